//! Serialization of records to and from the bytes a [`crate::block_store::BlockStore`] holds.

use prolly_types::{CodecId, Link, Node, RootDescriptor, TreeConfig};

use crate::error::StoreError;

/// Encodes and decodes the three record kinds a node store persists.
///
/// Spelled out per-record rather than generically so the trait stays
/// object-safe: a [`crate::store::NodeStore`] holds this behind
/// `Arc<dyn Codec>`, chosen once per tree via the config's
/// [`prolly_types::NodeCodecPrefix`].
pub trait Codec: Send + Sync {
    /// Which [`CodecId`] this codec produces.
    fn codec_id(&self) -> CodecId;

    /// Encode a node record.
    fn encode_node(&self, node: &Node) -> Result<Vec<u8>, StoreError>;
    /// Decode a node record.
    fn decode_node(&self, bytes: &[u8]) -> Result<Node, StoreError>;

    /// Encode a tree config.
    fn encode_config(&self, config: &TreeConfig) -> Result<Vec<u8>, StoreError>;
    /// Decode a tree config.
    fn decode_config(&self, bytes: &[u8]) -> Result<TreeConfig, StoreError>;

    /// Encode a root descriptor.
    fn encode_root(&self, root: &RootDescriptor) -> Result<Vec<u8>, StoreError>;
    /// Decode a root descriptor.
    fn decode_root(&self, bytes: &[u8]) -> Result<RootDescriptor, StoreError>;

    /// Encode a bare child [`Link`] as a branch payload's value bytes, the
    /// same way a leaf's value bytes are encoded, so the splitter's boundary
    /// decision is made over the identical byte string a conforming reader
    /// would hash.
    fn encode_link(&self, link: &Link) -> Result<Vec<u8>, StoreError>;
}

/// DAG-CBOR via `serde_ipld_dagcbor`, the default and only codec this crate
/// implements.
#[derive(Debug, Default, Clone, Copy)]
pub struct DagCborCodec;

impl Codec for DagCborCodec {
    fn codec_id(&self) -> CodecId {
        CodecId::DagCbor
    }

    fn encode_node(&self, node: &Node) -> Result<Vec<u8>, StoreError> {
        serde_ipld_dagcbor::to_vec(node).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn decode_node(&self, bytes: &[u8]) -> Result<Node, StoreError> {
        serde_ipld_dagcbor::from_slice(bytes).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn encode_config(&self, config: &TreeConfig) -> Result<Vec<u8>, StoreError> {
        serde_ipld_dagcbor::to_vec(config).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn decode_config(&self, bytes: &[u8]) -> Result<TreeConfig, StoreError> {
        serde_ipld_dagcbor::from_slice(bytes).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn encode_root(&self, root: &RootDescriptor) -> Result<Vec<u8>, StoreError> {
        serde_ipld_dagcbor::to_vec(root).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn decode_root(&self, bytes: &[u8]) -> Result<RootDescriptor, StoreError> {
        serde_ipld_dagcbor::from_slice(bytes).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn encode_link(&self, link: &Link) -> Result<Vec<u8>, StoreError> {
        serde_ipld_dagcbor::to_vec(link).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_tree_config() {
        let codec = DagCborCodec;
        let cfg = TreeConfig::default();
        let bytes = codec.encode_config(&cfg).unwrap();
        let decoded = codec.decode_config(&bytes).unwrap();
        assert_eq!(cfg, decoded);
    }

    #[test]
    fn round_trips_a_leaf_node() {
        let codec = DagCborCodec;
        let node = Node::Leaf {
            keys: vec![b"a".to_vec(), b"b".to_vec()],
            values: vec![b"1".to_vec(), b"2".to_vec()],
        };
        let bytes = codec.encode_node(&node).unwrap();
        let decoded = codec.decode_node(&bytes).unwrap();
        assert_eq!(node, decoded);
    }

    #[test]
    fn codec_id_is_dag_cbor() {
        assert_eq!(DagCborCodec.codec_id(), CodecId::DagCbor);
    }
}
