//! The facade that ties block storage, codec, hasher, and cache together.

use std::sync::Arc;

use prolly_types::{Node, NodeCodecPrefix, RootDescriptor, TreeConfig};
use tracing::trace;

use crate::block_store::BlockStore;
use crate::cache::NodeCache;
use crate::codec::Codec;
use crate::error::StoreError;
use crate::hasher::Hasher;

/// Reads and writes the three record kinds a tree persists, addressing each
/// by the digest of its encoded bytes.
///
/// Composed from trait objects rather than generics so the concrete codec,
/// hasher, and backing store are chosen once, at construction, by whoever
/// wires up a tree — there is no global registry to look them up from.
pub struct NodeStore {
    block_store: Arc<dyn BlockStore>,
    codec: Arc<dyn Codec>,
    hasher: Arc<dyn Hasher>,
    cache: NodeCache,
    prefix: NodeCodecPrefix,
}

impl NodeStore {
    /// Build a store from its components and the prefix every write will be
    /// stamped with.
    pub fn new(
        block_store: Arc<dyn BlockStore>,
        codec: Arc<dyn Codec>,
        hasher: Arc<dyn Hasher>,
        cache: NodeCache,
        prefix: NodeCodecPrefix,
    ) -> Self {
        Self {
            block_store,
            codec,
            hasher,
            cache,
            prefix,
        }
    }

    /// The prefix this store stamps onto every link it produces.
    pub fn prefix(&self) -> NodeCodecPrefix {
        self.prefix
    }

    fn link_for(&self, bytes: &[u8]) -> Result<prolly_types::Link, StoreError> {
        let native = self.hasher.digest(bytes);
        if native.len() < self.prefix.hash_length {
            return Err(StoreError::Codec(format!(
                "hasher produced {} bytes, prefix requires {}",
                native.len(),
                self.prefix.hash_length
            )));
        }
        let truncated = native[..self.prefix.hash_length].to_vec();
        Ok(prolly_types::Link::new(&self.prefix, truncated))
    }

    fn put_bytes(&self, bytes: Vec<u8>) -> Result<prolly_types::Link, StoreError> {
        let link = self.link_for(&bytes)?;
        self.cache.put(link.digest.clone(), bytes.clone());
        self.block_store.put(link.digest.clone(), bytes)?;
        Ok(link)
    }

    fn get_bytes(&self, link: &prolly_types::Link) -> Result<Vec<u8>, StoreError> {
        if let Some(cached) = self.cache.get(&link.digest) {
            return Ok(cached);
        }
        let bytes = self
            .block_store
            .get(&link.digest)?
            .ok_or_else(|| StoreError::BlockNotFound(link.to_string()))?;
        self.cache.put(link.digest.clone(), bytes.clone());
        Ok(bytes)
    }

    /// Encode a node without storing it, for trial-serialization size checks.
    pub fn encode_node(&self, node: &Node) -> Result<Vec<u8>, StoreError> {
        self.codec.encode_node(node)
    }

    /// Encode a bare child link the same way a leaf's value bytes are
    /// encoded, for the splitter's boundary decision over a branch payload.
    pub fn encode_link(&self, link: &prolly_types::Link) -> Result<Vec<u8>, StoreError> {
        self.codec.encode_link(link)
    }

    /// Encode and store a node, returning its link.
    pub fn write_node(&self, node: &Node) -> Result<prolly_types::Link, StoreError> {
        let bytes = self.codec.encode_node(node)?;
        let link = self.put_bytes(bytes)?;
        trace!(%link, is_leaf = node.is_leaf(), len = node.len(), "wrote node");
        Ok(link)
    }

    /// Load and decode a node by link.
    pub fn read_node(&self, link: &prolly_types::Link) -> Result<Node, StoreError> {
        let bytes = self.get_bytes(link)?;
        trace!(%link, len = bytes.len(), "read node");
        self.codec.decode_node(&bytes)
    }

    /// Encode and store a tree config, returning its link.
    pub fn write_config(&self, config: &TreeConfig) -> Result<prolly_types::Link, StoreError> {
        let bytes = self.codec.encode_config(config)?;
        let link = self.put_bytes(bytes)?;
        trace!(%link, "wrote config");
        Ok(link)
    }

    /// Load and decode a tree config by link.
    pub fn read_config(&self, link: &prolly_types::Link) -> Result<TreeConfig, StoreError> {
        let bytes = self.get_bytes(link)?;
        trace!(%link, len = bytes.len(), "read config");
        self.codec.decode_config(&bytes)
    }

    /// Encode and store a root descriptor, returning its link.
    pub fn write_tree(&self, root: &RootDescriptor) -> Result<prolly_types::Link, StoreError> {
        let bytes = self.codec.encode_root(root)?;
        let link = self.put_bytes(bytes)?;
        trace!(%link, len = bytes.len(), "wrote root descriptor");
        Ok(link)
    }

    /// Load and decode a root descriptor by link.
    pub fn read_tree(&self, link: &prolly_types::Link) -> Result<RootDescriptor, StoreError> {
        let bytes = self.get_bytes(link)?;
        trace!(%link, len = bytes.len(), "read root descriptor");
        self.codec.decode_root(&bytes)
    }
}
