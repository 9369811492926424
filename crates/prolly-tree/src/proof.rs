//! Inclusion proofs: a path from leaf to root, independently verifiable.

use prolly_types::Link;
use prolly_store::NodeStore;

use crate::cursor::Cursor;
use crate::error::TreeError;

/// One step of a [`Proof`]: the node identified by `node_link` has `index`
/// selected, either because it is the leaf holding the searched key or
/// because its link at `index` leads to the next segment's node.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProofSegment {
    /// The content link of the node this segment describes.
    pub node_link: Link,
    /// The index selected within that node.
    pub index: usize,
}

/// An inclusion path from a tree's root down to a specific leaf entry,
/// anchored to the root descriptor that names the tree.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Proof {
    /// Segments ordered root-first, leaf-last.
    pub segments: Vec<ProofSegment>,
    /// The root descriptor block this proof is anchored to.
    pub root_descriptor_link: Link,
}

impl Proof {
    /// Build a proof from a cursor already seeked to the target key.
    pub(crate) fn from_cursor(cursor: &Cursor, root_link: &Link, root_descriptor_link: Link) -> Self {
        let segments = cursor
            .path(root_link)
            .into_iter()
            .map(|(node_link, index)| ProofSegment { node_link, index })
            .collect();
        Self {
            segments,
            root_descriptor_link,
        }
    }
}

/// Verify that `(key, value)` is present under `root_descriptor_link`
/// according to `proof`, by independently re-reading every block the proof
/// names and checking that each step's recorded index leads to the next.
pub fn verify(
    proof: &Proof,
    key: &[u8],
    value: &[u8],
    root_descriptor_link: &Link,
    store: &NodeStore,
) -> Result<bool, TreeError> {
    if &proof.root_descriptor_link != root_descriptor_link {
        return Ok(false);
    }
    let Some(first) = proof.segments.first() else {
        return Ok(false);
    };
    let root_descriptor = store.read_tree(root_descriptor_link)?;
    if first.node_link != root_descriptor.root_link {
        return Ok(false);
    }

    for (i, segment) in proof.segments.iter().enumerate() {
        let node = store.read_node(&segment.node_link)?;
        if segment.index >= node.len() {
            return Ok(false);
        }
        let is_last = i + 1 == proof.segments.len();
        if is_last {
            if !node.is_leaf() {
                return Ok(false);
            }
            if node.key_at(segment.index) != key || node.value_at(segment.index) != value {
                return Ok(false);
            }
        } else {
            if node.is_leaf() {
                return Ok(false);
            }
            let next = &proof.segments[i + 1];
            if node.link_at(segment.index) != &next.node_link {
                return Ok(false);
            }
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prolly_store::{DagCborCodec, MemoryBlockStore, NodeCache, Sha256Hasher};
    use prolly_types::{lexicographic, Node, NodeCodecPrefix, RootDescriptor};
    use std::sync::Arc;

    fn store() -> NodeStore {
        NodeStore::new(
            Arc::new(MemoryBlockStore::new()),
            Arc::new(DagCborCodec),
            Arc::new(Sha256Hasher),
            NodeCache::new(64),
            NodeCodecPrefix::default_prefix(),
        )
    }

    #[test]
    fn proof_verifies_a_present_pair_and_rejects_a_tampered_value() {
        let store = store();
        let leaf = Node::Leaf {
            keys: vec![b"k1".to_vec(), b"k2".to_vec(), b"k3".to_vec()],
            values: vec![b"v1".to_vec(), b"v2".to_vec(), b"v3".to_vec()],
        };
        let root_link = store.write_node(&leaf).unwrap();
        let config_link = store.write_config(&prolly_types::TreeConfig::default()).unwrap();
        let descriptor = RootDescriptor {
            root_link: root_link.clone(),
            config_link,
        };
        let descriptor_link = store.write_tree(&descriptor).unwrap();

        let cursor = Cursor::at_item(&store, &root_link, b"k2", lexicographic).unwrap();
        let proof = Proof::from_cursor(&cursor, &root_link, descriptor_link.clone());

        assert!(verify(&proof, b"k2", b"v2", &descriptor_link, &store).unwrap());
        assert!(!verify(&proof, b"k2", b"tampered", &descriptor_link, &store).unwrap());
    }
}
