//! # prolly-testkit
//!
//! Shared [`proptest`] strategies and store fixtures used by the other
//! workspace crates' test suites: key/value universes, permutations of a
//! fixed entry set (for convergence properties), batches of pending edits,
//! and a ready-to-use in-memory [`prolly_store::NodeStore`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::sync::Arc;

use proptest::collection::vec;
use proptest::prelude::*;
use proptest::sample::Index;

use prolly_store::{DagCborCodec, MemoryBlockStore, NodeCache, NodeStore, Sha256Hasher};
use prolly_types::NodeCodecPrefix;

/// A fresh [`NodeStore`] backed by an empty [`MemoryBlockStore`], DAG-CBOR
/// encoding, and SHA-256 hashing — the combination every other crate's unit
/// tests reach for when they just need "a store".
pub fn memory_node_store() -> Arc<NodeStore> {
    Arc::new(NodeStore::new(
        Arc::new(MemoryBlockStore::new()),
        Arc::new(DagCborCodec),
        Arc::new(Sha256Hasher),
        NodeCache::new(256),
        NodeCodecPrefix::default_prefix(),
    ))
}

/// Short byte-string keys, deliberately narrow so generated batches collide
/// and exercise dedup/overwrite paths.
pub fn key_strategy() -> impl Strategy<Value = Vec<u8>> {
    "[a-f0-9]{1,6}".prop_map(|s| s.into_bytes())
}

/// Short byte-string values.
pub fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    vec(any::<u8>(), 0..16)
}

/// A set of distinct `(key, value)` pairs, keys deduplicated by retaining the
/// last occurrence, the way a real batch insert would.
pub fn entry_set_strategy(max_len: usize) -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    vec((key_strategy(), value_strategy()), 0..max_len).prop_map(|pairs| {
        let mut by_key = std::collections::BTreeMap::new();
        for (k, v) in pairs {
            by_key.insert(k, v);
        }
        by_key.into_iter().collect()
    })
}

/// A permutation of `entries`, for exercising order-independence: any
/// shuffling of the same entry set must converge to the same tree.
pub fn permutation_strategy(
    entries: Vec<(Vec<u8>, Vec<u8>)>,
) -> impl Strategy<Value = Vec<(Vec<u8>, Vec<u8>)>> {
    let len = entries.len();
    vec(any::<Index>(), len).prop_map(move |picks| {
        let mut pool = entries.clone();
        let mut out = Vec::with_capacity(len);
        for pick in picks {
            if pool.is_empty() {
                break;
            }
            let i = pick.index(pool.len());
            out.push(pool.remove(i));
        }
        out
    })
}

/// The kind of edit a generated mutation batch applies, mirroring
/// `prolly_tree::Op` without requiring this crate to depend on `prolly-tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKind {
    /// Insert a key known not to exist yet.
    Add,
    /// Overwrite a key known to already exist.
    Modify,
    /// Delete a key known to already exist.
    Remove,
}

/// One generated edit: a key/value pair plus which [`EditKind`] to apply.
/// `value` is empty for `Remove`, which carries none.
#[derive(Debug, Clone)]
pub struct EditSpec {
    /// The target key.
    pub key: Vec<u8>,
    /// The value to write; unused for `Remove`.
    pub value: Vec<u8>,
    /// Which edit to apply.
    pub kind: EditKind,
}

/// A batch of edits against a known `existing` key set: modifies are only
/// ever drawn from `existing`, adds only ever draw fresh keys, so the batch
/// is always valid to apply without a pre-check.
pub fn edit_batch_strategy(
    existing: Vec<Vec<u8>>,
    max_len: usize,
) -> impl Strategy<Value = Vec<EditSpec>> {
    let add_branch = (key_strategy(), value_strategy())
        .prop_map(|(key, value)| EditSpec {
            key,
            value,
            kind: EditKind::Add,
        })
        .boxed();

    let branch = if existing.is_empty() {
        add_branch
    } else {
        let modify_existing = existing.clone();
        let modify_branch = (any::<Index>(), value_strategy())
            .prop_map(move |(idx, value)| EditSpec {
                key: modify_existing[idx.index(modify_existing.len())].clone(),
                value,
                kind: EditKind::Modify,
            })
            .boxed();
        prop_oneof![add_branch, modify_branch].boxed()
    };

    vec(branch, 0..max_len).prop_map(move |mut specs| {
        // Adds must be distinct from `existing` and from each other; drop any
        // collisions rather than reject the whole case.
        let mut seen: std::collections::BTreeSet<Vec<u8>> = existing.iter().cloned().collect();
        specs.retain(|spec| match spec.kind {
            EditKind::Add => seen.insert(spec.key.clone()),
            _ => true,
        });
        specs
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::strategy::ValueTree;
    use proptest::test_runner::TestRunner;

    #[test]
    fn permutation_strategy_preserves_multiset() {
        let entries = vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ];
        let mut runner = TestRunner::default();
        let strat = permutation_strategy(entries.clone());
        for _ in 0..8 {
            let tree = strat.new_tree(&mut runner).unwrap();
            let mut shuffled = tree.current();
            shuffled.sort();
            let mut expected = entries.clone();
            expected.sort();
            assert_eq!(shuffled, expected);
        }
    }

    #[test]
    fn memory_node_store_round_trips_a_node() {
        use prolly_types::Node;
        let store = memory_node_store();
        let node = Node::Leaf {
            keys: vec![b"a".to_vec()],
            values: vec![b"1".to_vec()],
        };
        let link = store.write_node(&node).unwrap();
        assert_eq!(store.read_node(&link).unwrap(), node);
    }
}
