//! End-to-end property tests over the public `ProllyTree` facade: build
//! convergence under permutation, idempotent/additive rebuild, and
//! diff/merge round-tripping.

use std::sync::Arc;

use proptest::prelude::*;
use proptest::strategy::ValueTree;

use prolly_store::{DagCborCodec, MemoryBlockStore, NodeCache, NodeStore, Sha256Hasher};
use prolly_testkit::{edit_batch_strategy, entry_set_strategy, memory_node_store, permutation_strategy, EditKind};
use prolly_tree::{Mutation, ProllyTree};
use prolly_types::{NodeCodecPrefix, TreeConfig};

fn small_config() -> TreeConfig {
    // Tiny caps so even a handful of entries exercise branch levels.
    TreeConfig {
        min_node_size: 8,
        max_pairs_per_node: 4,
        ..TreeConfig::default()
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn any_permutation_of_the_same_entries_builds_the_same_root(entries in entry_set_strategy(24)) {
        let permuted = {
            let mut runner = proptest::test_runner::TestRunner::default();
            permutation_strategy(entries.clone())
                .new_tree(&mut runner)
                .unwrap()
                .current()
        };

        let a = ProllyTree::build_lexicographic(memory_node_store(), small_config(), entries).unwrap();
        let b = ProllyTree::build_lexicographic(memory_node_store(), small_config(), permuted).unwrap();
        prop_assert_eq!(a.root_link(), b.root_link());
    }

    #[test]
    fn rebuild_with_an_empty_batch_is_a_no_op(entries in entry_set_strategy(16)) {
        let mut tree = ProllyTree::build_lexicographic(memory_node_store(), small_config(), entries).unwrap();
        let before = tree.root_link().clone();
        tree.mutate();
        tree.rebuild().unwrap();
        prop_assert_eq!(&before, tree.root_link());
    }

    #[test]
    fn rebuild_applies_every_staged_add(
        base in entry_set_strategy(16),
        fresh in entry_set_strategy(8),
    ) {
        // Keep `fresh` disjoint from `base` so every entry is a genuine Add.
        let base_keys: std::collections::BTreeSet<_> = base.iter().map(|(k, _)| k.clone()).collect();
        let fresh: Vec<_> = fresh.into_iter().filter(|(k, _)| !base_keys.contains(k)).collect();

        let mut tree = ProllyTree::build_lexicographic(memory_node_store(), small_config(), base).unwrap();
        tree.mutate();
        for (k, v) in &fresh {
            tree.mutate().push(Mutation::add(k.clone(), v.clone())).unwrap();
        }
        tree.rebuild().unwrap();

        for (k, v) in &fresh {
            prop_assert_eq!(tree.get(k).unwrap(), v.clone());
        }
    }

    #[test]
    fn diff_then_merge_reproduces_the_target_tree(
        case in entry_set_strategy(20).prop_flat_map(|base| {
            let keys: Vec<Vec<u8>> = base.iter().map(|(k, _)| k.clone()).collect();
            (Just(base), edit_batch_strategy(keys, 10))
        }),
    ) {
        let (base, edit_specs) = case;
        // diff()/merge() read both trees' nodes through `self`'s store, so the
        // two trees being compared must share one underlying store.
        let shared_store = memory_node_store();
        let mut base_tree = ProllyTree::build_lexicographic(shared_store.clone(), small_config(), base.clone()).unwrap();

        let mut target_tree = ProllyTree::build_lexicographic(shared_store, small_config(), base).unwrap();
        target_tree.mutate();
        for spec in &edit_specs {
            let mutation = match spec.kind {
                EditKind::Add => Mutation::add(spec.key.clone(), spec.value.clone()),
                EditKind::Modify => Mutation::modify(spec.key.clone(), spec.value.clone()),
                EditKind::Remove => Mutation::remove(spec.key.clone()),
            };
            target_tree.mutate().push(mutation).unwrap();
        }
        target_tree.rebuild().unwrap();

        base_tree.merge(&target_tree).unwrap();

        for (k, v) in target_tree.iter().unwrap().collect::<Result<Vec<_>, _>>().unwrap() {
            prop_assert_eq!(base_tree.get(&k).unwrap(), v);
        }
    }
}

#[test]
fn a_proof_verifies_only_the_exact_key_value_pair_it_was_built_for() {
    let tree = ProllyTree::build_lexicographic(
        memory_node_store(),
        small_config(),
        vec![
            (b"alpha".to_vec(), b"1".to_vec()),
            (b"bravo".to_vec(), b"2".to_vec()),
            (b"charlie".to_vec(), b"3".to_vec()),
        ],
    )
    .unwrap();

    let proof = tree.proof(b"bravo").unwrap();
    assert!(tree.verify(&proof, b"bravo", b"2").unwrap());
    assert!(!tree.verify(&proof, b"bravo", b"wrong").unwrap());
    assert!(!tree.verify(&proof, b"alpha", b"1").unwrap());
}

#[test]
fn a_single_point_modify_touches_only_the_path_to_the_edited_key() {
    // A raw `MemoryBlockStore` handle kept alongside the `NodeStore` so the
    // test can observe how many distinct blocks a rebuild actually writes
    // (content-addressed writes of already-known bytes are no-ops, so
    // `len()` only grows for genuinely new blocks).
    let blocks = Arc::new(MemoryBlockStore::new());
    let store = Arc::new(NodeStore::new(
        blocks.clone(),
        Arc::new(DagCborCodec),
        Arc::new(Sha256Hasher),
        NodeCache::new(256),
        NodeCodecPrefix::default_prefix(),
    ));

    let entries: Vec<(Vec<u8>, Vec<u8>)> = (0..200)
        .map(|i: u32| (format!("k{i:05}").into_bytes(), format!("v{i}").into_bytes()))
        .collect();
    let mut tree = ProllyTree::build_lexicographic(store, small_config(), entries.clone()).unwrap();

    let before = blocks.len();
    tree.mutate()
        .push(Mutation::modify(entries[100].0.clone(), b"replacement".to_vec()))
        .unwrap();
    tree.rebuild().unwrap();
    let written = blocks.len() - before;

    // A from-scratch build over 200 entries at this config's tiny node caps
    // writes on the order of dozens of blocks (every leaf plus every branch
    // level). A single point edit that shares everything but the path to
    // the edited key should write only that path's new nodes plus the new
    // root descriptor — height-bounded, not size-bounded.
    assert!(
        written < 20,
        "a single-key modify wrote {written} new blocks; expected only the edited path to be re-serialized"
    );
    assert_eq!(tree.get(&entries[100].0).unwrap(), b"replacement".to_vec());
    // Every untouched key must still resolve, proving the reused subtrees
    // were reattached rather than silently dropped.
    for (k, v) in entries.iter().filter(|(k, _)| k != &entries[100].0) {
        assert_eq!(&tree.get(k).unwrap(), v);
    }
}

#[test]
fn keys_absent_from_one_side_of_a_merge_are_never_removed() {
    let shared_store = memory_node_store();
    let mut a = ProllyTree::build_lexicographic(
        shared_store.clone(),
        small_config(),
        vec![(b"a".to_vec(), b"1".to_vec()), (b"only-in-a".to_vec(), b"x".to_vec())],
    )
    .unwrap();
    let b = ProllyTree::build_lexicographic(
        shared_store,
        small_config(),
        vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())],
    )
    .unwrap();

    a.merge(&b).unwrap();

    assert_eq!(a.get(b"only-in-a").unwrap(), b"x".to_vec());
    assert_eq!(a.get(b"b").unwrap(), b"2".to_vec());
}
