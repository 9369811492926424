//! Streaming multi-level construction: the framework and its level-builders.

use std::cmp::Ordering;
use std::mem;
use std::sync::Arc;

use prolly_types::{CompareFn, Link, Node, TreeConfig};
use prolly_store::NodeStore;
use tracing::debug;

use crate::cursor::Cursor;
use crate::error::TreeError;
use crate::splitter::{build_splitter, Splitter};

enum Payload {
    Value(Vec<u8>),
    Link(Link),
}

/// One stage of the construction pipeline: a node buffer for the level
/// currently being assembled, plus the splitter deciding its boundaries.
struct LevelBuilder {
    is_leaf: bool,
    keys: Vec<Vec<u8>>,
    values: Vec<Vec<u8>>,
    links: Vec<Link>,
    splitter: Box<dyn Splitter>,
}

impl LevelBuilder {
    fn new(is_leaf: bool, splitter: Box<dyn Splitter>) -> Self {
        Self {
            is_leaf,
            keys: Vec::new(),
            values: Vec::new(),
            links: Vec::new(),
            splitter,
        }
    }

    fn len(&self) -> usize {
        self.keys.len()
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn candidate_node(&self, key: &[u8], payload: &Payload) -> Node {
        let mut keys = self.keys.clone();
        keys.push(key.to_vec());
        match payload {
            Payload::Value(v) => {
                let mut values = self.values.clone();
                values.push(v.clone());
                Node::Leaf { keys, values }
            }
            Payload::Link(l) => {
                let mut links = self.links.clone();
                links.push(l.clone());
                Node::Branch { keys, links }
            }
        }
    }

    fn push(&mut self, key: Vec<u8>, payload: Payload) {
        self.keys.push(key);
        match payload {
            Payload::Value(v) => self.values.push(v),
            Payload::Link(l) => self.links.push(l),
        }
    }

    /// Drain the buffer into a [`Node`], leaving this builder empty. Does
    /// not reset the splitter — callers reset it once the node has been
    /// handed off.
    fn take_node(&mut self) -> Node {
        let keys = mem::take(&mut self.keys);
        if self.is_leaf {
            Node::Leaf {
                keys,
                values: mem::take(&mut self.values),
            }
        } else {
            Node::Branch {
                keys,
                links: mem::take(&mut self.links),
            }
        }
    }
}

/// A stack of per-level builders driving bottom-up tree construction from an
/// ordered stream of leaf entries (or, during rebuild, a mix of seeded
/// verbatim entries and new ones).
pub struct Framework {
    store: Arc<NodeStore>,
    config: TreeConfig,
    cmp: CompareFn,
    builders: Vec<LevelBuilder>,
}

impl Framework {
    /// A fresh framework over an empty leaf level.
    pub fn new(store: Arc<NodeStore>, config: TreeConfig, cmp: CompareFn) -> Result<Self, TreeError> {
        let leaf_splitter = build_splitter(&config)?;
        Ok(Self {
            store,
            config,
            cmp,
            builders: vec![LevelBuilder::new(true, leaf_splitter)],
        })
    }

    /// The comparator this framework was built with.
    pub fn cmp(&self) -> CompareFn {
        self.cmp
    }

    /// Append one `(key, value)` pair to the leaf level.
    pub fn append(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<(), TreeError> {
        self.do_append(0, key, Payload::Value(value))
    }

    /// Append a stream of `(key, value)` pairs to the leaf level, in order.
    pub fn append_batch(
        &mut self,
        pairs: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    ) -> Result<(), TreeError> {
        for (key, value) in pairs {
            self.append(key, value)?;
        }
        Ok(())
    }

    /// Pre-populate each level's builder with the entries that precede
    /// `cursor`'s current index at that level, copied verbatim from the
    /// already-stored nodes along its path. Branch-level entries before the
    /// index are themselves `(key, link)` pairs, so seeding a branch level
    /// reattaches whole left-sibling subtrees by link rather than reading
    /// them — the starting half of rebuild's structural-sharing strategy
    /// (SPEC_FULL.md §4.6).
    pub fn seed(&mut self, cursor: &Cursor) -> Result<(), TreeError> {
        for level in 0..cursor.level_count() {
            let (node, index) = cursor.frame_at_level(level);
            for i in 0..index {
                match node {
                    Node::Leaf { keys, values } => {
                        self.do_append(level, keys[i].clone(), Payload::Value(values[i].clone()))?;
                    }
                    Node::Branch { keys, links } => {
                        self.do_append(level, keys[i].clone(), Payload::Link(links[i].clone()))?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Copy entries verbatim from `from`'s current position forward while
    /// its key stays below `bound` (or to the true end of the tree, when
    /// `bound` is `None`). Whenever `from` sits at the very start of a node
    /// whose entire span lies below `bound`, the whole node is reattached by
    /// its existing link at the next level up instead of being decomposed
    /// entry-by-entry — the stitching half of rebuild's structural-sharing
    /// strategy: an unchanged subtree is neither re-read nor re-split.
    pub fn append_to_cursor(
        &mut self,
        from: &mut Cursor,
        bound: Option<&[u8]>,
        store: &NodeStore,
    ) -> Result<(), TreeError> {
        loop {
            if !from.is_valid() {
                return Ok(());
            }
            if let Some(b) = bound {
                if (self.cmp)(from.key(), b) != Ordering::Less {
                    return Ok(());
                }
            }

            let levels = from.level_count();
            let mut climbed = false;
            for level in (0..levels).rev() {
                let (node, index) = from.frame_at_level(level);
                if index != 0 {
                    continue;
                }
                let within_bound = match bound {
                    Some(b) => (self.cmp)(node.last_key(), b) == Ordering::Less,
                    None => true,
                };
                if !within_bound {
                    continue;
                }
                let link = match from.link_at_level(level) {
                    Some(link) => link.clone(),
                    None => continue,
                };
                let key = node.last_key().to_vec();
                debug!(level = level + 1, key = ?key, %link, "stitch: reused whole subtree");
                self.do_append(level + 1, key, Payload::Link(link))?;
                from.skip_node_at_level(level, store)?;
                climbed = true;
                break;
            }
            if climbed {
                continue;
            }

            let key = from.key().to_vec();
            let value = from.value().to_vec();
            self.do_append(0, key, Payload::Value(value))?;
            from.advance(store)?;
        }
    }

    fn ensure_level(&mut self, level: usize) -> Result<(), TreeError> {
        while self.builders.len() <= level {
            let splitter = build_splitter(&self.config)?;
            self.builders.push(LevelBuilder::new(false, splitter));
        }
        Ok(())
    }

    fn do_append(&mut self, level: usize, key: Vec<u8>, payload: Payload) -> Result<(), TreeError> {
        self.ensure_level(level)?;

        let fits = self.fits(level, &key, &payload)?;
        if !fits {
            if self.builders[level].is_empty() {
                return Err(TreeError::OversizedPair);
            }
            self.split_boundary(level)?;
            if !self.fits(level, &key, &payload)? {
                return Err(TreeError::OversizedPair);
            }
        }

        let value_bytes = match &payload {
            Payload::Value(v) => v.clone(),
            Payload::Link(l) => self.store.encode_link(l)?,
        };
        self.builders[level].push(key.clone(), payload);
        self.builders[level].splitter.append(&key, &value_bytes)?;

        if self.builders[level].splitter.is_boundary() {
            let degenerate_branch_of_one = level >= 1 && self.builders[level].len() == 1;
            if !degenerate_branch_of_one {
                self.split_boundary(level)?;
            }
        }
        Ok(())
    }

    fn fits(&self, level: usize, key: &[u8], payload: &Payload) -> Result<bool, TreeError> {
        let candidate = self.builders[level].candidate_node(key, payload);
        let bytes = self.store.encode_node(&candidate)?;
        Ok(bytes.len() <= self.config.max_node_size)
    }

    fn split_boundary(&mut self, level: usize) -> Result<(), TreeError> {
        let node = self.builders[level].take_node();
        let last_key = node.last_key().to_vec();
        let link = self.store.write_node(&node)?;
        self.builders[level].splitter.reset();
        debug!(level, node_len = node.len(), %link, "split boundary");
        self.ensure_level(level + 1)?;
        self.do_append(level + 1, last_key, Payload::Link(link))
    }

    /// Flush every pending level top-down, apply canonical-root collapse if
    /// the candidate root is a single-child branch chain, persist the root,
    /// and return its link.
    pub fn finish(mut self) -> Result<Link, TreeError> {
        let mut level = 0;
        loop {
            if level + 1 < self.builders.len() {
                if !self.builders[level].is_empty() {
                    self.split_boundary(level)?;
                }
                level += 1;
            } else {
                break;
            }
        }

        let top = &mut self.builders[level];
        if top.is_empty() {
            let empty = Node::Leaf {
                keys: vec![],
                values: vec![],
            };
            return Ok(self.store.write_node(&empty)?);
        }
        if top.is_leaf || top.len() >= 2 {
            let node = top.take_node();
            return Ok(self.store.write_node(&node)?);
        }

        // Exactly one pair in a branch buffer with no parent: canonical-root
        // collapse. Follow the single child link down without ever storing
        // this wrapper node.
        let node = top.take_node();
        let mut candidate = match node {
            Node::Branch { links, .. } => links.into_iter().next().expect("len == 1"),
            Node::Leaf { .. } => unreachable!("leaf handled above"),
        };
        loop {
            let child = self.store.read_node(&candidate)?;
            if child.is_leaf() || child.len() > 1 {
                break;
            }
            candidate = match child {
                Node::Branch { links, .. } => links.into_iter().next().expect("len == 1"),
                Node::Leaf { .. } => unreachable!("checked above"),
            };
        }
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prolly_store::{DagCborCodec, MemoryBlockStore, NodeCache, Sha256Hasher};
    use prolly_types::{lexicographic, NodeCodecPrefix};

    fn store() -> Arc<NodeStore> {
        Arc::new(NodeStore::new(
            Arc::new(MemoryBlockStore::new()),
            Arc::new(DagCborCodec),
            Arc::new(Sha256Hasher),
            NodeCache::new(256),
            NodeCodecPrefix::default_prefix(),
        ))
    }

    #[test]
    fn three_pairs_under_default_caps_fit_in_one_leaf_root() {
        let store = store();
        let config = TreeConfig::default();
        let mut fw = Framework::new(store.clone(), config, lexicographic).unwrap();
        fw.append_batch(vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ])
        .unwrap();
        let root = fw.finish().unwrap();
        let node = store.read_node(&root).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.len(), 3);
        assert_eq!(node.key_at(0), b"a");
        assert_eq!(node.key_at(2), b"c");
    }

    #[test]
    fn empty_input_still_produces_a_root() {
        let store = store();
        let fw = Framework::new(store.clone(), TreeConfig::default(), lexicographic).unwrap();
        let root = fw.finish().unwrap();
        let node = store.read_node(&root).unwrap();
        assert!(node.is_leaf());
        assert_eq!(node.len(), 0);
    }

    #[test]
    fn identical_entries_under_two_permutations_converge_to_the_same_root() {
        let store = store();
        let mut config = TreeConfig::default();
        config.strategy_params = prolly_types::StrategyParams::SuffixThreshold { chunking_factor: 2 };
        config.min_node_size = 0;

        let mut pairs: Vec<(Vec<u8>, Vec<u8>)> = (0..500)
            .map(|i: u32| (format!("k{i:05}").into_bytes(), format!("v{i}").into_bytes()))
            .collect();

        let mut fw_a = Framework::new(store.clone(), config.clone(), lexicographic).unwrap();
        let mut sorted = pairs.clone();
        sorted.sort();
        fw_a.append_batch(sorted.clone()).unwrap();
        let root_a = fw_a.finish().unwrap();

        pairs.sort();
        let mut fw_b = Framework::new(store.clone(), config, lexicographic).unwrap();
        fw_b.append_batch(pairs).unwrap();
        let root_b = fw_b.finish().unwrap();

        assert_eq!(root_a, root_b);
    }

    #[test]
    fn large_input_with_small_chunking_factor_builds_multiple_levels() {
        let store = store();
        let mut config = TreeConfig::default();
        config.strategy_params = prolly_types::StrategyParams::SuffixThreshold { chunking_factor: 2 };
        config.min_node_size = 0;

        let mut fw = Framework::new(store.clone(), config, lexicographic).unwrap();
        let pairs: Vec<(Vec<u8>, Vec<u8>)> = (0..2000)
            .map(|i: u32| (format!("k{i:06}").into_bytes(), format!("v{i}").into_bytes()))
            .collect();
        fw.append_batch(pairs).unwrap();
        let root = fw.finish().unwrap();

        let root_node = store.read_node(&root).unwrap();
        assert!(!root_node.is_leaf(), "2000 pairs at factor 2 must not fit in a single leaf");
    }

    #[test]
    fn root_is_never_a_single_child_branch_chain() {
        let store = store();
        let mut config = TreeConfig::default();
        config.strategy_params = prolly_types::StrategyParams::SuffixThreshold { chunking_factor: 0 };
        config.min_node_size = 0;
        config.max_pairs_per_node = 1;

        let mut fw = Framework::new(store.clone(), config, lexicographic).unwrap();
        fw.append_batch(vec![(b"a".to_vec(), b"1".to_vec()), (b"b".to_vec(), b"2".to_vec())])
            .unwrap();
        let root = fw.finish().unwrap();
        let node = store.read_node(&root).unwrap();
        if !node.is_leaf() {
            assert!(node.len() > 1, "collapsed root must not itself be a single-child branch");
        }
    }
}
