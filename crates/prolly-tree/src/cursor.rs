//! Path-from-root traversal over a stored tree.

use std::cmp::Ordering;

use prolly_types::{CompareFn, Link, Node};
use prolly_store::NodeStore;

use crate::error::TreeError;

/// One level of a cursor's path: the node read at that level and the index
/// currently selected within it.
#[derive(Clone)]
struct Frame {
    node: Node,
    index: usize,
}

/// An owned stack of `(node, index)` frames from root to leaf.
///
/// Two cursors are only comparable when they were produced from trees of
/// identical height; comparing mismatched heights is
/// [`TreeError::CursorHeightMismatch`]. A cursor borrows nothing from the
/// store — every node it visits is read into an owned [`Node`] — so cursors
/// outlive any single store borrow and are cheap to clone.
#[derive(Clone)]
pub struct Cursor {
    frames: Vec<Frame>,
    valid: bool,
}

impl Cursor {
    /// Seek to the first key `≥ key` (or the last key, if `key` exceeds
    /// every key in the tree), descending from `root_link`.
    pub fn at_item(
        store: &NodeStore,
        root_link: &Link,
        key: &[u8],
        cmp: CompareFn,
    ) -> Result<Self, TreeError> {
        let mut frames = Vec::new();
        let mut link = root_link.clone();
        loop {
            let node = store.read_node(&link)?;
            let is_leaf = node.is_leaf();
            if node.is_empty() {
                // Only the root may legitimately be empty (the whole-tree
                // empty-map case); represent it as a single invalid frame.
                frames.push(Frame { node, index: 0 });
                break;
            }
            let idx = node.key_index(key, cmp);
            if is_leaf {
                frames.push(Frame { node, index: idx });
                break;
            }
            let next_link = node.link_at(idx).clone();
            frames.push(Frame { node, index: idx });
            link = next_link;
        }
        let valid = frames
            .last()
            .map(|f| f.index < f.node.len())
            .unwrap_or(false);
        Ok(Self { frames, valid })
    }

    /// Seek to the first entry of the tree rooted at `root_link`.
    pub fn at_start(store: &NodeStore, root_link: &Link) -> Result<Self, TreeError> {
        Self::at_item(store, root_link, &[], |_, _| Ordering::Greater)
    }

    /// `0 ≤ idx < len` at the leaf: whether this cursor currently names a
    /// live entry.
    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Whether the cursor sits on the last entry of its current leaf (not
    /// necessarily the last entry of the whole tree).
    pub fn is_at_end(&self) -> bool {
        let leaf = self.leaf_frame();
        self.valid && leaf.index + 1 == leaf.node.len()
    }

    fn leaf_frame(&self) -> &Frame {
        self.frames.last().expect("cursor always has at least one frame")
    }

    /// The key at the current position.
    ///
    /// # Panics
    /// Panics if the cursor is not valid.
    pub fn key(&self) -> &[u8] {
        assert!(self.valid, "key() called on an invalid cursor");
        let f = self.leaf_frame();
        f.node.key_at(f.index)
    }

    /// The value at the current position.
    ///
    /// # Panics
    /// Panics if the cursor is not valid.
    pub fn value(&self) -> &[u8] {
        assert!(self.valid, "value() called on an invalid cursor");
        let f = self.leaf_frame();
        f.node.value_at(f.index)
    }

    /// The link to the leaf node currently selected, i.e. the child link at
    /// the deepest branch frame.
    ///
    /// # Panics
    /// Panics if the tree has only one level (the root is itself the leaf).
    pub fn link(&self) -> &Link {
        assert!(self.frames.len() >= 2, "link() requires a branch/leaf split");
        let parent = &self.frames[self.frames.len() - 2];
        parent.node.link_at(parent.index)
    }

    /// Path height (number of frames), used to check comparability.
    pub fn height(&self) -> usize {
        self.frames.len()
    }

    /// The `(node_link, index)` pair at every frame from root to leaf,
    /// where `node_link` identifies the node at that frame (the root's own
    /// link for frame 0, otherwise the link the parent frame selected) and
    /// `index` is this frame's currently selected position. Used to build
    /// an inclusion [`crate::proof::Proof`].
    pub(crate) fn path(&self, root_link: &Link) -> Vec<(Link, usize)> {
        let mut links = Vec::with_capacity(self.frames.len());
        links.push(root_link.clone());
        for frame in &self.frames[..self.frames.len() - 1] {
            links.push(frame.node.link_at(frame.index).clone());
        }
        links
            .into_iter()
            .zip(self.frames.iter().map(|f| f.index))
            .collect()
    }

    /// Number of frames in this cursor's path (its height).
    pub(crate) fn level_count(&self) -> usize {
        self.frames.len()
    }

    /// The node and currently-selected index `level` frames up from the leaf
    /// (`level` 0 is the leaf frame), used by the rebuild framework to seed
    /// and stitch per level.
    pub(crate) fn frame_at_level(&self, level: usize) -> (&Node, usize) {
        let idx = self.frames.len() - 1 - level;
        (&self.frames[idx].node, self.frames[idx].index)
    }

    /// The link naming the node at `level` frames up from the leaf, as held
    /// by its parent frame — `None` when `level` is the root (no parent
    /// holds its link).
    pub(crate) fn link_at_level(&self, level: usize) -> Option<&Link> {
        let idx = self.frames.len() - 1 - level;
        if idx == 0 {
            None
        } else {
            let parent = &self.frames[idx - 1];
            Some(parent.node.link_at(parent.index))
        }
    }

    /// Advance past the entire node at `level`, to the start of the next
    /// sibling subtree at that level (or invalidate the cursor if `level` is
    /// the root). Used by rebuild's stitching to reattach a whole unchanged
    /// subtree by its existing link without descending into it.
    pub(crate) fn skip_node_at_level(&mut self, level: usize, store: &NodeStore) -> Result<(), TreeError> {
        let idx = self.frames.len() - 1 - level;
        if idx == 0 {
            self.valid = false;
            return Ok(());
        }
        self.bump_at(idx - 1, store)
    }

    /// First differing index along the path from the root.
    ///
    /// # Errors
    /// [`TreeError::CursorHeightMismatch`] if `self` and `other` were seeked
    /// through trees of different height.
    pub fn compare(&self, other: &Cursor) -> Result<Ordering, TreeError> {
        if self.frames.len() != other.frames.len() {
            return Err(TreeError::CursorHeightMismatch);
        }
        for (a, b) in self.frames.iter().zip(other.frames.iter()) {
            match a.index.cmp(&b.index) {
                Ordering::Equal => continue,
                ord => return Ok(ord),
            }
        }
        Ok(Ordering::Equal)
    }

    /// Advance by one entry at the leaf, climbing and re-seeking as many
    /// levels as needed.
    pub fn advance(&mut self, store: &NodeStore) -> Result<(), TreeError> {
        let leaf = self.frames.len() - 1;
        self.bump_at(leaf, store)
    }

    /// Advance the frame at `level` by one entry, climbing to the parent if
    /// `level`'s node is exhausted, then re-seeking every level below the
    /// point where the climb stopped to the start of the newly-selected
    /// subtree. Used directly by [`Self::skip_common`] to step over an
    /// entire shared subtree in one move.
    fn bump_at(&mut self, level: usize, store: &NodeStore) -> Result<(), TreeError> {
        let mut l = level;
        loop {
            self.frames[l].index += 1;
            if self.frames[l].index < self.frames[l].node.len() {
                break;
            }
            if l == 0 {
                self.valid = false;
                return Ok(());
            }
            l -= 1;
        }
        for next in l + 1..self.frames.len() {
            let link = self.frames[next - 1]
                .node
                .link_at(self.frames[next - 1].index)
                .clone();
            let node = store.read_node(&link)?;
            self.frames[next] = Frame { node, index: 0 };
        }
        self.valid = true;
        Ok(())
    }

    /// While both cursors point at equal `(key, value)` pairs, advance them
    /// in lockstep, jumping over an entire shared subtree whenever both
    /// cursors sit at the start of a node whose parent links agree (meaning
    /// the subtree is byte-identical and need not be read). Falls back to
    /// single-entry advances when the parent links or positions disagree.
    /// Stops when the pairs differ or either cursor becomes invalid.
    pub fn skip_common(&mut self, other: &mut Cursor, store: &NodeStore) -> Result<(), TreeError> {
        loop {
            if !self.valid || !other.valid {
                return Ok(());
            }
            if self.key() != other.key() || self.value() != other.value() {
                return Ok(());
            }
            let leaf = self.frames.len() - 1;
            let mut climb_to: Option<usize> = None;
            for l in (1..=leaf).rev() {
                if self.frames[l].index != 0 || other.frames[l].index != 0 {
                    break;
                }
                let self_link = self.frames[l - 1].node.link_at(self.frames[l - 1].index);
                let other_link = other.frames[l - 1].node.link_at(other.frames[l - 1].index);
                if self_link != other_link {
                    break;
                }
                climb_to = Some(l - 1);
            }
            match climb_to {
                Some(parent_level) => {
                    self.bump_at(parent_level, store)?;
                    other.bump_at(parent_level, store)?;
                }
                None => {
                    self.advance(store)?;
                    other.advance(store)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prolly_types::{lexicographic, Node};
    use prolly_store::{DagCborCodec, MemoryBlockStore, NodeCache, Sha256Hasher};
    use std::sync::Arc;

    fn store() -> NodeStore {
        NodeStore::new(
            Arc::new(MemoryBlockStore::new()),
            Arc::new(DagCborCodec),
            Arc::new(Sha256Hasher),
            NodeCache::new(64),
            prolly_types::NodeCodecPrefix::default_prefix(),
        )
    }

    fn leaf(pairs: &[(&str, &str)]) -> Node {
        Node::Leaf {
            keys: pairs.iter().map(|(k, _)| k.as_bytes().to_vec()).collect(),
            values: pairs.iter().map(|(_, v)| v.as_bytes().to_vec()).collect(),
        }
    }

    #[test]
    fn single_level_tree_seeks_and_advances() {
        let store = store();
        let root = leaf(&[("a", "1"), ("b", "2"), ("c", "3")]);
        let link = store.write_node(&root).unwrap();

        let mut cursor = Cursor::at_item(&store, &link, b"b", lexicographic).unwrap();
        assert!(cursor.is_valid());
        assert_eq!(cursor.key(), b"b");
        assert_eq!(cursor.value(), b"2");

        cursor.advance(&store).unwrap();
        assert_eq!(cursor.key(), b"c");
        assert!(cursor.is_at_end());

        cursor.advance(&store).unwrap();
        assert!(!cursor.is_valid());
    }

    #[test]
    fn two_level_tree_climbs_across_leaves() {
        let store = store();
        let left = leaf(&[("a", "1"), ("b", "2")]);
        let right = leaf(&[("c", "3"), ("d", "4")]);
        let left_link = store.write_node(&left).unwrap();
        let right_link = store.write_node(&right).unwrap();
        let root = Node::Branch {
            keys: vec![b"b".to_vec(), b"d".to_vec()],
            links: vec![left_link, right_link],
        };
        let root_link = store.write_node(&root).unwrap();

        let mut cursor = Cursor::at_item(&store, &root_link, b"b", lexicographic).unwrap();
        assert_eq!(cursor.key(), b"b");
        cursor.advance(&store).unwrap();
        assert_eq!(cursor.key(), b"c");
        cursor.advance(&store).unwrap();
        assert_eq!(cursor.key(), b"d");
        cursor.advance(&store).unwrap();
        assert!(!cursor.is_valid());
    }

    #[test]
    fn compare_rejects_mismatched_heights() {
        let store = store();
        let flat = leaf(&[("a", "1")]);
        let flat_link = store.write_node(&flat).unwrap();
        let child = leaf(&[("a", "1")]);
        let child_link = store.write_node(&child).unwrap();
        let branch = Node::Branch {
            keys: vec![b"a".to_vec()],
            links: vec![child_link],
        };
        let branch_link = store.write_node(&branch).unwrap();

        let a = Cursor::at_item(&store, &flat_link, b"a", lexicographic).unwrap();
        let b = Cursor::at_item(&store, &branch_link, b"a", lexicographic).unwrap();
        assert!(matches!(a.compare(&b), Err(TreeError::CursorHeightMismatch)));
    }

    #[test]
    fn skip_common_jumps_over_an_identical_shared_leaf() {
        let store = store();
        let shared = leaf(&[("a", "1"), ("b", "2")]);
        let shared_link = store.write_node(&shared).unwrap();
        let tail_left = leaf(&[("z", "9")]);
        let tail_left_link = store.write_node(&tail_left).unwrap();
        let tail_right = leaf(&[("z", "10")]);
        let tail_right_link = store.write_node(&tail_right).unwrap();

        let base_root = Node::Branch {
            keys: vec![b"b".to_vec(), b"z".to_vec()],
            links: vec![shared_link.clone(), tail_left_link],
        };
        let other_root = Node::Branch {
            keys: vec![b"b".to_vec(), b"z".to_vec()],
            links: vec![shared_link, tail_right_link],
        };
        let base_link = store.write_node(&base_root).unwrap();
        let other_link = store.write_node(&other_root).unwrap();

        let mut base = Cursor::at_item(&store, &base_link, b"a", lexicographic).unwrap();
        let mut other = Cursor::at_item(&store, &other_link, b"a", lexicographic).unwrap();
        base.skip_common(&mut other, &store).unwrap();

        assert_eq!(base.key(), b"z");
        assert_eq!(other.key(), b"z");
    }
}
