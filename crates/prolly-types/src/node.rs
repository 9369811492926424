//! Leaf/branch node records and the key-index bisection shared by cursors
//! and the construction framework.

use crate::link::Link;
use std::cmp::Ordering;

/// A key comparator. Defaults to byte-lexicographic order; a tree may be
/// configured with a different total order as long as both sides of any
/// comparison (diff, merge) use the same one.
pub type CompareFn = fn(&[u8], &[u8]) -> Ordering;

/// The default, byte-lexicographic comparator.
pub fn lexicographic(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

/// A tree node: either a leaf holding keys and encoded values, or a branch
/// holding keys and child links. `keys[i]` in a branch is the *largest* key
/// present in the subtree reachable through `links[i]` (the high-key rule).
///
/// Keys are strictly increasing under the tree's comparator in both
/// variants; an empty node is never constructed once published (invariant
/// enforced by the framework, not by this type).
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// A leaf: sorted keys paired with their encoded values.
    Leaf {
        /// Strictly increasing keys.
        keys: Vec<Vec<u8>>,
        /// Pre-encoded value bytes, one per key.
        values: Vec<Vec<u8>>,
    },
    /// A branch: sorted high-keys paired with child links.
    Branch {
        /// Strictly increasing high-keys, one per child.
        keys: Vec<Vec<u8>>,
        /// Child links, one per key.
        links: Vec<Link>,
    },
}

/// On-wire shape of a [`Node`]: an explicit `is_leaf` flag alongside exactly
/// one of `values`/`links`, matching the record shape fixed by the spec so
/// the encoding is byte-exact across implementations rather than an artifact
/// of Rust's enum representation.
#[derive(serde::Serialize, serde::Deserialize)]
struct NodeWire {
    is_leaf: bool,
    keys: Vec<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    values: Option<Vec<Vec<u8>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    links: Option<Vec<Link>>,
}

impl serde::Serialize for Node {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let wire = match self {
            Node::Leaf { keys, values } => NodeWire {
                is_leaf: true,
                keys: keys.clone(),
                values: Some(values.clone()),
                links: None,
            },
            Node::Branch { keys, links } => NodeWire {
                is_leaf: false,
                keys: keys.clone(),
                values: None,
                links: Some(links.clone()),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> serde::Deserialize<'de> for Node {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = NodeWire::deserialize(deserializer)?;
        if wire.is_leaf {
            let values = wire
                .values
                .ok_or_else(|| serde::de::Error::missing_field("values"))?;
            Ok(Node::Leaf {
                keys: wire.keys,
                values,
            })
        } else {
            let links = wire
                .links
                .ok_or_else(|| serde::de::Error::missing_field("links"))?;
            Ok(Node::Branch {
                keys: wire.keys,
                links,
            })
        }
    }
}

impl Node {
    /// Whether this node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf { .. })
    }

    /// Number of entries in this node.
    pub fn len(&self) -> usize {
        match self {
            Node::Leaf { keys, .. } | Node::Branch { keys, .. } => keys.len(),
        }
    }

    /// Whether this node currently holds no entries. A node in this state
    /// must never be serialized/stored; it only exists transiently inside a
    /// level-builder's buffer.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The key slice, regardless of variant.
    pub fn keys(&self) -> &[Vec<u8>] {
        match self {
            Node::Leaf { keys, .. } | Node::Branch { keys, .. } => keys,
        }
    }

    /// The key at index `i`.
    ///
    /// # Panics
    /// Panics if `i >= self.len()`.
    pub fn key_at(&self, i: usize) -> &[u8] {
        &self.keys()[i]
    }

    /// The encoded value at index `i`.
    ///
    /// # Panics
    /// Panics if this node is a branch, or if `i >= self.len()`.
    pub fn value_at(&self, i: usize) -> &[u8] {
        match self {
            Node::Leaf { values, .. } => &values[i],
            Node::Branch { .. } => panic!("value_at called on a branch node"),
        }
    }

    /// The child link at index `i`.
    ///
    /// # Panics
    /// Panics if this node is a leaf, or if `i >= self.len()`.
    pub fn link_at(&self, i: usize) -> &Link {
        match self {
            Node::Branch { links, .. } => &links[i],
            Node::Leaf { .. } => panic!("link_at called on a leaf node"),
        }
    }

    /// The smallest index `i` with `keys[i] >= item` under `cmp`, clamped to
    /// the last index when `item` exceeds every key.
    ///
    /// # Panics
    /// Panics if the node is empty (callers must never hold an empty node
    /// past construction).
    pub fn key_index(&self, item: &[u8], cmp: CompareFn) -> usize {
        let keys = self.keys();
        assert!(!keys.is_empty(), "key_index on an empty node");
        let mut l = 0usize;
        let mut r = keys.len() - 1;
        while l < r {
            let mid = l + (r - l) / 2;
            match cmp(&keys[mid], item) {
                Ordering::Equal => return mid,
                Ordering::Greater => r = mid,
                Ordering::Less => l = mid + 1,
            }
        }
        l
    }

    /// The last (largest) key in this node — the high-key a parent branch
    /// would store for a link pointing at this node.
    ///
    /// # Panics
    /// Panics if the node is empty.
    pub fn last_key(&self) -> &[u8] {
        let keys = self.keys();
        &keys[keys.len() - 1]
    }
}
