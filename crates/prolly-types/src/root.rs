//! The root descriptor: the single block that names a tree.

use crate::link::Link;

/// Names a tree by the link to its root node and the link to its
/// configuration. Loading a tree requires only this identifier.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RootDescriptor {
    /// Link to the root [`crate::Node`].
    pub root_link: Link,
    /// Link to the [`crate::TreeConfig`] this tree was built under.
    pub config_link: Link,
}
