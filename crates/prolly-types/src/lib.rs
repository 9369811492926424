//! # prolly-types
//!
//! Foundation types shared by every other crate in the workspace: the
//! content-addressed [`Link`], the [`Node`] record (leaf or branch), and the
//! [`TreeConfig`] that fixes node sizing and the splitting strategy.
//!
//! This crate has no dependency on the storage layer or the tree algorithms
//! above it — it only describes the wire shapes and the pure functions that
//! operate on them (key search, config validation, equality).

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Content identifiers: codec id + hash algorithm + digest bytes.
pub mod link;
/// Leaf/branch node record and binary search over its keys.
pub mod node;
/// Tree configuration: node size caps and splitter strategy parameters.
pub mod config;
/// Error types shared across this crate's modules.
pub mod error;
/// The root descriptor naming a tree by its root and config links.
pub mod root;

pub use config::{ChunkStrategy, StrategyParams, TreeConfig};
pub use error::TypesError;
pub use link::{CodecId, HashAlgo, Link, NodeCodecPrefix};
pub use node::{lexicographic, CompareFn, Node};
pub use root::RootDescriptor;
