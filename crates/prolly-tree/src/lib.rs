//! # prolly-tree
//!
//! The algorithmic core: content-defined splitting, the cursor, the
//! streaming construction framework, mutation batching and rebuild,
//! structural diff/merge, and the [`tree::ProllyTree`] facade tying them
//! together over a [`prolly_store::NodeStore`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Errors surfaced by tree operations.
pub mod error;
/// Deterministic, content-defined node boundary decisions.
pub mod splitter;
/// Path-from-root traversal over a stored tree.
pub mod cursor;
/// Streaming multi-level construction.
pub mod framework;
/// A sorted, key-deduplicated batch of pending edits.
pub mod mutation;
/// A lazy, pull-based range iterator.
pub mod iterator;
/// Inclusion proofs.
pub mod proof;
/// The `ProllyTree` facade.
pub mod tree;

pub use cursor::Cursor;
pub use error::TreeError;
pub use framework::Framework;
pub use iterator::{CancellationToken, NeverCancel, RangeIter, NEVER_CANCEL};
pub use mutation::{Mutation, MutationBuffer, Op};
pub use proof::{verify, Proof, ProofSegment};
pub use splitter::{build_splitter, Splitter, SuffixThresholdSplitter};
pub use tree::ProllyTree;
