//! # prolly-store
//!
//! The persistence boundary: encoding nodes/configs/root descriptors to
//! bytes, addressing them by digest, and caching the hot set in memory. Every
//! concern here is injected rather than looked up through a global registry —
//! [`store::NodeStore`] is built from whichever [`block_store::BlockStore`],
//! [`codec::Codec`], and [`hasher::Hasher`] the caller chooses.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Digest functions used to address stored blocks.
pub mod hasher;
/// Record encoding and decoding.
pub mod codec;
/// Raw byte storage keyed by digest.
pub mod block_store;
/// Bounded in-memory cache fronting the block store.
pub mod cache;
/// The [`store::NodeStore`] facade.
pub mod store;
/// Errors surfaced by this crate.
pub mod error;

pub use block_store::{BlockStore, MemoryBlockStore};
pub use cache::NodeCache;
pub use codec::{Codec, DagCborCodec};
pub use error::StoreError;
pub use hasher::{Hasher, Sha256Hasher};
pub use store::NodeStore;
