//! Raw byte storage keyed by digest.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StoreError;

/// Content-addressed byte storage. Implementations need not be aware of the
/// record shapes above them — they persist and retrieve opaque blocks keyed
/// by the raw digest bytes of a [`prolly_types::Link`].
pub trait BlockStore: Send + Sync {
    /// Fetch the bytes for `digest`, or `None` if absent.
    fn get(&self, digest: &[u8]) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `bytes` under `digest`. Writing the same digest twice with the
    /// same bytes is a no-op; callers never write the same digest with
    /// different bytes because the digest is a hash of the bytes.
    fn put(&self, digest: Vec<u8>, bytes: Vec<u8>) -> Result<(), StoreError>;
}

/// An in-memory block store backed by a `RwLock<HashMap>`. Intended for
/// tests and for embedding behind a real backend during development; holds
/// every block ever written for the process lifetime.
#[derive(Debug, Default)]
pub struct MemoryBlockStore {
    blocks: RwLock<HashMap<Vec<u8>, Arc<[u8]>>>,
}

impl MemoryBlockStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blocks currently held.
    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    /// Whether the store holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlockStore for MemoryBlockStore {
    fn get(&self, digest: &[u8]) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.blocks.read().get(digest).map(|b| b.to_vec()))
    }

    fn put(&self, digest: Vec<u8>, bytes: Vec<u8>) -> Result<(), StoreError> {
        self.blocks.write().entry(digest).or_insert_with(|| Arc::from(bytes));
        Ok(())
    }
}
