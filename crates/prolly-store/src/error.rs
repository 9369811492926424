//! Errors surfaced by the node store.

/// Failures from the persistence and codec boundary.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying block store failed to read or write bytes.
    #[error("block store I/O error: {0}")]
    Io(String),

    /// A link resolved to no bytes in the block store, even though the
    /// caller expected it to be present (content-addressed mappings are
    /// stable once written, so this indicates the block was never written
    /// or the store lost it).
    #[error("block not found for link {0}")]
    BlockNotFound(String),

    /// Encoding or decoding a record failed.
    #[error("codec error: {0}")]
    Codec(String),

    /// The config names a splitter strategy this build does not implement.
    #[error(transparent)]
    Types(#[from] prolly_types::TypesError),
}
