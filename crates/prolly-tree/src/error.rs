//! Errors surfaced by tree operations.

/// Failures raised by the splitter, framework, cursor, and tree facade.
#[derive(Debug, thiserror::Error)]
pub enum TreeError {
    /// `get`/`proof` found no entry for the requested key.
    #[error("key not found")]
    KeyNotFound,

    /// Two trees (or a tree and a mutation) were compared or combined under
    /// mismatched configuration.
    #[error("config mismatch")]
    ConfigMismatch,

    /// An operation that requires a finished buffer was attempted while a
    /// mutation is still pending.
    #[error("mutation in progress")]
    MutationInProgress,

    /// A mutation batch entry referenced a key in a way its op forbids (e.g.
    /// `Add` on a key already present, `Modify`/`Remove` on a missing key).
    #[error("invalid mutation: {0}")]
    InvalidMutation(String),

    /// The config names a splitter strategy not implemented by this build.
    #[error("unsupported chunking strategy: {0:?}")]
    UnsupportedStrategy(prolly_types::ChunkStrategy),

    /// A single key/value pair does not fit within `max_node_size` even in
    /// an otherwise-empty node.
    #[error("pair exceeds max_node_size")]
    OversizedPair,

    /// Two cursors were compared that do not share the same path length.
    #[error("cursor height mismatch")]
    CursorHeightMismatch,

    /// A splitter had `append` called again without an intervening `reset`
    /// after reporting a boundary.
    #[error("splitter appended to without reset after a boundary")]
    SplitterNotReset,

    /// Propagated from the node store.
    #[error(transparent)]
    Store(#[from] prolly_store::StoreError),

    /// Propagated from the types crate (config validation, etc).
    #[error(transparent)]
    Types(#[from] prolly_types::TypesError),
}
