//! Error types for the foundation layer.

/// Errors raised while validating or interpreting a [`crate::TreeConfig`].
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum TypesError {
    /// A config field violates a structural invariant (e.g. `min_node_size >= max_node_size`).
    #[error("invalid config: {reason}")]
    InvalidConfig {
        /// Human-readable description of which invariant failed.
        reason: String,
    },

    /// The config names a splitter strategy this build does not implement.
    #[error("unsupported splitter strategy tag: {tag}")]
    UnsupportedStrategy {
        /// The raw strategy tag byte from the config record.
        tag: u8,
    },
}

impl TypesError {
    /// Build an [`TypesError::InvalidConfig`] from any displayable reason.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}
