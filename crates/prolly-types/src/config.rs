//! Tree configuration: node size caps and splitter strategy selection.

use crate::error::TypesError;
use crate::link::NodeCodecPrefix;

/// Default floor for `min_node_size`, reproduced from the reference defaults.
pub const DEFAULT_MIN_NODE_SIZE: usize = 512;
/// Default cap for `max_node_size`.
pub const DEFAULT_MAX_NODE_SIZE: usize = 4096;
/// Default cap for `max_pairs_per_node`.
pub const DEFAULT_MAX_PAIRS_PER_NODE: usize = 1000;
/// Default chunking factor `k`: boundary probability is `2^-k`.
pub const DEFAULT_CHUNKING_FACTOR: u8 = 10;

/// Which splitter variant a [`TreeConfig`] selects.
///
/// Only [`ChunkStrategy::SuffixThreshold`] is implemented; the others are
/// recognized so that configs written by a future version of this library
/// round-trip, but constructing a splitter for them fails with
/// [`TypesError::UnsupportedStrategy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum ChunkStrategy {
    /// Hash-suffix threshold: boundary iff `hash(key ++ value) & mask == 0`.
    SuffixThreshold = 0,
    /// Weibull-distributed boundary probability. Not yet implemented.
    Weibull = 1,
    /// Rolling-hash content-defined chunking. Not yet implemented.
    RollingHash = 2,
}

impl ChunkStrategy {
    /// Decode a strategy tag byte, returning `None` for unrecognized values.
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::SuffixThreshold),
            1 => Some(Self::Weibull),
            2 => Some(Self::RollingHash),
            _ => None,
        }
    }

    /// The raw tag byte for this strategy.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Per-strategy knobs. Carried as a tagged union so a config round-trips
/// even when this build only implements one variant.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum StrategyParams {
    /// Parameters for [`ChunkStrategy::SuffixThreshold`].
    SuffixThreshold {
        /// Boundary probability is `2^-chunking_factor`.
        chunking_factor: u8,
    },
    /// Parameters for [`ChunkStrategy::Weibull`] (unimplemented).
    Weibull {
        /// Shape parameter.
        k: f64,
        /// Scale parameter.
        lambda: f64,
    },
    /// Parameters for [`ChunkStrategy::RollingHash`] (unimplemented).
    RollingHash {
        /// Rolling window size in bytes.
        window: usize,
    },
}

impl StrategyParams {
    /// The [`ChunkStrategy`] tag this parameter set belongs to.
    pub fn strategy(&self) -> ChunkStrategy {
        match self {
            Self::SuffixThreshold { .. } => ChunkStrategy::SuffixThreshold,
            Self::Weibull { .. } => ChunkStrategy::Weibull,
            Self::RollingHash { .. } => ChunkStrategy::RollingHash,
        }
    }
}

/// Byte and entry caps, plus splitter strategy, that every node in a tree is
/// built under. Persisted once per tree and referenced by every node
/// indirectly through the root descriptor.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct TreeConfig {
    /// Minimum accumulated bytes before a boundary may fire (the "floor").
    pub min_node_size: usize,
    /// Maximum encoded bytes a node may hold before a boundary is forced.
    pub max_node_size: usize,
    /// Maximum pairs a node may hold before a boundary is forced.
    pub max_pairs_per_node: usize,
    /// Which splitter variant to use.
    pub strategy_tag: ChunkStrategy,
    /// Knobs for the selected strategy.
    pub strategy_params: StrategyParams,
    /// Codec/hash-algorithm/version/length used for every block in this tree.
    pub node_codec_prefix: NodeCodecPrefix,
}

impl TreeConfig {
    /// Validate the structural invariants this config must satisfy: size caps
    /// are ordered sensibly, and the strategy tag matches the strategy
    /// params' variant.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.min_node_size >= self.max_node_size {
            return Err(TypesError::invalid_config(format!(
                "min_node_size ({}) must be < max_node_size ({})",
                self.min_node_size, self.max_node_size
            )));
        }
        if self.max_pairs_per_node == 0 {
            return Err(TypesError::invalid_config(
                "max_pairs_per_node must be > 0",
            ));
        }
        if self.strategy_params.strategy() != self.strategy_tag {
            return Err(TypesError::invalid_config(format!(
                "strategy_tag {:?} does not match strategy_params variant {:?}",
                self.strategy_tag,
                self.strategy_params.strategy()
            )));
        }
        let native = self.node_codec_prefix.hash_algo.native_length();
        if self.node_codec_prefix.hash_length > native {
            return Err(TypesError::invalid_config(format!(
                "hash_length ({}) exceeds the native digest length of {:?} ({})",
                self.node_codec_prefix.hash_length, self.node_codec_prefix.hash_algo, native
            )));
        }
        Ok(())
    }

    /// Two configs are equal iff every scalar field and the active
    /// strategy-params variant agree field-for-field. This is exactly
    /// `PartialEq`, spelled out because `Diff`/`Merge` rely on it being a
    /// precondition check rather than an incidental derive.
    pub fn configs_match(&self, other: &Self) -> bool {
        self == other
    }

    /// Parse a config from a TOML document using the same field names as the
    /// in-memory struct, then validate it.
    pub fn from_toml(src: &str) -> Result<Self, TypesError> {
        let cfg: Self = toml::from_str(src)
            .map_err(|e| TypesError::invalid_config(format!("toml parse error: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Serialize this config to a TOML document.
    pub fn to_toml(&self) -> Result<String, TypesError> {
        toml::to_string_pretty(self)
            .map_err(|e| TypesError::invalid_config(format!("toml serialize error: {e}")))
    }
}

impl Default for TreeConfig {
    /// The defaults from the spec: 512/4096/1000 size caps, hash-suffix
    /// threshold splitting with `chunking_factor = 10`, DAG-CBOR over SHA-256
    /// truncated to 20 bytes.
    fn default() -> Self {
        Self {
            min_node_size: DEFAULT_MIN_NODE_SIZE,
            max_node_size: DEFAULT_MAX_NODE_SIZE,
            max_pairs_per_node: DEFAULT_MAX_PAIRS_PER_NODE,
            strategy_tag: ChunkStrategy::SuffixThreshold,
            strategy_params: StrategyParams::SuffixThreshold {
                chunking_factor: DEFAULT_CHUNKING_FACTOR,
            },
            node_codec_prefix: NodeCodecPrefix::default_prefix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        TreeConfig::default().validate().unwrap();
    }

    #[test]
    fn rejects_inverted_size_bounds() {
        let mut cfg = TreeConfig::default();
        cfg.min_node_size = cfg.max_node_size;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_mismatched_strategy_params() {
        let mut cfg = TreeConfig::default();
        cfg.strategy_tag = ChunkStrategy::Weibull;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn toml_round_trip_preserves_equality() {
        let cfg = TreeConfig::default();
        let toml = cfg.to_toml().unwrap();
        let parsed = TreeConfig::from_toml(&toml).unwrap();
        assert!(cfg.configs_match(&parsed));
    }
}
