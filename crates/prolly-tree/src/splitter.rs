//! Deterministic, content-defined node boundary decisions.

use prolly_types::{ChunkStrategy, StrategyParams, TreeConfig};
use sha2::{Digest, Sha256};

use crate::error::TreeError;

/// An append-only decision stream over `(key, value_bytes)` pairs.
///
/// After `append` reports a boundary via [`Splitter::is_boundary`], the
/// caller must call [`Splitter::reset`] before appending again; appending
/// without resetting after a boundary is a programmer error.
pub trait Splitter: Send {
    /// Feed the next pair and update the running decision.
    fn append(&mut self, key: &[u8], value_bytes: &[u8]) -> Result<(), TreeError>;

    /// Whether the pair just appended closes the current node.
    fn is_boundary(&self) -> bool;

    /// Clear running state after a boundary, readying the splitter for the
    /// next node.
    fn reset(&mut self);
}

/// Build the splitter named by `strategy`, using `params` for its knobs.
///
/// Returns [`TreeError::UnsupportedStrategy`] for any strategy besides
/// [`ChunkStrategy::SuffixThreshold`], which is the only variant this crate
/// implements.
pub fn build_splitter(config: &TreeConfig) -> Result<Box<dyn Splitter>, TreeError> {
    match (&config.strategy_tag, &config.strategy_params) {
        (ChunkStrategy::SuffixThreshold, StrategyParams::SuffixThreshold { chunking_factor }) => {
            Ok(Box::new(SuffixThresholdSplitter::new(
                config.min_node_size,
                config.max_pairs_per_node,
                *chunking_factor,
            )))
        }
        (tag, _) => Err(TreeError::UnsupportedStrategy(*tag)),
    }
}

/// The default splitter: a pair is a boundary iff the low bits of
/// `hash(key ++ value)` are all zero, subject to a pair-count cap (always
/// wins) and a byte-size floor (suppresses the hash rule until met).
pub struct SuffixThresholdSplitter {
    min_node_size: usize,
    max_pairs_per_node: usize,
    mask: u64,
    total_bytes: usize,
    total_pairs: usize,
    boundary: bool,
    needs_reset: bool,
}

impl SuffixThresholdSplitter {
    /// A splitter with boundary probability `2^-chunking_factor`, subject to
    /// `min_node_size` (floor) and `max_pairs_per_node` (hard cap).
    pub fn new(min_node_size: usize, max_pairs_per_node: usize, chunking_factor: u8) -> Self {
        let mask = (1u64 << chunking_factor.min(63)) - 1;
        Self {
            min_node_size,
            max_pairs_per_node,
            mask,
            total_bytes: 0,
            total_pairs: 0,
            boundary: false,
            needs_reset: false,
        }
    }

    fn suffix_hash(key: &[u8], value_bytes: &[u8]) -> u64 {
        let mut hasher = Sha256::new();
        hasher.update(key);
        hasher.update(value_bytes);
        let digest = hasher.finalize();
        u64::from_le_bytes(digest[0..8].try_into().expect("sha256 digest is 32 bytes"))
    }
}

impl Splitter for SuffixThresholdSplitter {
    fn append(&mut self, key: &[u8], value_bytes: &[u8]) -> Result<(), TreeError> {
        if self.needs_reset {
            return Err(TreeError::SplitterNotReset);
        }
        self.total_bytes += key.len() + value_bytes.len();
        self.total_pairs += 1;

        self.boundary = if self.total_pairs >= self.max_pairs_per_node {
            true
        } else if self.total_bytes < self.min_node_size {
            false
        } else {
            Self::suffix_hash(key, value_bytes) & self.mask == 0
        };
        if self.boundary {
            self.needs_reset = true;
        }
        Ok(())
    }

    fn is_boundary(&self) -> bool {
        self.boundary
    }

    fn reset(&mut self) {
        self.total_bytes = 0;
        self.total_pairs = 0;
        self.boundary = false;
        self.needs_reset = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_cap_forces_a_boundary() {
        let mut s = SuffixThresholdSplitter::new(0, 2, 63);
        s.append(b"a", b"1").unwrap();
        assert!(!s.is_boundary());
        s.append(b"b", b"2").unwrap();
        assert!(s.is_boundary());
    }

    #[test]
    fn byte_floor_suppresses_hash_boundary() {
        let mut s = SuffixThresholdSplitter::new(10_000, usize::MAX, 0);
        s.append(b"a", b"1").unwrap();
        assert!(!s.is_boundary());
    }

    #[test]
    fn chunking_factor_zero_always_splits_above_floor() {
        let mut s = SuffixThresholdSplitter::new(0, usize::MAX, 0);
        s.append(b"a", b"1").unwrap();
        assert!(s.is_boundary());
    }

    #[test]
    fn decision_is_deterministic_for_the_same_input() {
        let mut a = SuffixThresholdSplitter::new(0, usize::MAX, 4);
        let mut b = SuffixThresholdSplitter::new(0, usize::MAX, 4);
        a.append(b"key", b"value").unwrap();
        b.append(b"key", b"value").unwrap();
        assert_eq!(a.is_boundary(), b.is_boundary());
    }

    #[test]
    fn append_without_reset_after_boundary_is_an_error() {
        let mut s = SuffixThresholdSplitter::new(0, 1, 63);
        s.append(b"a", b"1").unwrap();
        assert!(s.is_boundary());
        assert!(s.append(b"b", b"2").is_err());
    }

    #[test]
    fn reset_clears_running_state() {
        let mut s = SuffixThresholdSplitter::new(0, 1, 63);
        s.append(b"a", b"1").unwrap();
        s.reset();
        assert!(!s.is_boundary());
        s.append(b"b", b"2").unwrap();
        assert!(s.is_boundary());
    }

    #[test]
    fn unsupported_strategy_is_rejected_at_build_time() {
        let mut cfg = TreeConfig::default();
        cfg.strategy_tag = ChunkStrategy::Weibull;
        cfg.strategy_params = StrategyParams::Weibull { k: 1.0, lambda: 1.0 };
        assert!(matches!(
            build_splitter(&cfg),
            Err(TreeError::UnsupportedStrategy(ChunkStrategy::Weibull))
        ));
    }
}
