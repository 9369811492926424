//! Digest functions used to address stored blocks.

use prolly_types::HashAlgo;
use sha2::{Digest, Sha256};

/// Produces the native-length digest of a block's serialized bytes.
///
/// Implementors report the [`HashAlgo`] they compute so a [`crate::store::NodeStore`]
/// can stamp links correctly; truncation to the configured `hash_length` is
/// the store's responsibility, not the hasher's.
pub trait Hasher: Send + Sync {
    /// Which [`HashAlgo`] this hasher computes.
    fn algo(&self) -> HashAlgo;

    /// Digest `bytes`, returning `self.algo().native_length()` bytes.
    fn digest(&self, bytes: &[u8]) -> Vec<u8>;
}

/// SHA-256 via the `sha2` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn algo(&self) -> HashAlgo {
        HashAlgo::Sha256
    }

    fn digest(&self, bytes: &[u8]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hasher.finalize().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_has_native_length() {
        let h = Sha256Hasher;
        let d = h.digest(b"hello world");
        assert_eq!(d.len(), HashAlgo::Sha256.native_length());
    }

    #[test]
    fn digest_is_deterministic() {
        let h = Sha256Hasher;
        assert_eq!(h.digest(b"abc"), h.digest(b"abc"));
    }
}
