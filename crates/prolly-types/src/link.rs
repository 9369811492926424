//! Content identifiers.
//!
//! A [`Link`] names a stored block by the hash of its serialized bytes,
//! tagged with the codec and hash algorithm used to produce it. The tags are
//! drawn from the same numeric space as the multicodec/multihash registries
//! so that a link remains self-describing if it is ever exchanged with a
//! system that understands that registry, without this crate depending on
//! it directly.

use std::fmt;

/// Multicodec id of the record's serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[repr(u64)]
pub enum CodecId {
    /// DAG-CBOR, the default node and config encoding.
    DagCbor = 0x71,
    /// Raw bytes, used only for fixtures and tests.
    Raw = 0x55,
}

impl CodecId {
    /// Decode a codec id from its raw multicodec number.
    pub fn from_u64(v: u64) -> Option<Self> {
        match v {
            0x71 => Some(Self::DagCbor),
            0x55 => Some(Self::Raw),
            _ => None,
        }
    }
}

/// Multihash id of the hash function used to produce a [`Link`]'s digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[repr(u64)]
pub enum HashAlgo {
    /// SHA-256, the default and only algorithm implemented by this crate.
    Sha256 = 0x12,
}

impl HashAlgo {
    /// Decode a hash algorithm id from its raw multihash number.
    pub fn from_u64(v: u64) -> Option<Self> {
        match v {
            0x12 => Some(Self::Sha256),
            _ => None,
        }
    }

    /// The native digest length this algorithm produces, before any
    /// configured truncation is applied.
    pub fn native_length(self) -> usize {
        match self {
            Self::Sha256 => 32,
        }
    }
}

/// The codec/hash-algorithm/version/length tuple every node, root descriptor,
/// and config block is written and read with.
///
/// Two prefixes are equal iff all four fields match; this is exactly the
/// equality the tree configuration's `node_codec_prefix` field needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NodeCodecPrefix {
    /// Link format version (currently always `1`).
    pub version: u8,
    /// Codec used to serialize the logical record.
    pub codec: CodecId,
    /// Hash algorithm used to digest the serialized bytes.
    pub hash_algo: HashAlgo,
    /// Number of digest bytes retained (may truncate the algorithm's native output).
    pub hash_length: usize,
}

impl NodeCodecPrefix {
    /// The default prefix reproduced in the spec: DAG-CBOR, SHA-256, version 1,
    /// truncated to 20 digest bytes.
    pub const fn default_prefix() -> Self {
        Self {
            version: 1,
            codec: CodecId::DagCbor,
            hash_algo: HashAlgo::Sha256,
            hash_length: 20,
        }
    }
}

impl Default for NodeCodecPrefix {
    fn default() -> Self {
        Self::default_prefix()
    }
}

/// A content identifier: the codec/hash-algorithm tag plus the (possibly
/// truncated) digest bytes of a stored block.
#[derive(Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Link {
    /// Link format version.
    pub version: u8,
    /// Codec of the record this link addresses.
    pub codec: CodecId,
    /// Hash algorithm used to produce `digest`.
    pub hash_algo: HashAlgo,
    /// The (possibly truncated) digest bytes.
    #[serde(with = "serde_bytes")]
    pub digest: Vec<u8>,
}

impl Link {
    /// Construct a link from a prefix and already-computed digest bytes.
    ///
    /// `digest` must already be truncated to `prefix.hash_length`.
    pub fn new(prefix: &NodeCodecPrefix, digest: Vec<u8>) -> Self {
        debug_assert_eq!(digest.len(), prefix.hash_length);
        Self {
            version: prefix.version,
            codec: prefix.codec,
            hash_algo: prefix.hash_algo,
            digest,
        }
    }

    /// The prefix this link was produced with.
    pub fn prefix(&self) -> NodeCodecPrefix {
        NodeCodecPrefix {
            version: self.version,
            codec: self.codec,
            hash_algo: self.hash_algo,
            hash_length: self.digest.len(),
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Link")
            .field("version", &self.version)
            .field("codec", &self.codec)
            .field("hash_algo", &self.hash_algo)
            .field("digest", &hex::encode(&self.digest))
            .finish()
    }
}

impl fmt::Display for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "b{}{}", self.version, hex::encode(&self.digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_roundtrip() {
        let prefix = NodeCodecPrefix::default_prefix();
        let link = Link::new(&prefix, vec![0u8; prefix.hash_length]);
        assert_eq!(link.prefix(), prefix);
    }

    #[test]
    fn links_with_equal_fields_are_equal() {
        let prefix = NodeCodecPrefix::default_prefix();
        let a = Link::new(&prefix, vec![1u8; 20]);
        let b = Link::new(&prefix, vec![1u8; 20]);
        assert_eq!(a, b);
    }

    #[test]
    fn codec_ids_round_trip_through_u64() {
        assert_eq!(CodecId::from_u64(0x71), Some(CodecId::DagCbor));
        assert_eq!(HashAlgo::from_u64(0x12), Some(HashAlgo::Sha256));
        assert_eq!(CodecId::from_u64(0xff), None);
    }
}
