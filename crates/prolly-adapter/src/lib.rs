//! # prolly-adapter
//!
//! A minimal two-interface adapter presenting a [`ProllyTree`] to a larger
//! polymorphic data graph: [`Map`] for typed key/value lookup, and
//! [`Substrate`] for opaque, codec-agnostic traversal by a caller that only
//! knows the tree as a generic linked record. One concrete type implements
//! both — no dynamic node-kind dispatch is needed.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use prolly_tree::{ProllyTree, TreeError};

/// A typed, ordered key/value view over a tree.
pub trait Map {
    /// Look up `key`, returning `None` rather than an error when absent.
    fn lookup(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TreeError>;

    /// Iterate every entry in ascending key order.
    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TreeError>;
}

/// An opaque, generic-traversal view: the serialized bytes of the current
/// root record, decodable by anything that understands the tree's codec
/// without knowing it is a prolly tree specifically.
pub trait Substrate {
    /// The encoded bytes of the current root node.
    fn substrate(&self) -> Result<Vec<u8>, TreeError>;
}

impl Map for ProllyTree {
    fn lookup(&self, key: &[u8]) -> Result<Option<Vec<u8>>, TreeError> {
        match self.get(key) {
            Ok(value) => Ok(Some(value)),
            Err(TreeError::KeyNotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn entries(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, TreeError> {
        self.iter()?.collect()
    }
}

impl Substrate for ProllyTree {
    fn substrate(&self) -> Result<Vec<u8>, TreeError> {
        self.root_bytes()
    }
}
