//! A sorted, key-deduplicated batch of pending edits.

use std::collections::HashMap;

use prolly_types::CompareFn;

use crate::error::TreeError;

/// The kind of edit a [`Mutation`] represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// Insert a key that must not already be present.
    Add,
    /// Replace the value of a key that must already be present.
    Modify,
    /// Remove a key that must already be present.
    Remove,
}

/// A single pending edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    /// The key this edit applies to.
    pub key: Vec<u8>,
    /// The new value. `None` for [`Op::Remove`].
    pub value: Option<Vec<u8>>,
    /// Which edit this is.
    pub op: Op,
}

impl Mutation {
    /// An `Add` mutation.
    pub fn add(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            op: Op::Add,
        }
    }

    /// A `Modify` mutation.
    pub fn modify(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: Some(value.into()),
            op: Op::Modify,
        }
    }

    /// A `Remove` mutation.
    pub fn remove(key: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: None,
            op: Op::Remove,
        }
    }
}

/// Accepts edits in any order, de-duplicating on key (last write wins), and
/// produces them sorted ascending once [`MutationBuffer::finish`] is called.
///
/// Adds are accepted until `finish()`; `finish()` is idempotent and further
/// adds after it are rejected.
#[derive(Default)]
pub struct MutationBuffer {
    staged: HashMap<Vec<u8>, Mutation>,
    finished: Option<Vec<Mutation>>,
}

impl MutationBuffer {
    /// An empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a mutation, replacing any prior mutation for the same key.
    ///
    /// # Errors
    /// [`TreeError::MutationInProgress`] — renamed here to mean "buffer
    /// already finished" — if called after [`Self::finish`].
    pub fn push(&mut self, mutation: Mutation) -> Result<(), TreeError> {
        if self.finished.is_some() {
            return Err(TreeError::InvalidMutation(
                "push called on a finished mutation buffer".to_string(),
            ));
        }
        self.staged.insert(mutation.key.clone(), mutation);
        Ok(())
    }

    /// Whether the buffer has been finished.
    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    /// Look up a still-staged (not yet finished) mutation by key.
    pub fn staged_get(&self, key: &[u8]) -> Option<&Mutation> {
        self.staged.get(key)
    }

    /// Sort the staged mutations ascending by key under `cmp`. Idempotent:
    /// calling this again re-sorts the already-finished set rather than
    /// accepting new pushes.
    pub fn finish(&mut self, cmp: CompareFn) -> &[Mutation] {
        if self.finished.is_none() {
            let mut sorted: Vec<Mutation> = self.staged.drain().map(|(_, m)| m).collect();
            sorted.sort_by(|a, b| cmp(&a.key, &b.key));
            self.finished = Some(sorted);
        }
        self.finished.as_deref().unwrap_or(&[])
    }

    /// The finished, ascending-key mutation list.
    ///
    /// # Panics
    /// Panics if [`Self::finish`] has not been called.
    pub fn mutations(&self) -> &[Mutation] {
        self.finished
            .as_deref()
            .expect("mutations() called before finish()")
    }
}
