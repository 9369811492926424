//! The `ProllyTree` facade: get, range, mutate/rebuild, diff, merge, proof.

use std::cmp::Ordering;
use std::sync::Arc;

use prolly_store::NodeStore;
use prolly_types::{lexicographic, CompareFn, Link, RootDescriptor, TreeConfig};
use tracing::{debug, info};

use crate::cursor::Cursor;
use crate::error::TreeError;
use crate::framework::Framework;
use crate::iterator::{CancellationToken, RangeIter, NEVER_CANCEL};
use crate::mutation::{Mutation, MutationBuffer, Op};
use crate::proof::{verify, Proof};

/// A probabilistic, content-addressed ordered map over a [`NodeStore`].
///
/// Holds the current root and config links plus, while a mutation is being
/// assembled, the pending [`MutationBuffer`]. Only one mutation may be
/// in-flight at a time; most read operations reject while it is pending.
pub struct ProllyTree {
    store: Arc<NodeStore>,
    config: TreeConfig,
    cmp: CompareFn,
    root_link: Link,
    config_link: Link,
    descriptor_link: Link,
    buffer: Option<MutationBuffer>,
}

impl ProllyTree {
    /// Build a new tree from an ordered or unordered stream of `(key,
    /// value)` pairs (the framework sorts nothing — callers wanting a
    /// specific key order should sort first; two permutations of the same
    /// set converge to the same root regardless).
    pub fn build(
        store: Arc<NodeStore>,
        config: TreeConfig,
        cmp: CompareFn,
        pairs: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    ) -> Result<Self, TreeError> {
        config.validate()?;
        let mut framework = Framework::new(store.clone(), config.clone(), cmp)?;
        framework.append_batch(pairs)?;
        let root_link = framework.finish()?;
        let config_link = store.write_config(&config)?;
        let descriptor = RootDescriptor {
            root_link: root_link.clone(),
            config_link: config_link.clone(),
        };
        let descriptor_link = store.write_tree(&descriptor)?;
        info!(%descriptor_link, %root_link, "built tree");
        Ok(Self {
            store,
            config,
            cmp,
            root_link,
            config_link,
            descriptor_link,
            buffer: None,
        })
    }

    /// Build a tree with the default, byte-lexicographic comparator.
    pub fn build_lexicographic(
        store: Arc<NodeStore>,
        config: TreeConfig,
        pairs: impl IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    ) -> Result<Self, TreeError> {
        Self::build(store, config, lexicographic, pairs)
    }

    /// Load a tree from its root descriptor link.
    pub fn open(store: Arc<NodeStore>, descriptor_link: Link, cmp: CompareFn) -> Result<Self, TreeError> {
        let descriptor = store.read_tree(&descriptor_link)?;
        let config = store.read_config(&descriptor.config_link)?;
        Ok(Self {
            store,
            config,
            cmp,
            root_link: descriptor.root_link,
            config_link: descriptor.config_link,
            descriptor_link,
            buffer: None,
        })
    }

    /// The link to this tree's root descriptor block.
    pub fn descriptor_link(&self) -> &Link {
        &self.descriptor_link
    }

    /// The link to this tree's current root node.
    pub fn root_link(&self) -> &Link {
        &self.root_link
    }

    /// The configuration this tree was built under.
    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// The encoded bytes of the current root node, for opaque traversal by
    /// a caller that only knows this as a generic linked record.
    pub fn root_bytes(&self) -> Result<Vec<u8>, TreeError> {
        let node = self.store.read_node(&self.root_link)?;
        Ok(self.store.encode_node(&node)?)
    }

    /// Whether a mutation buffer is currently open.
    pub fn is_mutating(&self) -> bool {
        self.buffer.is_some()
    }

    /// Look up `key`. A pending Add/Modify shadows the stored tree; a
    /// pending Remove shadows it with [`TreeError::KeyNotFound`].
    pub fn get(&self, key: &[u8]) -> Result<Vec<u8>, TreeError> {
        if let Some(buffer) = &self.buffer {
            if let Some(pending) = pending_mutation_for(buffer, key, self.cmp) {
                return match pending.op {
                    Op::Add | Op::Modify => Ok(pending
                        .value
                        .clone()
                        .expect("Add/Modify mutations always carry a value")),
                    Op::Remove => Err(TreeError::KeyNotFound),
                };
            }
        }
        let cursor = Cursor::at_item(&self.store, &self.root_link, key, self.cmp)?;
        if cursor.is_valid() && (self.cmp)(cursor.key(), key) == Ordering::Equal {
            Ok(cursor.value().to_vec())
        } else {
            Err(TreeError::KeyNotFound)
        }
    }

    /// A lazy, ascending-order scan from `start` (or the first key, if
    /// `None`) through `end` inclusive (or the last key, if `None`).
    pub fn range<'a>(
        &self,
        start: Option<&[u8]>,
        end: Option<Vec<u8>>,
        cancel: &'a dyn CancellationToken,
    ) -> Result<RangeIter<'a>, TreeError> {
        let cursor = match start {
            Some(key) => Cursor::at_item(&self.store, &self.root_link, key, self.cmp)?,
            None => Cursor::at_start(&self.store, &self.root_link)?,
        };
        Ok(RangeIter::new(self.store.clone(), cursor, self.cmp, end, cancel))
    }

    /// A full-span scan with no cancellation.
    pub fn iter(&self) -> Result<RangeIter<'static>, TreeError> {
        self.range(None, None, &NEVER_CANCEL)
    }

    /// Begin (or continue) assembling a batch of edits. Must be followed by
    /// [`Self::rebuild`] before most other operations are accepted again.
    pub fn mutate(&mut self) -> &mut MutationBuffer {
        self.buffer.get_or_insert_with(MutationBuffer::new)
    }

    /// Apply the pending mutation buffer, producing a new root. An empty
    /// batch reproduces the existing root link unchanged (idempotent
    /// rebuild).
    ///
    /// Seeds a [`Framework`] at a cursor seeked to the first mutation, then
    /// walks the mutation list applying each edit and stitching the
    /// unchanged span up to the next mutation's key back in by reattaching
    /// whole untouched subtrees by link (see [`Framework::seed`] and
    /// [`Framework::append_to_cursor`]) — only the nodes on the path to each
    /// mutated key are ever re-read or re-split (SPEC_FULL.md §4.6).
    pub fn rebuild(&mut self) -> Result<(), TreeError> {
        let mut buffer = self.buffer.take().ok_or_else(|| {
            TreeError::InvalidMutation("rebuild called with no pending mutation buffer".to_string())
        })?;
        buffer.finish(self.cmp);
        let mutations = buffer.mutations().to_vec();
        if mutations.is_empty() {
            return Ok(());
        }

        let mut cursor = Cursor::at_item(&self.store, &self.root_link, &mutations[0].key, self.cmp)?;
        let mut framework = Framework::new(self.store.clone(), self.config.clone(), self.cmp)?;
        framework.seed(&cursor)?;

        for (i, m) in mutations.iter().enumerate() {
            let cursor_on_key = cursor.is_valid() && (self.cmp)(cursor.key(), &m.key) == Ordering::Equal;
            match m.op {
                Op::Add => {
                    if cursor_on_key {
                        return Err(TreeError::InvalidMutation(format!(
                            "Add on a key already present: {:?}",
                            m.key
                        )));
                    }
                    framework.append(m.key.clone(), m.value.clone().expect("Add always carries a value"))?;
                }
                Op::Modify => {
                    if !cursor_on_key {
                        return Err(TreeError::InvalidMutation(format!(
                            "Modify on a missing key: {:?}",
                            m.key
                        )));
                    }
                    framework.append(m.key.clone(), m.value.clone().expect("Modify always carries a value"))?;
                    cursor.advance(&self.store)?;
                }
                Op::Remove => {
                    if !cursor_on_key {
                        return Err(TreeError::InvalidMutation(format!(
                            "Remove on a missing key: {:?}",
                            m.key
                        )));
                    }
                    cursor.advance(&self.store)?;
                }
            }

            let bound = mutations.get(i + 1).map(|next| next.key.as_slice());
            framework.append_to_cursor(&mut cursor, bound, &self.store)?;
        }

        let new_root = framework.finish()?;
        let descriptor = RootDescriptor {
            root_link: new_root.clone(),
            config_link: self.config_link.clone(),
        };
        let descriptor_link = self.store.write_tree(&descriptor)?;
        info!(old_root = %self.root_link, new_root = %new_root, mutations = mutations.len(), "rebuilt tree");
        self.root_link = new_root;
        self.descriptor_link = descriptor_link;
        Ok(())
    }

    /// An inclusion proof for `key`.
    ///
    /// # Errors
    /// [`TreeError::MutationInProgress`] if a mutation buffer is open;
    /// [`TreeError::KeyNotFound`] if the key is absent.
    pub fn proof(&self, key: &[u8]) -> Result<Proof, TreeError> {
        if self.buffer.is_some() {
            return Err(TreeError::MutationInProgress);
        }
        let cursor = Cursor::at_item(&self.store, &self.root_link, key, self.cmp)?;
        if !cursor.is_valid() || (self.cmp)(cursor.key(), key) != Ordering::Equal {
            return Err(TreeError::KeyNotFound);
        }
        Ok(Proof::from_cursor(&cursor, &self.root_link, self.descriptor_link.clone()))
    }

    /// Verify `proof` attests `(key, value)` under this tree's current root
    /// descriptor.
    pub fn verify(&self, proof: &Proof, key: &[u8], value: &[u8]) -> Result<bool, TreeError> {
        verify(proof, key, value, &self.descriptor_link, &self.store)
    }

    /// Structurally diff `self` (base) against `other`, yielding the
    /// ascending-key mutation stream that would turn `self`'s entries into
    /// `other`'s — additive only: keys present only in `self` are not
    /// reported as removals.
    ///
    /// # Errors
    /// [`TreeError::ConfigMismatch`] if the two trees were built under
    /// different configurations.
    pub fn diff(&self, other: &ProllyTree) -> Result<Vec<Mutation>, TreeError> {
        if !self.config.configs_match(&other.config) {
            return Err(TreeError::ConfigMismatch);
        }
        if self.root_link == other.root_link {
            info!(base_root = %self.root_link, other_root = %other.root_link, mutations = 0, "diffed tree: roots identical");
            return Ok(Vec::new());
        }
        let mut base = Cursor::at_start(&self.store, &self.root_link)?;
        let mut other_cursor = Cursor::at_start(&self.store, &other.root_link)?;
        let mut mutations = Vec::new();

        loop {
            match (base.is_valid(), other_cursor.is_valid()) {
                (false, false) | (true, false) => break,
                (false, true) => {
                    while other_cursor.is_valid() {
                        debug!(key = ?other_cursor.key(), "diff: add (base exhausted)");
                        mutations.push(Mutation::add(
                            other_cursor.key().to_vec(),
                            other_cursor.value().to_vec(),
                        ));
                        other_cursor.advance(&self.store)?;
                    }
                    break;
                }
                (true, true) => match (self.cmp)(base.key(), other_cursor.key()) {
                    Ordering::Less => base.advance(&self.store)?,
                    Ordering::Greater => {
                        debug!(key = ?other_cursor.key(), "diff: add");
                        mutations.push(Mutation::add(
                            other_cursor.key().to_vec(),
                            other_cursor.value().to_vec(),
                        ));
                        other_cursor.advance(&self.store)?;
                    }
                    Ordering::Equal => {
                        if base.value() == other_cursor.value() {
                            base.skip_common(&mut other_cursor, &self.store)?;
                        } else {
                            debug!(key = ?other_cursor.key(), "diff: modify");
                            mutations.push(Mutation::modify(
                                other_cursor.key().to_vec(),
                                other_cursor.value().to_vec(),
                            ));
                            base.advance(&self.store)?;
                            other_cursor.advance(&self.store)?;
                        }
                    }
                },
            }
        }
        info!(base_root = %self.root_link, other_root = %other.root_link, mutations = mutations.len(), "diffed tree");
        Ok(mutations)
    }

    /// Diff `self` against `other`, then apply the emitted mutations.
    pub fn merge(&mut self, other: &ProllyTree) -> Result<(), TreeError> {
        let mutations = self.diff(other)?;
        if mutations.is_empty() {
            return Ok(());
        }
        let buffer = self.mutate();
        for m in mutations {
            buffer.push(m)?;
        }
        self.rebuild()
    }
}

fn pending_mutation_for<'a>(
    buffer: &'a MutationBuffer,
    key: &[u8],
    cmp: CompareFn,
) -> Option<&'a Mutation> {
    if buffer.is_finished() {
        buffer
            .mutations()
            .iter()
            .find(|m| cmp(&m.key, key) == Ordering::Equal)
    } else {
        buffer.staged_get(key)
    }
}
