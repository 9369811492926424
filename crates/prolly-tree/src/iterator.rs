//! A lazy, pull-based range iterator driven by cursor advance.

use std::sync::Arc;

use prolly_store::NodeStore;
use prolly_types::CompareFn;

use crate::cursor::Cursor;

/// Cooperative cancellation signal checked before each block fetch.
///
/// A range scan aborts at the next node read after cancellation is
/// requested; in-flight comparisons already in memory still complete.
pub trait CancellationToken: Send + Sync {
    /// Whether the scan should stop before its next block read.
    fn is_cancelled(&self) -> bool;
}

/// A token that never cancels, for callers with no cancellation need.
pub struct NeverCancel;

impl CancellationToken for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// A `'static` instance of [`NeverCancel`], for call sites that need a
/// `&'static dyn CancellationToken` (e.g. a full-span scan with no caller
/// context to borrow a token from).
pub static NEVER_CANCEL: NeverCancel = NeverCancel;

/// A finite, single-consumer stream of `(key, value)` pairs in ascending
/// key order, bounded by an inclusive end key.
pub struct RangeIter<'a> {
    store: Arc<NodeStore>,
    cursor: Option<Cursor>,
    cmp: CompareFn,
    end: Option<Vec<u8>>,
    cancel: &'a dyn CancellationToken,
    done: bool,
}

impl<'a> RangeIter<'a> {
    /// Start a range scan at `cursor`, stopping when the key exceeds `end`
    /// (inclusive), the cursor runs out, or `cancel` is tripped.
    pub fn new(
        store: Arc<NodeStore>,
        cursor: Cursor,
        cmp: CompareFn,
        end: Option<Vec<u8>>,
        cancel: &'a dyn CancellationToken,
    ) -> Self {
        Self {
            store,
            cursor: Some(cursor),
            cmp,
            end,
            cancel,
            done: false,
        }
    }
}

impl<'a> Iterator for RangeIter<'a> {
    type Item = Result<(Vec<u8>, Vec<u8>), crate::error::TreeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.cancel.is_cancelled() {
            self.done = true;
            return None;
        }
        let cursor = self.cursor.as_mut()?;
        if !cursor.is_valid() {
            self.done = true;
            return None;
        }
        let key = cursor.key().to_vec();
        if let Some(end) = &self.end {
            if (self.cmp)(&key, end) == std::cmp::Ordering::Greater {
                self.done = true;
                return None;
            }
        }
        let value = cursor.value().to_vec();
        if let Err(e) = cursor.advance(&self.store) {
            self.done = true;
            return Some(Err(e));
        }
        Some(Ok((key, value)))
    }
}
