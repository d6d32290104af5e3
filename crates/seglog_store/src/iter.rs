//! Streaming iteration over a segment's records.

use crate::error::{StoreError, StoreResult};
use crate::store::{Inner, LEN_WIDTH};
use parking_lot::MutexGuard;

/// A streaming iterator over every record in a segment, in append
/// order.
///
/// Yields `(position, payload)` pairs. The store lock is held for the
/// iterator's lifetime, so the view is a consistent snapshot; other
/// threads block until the iterator is dropped.
///
/// # Error Handling
///
/// A length prefix whose payload extends past the end of the file, or
/// a trailing fragment too short to hold a prefix, is reported as
/// [`StoreError::Corrupted`]. The format carries no checksum, so a
/// torn write cannot be told apart from valid data and is never
/// silently skipped. Iteration stops after the first error.
pub struct RecordIter<'a> {
    inner: MutexGuard<'a, Inner>,
    /// Position of the next record's length prefix.
    offset: u64,
    finished: bool,
}

impl<'a> RecordIter<'a> {
    /// `inner` must already have its staging buffer drained.
    pub(crate) fn new(inner: MutexGuard<'a, Inner>) -> Self {
        Self {
            inner,
            offset: 0,
            finished: false,
        }
    }

    fn read_next(&mut self) -> StoreResult<Option<(u64, Vec<u8>)>> {
        if self.offset == self.inner.size {
            return Ok(None);
        }

        let position = self.offset;
        let remaining = self.inner.size - position;
        if remaining < LEN_WIDTH {
            return Err(StoreError::Corrupted(format!(
                "truncated length prefix at position {position}: {remaining} bytes left"
            )));
        }

        let mut prefix = [0u8; LEN_WIDTH as usize];
        self.inner.read_exact_at(&mut prefix, position)?;
        let len = u64::from_be_bytes(prefix);

        if len > remaining - LEN_WIDTH {
            return Err(StoreError::Corrupted(format!(
                "record at position {position} claims {len} bytes with {} left",
                remaining - LEN_WIDTH
            )));
        }

        let mut payload = vec![0u8; len as usize];
        self.inner.read_exact_at(&mut payload, position + LEN_WIDTH)?;

        self.offset = position + LEN_WIDTH + len;
        Ok(Some((position, payload)))
    }
}

impl Iterator for RecordIter<'_> {
    type Item = StoreResult<(u64, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.read_next() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
