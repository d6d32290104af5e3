//! The append-only record store.

use crate::error::{StoreError, StoreResult};
use crate::iter::RecordIter;
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

/// Width in bytes of the big-endian length prefix preceding each record.
pub const LEN_WIDTH: u64 = 8;

/// Staging buffer drain threshold. An append drains the buffer before
/// staging when its record would not fit, so the buffer holds at most
/// this many bytes plus one record.
const STAGING_CAPACITY: usize = 4096;

/// An append-only record store over a single segment file.
///
/// Each record is persisted as an 8-byte big-endian length prefix
/// followed by the raw payload bytes. `append` returns the byte
/// position at which the record begins; `read` takes that position
/// back and returns the payload. Payloads are opaque - the store never
/// interprets them.
///
/// # Buffering
///
/// Appends are staged in an in-memory buffer and drained to the file
/// in batches. Positions handed out by `append` are valid immediately:
/// every read path drains the buffer first, so a reader always
/// observes all appends that completed before it, whether or not the
/// bytes have reached the file yet. Durability is only guaranteed by
/// [`Store::sync`] or [`Store::close`].
///
/// # Thread Safety
///
/// All operations are serialized under a single internal lock, so the
/// store can be shared across threads. Two concurrent appends never
/// interleave their bytes and always observe a strictly increasing,
/// gap-free position sequence.
///
/// # Example
///
/// ```no_run
/// use seglog_store::Store;
/// use std::path::Path;
///
/// let store = Store::open(Path::new("segment.store")).unwrap();
/// let (written, pos) = store.append(b"hello").unwrap();
/// assert_eq!((written, pos), (13, 0));
/// assert_eq!(store.read(pos).unwrap(), b"hello");
/// store.close().unwrap();
/// ```
pub struct Store {
    pub(crate) inner: Mutex<Inner>,
}

pub(crate) struct Inner {
    /// `None` once the store has been closed.
    file: Option<File>,
    /// Bytes staged but not yet written to the file.
    buf: Vec<u8>,
    /// File length once `buf` is fully drained.
    pub(crate) size: u64,
}

impl Inner {
    /// Drains the staging buffer to the end of the file.
    pub(crate) fn flush(&mut self) -> StoreResult<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(StoreError::Closed);
        };
        if self.buf.is_empty() {
            return Ok(());
        }
        file.seek(SeekFrom::End(0))?;
        file.write_all(&self.buf)?;
        self.buf.clear();
        Ok(())
    }

    /// Fills `dst` with the bytes at `offset`, after checking the
    /// requested range against the accounted size.
    pub(crate) fn read_exact_at(&mut self, dst: &mut [u8], offset: u64) -> StoreResult<()> {
        let Some(file) = self.file.as_mut() else {
            return Err(StoreError::Closed);
        };
        let end = offset.saturating_add(dst.len() as u64);
        if offset > self.size || end > self.size {
            return Err(StoreError::ReadPastEnd {
                position: offset,
                len: dst.len() as u64,
                size: self.size,
            });
        }
        if dst.is_empty() {
            return Ok(());
        }
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(dst)?;
        Ok(())
    }
}

impl Store {
    /// Creates a store over an already-open segment file.
    ///
    /// The file must be readable and writable. The store seeds its
    /// size counter from the file's current length, so wrapping a file
    /// written by a previous store instance resumes the position
    /// sequence where it left off.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's metadata cannot be queried.
    pub fn new(file: File) -> StoreResult<Self> {
        let size = file.metadata()?.len();
        Ok(Self {
            inner: Mutex::new(Inner {
                file: Some(file),
                buf: Vec::with_capacity(STAGING_CAPACITY),
                size,
            }),
        })
    }

    /// Opens or creates a segment file at the given path.
    ///
    /// An existing file is opened without truncation and its records
    /// are preserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StoreResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::new(file)
    }

    /// Appends a record and returns `(bytes_written, position)`.
    ///
    /// `bytes_written` is `LEN_WIDTH + payload.len()`; `position` is
    /// the byte offset at which the record's length prefix begins.
    /// Positions are strictly increasing and gap-free across all
    /// threads.
    ///
    /// The prefix and payload are staged together, so the size counter
    /// only ever advances by whole records and no reader can observe a
    /// length prefix without its payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed, or if the staging
    /// buffer must be drained to make room and the drain fails. The
    /// drain happens before anything is staged, so a failed `append`
    /// leaves the size counter and the buffer exactly as they were:
    /// no phantom record is accounted for and the call is safe to
    /// retry.
    pub fn append(&self, payload: &[u8]) -> StoreResult<(u64, u64)> {
        let mut inner = self.inner.lock();
        if inner.file.is_none() {
            return Err(StoreError::Closed);
        }
        // Drain first when this record would push the buffer past
        // capacity. Staging itself cannot fail, so after this point
        // the append always completes.
        if !inner.buf.is_empty()
            && inner.buf.len() + LEN_WIDTH as usize + payload.len() > STAGING_CAPACITY
        {
            inner.flush()?;
        }
        let position = inner.size;
        inner
            .buf
            .extend_from_slice(&(payload.len() as u64).to_be_bytes());
        inner.buf.extend_from_slice(payload);
        let written = LEN_WIDTH + payload.len() as u64;
        inner.size += written;
        Ok((written, position))
    }

    /// Reads back the record appended at `position`.
    ///
    /// Drains the staging buffer first, so a read always observes
    /// every append that completed before it on this store instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed, the drain or the file
    /// read fails, or `position` does not address a record boundary
    /// inside the written region. A misaligned position decodes a
    /// length that overruns the file and is rejected the same way as
    /// an out-of-range one.
    pub fn read(&self, position: u64) -> StoreResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        inner.flush()?;

        let mut prefix = [0u8; LEN_WIDTH as usize];
        inner.read_exact_at(&mut prefix, position)?;
        let len = u64::from_be_bytes(prefix);

        // Bounds-check the decoded length before allocating for it.
        let payload_start = position + LEN_WIDTH;
        if len > inner.size - payload_start {
            return Err(StoreError::ReadPastEnd {
                position: payload_start,
                len,
                size: inner.size,
            });
        }

        let mut payload = vec![0u8; len as usize];
        inner.read_exact_at(&mut payload, payload_start)?;
        Ok(payload)
    }

    /// Fills `dst` with the raw bytes at `offset`, bypassing the
    /// length-prefix framing.
    ///
    /// Returns the number of bytes read, which is always `dst.len()`
    /// on success. Drains the staging buffer first, like [`Store::read`].
    /// Intended for callers that already know exact file offsets, such
    /// as an index layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed, the drain or read
    /// fails, or the requested range extends past the written region.
    pub fn read_at(&self, dst: &mut [u8], offset: u64) -> StoreResult<usize> {
        let mut inner = self.inner.lock();
        inner.flush()?;
        inner.read_exact_at(dst, offset)?;
        Ok(dst.len())
    }

    /// Returns a streaming iterator over every record in the segment,
    /// in append order.
    ///
    /// The store lock is held for the iterator's lifetime; appends
    /// from other threads block until it is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the staging buffer
    /// cannot be drained.
    pub fn iter(&self) -> StoreResult<RecordIter<'_>> {
        let mut inner = self.inner.lock();
        inner.flush()?;
        Ok(RecordIter::new(inner))
    }

    /// Forces all appended records to durable storage.
    ///
    /// Drains the staging buffer and syncs file data and metadata to
    /// disk. After this returns, every prior append survives process
    /// termination.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or the drain or sync
    /// fails.
    pub fn sync(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.flush()?;
        let Some(file) = inner.file.as_ref() else {
            return Err(StoreError::Closed);
        };
        file.sync_all()?;
        Ok(())
    }

    /// Flushes, syncs, and closes the underlying file.
    ///
    /// This is the durability boundary for any records not yet synced.
    /// Every subsequent operation, including a second `close`, returns
    /// [`StoreError::Closed`].
    ///
    /// # Errors
    ///
    /// Returns an error if the store is already closed or the final
    /// drain or sync fails. On a drain failure the file stays open so
    /// the caller may retry.
    pub fn close(&self) -> StoreResult<()> {
        let mut inner = self.inner.lock();
        inner.flush()?;
        let file = inner.file.take().ok_or(StoreError::Closed)?;
        file.sync_all()?;
        Ok(())
    }

    /// Returns the total bytes accounted for, staged bytes included.
    ///
    /// This is the position the next `append` will return. It does not
    /// imply the bytes have reached disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed.
    pub fn size(&self) -> StoreResult<u64> {
        let inner = self.inner.lock();
        if inner.file.is_none() {
            return Err(StoreError::Closed);
        }
        Ok(inner.size)
    }

    /// Returns `true` if no records have been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.size()? == 0)
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("Store")
            .field("size", &inner.size)
            .field("closed", &inner.file.is_none())
            .finish_non_exhaustive()
    }
}
