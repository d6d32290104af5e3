//! # seglog store
//!
//! The persistence primitive for a log-structured storage segment: an
//! append-only binary file of length-prefixed records.
//!
//! Each record is written as an 8-byte big-endian length prefix
//! followed by the raw payload. [`Store::append`] returns the byte
//! position where the record begins; [`Store::read`] takes that
//! position back and returns the payload. Payloads are opaque byte
//! sequences - the store never interprets them.
//!
//! ## Design Principles
//!
//! - One store owns one segment file exclusively for its lifetime
//! - Appends are staged in memory and drained in batches; every read
//!   path drains first, so positions are readable the moment `append`
//!   returns
//! - A single coarse lock serializes all operations; scale throughput
//!   by running more segments, not by finer locking
//! - No retries, no logging, no recovery policy - failures propagate
//!   to the caller
//!
//! ## Example
//!
//! ```no_run
//! use seglog_store::Store;
//! use std::path::Path;
//!
//! let store = Store::open(Path::new("segment.store")).unwrap();
//! let (written, pos) = store.append(b"hello").unwrap();
//! assert_eq!((written, pos), (13, 0));
//! assert_eq!(store.read(pos).unwrap(), b"hello");
//! store.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod iter;
mod store;

pub use error::{StoreError, StoreResult};
pub use iter::RecordIter;
pub use store::{Store, LEN_WIDTH};
