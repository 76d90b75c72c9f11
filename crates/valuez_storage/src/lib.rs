//! # valuez storage
//!
//! The durable bucket store underneath valuez.
//!
//! A store holds named buckets, each an ordered map from byte keys to byte
//! values. All writes go through [`Batch`]es that are applied atomically,
//! so structural changes such as "create a bucket and record it in a
//! membership bucket" land together or not at all.
//!
//! ## Available Stores
//!
//! - [`MemoryStore`] - For testing and ephemeral data
//! - [`FileStore`] - Append-only log file with crash recovery
//!
//! ## Example
//!
//! ```rust
//! use valuez_storage::{Batch, BucketStore, MemoryStore};
//!
//! let mut store = MemoryStore::new();
//! let mut batch = Batch::new();
//! batch.create_bucket("people").put("people", b"101".to_vec(), b"ada".to_vec());
//! store.apply(&batch).unwrap();
//!
//! assert_eq!(store.scan("people").unwrap().len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod batch;
mod buckets;
mod error;
mod file;
mod frame;
mod memory;
mod store;

pub use batch::{Batch, BatchOp};
pub use error::{StorageError, StorageResult};
pub use file::{CompactReport, FileStore, VerifyReport};
pub use frame::{CRC_SIZE, FRAME_MAGIC, FRAME_VERSION, HEADER_SIZE};
pub use memory::MemoryStore;
pub use store::BucketStore;
