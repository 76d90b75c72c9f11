//! # valuez core
//!
//! An embedded, durable store of named collections of dynamic values.
//!
//! ## Design
//!
//! - **One actor per collection**: every mutation of a collection runs on its
//!   own thread, in arrival order
//! - **Single durable writer**: a supervisor thread owns the store and applies
//!   each change as one atomic batch before it becomes visible
//! - **Copy-on-write overlays**: transactions stage changes privately; views
//!   read an immutable snapshot
//! - **Graceful shutdown**: closing drains every collection before the store
//!   is released
//!
//! ## Quick Start
//!
//! ```rust
//! use valuez_core::{Database, Value};
//!
//! let db = Database::open_in_memory("demo").unwrap();
//! let people = db.new_collection("people").unwrap();
//!
//! let id = people.put(Value::record([("name", Value::from("ada"))])).unwrap();
//! assert_eq!(id.as_u64(), 101);
//!
//! let found = people
//!     .get(|v| Ok(v.get("name") == Some(&Value::from("ada"))))
//!     .unwrap();
//! assert_eq!(found.len(), 1);
//!
//! db.close().unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod callback;
mod collection;
mod config;
mod database;
mod error;
mod stats;
mod transaction;
mod types;

pub use callback::{CallbackError, CallbackResult};
pub use collection::{Collection, FRESH_COUNTER};
pub use config::{db_file_path, Config};
pub use database::{Database, MEMBERSHIP_BUCKET, RESERVED_PREFIX};
pub use error::{CoreError, CoreResult};
pub use stats::{DatabaseStats, StatsSnapshot};
pub use transaction::Transaction;
pub use types::ItemId;

pub use valuez_codec::{CborCodec, Codec, Value};
pub use valuez_storage::{BucketStore, FileStore, MemoryStore};
