//! # valuez testkit
//!
//! Test utilities for valuez.
//!
//! This crate provides:
//! - Test fixtures and database helpers
//! - A fault-injecting store for durability failure tests
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use valuez_testkit::prelude::*;
//!
//! with_temp_db(|db| {
//!     let items = db.new_collection("items").unwrap();
//!     items.put("a").unwrap();
//!     assert_eq!(items.len(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fault;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fault::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use fault::*;
pub use fixtures::*;
pub use generators::*;
