//! Benchmark support for valuez.

#![warn(missing_docs)]

pub mod utils;
