//! Test fixtures and database helpers.
//!
//! Provides convenience functions for setting up test databases
//! and common test scenarios.

use crate::fault::{FaultSwitch, FlakyStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use valuez_core::{CborCodec, Config, Database};

/// A test database with automatic cleanup.
pub struct TestDatabase {
    /// The database instance.
    pub db: Database,
    /// Injects store failures; `None` unless built with [`TestDatabase::flaky`].
    pub faults: Option<FaultSwitch>,
    temp_dir: Option<TempDir>,
}

impl TestDatabase {
    /// Creates a new in-memory test database.
    pub fn memory() -> Self {
        Self {
            db: Database::open_in_memory("test").expect("Failed to open in-memory database"),
            faults: None,
            temp_dir: None,
        }
    }

    /// Creates a new file-backed test database in a temporary directory.
    pub fn file() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open("test", Self::file_config(temp_dir.path()))
            .expect("Failed to open file database");

        Self {
            db,
            faults: None,
            temp_dir: Some(temp_dir),
        }
    }

    /// Creates a database over a [`FlakyStore`] whose failures are driven by
    /// [`TestDatabase::faults`].
    pub fn flaky() -> Self {
        let faults = FaultSwitch::new();
        let store = FlakyStore::new(faults.clone());
        let db = Database::open_with_store(
            "test",
            Config::new(),
            Box::new(store),
            Arc::new(CborCodec::new()),
        )
        .expect("Failed to open flaky database");

        Self {
            db,
            faults: Some(faults),
            temp_dir: None,
        }
    }

    /// Closes a file-backed database and opens it again from disk.
    pub fn reopen(self) -> Self {
        let Self { db, temp_dir, .. } = self;
        let temp_dir = temp_dir.expect("Only file databases can be reopened");
        db.close().expect("Failed to close database");
        drop(db);

        let db = Database::open("test", Self::file_config(temp_dir.path()))
            .expect("Failed to reopen file database");
        Self {
            db,
            faults: None,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the store file path if file-based, None otherwise.
    pub fn path(&self) -> Option<PathBuf> {
        self.temp_dir
            .as_ref()
            .map(|d| Self::file_config(d.path()).store_path("test"))
    }

    /// Returns the fault switch of a flaky database.
    pub fn faults(&self) -> &FaultSwitch {
        self.faults
            .as_ref()
            .expect("Only flaky databases have a fault switch")
    }

    fn file_config(dir: &Path) -> Config {
        Config::new().data_dir(dir).sync_on_commit(false)
    }
}

impl std::ops::Deref for TestDatabase {
    type Target = Database;

    fn deref(&self) -> &Self::Target {
        &self.db
    }
}

/// Runs a test with a temporary in-memory database.
///
/// # Example
///
/// ```rust
/// use valuez_testkit::with_temp_db;
///
/// with_temp_db(|db| {
///     let items = db.new_collection("items").unwrap();
///     assert!(items.is_empty());
/// });
/// ```
pub fn with_temp_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database) -> R,
{
    let test_db = TestDatabase::memory();
    f(&test_db.db)
}

/// Runs a test with a temporary file-backed database.
pub fn with_file_db<F, R>(f: F) -> R
where
    F: FnOnce(&Database, &Path) -> R,
{
    let test_db = TestDatabase::file();
    let path = test_db.path().expect("File database should have a path");
    f(&test_db.db, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use valuez_core::Value;

    /// Creates an in-memory database with one collection, `items`, holding
    /// the integers `0..count`.
    pub fn populated_database(count: i64) -> TestDatabase {
        let test_db = TestDatabase::memory();
        let items = test_db
            .new_collection("items")
            .expect("Failed to create collection");
        for i in 0..count {
            items.put(Value::from(i)).expect("Failed to put item");
        }
        test_db
    }

    /// Creates an in-memory database with `count` collections named
    /// `collection_0`, `collection_1`, ..., each holding one item.
    pub fn multi_collection_database(count: usize) -> TestDatabase {
        let test_db = TestDatabase::memory();
        for i in 0..count {
            let collection = test_db
                .new_collection(&format!("collection_{i}"))
                .expect("Failed to create collection");
            collection
                .put(Value::record([("collection", Value::from(i as i64))]))
                .expect("Failed to put item");
        }
        test_db
    }
}
