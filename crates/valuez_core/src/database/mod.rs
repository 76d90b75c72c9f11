//! Database facade and warm start.

mod supervisor;
mod warm;

pub(crate) use supervisor::{Change, DbRequest};
pub use warm::{MEMBERSHIP_BUCKET, RESERVED_PREFIX};

use crate::collection::{self, Collection, CollectionActor, CollectionShared, ItemMap, FRESH_COUNTER};
use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::stats::{DatabaseStats, StatsSnapshot};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use supervisor::{Registry, Supervisor};
use valuez_codec::{CborCodec, Codec};
use valuez_storage::{BucketStore, FileStore};

/// The main database handle.
///
/// A database is a set of named [`Collection`]s. Each collection is served
/// by its own actor thread; a supervisor thread owns the durable store,
/// applies every durable batch in submission order and handles structural
/// changes and shutdown.
///
/// # Opening a Database
///
/// ```rust,no_run
/// use valuez_core::{Config, Database};
///
/// let db = Database::open("inventory", Config::new().data_dir("data")).unwrap();
/// let items = match db.collection("items") {
///     Ok(items) => items,
///     Err(_) => db.new_collection("items").unwrap(),
/// };
/// items.put("widget").unwrap();
/// db.close().unwrap();
/// ```
///
/// The store file is `<data_dir>/<name>.db`. Reopening it restores every
/// collection with its items and identifier counter.
///
/// # In-Memory Databases
///
/// ```rust
/// use valuez_core::Database;
///
/// let db = Database::open_in_memory("scratch").unwrap();
/// assert!(db.collection_names().is_empty());
/// ```
pub struct Database {
    name: String,
    config: Config,
    registry: Registry,
    requests: Sender<DbRequest>,
    stats: Arc<DatabaseStats>,
    is_open: RwLock<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Database {
    /// Opens or creates a database.
    ///
    /// Unless `config.in_memory` is set, the store file is opened (created
    /// if missing) and every stored collection is loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The data directory is missing and `create_dir` is false
    /// - Another handle holds the store's lock
    /// - Stored data cannot be decoded (`Corrupted`, `Codec`)
    /// - I/O errors occur
    pub fn open(name: &str, config: Config) -> CoreResult<Self> {
        if config.in_memory {
            return Self::start(name, config, None, Arc::new(CborCodec::new()));
        }

        if !config.data_dir.exists() {
            if config.create_dir {
                fs::create_dir_all(&config.data_dir)?;
            } else {
                return Err(CoreError::invalid_operation(format!(
                    "data directory does not exist: {}",
                    config.data_dir.display()
                )));
            }
        }

        let store = FileStore::open(&config.store_path(name), config.sync_on_commit)?;
        Self::start(name, config, Some(Box::new(store)), Arc::new(CborCodec::new()))
    }

    /// Opens a database that never touches disk.
    ///
    /// # Errors
    ///
    /// Returns an error only if a worker thread cannot be spawned.
    pub fn open_in_memory(name: &str) -> CoreResult<Self> {
        Self::open(name, Config::in_memory())
    }

    /// Opens a database over a caller-supplied store and codec.
    ///
    /// `config.in_memory` is ignored; the given store is always used.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored collections cannot be loaded.
    pub fn open_with_store(
        name: &str,
        config: Config,
        store: Box<dyn BucketStore>,
        codec: Arc<dyn Codec>,
    ) -> CoreResult<Self> {
        Self::start(name, config, Some(store), codec)
    }

    fn start(
        name: &str,
        config: Config,
        store: Option<Box<dyn BucketStore>>,
        codec: Arc<dyn Codec>,
    ) -> CoreResult<Self> {
        let stats = Arc::new(DatabaseStats::new());
        let registry: Registry = Arc::new(RwLock::new(HashMap::new()));
        let (requests, inbox) = mpsc::channel();

        if let Some(store) = &store {
            for stored in warm::load_collections(store.as_ref(), codec.as_ref())? {
                let shared = Arc::new(CollectionShared::new(
                    stored.name.clone(),
                    stored.items,
                    stored.last_id,
                    Arc::clone(&stats),
                ));
                let (handle, actor_inbox) = collection::channel(Arc::clone(&shared));
                CollectionActor::new(shared, actor_inbox, requests.clone()).spawn()?;
                registry.write().insert(stored.name, handle);
            }
        }

        let collections = registry.read().len();
        let in_memory = store.is_none();
        let worker = Supervisor::new(
            name,
            store,
            codec,
            Arc::clone(&registry),
            Arc::clone(&stats),
            inbox,
        )
        .spawn()?;

        tracing::info!(database = name, in_memory, collections, "database opened");

        Ok(Self {
            name: name.to_string(),
            config,
            registry,
            requests,
            stats,
            is_open: RwLock::new(true),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Creates a new, empty collection.
    ///
    /// The collection is recorded in the store before it is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The name is empty or reserved (`InvalidCollectionName`)
    /// - A collection with this name exists (`CollectionExists`)
    /// - The database is closing or closed
    /// - The store rejects the change
    pub fn new_collection(&self, name: &str) -> CoreResult<Collection> {
        self.ensure_open()?;
        warm::validate_collection_name(name)?;
        if self.registry.read().contains_key(name) {
            return Err(CoreError::collection_exists(name));
        }

        let shared = Arc::new(CollectionShared::new(
            name,
            ItemMap::new(),
            FRESH_COUNTER,
            Arc::clone(&self.stats),
        ));
        let (handle, actor_inbox) = collection::channel(Arc::clone(&shared));

        let (reply, rx) = mpsc::channel();
        self.requests
            .send(DbRequest::AddCollection {
                collection: handle.clone(),
                reply,
            })
            .map_err(|_| CoreError::DatabaseClosed)?;
        rx.recv().map_err(|_| CoreError::DatabaseClosed)??;

        CollectionActor::new(shared, actor_inbox, self.requests.clone()).spawn()?;
        Ok(handle)
    }

    /// Returns the collection with this name.
    ///
    /// # Errors
    ///
    /// Returns `CollectionNotFound` if there is none, or `DatabaseClosed`.
    pub fn collection(&self, name: &str) -> CoreResult<Collection> {
        self.ensure_open()?;
        self.registry
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::collection_not_found(name))
    }

    /// Returns the names of all collections, sorted.
    #[must_use]
    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Closes the database.
    ///
    /// Every collection finishes the requests already queued for it, then
    /// suspends; the store is closed once all of them have. Closing an
    /// already closed database does nothing.
    ///
    /// # Errors
    ///
    /// Returns `DatabaseClosing` if another close is in progress, or the
    /// store's error if closing it failed. In the latter case the database
    /// is closed regardless.
    pub fn close(&self) -> CoreResult<()> {
        if !self.is_open() {
            return Ok(());
        }

        let (reply, rx) = mpsc::channel();
        if self.requests.send(DbRequest::Close { reply }).is_err() {
            *self.is_open.write() = false;
            return Ok(());
        }
        // A dropped reply means an earlier close already finished.
        let result = rx.recv().unwrap_or(Ok(()));
        if matches!(result, Err(CoreError::DatabaseClosing)) {
            return result;
        }

        *self.is_open.write() = false;
        if let Some(worker) = self.worker.lock().take() {
            let _ = worker.join();
        }
        result
    }

    /// Checks if the database is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        *self.is_open.read()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if *self.is_open.read() {
            Ok(())
        } else {
            Err(CoreError::DatabaseClosed)
        }
    }

    /// Returns the database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns database configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns a snapshot of the database counters.
    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name)
            .field("is_open", &self.is_open())
            .field("collections", &self.collection_names())
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
