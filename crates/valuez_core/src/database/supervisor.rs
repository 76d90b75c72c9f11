//! The database supervisor: durable writes and structural changes.

use super::warm::MEMBERSHIP_BUCKET;
use crate::collection::Collection;
use crate::error::{CoreError, CoreResult};
use crate::stats::DatabaseStats;
use crate::types::ItemId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use valuez_codec::{Codec, Value};
use valuez_storage::{Batch, BucketStore};

/// Collections of one database by name.
pub(crate) type Registry = Arc<RwLock<HashMap<String, Collection>>>;

/// One change to a collection's committed map.
#[derive(Debug, Clone)]
pub(crate) enum Change {
    Upsert(ItemId, Value),
    Remove(ItemId),
}

/// Requests served by the supervisor, one at a time.
///
/// `Write` is the data path used by collection actors. The rest is the admin
/// path. Both share one inbox so that structural changes and durable writes
/// are strictly ordered.
pub(crate) enum DbRequest {
    Write {
        collection: String,
        changes: Vec<Change>,
        reply: Sender<CoreResult<()>>,
    },
    AddCollection {
        collection: Collection,
        reply: Sender<CoreResult<()>>,
    },
    DeleteCollection {
        name: String,
        reply: Sender<CoreResult<()>>,
    },
    CollectionSuspended {
        name: String,
    },
    Close {
        reply: Sender<CoreResult<()>>,
    },
}

enum State {
    Open,
    Closing {
        /// Collection name to whether it has suspended.
        waiting: HashMap<String, bool>,
        reply: Sender<CoreResult<()>>,
    },
}

/// Owns the durable store and linearizes everything that touches it.
///
/// With no store (in-memory mode) every write succeeds immediately.
pub(crate) struct Supervisor {
    db_name: String,
    store: Option<Box<dyn BucketStore>>,
    codec: Arc<dyn Codec>,
    registry: Registry,
    stats: Arc<DatabaseStats>,
    inbox: Receiver<DbRequest>,
    state: State,
}

impl Supervisor {
    pub(crate) fn new(
        db_name: impl Into<String>,
        store: Option<Box<dyn BucketStore>>,
        codec: Arc<dyn Codec>,
        registry: Registry,
        stats: Arc<DatabaseStats>,
        inbox: Receiver<DbRequest>,
    ) -> Self {
        Self {
            db_name: db_name.into(),
            store,
            codec,
            registry,
            stats,
            inbox,
            state: State::Open,
        }
    }

    pub(crate) fn spawn(self) -> CoreResult<JoinHandle<()>> {
        let handle = thread::Builder::new()
            .name(format!("valuez-db-{}", self.db_name))
            .spawn(move || self.run())?;
        Ok(handle)
    }

    fn run(mut self) {
        loop {
            if self.drained() {
                self.finish();
                return;
            }

            let Ok(request) = self.inbox.recv() else {
                // Every handle is gone without a close request.
                if let Err(e) = self.close_store() {
                    tracing::warn!(database = %self.db_name, error = %e, "store close failed");
                }
                return;
            };

            match request {
                DbRequest::Write {
                    collection,
                    changes,
                    reply,
                } => {
                    let result = self.write(&collection, changes);
                    let _ = reply.send(result);
                }
                DbRequest::AddCollection { collection, reply } => {
                    let _ = reply.send(self.add_collection(collection));
                }
                DbRequest::DeleteCollection { name, reply } => {
                    let _ = reply.send(self.delete_collection(&name));
                }
                DbRequest::CollectionSuspended { name } => {
                    if let State::Closing { waiting, .. } = &mut self.state {
                        if let Some(suspended) = waiting.get_mut(&name) {
                            *suspended = true;
                        }
                    }
                }
                DbRequest::Close { reply } => self.begin_close(reply),
            }
        }
    }

    fn write(&mut self, collection: &str, changes: Vec<Change>) -> CoreResult<()> {
        let ops = changes.len();
        let result = match self.store.as_mut() {
            None => Ok(()),
            Some(store) => {
                encode_batch(self.codec.as_ref(), collection, changes).and_then(|batch| {
                    store.apply(&batch).map_err(CoreError::from)
                })
            }
        };

        match result {
            Ok(()) => {
                self.stats.record_batch_applied();
                tracing::debug!(collection, ops, "durable batch applied");
                Ok(())
            }
            Err(e) => {
                self.stats.record_batch_failed();
                tracing::warn!(collection, ops, error = %e, "durable batch failed");
                Err(CoreError::commit_failed(e.to_string()))
            }
        }
    }

    fn add_collection(&mut self, collection: Collection) -> CoreResult<()> {
        if matches!(self.state, State::Closing { .. }) {
            return Err(CoreError::DatabaseClosing);
        }
        let name = collection.name().to_string();
        if self.registry.read().contains_key(&name) {
            return Err(CoreError::collection_exists(name));
        }

        if let Some(store) = self.store.as_mut() {
            let mut batch = Batch::new();
            if !store.contains_bucket(MEMBERSHIP_BUCKET)? {
                batch.create_bucket(MEMBERSHIP_BUCKET);
            }
            batch
                .create_bucket(name.clone())
                .put(MEMBERSHIP_BUCKET, name.as_bytes().to_vec(), Vec::new());
            store.apply(&batch)?;
        }

        self.registry.write().insert(name.clone(), collection);
        self.stats.record_collection_created();
        tracing::info!(database = %self.db_name, collection = %name, "collection created");
        Ok(())
    }

    fn delete_collection(&mut self, name: &str) -> CoreResult<()> {
        let result = match self.store.as_mut() {
            None => Ok(()),
            Some(store) => {
                let mut batch = Batch::new();
                batch
                    .drop_bucket(name)
                    .delete(MEMBERSHIP_BUCKET, name.as_bytes().to_vec());
                store.apply(&batch).map_err(CoreError::from)
            }
        };

        // The collection is gone from the database either way.
        self.registry.write().remove(name);
        if let State::Closing { waiting, .. } = &mut self.state {
            waiting.insert(name.to_string(), true);
        }

        match &result {
            Ok(()) => {
                self.stats.record_collection_deleted();
                tracing::info!(database = %self.db_name, collection = name, "collection deleted");
            }
            Err(e) => {
                tracing::warn!(
                    database = %self.db_name,
                    collection = name,
                    error = %e,
                    "collection closed but not removed from store"
                );
            }
        }
        result
    }

    fn begin_close(&mut self, reply: Sender<CoreResult<()>>) {
        if matches!(self.state, State::Closing { .. }) {
            let _ = reply.send(Err(CoreError::DatabaseClosing));
            return;
        }

        let collections: Vec<Collection> = self.registry.read().values().cloned().collect();
        let mut waiting = HashMap::with_capacity(collections.len());
        for collection in &collections {
            // An actor that is already gone counts as suspended.
            let delivered = collection.shutdown();
            waiting.insert(collection.name().to_string(), !delivered);
        }

        tracing::info!(
            database = %self.db_name,
            collections = collections.len(),
            "closing database"
        );
        self.state = State::Closing { waiting, reply };
    }

    fn drained(&self) -> bool {
        match &self.state {
            State::Open => false,
            State::Closing { waiting, .. } => waiting.values().all(|suspended| *suspended),
        }
    }

    fn finish(mut self) {
        let result = self.close_store();
        self.registry.write().clear();
        if let State::Closing { reply, .. } = self.state {
            tracing::info!(database = %self.db_name, "database closed");
            let _ = reply.send(result);
        }
    }

    fn close_store(&mut self) -> CoreResult<()> {
        match self.store.as_mut() {
            Some(store) => store.close().map_err(CoreError::from),
            None => Ok(()),
        }
    }
}

fn encode_batch(codec: &dyn Codec, collection: &str, changes: Vec<Change>) -> CoreResult<Batch> {
    let mut batch = Batch::new();
    for change in changes {
        match change {
            Change::Upsert(id, value) => {
                batch.put(collection, id.key(), codec.encode(&value)?);
            }
            Change::Remove(id) => {
                batch.delete(collection, id.key());
            }
        }
    }
    Ok(batch)
}
