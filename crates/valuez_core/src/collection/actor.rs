//! The per-collection request loop.

use super::request::{reply_channel, Predicate, Request, TransactionBody, UpdateFn};
use super::{CollectionShared, ItemMap};
use crate::callback::{guarded, CallbackResult};
use crate::database::{Change, DbRequest};
use crate::error::{CoreError, CoreResult};
use crate::transaction::Transaction;
use crate::types::ItemId;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;
use valuez_codec::Value;

/// Serializes every mutation of one collection.
///
/// The actor is the only writer of the committed map. Each change is first
/// sent to the database's durable channel and applied in memory only once
/// the store has accepted it.
pub(crate) struct CollectionActor {
    shared: Arc<CollectionShared>,
    inbox: Receiver<Request>,
    database: Sender<DbRequest>,
    list: Option<Arc<Vec<Value>>>,
}

impl CollectionActor {
    pub(crate) fn new(
        shared: Arc<CollectionShared>,
        inbox: Receiver<Request>,
        database: Sender<DbRequest>,
    ) -> Self {
        Self {
            shared,
            inbox,
            database,
            list: None,
        }
    }

    /// Starts the actor on its own thread.
    pub(crate) fn spawn(self) -> CoreResult<()> {
        thread::Builder::new()
            .name(format!("valuez-col-{}", self.shared.name()))
            .spawn(move || self.run())?;
        Ok(())
    }

    fn run(mut self) {
        self.shared.bind_actor_thread();
        tracing::debug!(collection = self.shared.name(), "collection actor started");

        while let Ok(request) = self.inbox.recv() {
            match request {
                Request::Put { value, reply } => {
                    let _ = reply.send(self.put(value));
                }
                Request::Take { predicate, reply } => {
                    let _ = reply.send(self.take(predicate));
                }
                Request::Update { func, reply } => {
                    let _ = reply.send(self.update(func));
                }
                Request::Transaction { body, reply } => {
                    let _ = reply.send(self.transaction(body));
                }
                Request::View { reply } => {
                    self.shared.stats().record_view();
                    let _ = reply.send(Ok(self.shared.snapshot()));
                }
                Request::AsList { reply } => {
                    let _ = reply.send(Ok(self.as_list()));
                }
                Request::Delete { reply } => {
                    let _ = reply.send(self.delete());
                    break;
                }
                Request::Shutdown => {
                    self.suspend();
                    break;
                }
            }
        }

        self.respond_closed();
    }

    fn put(&mut self, value: Value) -> CoreResult<ItemId> {
        let id = self.shared.next_id()?;
        let changes = vec![Change::Upsert(id, value)];

        self.commit(&changes).inspect_err(|e| {
            tracing::warn!(collection = self.shared.name(), %id, error = %e, "put not stored");
        })?;
        self.apply(changes);
        self.shared.stats().record_put();
        Ok(id)
    }

    fn take(&mut self, mut predicate: Predicate) -> CoreResult<Vec<Value>> {
        self.shared.stats().record_take();
        let items = self.shared.snapshot();

        let matched = self.guard("take", || {
            let mut matched = Vec::new();
            for (id, value) in items.iter() {
                if predicate(value)? {
                    matched.push(*id);
                }
            }
            Ok(matched)
        })?;

        if matched.is_empty() {
            return Ok(Vec::new());
        }

        let changes: Vec<Change> = matched.iter().copied().map(Change::Remove).collect();
        if let Err(e) = self.commit(&changes) {
            tracing::warn!(
                collection = self.shared.name(),
                matched = matched.len(),
                error = %e,
                "take not stored, returning no items"
            );
            return Ok(Vec::new());
        }

        let taken = self.shared.mutate(|items| {
            matched
                .iter()
                .filter_map(|id| items.remove(id))
                .collect::<Vec<_>>()
        });
        self.list = None;
        Ok(taken)
    }

    fn update(&mut self, mut func: UpdateFn) -> CoreResult<bool> {
        self.shared.stats().record_update();
        let items = self.shared.snapshot();

        let (replacement, changed) = self.guard("update", || {
            let mut replacement = ItemMap::new();
            let mut changed = false;
            for (id, value) in items.iter() {
                match func(value)? {
                    Some(next) => {
                        changed = true;
                        replacement.insert(*id, next);
                    }
                    None => {
                        replacement.insert(*id, value.clone());
                    }
                }
            }
            Ok((replacement, changed))
        })?;

        if !changed {
            return Ok(false);
        }

        // The stored batch is a full re-snapshot, unchanged items included.
        let changes: Vec<Change> = replacement
            .iter()
            .map(|(id, value)| Change::Upsert(*id, value.clone()))
            .collect();
        if let Err(e) = self.commit(&changes) {
            tracing::warn!(collection = self.shared.name(), error = %e, "update not stored");
            return Ok(false);
        }

        self.shared.replace(replacement);
        self.list = None;
        Ok(true)
    }

    fn transaction(&mut self, body: TransactionBody) -> CoreResult<bool> {
        let mut txn = Transaction::write(Arc::clone(&self.shared), self.shared.snapshot());

        let decision = self.guard("transaction", || body(&mut txn));
        let decision = match decision {
            Ok(decision) => decision,
            Err(e) => {
                self.shared.stats().record_transaction_failure();
                return Err(e);
            }
        };

        if !decision {
            self.shared.stats().record_transaction_abort();
            return Ok(false);
        }

        let changes = txn.into_changes();
        if !changes.is_empty() {
            if let Err(e) = self.commit(&changes) {
                tracing::warn!(
                    collection = self.shared.name(),
                    changes = changes.len(),
                    error = %e,
                    "transaction not stored"
                );
                self.shared.stats().record_transaction_failure();
                return Ok(false);
            }
            self.apply(changes);
        }

        self.shared.stats().record_transaction_commit();
        Ok(true)
    }

    fn as_list(&mut self) -> Arc<Vec<Value>> {
        let shared = &self.shared;
        Arc::clone(
            self.list
                .get_or_insert_with(|| Arc::new(shared.snapshot().values().cloned().collect())),
        )
    }

    fn delete(&mut self) -> CoreResult<()> {
        self.shared.mark_closed();

        let (reply, rx) = reply_channel();
        self.database
            .send(DbRequest::DeleteCollection {
                name: self.shared.name().to_string(),
                reply,
            })
            .map_err(|_| CoreError::DatabaseClosed)?;
        rx.recv().map_err(|_| CoreError::DatabaseClosed)?
    }

    fn suspend(&mut self) {
        self.shared.mark_closed();
        tracing::debug!(collection = self.shared.name(), "collection suspended");
        let _ = self.database.send(DbRequest::CollectionSuspended {
            name: self.shared.name().to_string(),
        });
    }

    /// Answers everything still arriving with a closed error.
    fn respond_closed(self) {
        for request in self.inbox.iter() {
            match request {
                Request::Shutdown => {
                    let _ = self.database.send(DbRequest::CollectionSuspended {
                        name: self.shared.name().to_string(),
                    });
                }
                other => {
                    tracing::debug!(
                        collection = self.shared.name(),
                        request = other.kind(),
                        "rejecting request on closed collection"
                    );
                    other.reject(CoreError::collection_closed(self.shared.name()));
                }
            }
        }
    }

    /// Sends changes down the durable channel and waits for the verdict.
    fn commit(&self, changes: &[Change]) -> CoreResult<()> {
        let (reply, rx) = reply_channel();
        self.database
            .send(DbRequest::Write {
                collection: self.shared.name().to_string(),
                changes: changes.to_vec(),
                reply,
            })
            .map_err(|_| CoreError::DatabaseClosed)?;
        rx.recv().map_err(|_| CoreError::DatabaseClosed)?
    }

    fn apply(&mut self, changes: Vec<Change>) {
        self.shared.mutate(|items| {
            for change in changes {
                match change {
                    Change::Upsert(id, value) => {
                        items.insert(id, value);
                    }
                    Change::Remove(id) => {
                        items.remove(&id);
                    }
                }
            }
        });
        self.list = None;
    }

    fn guard<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce() -> CallbackResult<T>,
    ) -> CoreResult<T> {
        guarded(operation, f).inspect_err(|e| {
            self.shared.stats().record_callback_fault();
            tracing::warn!(collection = self.shared.name(), error = %e, "callback fault");
        })
    }
}
