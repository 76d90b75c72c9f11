//! The public collection handle.

use super::request::{reply_channel, Reply, Request};
use super::CollectionShared;
use crate::callback::{guarded, CallbackResult};
use crate::error::{CoreError, CoreResult};
use crate::transaction::Transaction;
use crate::types::ItemId;
use std::fmt;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use valuez_codec::Value;

/// Creates a handle and the inbox its actor will read.
pub(crate) fn channel(shared: Arc<CollectionShared>) -> (Collection, Receiver<Request>) {
    let (inbox, requests) = mpsc::channel();
    (Collection { shared, inbox }, requests)
}

/// A handle to one collection of a [`crate::Database`].
///
/// Handles are cheap to clone and can be sent between threads. Every call
/// blocks until the collection's actor has answered; mutations are served
/// one at a time in arrival order. [`Collection::get`] and views read the
/// committed state directly on the calling thread.
///
/// Functions passed to [`Collection::take`], [`Collection::update`] and
/// [`Collection::run_transaction`] run on the actor. They must not call back
/// into the same collection through its handle; doing so is rejected with
/// `InvalidOperation`.
///
/// # Example
///
/// ```rust
/// use valuez_core::{Database, Value};
///
/// let db = Database::open_in_memory("zoo").unwrap();
/// let animals = db.new_collection("animals").unwrap();
///
/// animals.put(Value::from("cat")).unwrap();
/// animals.put(Value::from("dog")).unwrap();
///
/// let cats = animals.get(|v| Ok(v.as_text() == Some("cat"))).unwrap();
/// assert_eq!(cats, vec![Value::from("cat")]);
///
/// let taken = animals.take(|v| Ok(v.as_text() == Some("dog"))).unwrap();
/// assert_eq!(taken, vec![Value::from("dog")]);
/// assert_eq!(animals.as_list().unwrap().len(), 1);
/// ```
#[derive(Clone)]
pub struct Collection {
    shared: Arc<CollectionShared>,
    inbox: Sender<Request>,
}

impl Collection {
    /// Returns the collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Returns true once the collection has been deleted or shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }

    /// Number of committed items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.len()
    }

    /// Returns true if the collection holds no committed items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a value and returns its new identifier.
    ///
    /// The value is visible only after it has been durably recorded.
    ///
    /// # Errors
    ///
    /// Returns `CommitFailed` if the store rejects the write; the collection
    /// is unchanged but the identifier is not reused.
    pub fn put(&self, value: impl Into<Value>) -> CoreResult<ItemId> {
        let value = value.into();
        self.call(|reply| Request::Put { value, reply })
    }

    /// Removes and returns every item matching `predicate`.
    ///
    /// If the store rejects the removal nothing is removed and the result is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns `Callback` if the predicate fails or panics for any item; no
    /// item is removed in that case.
    pub fn take<F>(&self, predicate: F) -> CoreResult<Vec<Value>>
    where
        F: FnMut(&Value) -> CallbackResult<bool> + Send + 'static,
    {
        self.call(|reply| Request::Take {
            predicate: Box::new(predicate),
            reply,
        })
    }

    /// Runs `f` over every item; `Some(new)` replaces the item.
    ///
    /// Returns true if at least one item changed and the change was stored.
    ///
    /// # Errors
    ///
    /// Returns `Callback` if `f` fails or panics; nothing changes.
    pub fn update<F>(&self, f: F) -> CoreResult<bool>
    where
        F: FnMut(&Value) -> CallbackResult<Option<Value>> + Send + 'static,
    {
        self.call(|reply| Request::Update {
            func: Box::new(f),
            reply,
        })
    }

    /// Returns every committed item matching `predicate`.
    ///
    /// Runs on the calling thread against the committed state at the time
    /// of the call, without going through the actor.
    ///
    /// # Errors
    ///
    /// Returns `CollectionClosed` on a closed collection, or `Callback` if
    /// the predicate fails.
    pub fn get<F>(&self, mut predicate: F) -> CoreResult<Vec<Value>>
    where
        F: FnMut(&Value) -> CallbackResult<bool>,
    {
        self.ensure_open()?;
        self.shared.stats().record_scan();
        let items = self.shared.snapshot();
        guarded("get", || {
            let mut found = Vec::new();
            for value in items.values() {
                if predicate(value)? {
                    found.push(value.clone());
                }
            }
            Ok(found)
        })
    }

    /// Opens a read-only view of the current committed state.
    ///
    /// Views opened between two mutations share the same snapshot.
    ///
    /// # Errors
    ///
    /// Returns `CollectionClosed` on a closed collection.
    pub fn view(&self) -> CoreResult<Transaction> {
        let snapshot = self.call(|reply| Request::View { reply })?;
        Ok(Transaction::read(Arc::clone(&self.shared), snapshot))
    }

    /// Opens a view and runs `f` against it on the calling thread.
    ///
    /// # Errors
    ///
    /// Returns `CollectionClosed` on a closed collection, or `Callback` if
    /// `f` fails.
    pub fn open_view<T, F>(&self, f: F) -> CoreResult<T>
    where
        F: FnOnce(&Transaction) -> CallbackResult<T>,
    {
        let view = self.view()?;
        guarded("view", || f(&view))
    }

    /// Runs `body` in a write transaction on the collection's actor.
    ///
    /// Changes staged by `body` are stored as one batch if it returns
    /// `true`. Returns whether the changes were committed: `false` if the
    /// body declined or the store rejected the batch.
    ///
    /// # Errors
    ///
    /// Returns `Callback` if the body fails or panics; nothing is stored.
    pub fn run_transaction<F>(&self, body: F) -> CoreResult<bool>
    where
        F: FnOnce(&mut Transaction) -> CallbackResult<bool> + Send + 'static,
    {
        self.call(|reply| Request::Transaction {
            body: Box::new(body),
            reply,
        })
    }

    /// Returns every committed item in identifier order.
    ///
    /// The list is cached by the actor until the next mutation.
    ///
    /// # Errors
    ///
    /// Returns `CollectionClosed` on a closed collection.
    pub fn as_list(&self) -> CoreResult<Arc<Vec<Value>>> {
        self.call(|reply| Request::AsList { reply })
    }

    /// Deletes the collection and its stored items.
    ///
    /// The collection is closed afterwards even if removing it from the
    /// store fails.
    ///
    /// # Errors
    ///
    /// Returns `CollectionClosed` if it was already closed, or the store
    /// error if removal failed.
    pub fn delete(&self) -> CoreResult<()> {
        self.call(|reply| Request::Delete { reply })
    }

    /// Asks the actor to suspend. Returns false if it is already gone.
    pub(crate) fn shutdown(&self) -> bool {
        self.inbox.send(Request::Shutdown).is_ok()
    }

    fn ensure_open(&self) -> CoreResult<()> {
        if self.shared.is_closed() {
            return Err(CoreError::collection_closed(self.name()));
        }
        Ok(())
    }

    fn call<T>(&self, request: impl FnOnce(Reply<T>) -> Request) -> CoreResult<T> {
        if self.shared.on_actor_thread() {
            return Err(CoreError::invalid_operation(format!(
                "collection {} called from inside its own callback",
                self.name()
            )));
        }
        let (reply, rx) = reply_channel();
        self.inbox
            .send(request(reply))
            .map_err(|_| CoreError::collection_closed(self.name()))?;
        rx.recv()
            .map_err(|_| CoreError::collection_closed(self.name()))?
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name())
            .field("closed", &self.is_closed())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}
