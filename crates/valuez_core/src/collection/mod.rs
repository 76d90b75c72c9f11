//! Collections: one actor per collection plus a lock-guarded read path.
//!
//! Every mutation of a collection is a [`request::Request`] processed on the
//! collection's own thread, in arrival order. The committed map lives behind
//! a reader/writer lock so that [`Collection::get`] and views can read it
//! from the caller's thread; the actor takes the write side only for the
//! short section that applies an already durable change.

mod actor;
mod handle;
mod request;

pub use handle::Collection;

pub(crate) use actor::CollectionActor;
pub(crate) use handle::channel;

use crate::error::{CoreError, CoreResult};
use crate::stats::DatabaseStats;
use crate::types::ItemId;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, ThreadId};
use valuez_codec::Value;

/// Committed contents of a collection.
pub(crate) type ItemMap = BTreeMap<ItemId, Value>;

/// Identifier counter value of a collection that has never held an item.
pub const FRESH_COUNTER: u64 = 100;

/// State shared between a collection's actor and its handles.
#[derive(Debug)]
pub(crate) struct CollectionShared {
    name: String,
    items: RwLock<Arc<ItemMap>>,
    last_id: AtomicU64,
    closed: AtomicBool,
    actor_thread: OnceLock<ThreadId>,
    stats: Arc<DatabaseStats>,
}

impl CollectionShared {
    /// Creates state for a collection with the given committed items.
    ///
    /// `last_id` is the counter value; the next item gets `last_id + 1`.
    pub(crate) fn new(
        name: impl Into<String>,
        items: ItemMap,
        last_id: u64,
        stats: Arc<DatabaseStats>,
    ) -> Self {
        Self {
            name: name.into(),
            items: RwLock::new(Arc::new(items)),
            last_id: AtomicU64::new(last_id),
            closed: AtomicBool::new(false),
            actor_thread: OnceLock::new(),
            stats,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn stats(&self) -> &DatabaseStats {
        &self.stats
    }

    /// Hands out the next identifier. Never returns the same value twice.
    ///
    /// Fails once the counter has reached `u64::MAX`; the counter is left
    /// there, so every later call fails too.
    pub(crate) fn next_id(&self) -> CoreResult<ItemId> {
        self.last_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| last.checked_add(1))
            .map(|last| ItemId::new(last + 1))
            .map_err(|_| {
                CoreError::invalid_operation(format!(
                    "collection {}: identifiers exhausted",
                    self.name
                ))
            })
    }

    pub(crate) fn last_id(&self) -> u64 {
        self.last_id.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closed(&self) {
        self.closed.store(true, Ordering::Release);
    }

    /// The committed map as of now. Later mutations do not affect it.
    pub(crate) fn snapshot(&self) -> Arc<ItemMap> {
        Arc::clone(&self.items.read())
    }

    /// Mutates the committed map under the write lock.
    ///
    /// Outstanding snapshots keep the old contents; the map is copied first
    /// if any exist.
    pub(crate) fn mutate<R>(&self, f: impl FnOnce(&mut ItemMap) -> R) -> R {
        let mut items = self.items.write();
        f(Arc::make_mut(&mut items))
    }

    /// Swaps in a whole new committed map.
    pub(crate) fn replace(&self, items: ItemMap) {
        *self.items.write() = Arc::new(items);
    }

    pub(crate) fn len(&self) -> usize {
        self.items.read().len()
    }

    pub(crate) fn bind_actor_thread(&self) {
        let _ = self.actor_thread.set(thread::current().id());
    }

    /// Returns true when called from inside one of this collection's own
    /// callbacks.
    pub(crate) fn on_actor_thread(&self) -> bool {
        self.actor_thread.get() == Some(&thread::current().id())
    }
}
