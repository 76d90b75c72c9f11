//! Write transactions and read views.
//!
//! Both are the same [`Transaction`] type. A read view holds an immutable
//! snapshot of a collection and rejects every mutation. A write transaction
//! layers staged upserts and staged deletions over the committed map; the
//! overlay is invisible to everyone else and becomes one durable batch only
//! when the transaction body returns `true`.

use crate::callback::{guarded, CallbackResult};
use crate::collection::{CollectionShared, ItemMap};
use crate::database::Change;
use crate::error::{CoreError, CoreResult};
use crate::types::ItemId;
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::{btree_map, BTreeSet};
use std::fmt;
use std::iter::Peekable;
use std::sync::Arc;
use valuez_codec::Value;

/// A copy-on-write overlay over one collection.
///
/// Obtained through [`crate::Collection::run_transaction`] (writable) or
/// [`crate::Collection::view`] / [`crate::Collection::open_view`]
/// (read-only).
///
/// # Example
///
/// ```rust
/// use valuez_core::{Database, Value};
///
/// let db = Database::open_in_memory("shop").unwrap();
/// let orders = db.new_collection("orders").unwrap();
///
/// let committed = orders
///     .run_transaction(|txn| {
///         txn.put(Value::from("first"))?;
///         txn.put(Value::from("second"))?;
///         Ok(true)
///     })
///     .unwrap();
///
/// assert!(committed);
/// assert_eq!(orders.as_list().unwrap().len(), 2);
/// ```
pub struct Transaction {
    shared: Arc<CollectionShared>,
    read_only: bool,
    base: Arc<ItemMap>,
    staged: ItemMap,
    deleted: BTreeSet<ItemId>,
    list: OnceCell<Arc<Vec<Value>>>,
}

impl Transaction {
    /// Creates a write transaction over the given committed map.
    pub(crate) fn write(shared: Arc<CollectionShared>, base: Arc<ItemMap>) -> Self {
        Self::new(shared, base, false)
    }

    /// Creates a read view over a snapshot.
    pub(crate) fn read(shared: Arc<CollectionShared>, snapshot: Arc<ItemMap>) -> Self {
        Self::new(shared, snapshot, true)
    }

    fn new(shared: Arc<CollectionShared>, base: Arc<ItemMap>, read_only: bool) -> Self {
        Self {
            shared,
            read_only,
            base,
            staged: ItemMap::new(),
            deleted: BTreeSet::new(),
            list: OnceCell::new(),
        }
    }

    /// Returns true for read views.
    #[must_use]
    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Name of the collection this overlay belongs to.
    #[must_use]
    pub fn collection_name(&self) -> &str {
        self.shared.name()
    }

    /// Stages a new item and returns its identifier.
    ///
    /// The identifier is taken from the collection's counter immediately, so
    /// it is consumed even if the transaction does not commit.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnlyView` on a read view, or `InvalidOperation` once the
    /// collection has run out of identifiers.
    pub fn put(&mut self, value: impl Into<Value>) -> CoreResult<ItemId> {
        self.ensure_writable("put")?;
        let id = self.shared.next_id()?;
        self.staged.insert(id, value.into());
        self.deleted.remove(&id);
        self.invalidate();
        Ok(id)
    }

    /// Stages deletion of every visible item matching `predicate` and
    /// returns those items.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnlyView` on a read view, or `Callback` if the predicate
    /// fails; nothing is staged in either case.
    pub fn take<F>(&mut self, mut predicate: F) -> CoreResult<Vec<Value>>
    where
        F: FnMut(&Value) -> CallbackResult<bool>,
    {
        self.ensure_writable("take")?;
        let matched = guarded("take", || {
            let mut matched = Vec::new();
            for (id, value) in self.visible() {
                if predicate(value)? {
                    matched.push((id, value.clone()));
                }
            }
            Ok(matched)
        })?;

        let mut taken = Vec::with_capacity(matched.len());
        for (id, value) in matched {
            self.deleted.insert(id);
            taken.push(value);
        }
        if !taken.is_empty() {
            self.invalidate();
        }
        Ok(taken)
    }

    /// Applies `f` to every visible item and stages the full result as the
    /// new set of upserts, replacing whatever was staged before.
    ///
    /// Returns whether any item changed. Nothing is staged if none did.
    ///
    /// # Errors
    ///
    /// Returns `ReadOnlyView` on a read view, or `Callback` if `f` fails.
    pub fn update<F>(&mut self, mut f: F) -> CoreResult<bool>
    where
        F: FnMut(&Value) -> CallbackResult<Option<Value>>,
    {
        self.ensure_writable("update")?;
        let (replacement, changed) = guarded("update", || {
            let mut replacement = ItemMap::new();
            let mut changed = false;
            for (id, value) in self.visible() {
                let next = match f(value)? {
                    Some(next) => {
                        changed = true;
                        next
                    }
                    None => value.clone(),
                };
                replacement.insert(id, next);
            }
            Ok((replacement, changed))
        })?;

        if changed {
            self.staged = replacement;
            self.invalidate();
        }
        Ok(changed)
    }

    /// Returns every visible item matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns `Callback` if the predicate fails.
    pub fn get<F>(&self, mut predicate: F) -> CoreResult<Vec<Value>>
    where
        F: FnMut(&Value) -> CallbackResult<bool>,
    {
        self.shared.stats().record_scan();
        guarded("get", || {
            let mut found = Vec::new();
            for (_, value) in self.visible() {
                if predicate(value)? {
                    found.push(value.clone());
                }
            }
            Ok(found)
        })
    }

    /// Returns every visible item, in identifier order.
    ///
    /// The list is cached until the next mutation of this overlay.
    pub fn as_list(&self) -> Arc<Vec<Value>> {
        Arc::clone(self.list.get_or_init(|| {
            Arc::new(self.visible().map(|(_, value)| value.clone()).collect())
        }))
    }

    /// Number of visible items.
    #[must_use]
    pub fn len(&self) -> usize {
        if self.read_only {
            self.base.len()
        } else {
            self.visible().count()
        }
    }

    /// Returns true if no items are visible.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collections cannot be deleted through a transaction handle.
    ///
    /// # Errors
    ///
    /// Always returns `NotAllowedInTransaction`.
    pub fn delete_collection(&self) -> CoreResult<()> {
        Err(CoreError::NotAllowedInTransaction {
            operation: "delete-collection",
        })
    }

    /// Flattens the overlay into durable changes: upserts, then deletions.
    pub(crate) fn into_changes(self) -> Vec<Change> {
        let mut changes: Vec<Change> = self
            .staged
            .into_iter()
            .map(|(id, value)| Change::Upsert(id, value))
            .collect();
        changes.extend(self.deleted.into_iter().map(Change::Remove));
        changes
    }

    /// Committed items overridden by staged upserts, minus staged deletions,
    /// in identifier order.
    fn visible(&self) -> Visible<'_> {
        Visible {
            base: self.base.iter().peekable(),
            staged: self.staged.iter().peekable(),
            deleted: &self.deleted,
        }
    }

    fn ensure_writable(&self, operation: &'static str) -> CoreResult<()> {
        if self.read_only {
            return Err(CoreError::ReadOnlyView { operation });
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.list.take();
    }
}

/// Ordered merge of the committed map and the staged upserts.
struct Visible<'a> {
    base: Peekable<btree_map::Iter<'a, ItemId, Value>>,
    staged: Peekable<btree_map::Iter<'a, ItemId, Value>>,
    deleted: &'a BTreeSet<ItemId>,
}

impl<'a> Iterator for Visible<'a> {
    type Item = (ItemId, &'a Value);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let order = match (self.base.peek(), self.staged.peek()) {
                (None, None) => return None,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some((base_id, _)), Some((staged_id, _))) => base_id.cmp(staged_id),
            };
            let next = match order {
                Ordering::Less => self.base.next(),
                Ordering::Equal => {
                    // staged value shadows the committed one
                    self.base.next();
                    self.staged.next()
                }
                Ordering::Greater => self.staged.next(),
            };
            let (id, value) = next?;
            if !self.deleted.contains(id) {
                return Some((*id, value));
            }
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("collection", &self.shared.name())
            .field("read_only", &self.read_only)
            .field("staged", &self.staged.len())
            .field("deleted", &self.deleted.len())
            .finish_non_exhaustive()
    }
}
