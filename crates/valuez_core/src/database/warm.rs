//! Warm start: rebuilding collections from the durable store.

use crate::collection::{ItemMap, FRESH_COUNTER};
use crate::error::{CoreError, CoreResult};
use crate::types::ItemId;
use valuez_codec::Codec;
use valuez_storage::BucketStore;

/// Bucket holding one empty entry per live collection name.
pub const MEMBERSHIP_BUCKET: &str = "__cols";

/// Prefix reserved for internal buckets.
pub const RESERVED_PREFIX: &str = "__";

/// A collection as found in the store.
#[derive(Debug)]
pub(crate) struct StoredCollection {
    pub name: String,
    pub items: ItemMap,
    /// Counter value; the next item gets `last_id + 1`.
    pub last_id: u64,
}

/// Rejects names that cannot be used for a collection.
pub(crate) fn validate_collection_name(name: &str) -> CoreResult<()> {
    if name.is_empty() {
        return Err(CoreError::invalid_collection_name(name, "name is empty"));
    }
    if name.starts_with(RESERVED_PREFIX) {
        return Err(CoreError::invalid_collection_name(
            name,
            "names starting with \"__\" are reserved",
        ));
    }
    Ok(())
}

/// Reads every collection listed in the membership bucket.
pub(crate) fn load_collections(
    store: &dyn BucketStore,
    codec: &dyn Codec,
) -> CoreResult<Vec<StoredCollection>> {
    if !store.contains_bucket(MEMBERSHIP_BUCKET)? {
        return Ok(Vec::new());
    }

    let mut collections = Vec::new();
    for (key, _) in store.scan(MEMBERSHIP_BUCKET)? {
        let name = String::from_utf8(key)
            .map_err(|_| CoreError::corrupted("collection name is not UTF-8"))?;
        if !store.contains_bucket(&name)? {
            return Err(CoreError::corrupted(format!(
                "collection {name} is listed but has no bucket"
            )));
        }
        collections.push(load_collection(store, codec, name)?);
    }
    Ok(collections)
}

fn load_collection(
    store: &dyn BucketStore,
    codec: &dyn Codec,
    name: String,
) -> CoreResult<StoredCollection> {
    let mut items = ItemMap::new();
    let mut max_id: Option<u64> = None;

    for (key, bytes) in store.scan(&name)? {
        let id = std::str::from_utf8(&key)
            .ok()
            .and_then(|s| s.parse::<ItemId>().ok())
            .ok_or_else(|| {
                CoreError::corrupted(format!(
                    "collection {name}: key {:?} is not a decimal identifier",
                    String::from_utf8_lossy(&key)
                ))
            })?;
        let value = codec.decode(&bytes)?;
        max_id = max_id.max(Some(id.as_u64()));
        items.insert(id, value);
    }

    let last_id = match max_id {
        None => FRESH_COUNTER,
        Some(max) => max.checked_add(1).ok_or_else(|| {
            CoreError::corrupted(format!(
                "collection {name}: identifier {max} leaves no room for the counter"
            ))
        })?,
    };
    tracing::debug!(
        collection = %name,
        items = items.len(),
        last_id,
        "loaded collection"
    );

    Ok(StoredCollection {
        name,
        items,
        last_id,
    })
}
