//! Dump command implementation.

use super::{collection_names, open_store, parse_id};
use serde_json::{json, Map, Value as Json};
use std::path::Path;
use valuez_codec::{CborCodec, Codec, Value};
use valuez_storage::BucketStore;

/// One decoded item.
#[derive(Debug, serde::Serialize)]
pub struct DumpedItem {
    /// Item identifier.
    pub id: u64,
    /// The decoded value.
    pub value: Json,
}

/// Runs the dump command.
pub fn run(
    path: &Path,
    collection: &str,
    format: &str,
    limit: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(path)?;
    let items = dump(&store, collection, limit)?;
    store.close()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&items)?),
        _ => {
            for item in &items {
                println!("{}\t{}", item.id, item.value);
            }
        }
    }
    Ok(())
}

/// Decodes the items of `collection` in identifier order.
pub fn dump(
    store: &dyn BucketStore,
    collection: &str,
    limit: Option<usize>,
) -> Result<Vec<DumpedItem>, Box<dyn std::error::Error>> {
    if !collection_names(store)?.iter().any(|name| name == collection) {
        return Err(format!("Collection not found: {collection}").into());
    }

    let codec = CborCodec::new();
    let mut items = Vec::new();
    for (key, bytes) in store.scan(collection)? {
        let id = parse_id(&key).ok_or_else(|| {
            format!(
                "Invalid item key in {collection}: {:?}",
                String::from_utf8_lossy(&key)
            )
        })?;
        let value = codec.decode(&bytes)?;
        items.push(DumpedItem {
            id,
            value: to_json(&value),
        });
    }

    // keys are ordered as text, identifiers as numbers
    items.sort_by_key(|item| item.id);
    items.truncate(limit.unwrap_or(usize::MAX));
    tracing::debug!(collection, items = items.len(), "dumped collection");
    Ok(items)
}

/// Renders a value as JSON. Byte strings become arrays of numbers and
/// non-text map keys are rendered as JSON text.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => json!(b),
        Value::Integer(n) => json!(n),
        Value::Bytes(bytes) => json!(bytes),
        Value::Text(text) => json!(text),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(pairs) => {
            let mut map = Map::new();
            for (key, value) in pairs {
                let key = match key {
                    Value::Text(text) => text.clone(),
                    other => to_json(other).to_string(),
                };
                map.insert(key, to_json(value));
            }
            Json::Object(map)
        }
    }
}
