//! Inspect command implementation.

use super::{collection_names, format_size, open_store, parse_id};
use serde::Serialize;
use std::path::Path;
use valuez_storage::{BucketStore, FileStore};

/// Store inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Store path.
    pub path: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Number of frames in the log.
    pub frame_count: u64,
    /// Per-collection statistics.
    pub collections: Vec<CollectionStats>,
}

/// Statistics for a single collection.
#[derive(Debug, Serialize)]
pub struct CollectionStats {
    /// Collection name.
    pub name: String,
    /// Number of stored items.
    pub item_count: usize,
    /// Highest stored identifier, if any item is stored.
    pub max_id: Option<u64>,
    /// Total encoded size of the items in bytes.
    pub data_size: usize,
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = open_store(path)?;
    let result = inspect(&store)?;
    store.close()?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&result)?),
        _ => print_text_output(&result),
    }
    Ok(())
}

/// Collects statistics from an open store.
pub fn inspect(store: &FileStore) -> Result<InspectResult, Box<dyn std::error::Error>> {
    let mut collections = Vec::new();
    for name in collection_names(store)? {
        let entries = store.scan(&name)?;
        collections.push(CollectionStats {
            item_count: entries.len(),
            max_id: entries.iter().filter_map(|(key, _)| parse_id(key)).max(),
            data_size: entries.iter().map(|(_, value)| value.len()).sum(),
            name,
        });
    }

    Ok(InspectResult {
        path: store.path().display().to_string(),
        file_size: store.len_bytes(),
        frame_count: store.frame_count(),
        collections,
    })
}

fn print_text_output(result: &InspectResult) {
    println!("valuez Store Inspection");
    println!("=======================");
    println!();
    println!("Path: {}", result.path);
    println!();
    println!("Storage:");
    println!("  File size: {}", format_size(result.file_size));
    println!("  Frames:    {}", result.frame_count);
    println!();
    println!("Collections: {}", result.collections.len());
    for col in &result.collections {
        let max_id = col
            .max_id
            .map_or_else(|| "-".to_string(), |id| id.to_string());
        println!(
            "  {}: {} items, max id {}, {}",
            col.name,
            col.item_count,
            max_id,
            format_size(col.data_size as u64)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use valuez_core::{Config, Database};

    #[test]
    fn inspect_reports_collections() {
        let dir = tempdir().unwrap();
        let db = Database::open("app", Config::new().data_dir(dir.path())).unwrap();
        let people = db.new_collection("people").unwrap();
        people.put("ada").unwrap();
        people.put("grace").unwrap();
        db.new_collection("empty").unwrap();
        db.close().unwrap();

        let store = FileStore::open(&dir.path().join("app.db"), false).unwrap();
        let result = inspect(&store).unwrap();

        assert_eq!(result.collections.len(), 2);
        let empty = &result.collections[0];
        assert_eq!((empty.name.as_str(), empty.item_count), ("empty", 0));
        assert_eq!(empty.max_id, None);

        let people = &result.collections[1];
        assert_eq!(people.name, "people");
        assert_eq!(people.item_count, 2);
        assert_eq!(people.max_id, Some(102));
        assert!(result.file_size > 0);
    }

    #[test]
    fn sizes_are_readable() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }
}
