//! CLI command implementations.

pub mod compact;
pub mod dump;
pub mod inspect;
pub mod verify;

use std::path::Path;
use valuez_core::MEMBERSHIP_BUCKET;
use valuez_storage::{BucketStore, FileStore};

/// Opens an existing store file without syncing.
///
/// Fails if the file is missing or a database currently holds it.
pub(crate) fn open_store(path: &Path) -> Result<FileStore, Box<dyn std::error::Error>> {
    if !path.exists() {
        return Err(format!("No store found at {}", path.display()).into());
    }
    Ok(FileStore::open(path, false)?)
}

/// Names of the collections recorded in the membership bucket, sorted.
pub(crate) fn collection_names(
    store: &dyn BucketStore,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    if !store.contains_bucket(MEMBERSHIP_BUCKET)? {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for (key, _) in store.scan(MEMBERSHIP_BUCKET)? {
        names.push(String::from_utf8(key)?);
    }
    Ok(names)
}

/// Parses a stored item key.
pub(crate) fn parse_id(key: &[u8]) -> Option<u64> {
    std::str::from_utf8(key).ok()?.parse().ok()
}

pub(crate) fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} bytes")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
