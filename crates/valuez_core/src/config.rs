//! Database configuration.

use std::path::{Path, PathBuf};

/// Configuration for opening a database.
#[derive(Debug, Clone)]
pub struct Config {
    /// Keep everything in memory and never touch the durable store.
    pub in_memory: bool,

    /// Directory holding the `<name>.db` file.
    pub data_dir: PathBuf,

    /// Whether to create `data_dir` if it doesn't exist.
    pub create_dir: bool,

    /// Whether to sync the log after every durable batch (safer but slower).
    pub sync_on_commit: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            in_memory: false,
            data_dir: PathBuf::from("."),
            create_dir: true,
            sync_on_commit: true,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for an in-memory database.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default().with_in_memory(true)
    }

    /// Sets in-memory mode.
    #[must_use]
    pub const fn with_in_memory(mut self, value: bool) -> Self {
        self.in_memory = value;
        self
    }

    /// Sets the data directory.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Sets whether to create the data directory if missing.
    #[must_use]
    pub const fn create_dir(mut self, value: bool) -> Self {
        self.create_dir = value;
        self
    }

    /// Sets whether to sync after every durable batch.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Returns the path of the store file for a database name.
    #[must_use]
    pub fn store_path(&self, name: &str) -> PathBuf {
        db_file_path(&self.data_dir, name)
    }
}

/// Joins a directory and database name into the store file path.
#[must_use]
pub fn db_file_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.db"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(!config.in_memory);
        assert!(config.create_dir);
        assert!(config.sync_on_commit);
        assert_eq!(config.data_dir, PathBuf::from("."));
    }

    #[test]
    fn builder() {
        let config = Config::new()
            .data_dir("/tmp/vz")
            .create_dir(false)
            .sync_on_commit(false);

        assert_eq!(config.data_dir, PathBuf::from("/tmp/vz"));
        assert!(!config.create_dir);
        assert!(!config.sync_on_commit);
        assert!(Config::in_memory().in_memory);
    }

    #[test]
    fn store_path_appends_extension() {
        let config = Config::new().data_dir("data");
        assert_eq!(config.store_path("shop"), PathBuf::from("data").join("shop.db"));
    }
}
