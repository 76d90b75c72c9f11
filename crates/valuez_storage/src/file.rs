//! File-backed bucket store.

use crate::batch::Batch;
use crate::buckets::BucketMap;
use crate::error::{StorageError, StorageResult};
use crate::frame::{encode_frame, scan_log};
use crate::store::BucketStore;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A bucket store persisted as an append-only log of batch frames.
///
/// Every applied batch becomes one frame at the end of the file, so a batch
/// is durable exactly when its frame is. The whole contents are replayed
/// into memory on open.
///
/// # Recovery
///
/// A frame cut short by a crash during append is dropped and the file is
/// truncated to the last complete frame. Damage followed by further valid
/// frames cannot come from a torn write and is reported as
/// [`StorageError::Corrupted`].
///
/// # Locking
///
/// The file is held under an exclusive advisory lock until the store is
/// closed or dropped.
///
/// # Example
///
/// ```no_run
/// use valuez_storage::{BucketStore, FileStore};
/// use std::path::Path;
///
/// let mut store = FileStore::open(Path::new("app.db"), true).unwrap();
/// store.create_bucket("people").unwrap();
/// store.close().unwrap();
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    file: Option<File>,
    len: u64,
    frames: u64,
    buckets: BucketMap,
    sync_on_commit: bool,
}

/// Outcome of [`FileStore::compact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompactReport {
    /// File size before compaction.
    pub bytes_before: u64,
    /// File size after compaction.
    pub bytes_after: u64,
    /// Frames before compaction.
    pub frames_before: u64,
}

/// Outcome of [`FileStore::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Total file size.
    pub file_len: u64,
    /// Number of valid frames.
    pub frames: u64,
    /// Number of operations across valid frames.
    pub ops: u64,
    /// Length of the valid prefix.
    pub valid_len: u64,
    /// Bytes after the valid prefix.
    pub trailing_bytes: u64,
    /// First problem found, if any.
    pub error: Option<String>,
    /// True if valid frames follow the first problem.
    pub data_after_error: bool,
}

impl VerifyReport {
    /// Returns true if the file has no damage at all.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if opening the file would succeed, possibly after
    /// truncating a torn tail.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        !self.data_after_error
    }
}

impl FileStore {
    /// Opens or creates the log at `path` and replays it.
    ///
    /// With `sync_on_commit` set every applied batch is followed by
    /// `sync_data`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Another handle holds the lock (returns `Locked`)
    /// - The log is corrupted beyond a torn tail
    /// - I/O errors occur
    pub fn open(path: &Path, sync_on_commit: bool) -> StorageResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: path.to_path_buf(),
            });
        }

        let mut bytes = Vec::new();
        file.read_to_end(&mut bytes)?;

        let scan = scan_log(&bytes);
        if let Some(reason) = &scan.error {
            if scan.data_after_error {
                return Err(StorageError::corrupted(format!(
                    "{}: {reason}",
                    path.display()
                )));
            }
            tracing::warn!(
                path = %path.display(),
                valid_len = scan.valid_len,
                dropped = bytes.len() as u64 - scan.valid_len,
                "truncating torn log tail: {reason}"
            );
            file.set_len(scan.valid_len)?;
            file.sync_all()?;
        }

        let mut buckets = BucketMap::new();
        for (index, batch) in scan.batches.iter().enumerate() {
            buckets.apply(batch).map_err(|e| {
                StorageError::corrupted(format!("frame {index} does not replay: {e}"))
            })?;
        }

        tracing::debug!(
            path = %path.display(),
            frames = scan.batches.len(),
            entries = buckets.entry_count(),
            "replayed log"
        );

        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
            len: scan.valid_len,
            frames: scan.batches.len() as u64,
            buckets,
            sync_on_commit,
        })
    }

    /// Returns the path to the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the size of the log in bytes.
    #[must_use]
    pub fn len_bytes(&self) -> u64 {
        self.len
    }

    /// Returns the number of frames in the log.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// Rewrites the log as a single frame holding the live contents.
    ///
    /// The new log is written to a temporary file, synced and renamed over
    /// the old one.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or any I/O step fails. The
    /// existing log is left in place on failure.
    pub fn compact(&mut self) -> StorageResult<CompactReport> {
        if self.file.is_none() {
            return Err(StorageError::Closed);
        }
        let bytes_before = self.len;
        let frames_before = self.frames;

        let snapshot = self.buckets.to_batch();
        let data = if snapshot.is_empty() {
            Vec::new()
        } else {
            encode_frame(&snapshot)?
        };

        let temp_path = temp_path(&self.path);
        let mut temp = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;
        if temp.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked { path: temp_path });
        }
        temp.write_all(&data)?;
        temp.sync_all()?;

        fs::rename(&temp_path, &self.path)?;
        sync_parent(&self.path)?;

        self.file = Some(temp);
        self.len = data.len() as u64;
        self.frames = u64::from(!data.is_empty());

        tracing::info!(
            path = %self.path.display(),
            bytes_before,
            bytes_after = self.len,
            "compacted log"
        );

        Ok(CompactReport {
            bytes_before,
            bytes_after: self.len,
            frames_before,
        })
    }

    /// Checks the frame structure of a log without opening it for writing.
    ///
    /// # Errors
    ///
    /// Returns an error only if the file cannot be read.
    pub fn verify(path: &Path) -> StorageResult<VerifyReport> {
        let bytes = fs::read(path)?;
        let scan = scan_log(&bytes);
        let file_len = bytes.len() as u64;
        Ok(VerifyReport {
            file_len,
            frames: scan.batches.len() as u64,
            ops: scan.batches.iter().map(|b| b.len() as u64).sum(),
            valid_len: scan.valid_len,
            trailing_bytes: file_len - scan.valid_len,
            error: scan.error,
            data_after_error: scan.data_after_error,
        })
    }

    fn file_mut(&mut self) -> StorageResult<&mut File> {
        self.file.as_mut().ok_or(StorageError::Closed)
    }

    fn ensure_open(&self) -> StorageResult<()> {
        if self.file.is_none() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    fn append_frame(&mut self, frame: &[u8]) -> StorageResult<()> {
        let offset = self.len;
        let sync = self.sync_on_commit;
        let file = self.file_mut()?;

        let written = (|| -> std::io::Result<()> {
            file.seek(SeekFrom::Start(offset))?;
            file.write_all(frame)?;
            if sync {
                file.sync_data()?;
            }
            Ok(())
        })();

        if let Err(e) = written {
            // Drop whatever part of the frame reached the file.
            if let Err(rollback) = file.set_len(offset) {
                tracing::warn!(error = %rollback, "failed to roll back partial frame");
            }
            return Err(e.into());
        }

        self.len += frame.len() as u64;
        self.frames += 1;
        Ok(())
    }
}

impl BucketStore for FileStore {
    fn bucket_names(&self) -> StorageResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.buckets.names())
    }

    fn contains_bucket(&self, name: &str) -> StorageResult<bool> {
        self.ensure_open()?;
        Ok(self.buckets.contains(name))
    }

    fn scan(&self, bucket: &str) -> StorageResult<Vec<(Vec<u8>, Vec<u8>)>> {
        self.ensure_open()?;
        self.buckets.scan(bucket)
    }

    fn apply(&mut self, batch: &Batch) -> StorageResult<()> {
        self.ensure_open()?;
        self.buckets.validate(batch)?;
        if batch.is_empty() {
            return Ok(());
        }
        let frame = encode_frame(batch)?;
        self.append_frame(&frame)?;
        self.buckets.apply_validated(batch);
        Ok(())
    }

    fn close(&mut self) -> StorageResult<()> {
        let file = self.file.take().ok_or(StorageError::Closed)?;
        file.sync_all()?;
        tracing::debug!(path = %self.path.display(), "closed log");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".compact");
    PathBuf::from(name)
}

#[cfg(unix)]
fn sync_parent(path: &Path) -> StorageResult<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    File::open(parent)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) -> StorageResult<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::HEADER_SIZE;
    use tempfile::tempdir;

    fn put(store: &mut FileStore, bucket: &str, key: &[u8], value: &[u8]) {
        let mut batch = Batch::new();
        batch.put(bucket, key.to_vec(), value.to_vec());
        store.apply(&batch).unwrap();
    }

    #[test]
    fn file_create_new() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let store = FileStore::open(&path, true).unwrap();
        assert_eq!(store.len_bytes(), 0);
        assert!(path.exists());
        assert_eq!(store.path(), path);
    }

    #[test]
    fn file_persistence() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        {
            let mut store = FileStore::open(&path, true).unwrap();
            store.create_bucket("a").unwrap();
            put(&mut store, "a", b"101", b"one");
            put(&mut store, "a", b"102", b"two");
            store.close().unwrap();
        }

        let store = FileStore::open(&path, true).unwrap();
        assert_eq!(store.bucket_names().unwrap(), vec!["a".to_string()]);
        assert_eq!(store.scan("a").unwrap().len(), 2);
        assert_eq!(store.frame_count(), 3);
    }

    #[test]
    fn file_invalid_batch_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut store = FileStore::open(&path, true).unwrap();
        store.create_bucket("a").unwrap();
        let before = store.len_bytes();

        let mut batch = Batch::new();
        batch.put("a", b"1".to_vec(), b"x".to_vec()).drop_bucket("b");
        assert!(matches!(
            store.apply(&batch),
            Err(StorageError::BucketNotFound { .. })
        ));
        assert_eq!(store.len_bytes(), before);
        assert!(store.scan("a").unwrap().is_empty());
    }

    #[test]
    fn lock_prevents_second_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let _first = FileStore::open(&path, true).unwrap();
        assert!(matches!(
            FileStore::open(&path, true),
            Err(StorageError::Locked { .. })
        ));
    }

    #[test]
    fn lock_released_on_close() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut first = FileStore::open(&path, true).unwrap();
        first.close().unwrap();
        let _second = FileStore::open(&path, true).unwrap();
    }

    #[test]
    fn closed_store_rejects_operations() {
        let dir = tempdir().unwrap();
        let mut store = FileStore::open(&dir.path().join("test.db"), false).unwrap();
        store.close().unwrap();

        assert!(matches!(store.bucket_names(), Err(StorageError::Closed)));
        assert!(matches!(store.create_bucket("a"), Err(StorageError::Closed)));
        assert!(matches!(store.compact(), Err(StorageError::Closed)));
        assert!(matches!(store.close(), Err(StorageError::Closed)));
    }

    #[test]
    fn torn_tail_is_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let good_len = {
            let mut store = FileStore::open(&path, true).unwrap();
            store.create_bucket("a").unwrap();
            put(&mut store, "a", b"1", b"x");
            let len = store.len_bytes();
            store.close().unwrap();
            len
        };

        // half a header left behind by a crash
        let mut raw = OpenOptions::new().append(true).open(&path).unwrap();
        raw.write_all(b"VZLG\x01\x00\x20").unwrap();
        drop(raw);

        let store = FileStore::open(&path, true).unwrap();
        assert_eq!(store.len_bytes(), good_len);
        assert_eq!(fs::metadata(&path).unwrap().len(), good_len);
        assert_eq!(store.scan("a").unwrap().len(), 1);
    }

    #[test]
    fn mid_file_corruption_is_reported() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let first_frame_len = {
            let mut store = FileStore::open(&path, true).unwrap();
            store.create_bucket("a").unwrap();
            let len = store.len_bytes();
            put(&mut store, "a", b"1", b"x");
            put(&mut store, "a", b"2", b"y");
            store.close().unwrap();
            len
        };

        let mut bytes = fs::read(&path).unwrap();
        bytes[first_frame_len as usize + HEADER_SIZE + 1] ^= 0xff;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            FileStore::open(&path, true),
            Err(StorageError::Corrupted(_))
        ));

        let report = FileStore::verify(&path).unwrap();
        assert!(!report.is_clean());
        assert!(!report.is_recoverable());
        assert_eq!(report.frames, 1);
    }

    #[test]
    fn damaged_length_mid_log_keeps_file_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let first_frame_len = {
            let mut store = FileStore::open(&path, true).unwrap();
            store.create_bucket("a").unwrap();
            let len = store.len_bytes();
            put(&mut store, "a", b"1", b"x");
            put(&mut store, "a", b"2", b"y");
            put(&mut store, "a", b"3", b"z");
            store.close().unwrap();
            len
        };

        let mut bytes = fs::read(&path).unwrap();
        let original_len = bytes.len() as u64;
        // high byte of the second frame's payload length
        bytes[first_frame_len as usize + HEADER_SIZE - 1] = 0x7f;
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(
            FileStore::open(&path, true),
            Err(StorageError::Corrupted(_))
        ));
        assert_eq!(fs::metadata(&path).unwrap().len(), original_len);

        let report = FileStore::verify(&path).unwrap();
        assert!(!report.is_recoverable());
    }

    #[test]
    fn compact_keeps_live_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut store = FileStore::open(&path, true).unwrap();
        store.create_bucket("a").unwrap();
        store.create_bucket("gone").unwrap();
        for i in 0..20u32 {
            put(&mut store, "a", &i.to_le_bytes(), b"value");
        }
        let mut batch = Batch::new();
        for i in 0..15u32 {
            batch.delete("a", i.to_le_bytes().to_vec());
        }
        batch.drop_bucket("gone");
        store.apply(&batch).unwrap();

        let report = store.compact().unwrap();
        assert!(report.bytes_after < report.bytes_before);
        assert_eq!(store.frame_count(), 1);

        // still writable after the swap
        put(&mut store, "a", b"new", b"v");
        store.close().unwrap();

        let store = FileStore::open(&path, true).unwrap();
        assert_eq!(store.bucket_names().unwrap(), vec!["a".to_string()]);
        assert_eq!(store.scan("a").unwrap().len(), 6);
        assert!(!temp_path(&path).exists());
    }

    #[test]
    fn verify_clean_log() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("test.db");

        let mut store = FileStore::open(&path, true).unwrap();
        store.create_bucket("a").unwrap();
        put(&mut store, "a", b"1", b"x");
        store.close().unwrap();

        let report = FileStore::verify(&path).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.frames, 2);
        assert_eq!(report.ops, 2);
        assert_eq!(report.trailing_bytes, 0);
        assert_eq!(report.valid_len, report.file_len);
    }
}
