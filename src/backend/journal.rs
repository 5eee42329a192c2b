//! Durable backend: an in-memory table rebuilt from an append-only journal.
//!
//! Journal layout: a 5-byte header (magic + version) followed by frames of
//! `len: u32 LE | rmp-serde entry | crc32: u32 LE`. Each frame records the
//! *effect* of a write (the full post-write item, or a deletion), so replay
//! never re-checks whether an updated item existed.

use super::table::Table;
use super::{Assignment, CompositeKey, Item, KvBackend};
use crate::error::{StoreError, StoreResult};
use fs2::FileExt;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Magic bytes for journal files.
const JOURNAL_MAGIC: &[u8; 4] = b"TRJ\0";

/// Current journal format version.
const JOURNAL_VERSION: u8 = 1;

const HEADER_LEN: u64 = 5;

/// Upper bound on a single encoded entry.
const MAX_ENTRY_LEN: u64 = 16 * 1024 * 1024;

const JOURNAL_FILE: &str = "trackers.journal";
const COMPACT_FILE: &str = "trackers.journal.compact";
const LOCK_FILE: &str = "LOCK";

/// Journal configuration.
#[derive(Clone, Debug)]
pub struct JournalConfig {
    /// Directory holding the journal and its lock file.
    pub path: PathBuf,

    /// Whether to create the journal if it doesn't exist.
    pub create_if_missing: bool,

    /// fsync after every write.
    pub sync_writes: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./trackers"),
            create_if_missing: true,
            sync_writes: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
enum JournalOp {
    /// Item after the write, JSON-encoded.
    Put {
        partition: String,
        sort: String,
        item: Vec<u8>,
    },
    Delete {
        partition: String,
        sort: String,
    },
}

impl JournalOp {
    fn put(key: &CompositeKey, item: &Item) -> StoreResult<Self> {
        Ok(JournalOp::Put {
            partition: key.partition.clone(),
            sort: key.sort.clone(),
            item: serde_json::to_vec(item)?,
        })
    }

    fn delete(key: &CompositeKey) -> Self {
        JournalOp::Delete {
            partition: key.partition.clone(),
            sort: key.sort.clone(),
        }
    }

    fn apply(self, table: &mut Table) -> StoreResult<()> {
        match self {
            JournalOp::Put { partition, sort, item } => {
                let item: Item = serde_json::from_slice(&item)
                    .map_err(|e| StoreError::Deserialization(e.to_string()))?;
                table.put(&CompositeKey { partition, sort }, item);
            }
            JournalOp::Delete { partition, sort } => {
                table.remove(&CompositeKey { partition, sort });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JournalEntry {
    seq: u64,
    /// Microseconds since Unix epoch.
    timestamp: i64,
    op: JournalOp,
}

enum Frame {
    Entry(JournalEntry, u64),
    End,
    /// Incomplete or unreadable final frame.
    Torn,
}

/// Append handle to the journal file.
trait JournalFile: Write + Send {
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl JournalFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_all()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

struct JournalWriter {
    file: Box<dyn JournalFile>,
    /// Bytes of valid journal on disk.
    len: u64,
    next_seq: u64,
    /// Set when a failed frame could not be cut off again. Only `compact`
    /// clears it.
    poisoned: bool,
}

impl JournalWriter {
    fn new(file: File, len: u64, next_seq: u64) -> Self {
        Self {
            file: Box::new(file),
            len,
            next_seq,
            poisoned: false,
        }
    }
}

/// Backend persisted to a journal file under an exclusive lock.
pub struct JournalBackend {
    config: JournalConfig,

    /// Lock file for exclusive access.
    _lock_file: File,

    table: RwLock<Table>,

    /// Serializes writers; held across journal append and table apply.
    writer: Mutex<JournalWriter>,
}

impl JournalBackend {
    /// Open an existing journal or create a new one.
    pub fn open_or_create(config: JournalConfig) -> StoreResult<Self> {
        if config.path.join(JOURNAL_FILE).exists() {
            Self::open(config)
        } else if config.create_if_missing {
            Self::create(config)
        } else {
            Err(StoreError::NotInitialized)
        }
    }

    /// Create a new, empty journal.
    pub fn create(config: JournalConfig) -> StoreResult<Self> {
        fs::create_dir_all(&config.path)?;
        let lock_file = Self::acquire_lock(&config.path)?;

        let journal_path = config.path.join(JOURNAL_FILE);
        Self::write_header(&journal_path)?;

        let writer = JournalWriter::new(OpenOptions::new().append(true).open(&journal_path)?, HEADER_LEN, 1);

        info!(path = %config.path.display(), "created tracker journal");

        Ok(Self {
            config,
            _lock_file: lock_file,
            table: RwLock::new(Table::new()),
            writer: Mutex::new(writer),
        })
    }

    /// Open an existing journal, replaying it into memory.
    pub fn open(config: JournalConfig) -> StoreResult<Self> {
        let journal_path = config.path.join(JOURNAL_FILE);
        if !journal_path.exists() {
            return Err(StoreError::NotInitialized);
        }
        let lock_file = Self::acquire_lock(&config.path)?;

        let (table, next_seq, valid_len) = Self::replay(&journal_path)?;

        let file = OpenOptions::new().append(true).open(&journal_path)?;
        if file.metadata()?.len() > valid_len {
            warn!(valid_len, "truncating torn journal tail");
            file.set_len(valid_len)?;
        }

        info!(
            path = %config.path.display(),
            items = table.len(),
            entries = next_seq - 1,
            "replayed tracker journal"
        );

        Ok(Self {
            config,
            _lock_file: lock_file,
            table: RwLock::new(table),
            writer: Mutex::new(JournalWriter::new(file, valid_len, next_seq)),
        })
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Rewrite the journal so it holds one entry per live item.
    ///
    /// Returns the number of entries written. The rewrite comes from the
    /// in-memory table, so it also recovers a poisoned writer.
    pub fn compact(&self) -> StoreResult<usize> {
        let mut writer = self.writer.lock();
        let table = self.table.read();

        let compact_path = self.config.path.join(COMPACT_FILE);
        Self::write_header(&compact_path)?;

        let mut file = OpenOptions::new().append(true).open(&compact_path)?;
        let mut len = HEADER_LEN;
        let mut seq = 1;
        for (key, item) in table.entries() {
            let frame = Self::encode_frame(&JournalEntry {
                seq,
                timestamp: chrono::Utc::now().timestamp_micros(),
                op: JournalOp::put(&key, item)?,
            })?;
            file.write_all(&frame)?;
            len += frame.len() as u64;
            seq += 1;
        }
        file.sync_all()?;
        drop(file);

        let journal_path = self.config.path.join(JOURNAL_FILE);
        fs::rename(&compact_path, &journal_path)?;

        *writer = JournalWriter::new(OpenOptions::new().append(true).open(&journal_path)?, len, seq);

        debug!(entries = seq - 1, "compacted tracker journal");
        Ok((seq - 1) as usize)
    }

    /// Force pending writes to disk.
    pub fn sync(&self) -> StoreResult<()> {
        self.writer.lock().file.sync()?;
        Ok(())
    }

    /// Append one frame. On failure the frame is cut off again, so a write
    /// reported as failed never replays.
    fn append(&self, writer: &mut JournalWriter, op: JournalOp) -> StoreResult<()> {
        if writer.poisoned {
            return Err(StoreError::Unavailable(
                "journal holds an unremovable failed write; compact to recover".into(),
            ));
        }

        let frame = Self::encode_frame(&JournalEntry {
            seq: writer.next_seq,
            timestamp: chrono::Utc::now().timestamp_micros(),
            op,
        })?;

        let written = writer.file.write_all(&frame).and_then(|()| {
            if self.config.sync_writes {
                writer.file.sync()
            } else {
                Ok(())
            }
        });
        if let Err(e) = written {
            if let Err(truncate_err) = writer.file.truncate(writer.len) {
                warn!(error = %truncate_err, len = writer.len, "failed to drop unwritten journal frame");
                writer.poisoned = true;
                return Err(truncate_err.into());
            }
            return Err(e.into());
        }

        writer.len += frame.len() as u64;
        writer.next_seq += 1;
        Ok(())
    }

    fn encode_frame(entry: &JournalEntry) -> StoreResult<Vec<u8>> {
        let encoded = rmp_serde::to_vec(entry)?;

        let mut frame = Vec::with_capacity(encoded.len() + 8);
        frame.extend_from_slice(&(encoded.len() as u32).to_le_bytes());
        frame.extend_from_slice(&encoded);
        frame.extend_from_slice(&crc32fast::hash(&encoded).to_le_bytes());
        Ok(frame)
    }

    fn read_frame(reader: &mut impl Read, remaining: u64) -> StoreResult<Frame> {
        if remaining == 0 {
            return Ok(Frame::End);
        }
        if remaining < 4 {
            return Ok(Frame::Torn);
        }

        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as u64;

        if len > MAX_ENTRY_LEN {
            return Err(StoreError::Corruption("journal entry too large".into()));
        }

        let frame_len = 4 + len + 4;
        if frame_len > remaining {
            // Bounded by MAX_ENTRY_LEN: remaining < frame_len here.
            let mut tail = len_bytes.to_vec();
            reader.read_to_end(&mut tail)?;
            if Self::holds_complete_frame(&tail) {
                return Err(StoreError::Corruption(
                    "journal entry length runs past later entries".into(),
                ));
            }
            return Ok(Frame::Torn);
        }

        let mut encoded = vec![0u8; len as usize];
        reader.read_exact(&mut encoded)?;

        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);
        let computed = crc32fast::hash(&encoded);

        if stored != computed {
            if frame_len == remaining {
                return Ok(Frame::Torn);
            }
            return Err(StoreError::ChecksumMismatch {
                expected: stored,
                got: computed,
            });
        }

        let entry = rmp_serde::from_slice(&encoded)?;
        Ok(Frame::Entry(entry, frame_len))
    }

    /// Whether a checksummed frame starts anywhere after the first byte of
    /// `tail`. A torn append holds only a prefix of one frame, so finding
    /// one means a length prefix was damaged.
    fn holds_complete_frame(tail: &[u8]) -> bool {
        (1..tail.len()).any(|start| {
            let rest = &tail[start..];
            if rest.len() < 8 {
                return false;
            }
            let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
            if len == 0 || rest.len() < 8 + len {
                return false;
            }
            let stored = u32::from_le_bytes([rest[4 + len], rest[5 + len], rest[6 + len], rest[7 + len]]);
            crc32fast::hash(&rest[4..4 + len]) == stored
        })
    }

    /// Rebuild the table. Returns it with the next sequence number and the
    /// length of the valid journal prefix.
    fn replay(path: &Path) -> StoreResult<(Table, u64, u64)> {
        let file = File::open(path)?;
        let file_len = file.metadata()?.len();
        let mut reader = BufReader::new(file);

        Self::verify_header(&mut reader)?;

        let mut table = Table::new();
        let mut offset = HEADER_LEN;
        let mut next_seq = 1;

        loop {
            match Self::read_frame(&mut reader, file_len - offset)? {
                Frame::Entry(entry, size) => {
                    next_seq = next_seq.max(entry.seq + 1);
                    entry.op.apply(&mut table)?;
                    offset += size;
                }
                Frame::End => break,
                Frame::Torn => {
                    warn!(offset, file_len, "journal ends in a torn entry");
                    break;
                }
            }
        }

        Ok((table, next_seq, offset))
    }

    fn write_header(path: &Path) -> StoreResult<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        file.write_all(JOURNAL_MAGIC)?;
        file.write_all(&[JOURNAL_VERSION])?;
        file.sync_all()?;
        Ok(())
    }

    fn verify_header(reader: &mut impl Read) -> StoreResult<()> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|_| StoreError::InvalidFormat("Journal header missing".into()))?;
        if &magic != JOURNAL_MAGIC {
            return Err(StoreError::InvalidFormat("Invalid journal magic".into()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != JOURNAL_VERSION {
            return Err(StoreError::InvalidFormat(format!(
                "Unsupported journal version: {}",
                version[0]
            )));
        }
        Ok(())
    }

    fn acquire_lock(path: &Path) -> StoreResult<File> {
        let lock_file = File::create(path.join(LOCK_FILE))?;
        lock_file
            .try_lock_exclusive()
            .map_err(|_| StoreError::Locked)?;
        Ok(lock_file)
    }
}

impl KvBackend for JournalBackend {
    fn put(&self, key: &CompositeKey, item: Item) -> StoreResult<()> {
        let mut writer = self.writer.lock();
        self.append(&mut writer, JournalOp::put(key, &item)?)?;
        self.table.write().put(key, item);
        Ok(())
    }

    fn get(&self, key: &CompositeKey) -> StoreResult<Option<Item>> {
        Ok(self.table.read().get(key).cloned())
    }

    fn query(&self, partition: &str) -> StoreResult<Vec<Item>> {
        Ok(self.table.read().query(partition))
    }

    fn update(&self, key: &CompositeKey, assignments: &[Assignment]) -> StoreResult<Option<Item>> {
        let mut writer = self.writer.lock();
        let updated = self.table.read().preview_update(key, assignments);
        if let Some(item) = &updated {
            self.append(&mut writer, JournalOp::put(key, item)?)?;
            self.table.write().put(key, item.clone());
        }
        Ok(updated)
    }

    fn delete(&self, key: &CompositeKey) -> StoreResult<Option<Item>> {
        let mut writer = self.writer.lock();
        if self.table.read().get(key).is_none() {
            return Ok(None);
        }
        self.append(&mut writer, JournalOp::delete(key))?;
        Ok(self.table.write().remove(key))
    }
}

impl Drop for JournalBackend {
    fn drop(&mut self) {
        // Best-effort sync on drop
        let _ = self.sync();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> JournalConfig {
        JournalConfig {
            path: dir.path().join("journal"),
            create_if_missing: true,
            sync_writes: false,
        }
    }

    fn key(sort: &str) -> CompositeKey {
        CompositeKey {
            partition: "USER#u".to_string(),
            sort: sort.to_string(),
        }
    }

    fn item(value: serde_json::Value) -> Item {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_replay_restores_table() {
        let dir = TempDir::new().unwrap();

        {
            let backend = JournalBackend::create(test_config(&dir)).unwrap();
            backend.put(&key("1"), item(json!({"n": 1}))).unwrap();
            backend.put(&key("2"), item(json!({"n": 2}))).unwrap();
            backend
                .update(&key("1"), &[("n".into(), json!(10))])
                .unwrap();
            backend.delete(&key("2")).unwrap();
        }

        let backend = JournalBackend::open(test_config(&dir)).unwrap();
        assert_eq!(backend.len(), 1);
        assert_eq!(backend.get(&key("1")).unwrap().unwrap()["n"], 10);
        assert!(backend.get(&key("2")).unwrap().is_none());
    }

    #[test]
    fn test_update_of_missing_item_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);
        let backend = JournalBackend::create(config.clone()).unwrap();

        let result = backend
            .update(&key("missing"), &[("n".into(), json!(1))])
            .unwrap();
        assert!(result.is_none());
        assert!(backend.delete(&key("missing")).unwrap().is_none());
        drop(backend);

        let journal_len = fs::metadata(config.path.join(JOURNAL_FILE)).unwrap().len();
        assert_eq!(journal_len, HEADER_LEN);
    }

    #[test]
    fn test_lock_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let _first = JournalBackend::create(test_config(&dir)).unwrap();

        let second = JournalBackend::open(test_config(&dir));
        assert!(matches!(second, Err(StoreError::Locked)));
    }

    #[test]
    fn test_open_missing_without_create() {
        let dir = TempDir::new().unwrap();
        let config = JournalConfig {
            create_if_missing: false,
            ..test_config(&dir)
        };
        assert!(matches!(
            JournalBackend::open_or_create(config),
            Err(StoreError::NotInitialized)
        ));
    }

    #[test]
    fn test_torn_tail_is_dropped() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        {
            let backend = JournalBackend::create(config.clone()).unwrap();
            backend.put(&key("1"), item(json!({"n": 1}))).unwrap();
            backend.put(&key("2"), item(json!({"n": 2}))).unwrap();
        }

        // Chop the last few bytes off the final frame.
        let journal_path = config.path.join(JOURNAL_FILE);
        let len = fs::metadata(&journal_path).unwrap().len();
        OpenOptions::new()
            .write(true)
            .open(&journal_path)
            .unwrap()
            .set_len(len - 3)
            .unwrap();

        {
            let backend = JournalBackend::open(config.clone()).unwrap();
            assert_eq!(backend.len(), 1);
            assert!(backend.get(&key("2")).unwrap().is_none());

            // Appending after recovery keeps the journal readable.
            backend.put(&key("3"), item(json!({"n": 3}))).unwrap();
        }

        let backend = JournalBackend::open(config).unwrap();
        assert_eq!(backend.len(), 2);
        assert!(backend.get(&key("3")).unwrap().is_some());
    }

    #[test]
    fn test_corruption_before_tail_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        {
            let backend = JournalBackend::create(config.clone()).unwrap();
            backend.put(&key("1"), item(json!({"n": 1}))).unwrap();
            backend.put(&key("2"), item(json!({"n": 2}))).unwrap();
        }

        // Flip a byte inside the first entry's payload.
        let journal_path = config.path.join(JOURNAL_FILE);
        let mut bytes = fs::read(&journal_path).unwrap();
        let target = HEADER_LEN as usize + 6;
        bytes[target] ^= 0xFF;
        fs::write(&journal_path, bytes).unwrap();

        let result = JournalBackend::open(config);
        assert!(matches!(result, Err(StoreError::ChecksumMismatch { .. })));
    }

    #[test]
    fn test_oversized_length_prefix_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        {
            let backend = JournalBackend::create(config.clone()).unwrap();
            for i in 0..3 {
                backend.put(&key(&i.to_string()), item(json!({"n": i}))).unwrap();
            }
        }

        // High byte of the first entry's length.
        let journal_path = config.path.join(JOURNAL_FILE);
        let mut bytes = fs::read(&journal_path).unwrap();
        bytes[HEADER_LEN as usize + 3] ^= 0x01;
        fs::write(&journal_path, &bytes).unwrap();

        let result = JournalBackend::open(config);
        assert!(matches!(result, Err(StoreError::Corruption(_))));
        assert_eq!(fs::metadata(&journal_path).unwrap().len(), bytes.len() as u64);
    }

    #[test]
    fn test_length_prefix_past_later_entries_is_an_error() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        {
            let backend = JournalBackend::create(config.clone()).unwrap();
            for i in 0..3 {
                backend.put(&key(&i.to_string()), item(json!({"n": i}))).unwrap();
            }
        }

        // Still under the size cap, but longer than the rest of the file.
        let journal_path = config.path.join(JOURNAL_FILE);
        let mut bytes = fs::read(&journal_path).unwrap();
        bytes[HEADER_LEN as usize + 1] ^= 0x04;
        fs::write(&journal_path, &bytes).unwrap();

        let result = JournalBackend::open(config);
        assert!(matches!(result, Err(StoreError::Corruption(_))));
        assert_eq!(fs::metadata(&journal_path).unwrap().len(), bytes.len() as u64);
    }

    /// Journal file that fails on demand.
    struct FaultyFile {
        inner: File,
        failing_syncs: u32,
        failing_truncates: u32,
    }

    impl Write for FaultyFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.inner.flush()
        }
    }

    impl JournalFile for FaultyFile {
        fn sync(&mut self) -> io::Result<()> {
            if self.failing_syncs > 0 {
                self.failing_syncs -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "sync failed"));
            }
            self.inner.sync_all()
        }

        fn truncate(&mut self, len: u64) -> io::Result<()> {
            if self.failing_truncates > 0 {
                self.failing_truncates -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "truncate failed"));
            }
            self.inner.set_len(len)
        }
    }

    fn inject_faults(backend: &JournalBackend, failing_syncs: u32, failing_truncates: u32) {
        let inner = OpenOptions::new()
            .append(true)
            .open(backend.path().join(JOURNAL_FILE))
            .unwrap();
        backend.writer.lock().file = Box::new(FaultyFile {
            inner,
            failing_syncs,
            failing_truncates,
        });
    }

    #[test]
    fn test_failed_sync_leaves_no_frame() {
        let dir = TempDir::new().unwrap();
        let config = JournalConfig {
            sync_writes: true,
            ..test_config(&dir)
        };
        let journal_path = config.path.join(JOURNAL_FILE);

        {
            let backend = JournalBackend::create(config.clone()).unwrap();
            backend.put(&key("1"), item(json!({"n": 1}))).unwrap();
            let len_before = fs::metadata(&journal_path).unwrap().len();

            inject_faults(&backend, 1, 0);
            assert!(backend.put(&key("2"), item(json!({"n": 2}))).is_err());
            assert!(backend.get(&key("2")).unwrap().is_none());
            assert_eq!(fs::metadata(&journal_path).unwrap().len(), len_before);

            // Later appends land right after the last good frame.
            backend.put(&key("3"), item(json!({"n": 3}))).unwrap();
        }

        let backend = JournalBackend::open(config).unwrap();
        assert_eq!(backend.len(), 2);
        assert!(backend.get(&key("2")).unwrap().is_none());
        assert_eq!(backend.get(&key("3")).unwrap().unwrap()["n"], 3);
    }

    #[test]
    fn test_failed_truncate_poisons_writer_until_compaction() {
        let dir = TempDir::new().unwrap();
        let config = JournalConfig {
            sync_writes: true,
            ..test_config(&dir)
        };

        {
            let backend = JournalBackend::create(config.clone()).unwrap();
            backend.put(&key("1"), item(json!({"n": 1}))).unwrap();

            inject_faults(&backend, 1, 1);
            assert!(backend.put(&key("2"), item(json!({"n": 2}))).is_err());

            // The file is healthy again, but the failed frame is still there.
            assert!(matches!(
                backend.put(&key("3"), item(json!({"n": 3}))),
                Err(StoreError::Unavailable(_))
            ));
            assert!(matches!(backend.delete(&key("1")), Err(StoreError::Unavailable(_))));

            assert_eq!(backend.compact().unwrap(), 1);
            backend.put(&key("3"), item(json!({"n": 3}))).unwrap();
        }

        let backend = JournalBackend::open(config).unwrap();
        assert_eq!(backend.len(), 2);
        assert!(backend.get(&key("2")).unwrap().is_none());
        assert!(backend.get(&key("3")).unwrap().is_some());
    }

    #[test]
    fn test_compact() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir);

        {
            let backend = JournalBackend::create(config.clone()).unwrap();
            for i in 0..10 {
                backend
                    .put(&key("1"), item(json!({"n": i})))
                    .unwrap();
            }
            backend.put(&key("2"), item(json!({"n": 0}))).unwrap();
            backend.delete(&key("2")).unwrap();

            assert_eq!(backend.compact().unwrap(), 1);
            backend.put(&key("3"), item(json!({"n": 3}))).unwrap();
        }

        let backend = JournalBackend::open(config).unwrap();
        assert_eq!(backend.len(), 2);
        assert_eq!(backend.get(&key("1")).unwrap().unwrap()["n"], 9);
    }
}
