#![allow(async_fn_in_trait)]

use crate::error::{StorageError, StorageResult};
use doorbot_core::MembershipRecord;
use doorbot_core::constants::RECORD_FIELD_COUNT;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

/// Source of the membership snapshot.
///
/// Backends are swappable (local file, remote fetch, memory) without changing
/// the matcher. Every call reads the current snapshot; nothing is cached.
///
/// # Implementation Note
///
/// This trait uses native async trait methods (Edition 2024 feature).
pub trait RecordStore: Send + Sync {
    /// Read every record, in snapshot order.
    async fn read_records(&self) -> StorageResult<Vec<MembershipRecord>>;

    /// Time since the snapshot was last replaced.
    async fn age(&self) -> StorageResult<Duration>;
}

/// Parse a CSV snapshot.
///
/// Rows hold exactly three fields `codeId,displayName,memberId`; the last two
/// may be empty. There is no header row. A single row with the wrong field
/// count makes the whole snapshot unparsable.
///
/// # Errors
///
/// Returns [`StorageError::MalformedRow`] for a row with the wrong field count,
/// or [`StorageError::Csv`] for invalid CSV.
///
/// # Examples
///
/// ```
/// use doorbot_storage::parse_records;
///
/// let records = parse_records("ff123456,Alice,M-1\n1a2b3c4d,,\n").unwrap();
/// assert_eq!(records.len(), 2);
/// assert!(records[0].is_keypad_pin());
/// assert_eq!(records[1].display_name, None);
/// ```
pub fn parse_records(data: &str) -> StorageResult<Vec<MembershipRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(data.as_bytes());

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.len() != RECORD_FIELD_COUNT {
            return Err(StorageError::MalformedRow {
                line: row.position().map_or(0, |p| p.line()),
                fields: row.len(),
            });
        }
        records.push(MembershipRecord::from_fields(&row[0], &row[1], &row[2]));
    }
    Ok(records)
}

/// Record store backed by a CSV file an external updater replaces.
#[derive(Debug, Clone)]
pub struct CsvRecordStore {
    path: PathBuf,
}

impl CsvRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Read {
            path: self.path.clone(),
            source,
        }
    }
}

impl RecordStore for CsvRecordStore {
    async fn read_records(&self) -> StorageResult<Vec<MembershipRecord>> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| self.read_error(e))?;
        parse_records(&data)
    }

    async fn age(&self) -> StorageResult<Duration> {
        let modified = tokio::fs::metadata(&self.path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| self.read_error(e))?;
        // A modification time in the future counts as fresh.
        Ok(SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO))
    }
}

#[derive(Debug)]
struct MemoryState {
    records: Vec<MembershipRecord>,
    age: Duration,
    failure: Option<String>,
    reads: usize,
}

/// In-memory record store.
///
/// Clones share the same snapshot, so a test can keep one clone and replace
/// the records while a matcher owns another.
#[derive(Debug, Clone)]
pub struct MemoryRecordStore {
    state: Arc<Mutex<MemoryState>>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MemoryRecordStore {
    pub fn new(records: Vec<MembershipRecord>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                records,
                age: Duration::ZERO,
                failure: None,
                reads: 0,
            })),
        }
    }

    /// Replace the snapshot.
    pub fn set_records(&self, records: Vec<MembershipRecord>) {
        let mut state = self.lock();
        state.records = records;
        state.age = Duration::ZERO;
    }

    pub fn set_age(&self, age: Duration) {
        self.lock().age = age;
    }

    /// Make every following read fail with `message`, or succeed again with
    /// `None`.
    pub fn set_failure(&self, message: Option<&str>) {
        self.lock().failure = message.map(str::to_string);
    }

    /// Number of `read_records` calls so far.
    pub fn reads(&self) -> usize {
        self.lock().reads
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl RecordStore for MemoryRecordStore {
    async fn read_records(&self) -> StorageResult<Vec<MembershipRecord>> {
        let mut state = self.lock();
        state.reads += 1;
        match &state.failure {
            Some(message) => Err(StorageError::Unavailable(message.clone())),
            None => Ok(state.records.clone()),
        }
    }

    async fn age(&self) -> StorageResult<Duration> {
        let state = self.lock();
        match &state.failure {
            Some(message) => Err(StorageError::Unavailable(message.clone())),
            None => Ok(state.age),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_parse_keeps_snapshot_order() {
        let records = parse_records("ff111111,One,1\nabcdef12,Two,2\nff222222,Three,3\n").unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.code_id.as_str()).collect();
        assert_eq!(ids, vec!["ff111111", "abcdef12", "ff222222"]);
    }

    #[test]
    fn test_parse_empty_optional_fields() {
        let records = parse_records("ff654321,,\n").unwrap();
        assert_eq!(records[0].display_name, None);
        assert_eq!(records[0].member_id, None);
    }

    #[test]
    fn test_parse_quoted_name_with_comma() {
        let records = parse_records("ff654321,\"Doe, Jane\",M-7\n").unwrap();
        assert_eq!(records[0].display_name.as_deref(), Some("Doe, Jane"));
    }

    #[test]
    fn test_parse_empty_snapshot() {
        assert!(parse_records("").unwrap().is_empty());
    }

    #[rstest]
    #[case("ff123456,Alice\n", 2)]
    #[case("ff123456,Alice,M-1,extra\n", 4)]
    #[case("ff123456\n", 1)]
    fn test_wrong_field_count_rejects_snapshot(#[case] data: &str, #[case] fields: usize) {
        match parse_records(data) {
            Err(StorageError::MalformedRow { fields: found, .. }) => assert_eq!(found, fields),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_one_bad_row_rejects_everything() {
        let data = "ff111111,One,1\nbroken\nff222222,Two,2\n";
        assert!(matches!(
            parse_records(data),
            Err(StorageError::MalformedRow { line: 2, fields: 1 })
        ));
    }

    #[tokio::test]
    async fn test_memory_store_failure_toggle() {
        let store = MemoryRecordStore::new(vec![MembershipRecord::from_fields("ff123456", "", "")]);
        assert_eq!(store.read_records().await.unwrap().len(), 1);

        store.set_failure(Some("offline"));
        assert!(matches!(
            store.read_records().await,
            Err(StorageError::Unavailable(_))
        ));

        store.set_failure(None);
        assert!(store.read_records().await.is_ok());
        assert_eq!(store.reads(), 3);
    }

    #[tokio::test]
    async fn test_memory_store_clones_share_snapshot() {
        let store = MemoryRecordStore::default();
        let other = store.clone();

        other.set_records(vec![MembershipRecord::from_fields("abcdef", "", "")]);
        other.set_age(Duration::from_secs(60));

        assert_eq!(store.read_records().await.unwrap().len(), 1);
        assert_eq!(store.age().await.unwrap(), Duration::from_secs(60));
    }
}
