//! Persistent record store backed by a single JSON file.
//!
//! The whole store is rewritten on every update through a temporary file that
//! is renamed over the original, so a reader never sees a half-written record.
//! Updates go through [`CaseRecord::merged`], which refuses any change that
//! would revert a completion flag.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::record::{CaseRecord, RecordKey, RecordUpdate, TransitionError};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record {0} not found")]
    NotFound(RecordKey),

    #[error("record {key}: {source}")]
    InvalidTransition {
        key: RecordKey,
        #[source]
        source: TransitionError,
    },

    #[error("store file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    /// Errors that mean the store itself can no longer be trusted. A run must
    /// stop on these instead of moving on to the next record.
    pub fn is_fatal(&self) -> bool {
        matches!(self, StoreError::Corrupt { .. } | StoreError::Io { .. })
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    next_key: RecordKey,
    #[serde(default)]
    records: BTreeMap<RecordKey, CaseRecord>,
}

/// Mapping from [`RecordKey`] to [`CaseRecord`], persisted at `path`.
#[derive(Debug)]
pub struct RecordStore {
    path: PathBuf,
    data: StoreFile,
}

impl RecordStore {
    /// Loads the store at `path`. A missing or blank file is an empty store.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let mut data = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => StoreFile::default(),
            Ok(contents) => {
                serde_json::from_str::<StoreFile>(&contents).map_err(|source| {
                    StoreError::Corrupt {
                        path: path.clone(),
                        source,
                    }
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreFile::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        // Keys are never reused, even if the counter was lost.
        let floor = data.records.keys().next_back().map_or(1, |last| last + 1);
        data.next_key = data.next_key.max(floor);

        debug!(path = %path.display(), records = data.records.len(), "opened record store");
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.data.records.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.data.records.is_empty()
    }

    #[allow(dead_code)]
    pub fn get(&self, key: RecordKey) -> Option<&CaseRecord> {
        self.data.records.get(&key)
    }

    /// All records in key order.
    pub fn records(&self) -> impl Iterator<Item = (RecordKey, &CaseRecord)> {
        self.data.records.iter().map(|(key, record)| (*key, record))
    }

    /// Snapshot of every record matching `predicate`, in key order.
    pub fn find(&self, predicate: impl Fn(&CaseRecord) -> bool) -> Vec<(RecordKey, CaseRecord)> {
        self.data
            .records
            .iter()
            .filter(|(_, record)| predicate(record))
            .map(|(key, record)| (*key, record.clone()))
            .collect()
    }

    /// Adds a seeded record and returns its key.
    #[allow(dead_code)]
    pub fn insert(&mut self, record: CaseRecord) -> Result<RecordKey, StoreError> {
        let key = self.data.next_key;
        record
            .check_consistent()
            .map_err(|source| StoreError::InvalidTransition { key, source })?;

        self.data.records.insert(key, record);
        self.data.next_key = key + 1;
        if let Err(e) = self.persist() {
            self.data.records.remove(&key);
            self.data.next_key = key;
            return Err(e);
        }
        Ok(key)
    }

    /// Merges `update` into the record at `key` and persists the store.
    ///
    /// Nothing is written when the key is missing or the merge is refused. If
    /// persisting fails the in-memory record is rolled back as well.
    pub fn update(
        &mut self,
        key: RecordKey,
        update: &RecordUpdate,
    ) -> Result<&CaseRecord, StoreError> {
        let current = self
            .data
            .records
            .get(&key)
            .ok_or(StoreError::NotFound(key))?;
        let mut next = current
            .merged(update)
            .map_err(|source| StoreError::InvalidTransition { key, source })?;
        next.updated_at = Some(Utc::now());

        let previous = self.data.records.insert(key, next);
        if let Err(e) = self.persist() {
            if let Some(previous) = previous {
                self.data.records.insert(key, previous);
            }
            return Err(e);
        }

        debug!(key, "record updated");
        self.data.records.get(&key).ok_or(StoreError::NotFound(key))
    }

    fn persist(&self) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let contents =
            serde_json::to_string_pretty(&self.data).map_err(|source| StoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        let temp_path = self.path.with_extension("json.tmp");
        fs::write(&temp_path, contents).map_err(io_err)?;
        fs::rename(&temp_path, &self.path).map_err(io_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Stage, StageState};
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, RecordStore) {
        let tmp = TempDir::new().unwrap();
        let store = RecordStore::open(tmp.path().join("db").join("master.json")).unwrap();
        (tmp, store)
    }

    #[test]
    fn open_missing_file_gives_empty_store() {
        let (_tmp, store) = temp_store();
        assert!(store.is_empty());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn open_blank_file_gives_empty_store() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("master.json");
        fs::write(&path, "  \n").unwrap();
        assert!(RecordStore::open(&path).unwrap().is_empty());
    }

    #[test]
    fn open_garbage_is_corrupt_and_fatal() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("master.json");
        fs::write(&path, "{not json").unwrap();
        let err = RecordStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn insert_assigns_increasing_keys_and_persists() {
        let (_tmp, mut store) = temp_store();
        let a = store.insert(CaseRecord::new("mad", "12-cv-00345", "01")).unwrap();
        let b = store.insert(CaseRecord::new("nhd", "13-cv-00001", "1")).unwrap();
        assert_eq!(a, 1);
        assert_eq!(b, 2);

        let reopened = RecordStore::open(store.path()).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get(b).unwrap().court, "nhd");
    }

    #[test]
    fn insert_rejects_inconsistent_record() {
        let (_tmp, mut store) = temp_store();
        let bad = CaseRecord {
            document_done: true,
            ..CaseRecord::new("mad", "12-cv-00345", "01")
        };
        let err = store.insert(bad).unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert!(store.is_empty());
    }

    #[test]
    fn find_filters_in_key_order() {
        let (_tmp, mut store) = temp_store();
        for n in 0..4 {
            store
                .insert(CaseRecord::new("mad", format!("12-cv-0000{n}"), "01"))
                .unwrap();
        }
        store.update(2, &RecordUpdate::resolved("222", "B")).unwrap();

        let pending = store.find(Stage::ResolveIds.predicate());
        let keys: Vec<_> = pending.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![1, 3, 4]);

        let resolved = store.find(Stage::FetchDockets.predicate());
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].1.external_case_id, "222");
    }

    #[test]
    fn update_merges_and_survives_reopen() {
        let (_tmp, mut store) = temp_store();
        let key = store.insert(CaseRecord::new("mad", "12-cv-00345", "01")).unwrap();

        let record = store
            .update(key, &RecordUpdate::resolved("123456", "X v. Y"))
            .unwrap();
        assert_eq!(record.external_case_id, "123456");
        assert!(record.updated_at.is_some());

        let reopened = RecordStore::open(store.path()).unwrap();
        let record = reopened.get(key).unwrap();
        assert_eq!(record.external_case_id, "123456");
        assert_eq!(record.title, "X v. Y");
        assert_eq!(record.docket_number, "12-cv-00345");
        assert_eq!(record.state(), StageState::DocketPending);
    }

    #[test]
    fn update_missing_key_is_not_found() {
        let (_tmp, mut store) = temp_store();
        let err = store
            .update(42, &RecordUpdate::document_fetched())
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(42)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn refused_update_leaves_record_untouched() {
        let (_tmp, mut store) = temp_store();
        let key = store.insert(CaseRecord::new("mad", "12-cv-00345", "01")).unwrap();
        let before = store.get(key).unwrap().clone();

        let err = store
            .update(key, &RecordUpdate::document_fetched())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(store.get(key).unwrap(), &before);

        let reopened = RecordStore::open(store.path()).unwrap();
        assert_eq!(reopened.get(key).unwrap(), &before);
    }

    #[test]
    fn failed_write_rolls_back_update() {
        let (tmp, mut store) = temp_store();
        let key = store.insert(CaseRecord::new("mad", "12-cv-00345", "01")).unwrap();
        let before = store.get(key).unwrap().clone();
        let on_disk = fs::read(store.path()).unwrap();

        // A directory where the temp file should go makes the write fail.
        fs::create_dir(tmp.path().join("db").join("master.json.tmp")).unwrap();

        let err = store
            .update(key, &RecordUpdate::resolved("123456", "X v. Y"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
        assert!(err.is_fatal());
        assert_eq!(store.get(key).unwrap(), &before);
        assert_eq!(fs::read(store.path()).unwrap(), on_disk);
    }

    #[test]
    fn failed_write_rolls_back_insert() {
        let (tmp, mut store) = temp_store();
        let first = store.insert(CaseRecord::new("mad", "12-cv-00345", "01")).unwrap();
        fs::create_dir(tmp.path().join("db").join("master.json.tmp")).unwrap();

        let err = store
            .insert(CaseRecord::new("mad", "12-cv-00346", "01"))
            .unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(store.len(), 1);
        assert!(store.get(first + 1).is_none());

        fs::remove_dir(tmp.path().join("db").join("master.json.tmp")).unwrap();
        let key = store.insert(CaseRecord::new("mad", "12-cv-00346", "01")).unwrap();
        assert_eq!(key, first + 1);
    }

    #[test]
    fn keys_are_not_reused_when_counter_is_missing() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("master.json");
        fs::write(
            &path,
            r#"{"records": {"7": {"court": "mad", "docket_number": "1", "office": "01"}}}"#,
        )
        .unwrap();

        let mut store = RecordStore::open(&path).unwrap();
        let key = store.insert(CaseRecord::new("mad", "2", "01")).unwrap();
        assert_eq!(key, 8);
    }

    #[test]
    fn no_temp_file_left_behind() {
        let (tmp, mut store) = temp_store();
        store.insert(CaseRecord::new("mad", "12-cv-00345", "01")).unwrap();
        let leftovers: Vec<_> = fs::read_dir(tmp.path().join("db"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|x| x == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
