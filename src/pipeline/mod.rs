//! The four pipeline stages.
//!
//! Every record stage follows the same shape: snapshot the eligible records
//! from the store, process them one at a time in key order, and write back a
//! status update only after the stage's side effects have succeeded. A
//! failure on one record is logged and recorded in the [`StageReport`]; the
//! stage moves on to the next record. Only a fatal store error stops the run.

mod archive;
mod docket;
mod document;
mod resolve;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::error::PipelineError;
use crate::record::{CaseRecord, RecordKey, Stage};
use crate::store::StoreError;

pub use archive::{ArchiveBundle, archive_outputs};
pub use docket::fetch_dockets;
pub use document::fetch_documents;
pub use resolve::resolve_identifiers;

/// Where artifacts live under the download directory.
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn json_dir(&self) -> PathBuf {
        self.root.join("json")
    }

    pub fn html_dir(&self) -> PathBuf {
        self.root.join("html")
    }

    pub fn document_dir(&self) -> PathBuf {
        self.root.join("pdf")
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join("zip")
    }

    pub fn docket_json_path(&self, external_case_id: &str) -> PathBuf {
        self.json_dir().join(format!("{external_case_id}.json"))
    }

    pub fn docket_html_path(&self, external_case_id: &str) -> PathBuf {
        self.html_dir().join(format!("{external_case_id}.html"))
    }

    pub fn document_path(&self, external_case_id: &str) -> PathBuf {
        self.document_dir().join(format!("{external_case_id}.pdf"))
    }
}

/// Writes `contents` to `path` through a temporary sibling and a rename, so
/// an interrupted write never leaves a truncated artifact behind.
pub(crate) fn write_artifact(path: &Path, contents: &[u8]) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
    }
    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    fs::write(&temp_path, contents).map_err(|e| PipelineError::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| PipelineError::io(path, e))?;
    Ok(())
}

/// Hooks for following a stage record by record. Both methods default to
/// doing nothing.
pub trait StageObserver {
    fn record_started(&self, _key: RecordKey, _record: &CaseRecord) {}
    fn record_finished(&self, _key: RecordKey, _error: Option<&PipelineError>) {}
}

impl StageObserver for () {}

/// A record that failed a stage, with the reason.
#[derive(Debug)]
pub struct RecordFailure {
    pub key: RecordKey,
    pub error: PipelineError,
}

/// Outcome of one record stage.
#[derive(Debug)]
pub struct StageReport {
    pub stage: Stage,
    pub eligible: usize,
    pub succeeded: usize,
    pub failures: Vec<RecordFailure>,
}

impl StageReport {
    pub fn new(stage: Stage, eligible: usize) -> Self {
        Self {
            stage,
            eligible,
            succeeded: 0,
            failures: Vec::new(),
        }
    }

    /// True when every eligible record went through.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Books the outcome of one record. Fatal store errors are handed back so
    /// the stage can stop; anything else is logged and the stage carries on.
    pub(crate) fn record(
        &mut self,
        key: RecordKey,
        result: Result<(), PipelineError>,
        observer: &impl StageObserver,
    ) -> Result<(), StoreError> {
        observer.record_finished(key, result.as_ref().err());
        match result {
            Ok(()) => {
                self.succeeded += 1;
                Ok(())
            }
            Err(PipelineError::Store(e)) if e.is_fatal() => Err(e),
            Err(error) => {
                warn!(stage = %self.stage, key, error = %error, "record failed, left eligible for the next run");
                self.failures.push(RecordFailure { key, error });
                Ok(())
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn layout_paths_are_keyed_by_case_id() {
        let layout = ArtifactLayout::new("downloads");
        assert_eq!(
            layout.docket_json_path("123456"),
            PathBuf::from("downloads/json/123456.json")
        );
        assert_eq!(
            layout.docket_html_path("123456"),
            PathBuf::from("downloads/html/123456.html")
        );
        assert_eq!(
            layout.document_path("123456"),
            PathBuf::from("downloads/pdf/123456.pdf")
        );
        assert_eq!(layout.archive_dir(), PathBuf::from("downloads/zip"));
    }

    #[test]
    fn write_artifact_creates_dirs_and_overwrites() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("a").join("b").join("file.json");
        write_artifact(&path, b"one").unwrap();
        write_artifact(&path, b"two").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"two");
        assert!(!tmp.path().join("a/b/file.json.tmp").exists());
    }

    #[test]
    fn report_keeps_going_on_record_errors() {
        let mut report = StageReport::new(Stage::FetchDockets, 2);
        report
            .record(
                1,
                Err(PipelineError::MissingDocument {
                    external_case_id: "1".into(),
                }),
                &(),
            )
            .unwrap();
        report.record(2, Ok(()), &()).unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn report_stops_on_fatal_store_error() {
        let mut report = StageReport::new(Stage::ResolveIds, 1);
        let fatal = StoreError::Io {
            path: PathBuf::from("db/master.json"),
            source: std::io::Error::other("disk full"),
        };
        let err = report
            .record(1, Err(PipelineError::from(fatal)), &())
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(report.failures.is_empty());
    }
}
