use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::case::CaseRecord;

/// Where a record stands in the pipeline, derived from its persisted fields.
///
/// Records flow: UNRESOLVED → DOCKET_PENDING → DOCUMENT_PENDING → COMPLETE.
/// `Inconsistent` only shows up when the store file was edited by hand into a
/// combination of flags the pipeline never writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum StageState {
    Unresolved,
    DocketPending,
    DocumentPending,
    Complete,
    Inconsistent,
}

impl StageState {
    pub fn of(record: &CaseRecord) -> Self {
        if record.check_consistent().is_err() {
            return StageState::Inconsistent;
        }
        match (
            record.is_resolved(),
            record.docket_json_done,
            record.document_done,
        ) {
            (false, _, _) => StageState::Unresolved,
            (true, false, _) => StageState::DocketPending,
            (true, true, false) => StageState::DocumentPending,
            (true, true, true) => StageState::Complete,
        }
    }
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::Unresolved => write!(f, "UNRESOLVED"),
            StageState::DocketPending => write!(f, "DOCKET_PENDING"),
            StageState::DocumentPending => write!(f, "DOCUMENT_PENDING"),
            StageState::Complete => write!(f, "COMPLETE"),
            StageState::Inconsistent => write!(f, "INCONSISTENT"),
        }
    }
}

/// The four pipeline stages, in the order they are meant to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    ResolveIds,
    FetchDockets,
    FetchDocuments,
    Archive,
}

impl Stage {
    /// Eligibility predicate for this stage. Reads persisted fields only.
    ///
    /// `Archive` works on the output tree as a whole, so no record is ever
    /// eligible for it.
    pub fn is_eligible(self, record: &CaseRecord) -> bool {
        match self {
            Stage::ResolveIds => needs_resolution(record),
            Stage::FetchDockets => needs_docket(record),
            Stage::FetchDocuments => needs_document(record),
            Stage::Archive => false,
        }
    }

    pub fn predicate(self) -> impl Fn(&CaseRecord) -> bool {
        move |record| self.is_eligible(record)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::ResolveIds => write!(f, "RESOLVE_IDS"),
            Stage::FetchDockets => write!(f, "FETCH_DOCKETS"),
            Stage::FetchDocuments => write!(f, "FETCH_DOCUMENTS"),
            Stage::Archive => write!(f, "ARCHIVE"),
        }
    }
}

pub fn needs_resolution(record: &CaseRecord) -> bool {
    record.external_case_id.is_empty()
}

pub fn needs_docket(record: &CaseRecord) -> bool {
    !record.external_case_id.is_empty() && !record.docket_json_done
}

pub fn needs_document(record: &CaseRecord) -> bool {
    record.docket_json_done && !record.document_done && record.document_id.is_some()
}

/// Number of records in each [`StageState`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateCounts(BTreeMap<StageState, usize>);

impl StateCounts {
    pub fn tally<'a>(records: impl IntoIterator<Item = &'a CaseRecord>) -> Self {
        let mut counts = BTreeMap::new();
        for record in records {
            *counts.entry(record.state()).or_insert(0) += 1;
        }
        Self(counts)
    }

    pub fn get(&self, state: StageState) -> usize {
        self.0.get(&state).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}
