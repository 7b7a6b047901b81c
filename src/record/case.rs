use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::stage::StageState;

/// Key of a record inside the store. Assigned on insert, never reused.
pub type RecordKey = u64;

/// One court case under collection and its pipeline completion flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub court: String,
    pub docket_number: String,
    pub office: String,
    /// Identifier assigned by the court-records service. Empty until resolved.
    #[serde(default)]
    pub external_case_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub docket_json_done: bool,
    /// First document listed on the docket.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
    #[serde(default)]
    pub document_done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Why an update was refused by [`CaseRecord::merged`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("external case id must not be empty")]
    EmptyCaseId,

    #[error("external case id is already set to {current}")]
    CaseIdImmutable { current: String },

    #[error("document id is already set to {current}")]
    DocumentIdImmutable { current: String },

    #[error("{field} cannot revert to false")]
    FlagReverted { field: &'static str },

    #[error("record would be inconsistent: {0}")]
    Inconsistent(&'static str),
}

impl CaseRecord {
    /// A freshly seeded record with no pipeline progress.
    #[allow(dead_code)]
    pub fn new(
        court: impl Into<String>,
        docket_number: impl Into<String>,
        office: impl Into<String>,
    ) -> Self {
        Self {
            court: court.into(),
            docket_number: docket_number.into(),
            office: office.into(),
            ..Default::default()
        }
    }

    pub fn is_resolved(&self) -> bool {
        !self.external_case_id.is_empty()
    }

    pub fn state(&self) -> StageState {
        StageState::of(self)
    }

    /// Checks the flag ordering: `document_done` implies `docket_json_done`,
    /// which implies a resolved case id and a document id.
    pub fn check_consistent(&self) -> Result<(), TransitionError> {
        if self.docket_json_done && !self.is_resolved() {
            return Err(TransitionError::Inconsistent(
                "docket fetched before the case id was resolved",
            ));
        }
        if self.docket_json_done && self.document_id.is_none() {
            return Err(TransitionError::Inconsistent(
                "docket marked fetched without a document id",
            ));
        }
        if self.document_done && !self.docket_json_done {
            return Err(TransitionError::Inconsistent(
                "document fetched before the docket",
            ));
        }
        Ok(())
    }

    /// Returns a copy of this record with `update` merged in.
    ///
    /// Fields absent from the update are left untouched. The merge is refused
    /// if it would revert a flag, overwrite an identifier that is already set,
    /// or leave the record inconsistent.
    pub fn merged(&self, update: &RecordUpdate) -> Result<CaseRecord, TransitionError> {
        let mut next = self.clone();

        if let Some(id) = &update.external_case_id {
            if id.is_empty() {
                return Err(TransitionError::EmptyCaseId);
            }
            if self.is_resolved() && self.external_case_id != *id {
                return Err(TransitionError::CaseIdImmutable {
                    current: self.external_case_id.clone(),
                });
            }
            next.external_case_id = id.clone();
        }
        if let Some(title) = &update.title {
            next.title = title.clone();
        }
        if let Some(done) = update.docket_json_done {
            if self.docket_json_done && !done {
                return Err(TransitionError::FlagReverted {
                    field: "docket_json_done",
                });
            }
            next.docket_json_done = done;
        }
        if let Some(doc) = &update.document_id {
            match &self.document_id {
                Some(current) if self.docket_json_done && current != doc => {
                    return Err(TransitionError::DocumentIdImmutable {
                        current: current.clone(),
                    });
                }
                _ => next.document_id = Some(doc.clone()),
            }
        }
        if let Some(done) = update.document_done {
            if self.document_done && !done {
                return Err(TransitionError::FlagReverted {
                    field: "document_done",
                });
            }
            next.document_done = done;
        }

        next.check_consistent()?;
        Ok(next)
    }
}

/// A partial set of field updates. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordUpdate {
    pub external_case_id: Option<String>,
    pub title: Option<String>,
    pub docket_json_done: Option<bool>,
    pub document_id: Option<String>,
    pub document_done: Option<bool>,
}

impl RecordUpdate {
    /// Identifier resolution succeeded.
    pub fn resolved(external_case_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            external_case_id: Some(external_case_id.into()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    /// Docket artifacts were persisted; `document_id` is the first docket entry.
    pub fn docket_fetched(document_id: impl Into<String>) -> Self {
        Self {
            docket_json_done: Some(true),
            document_id: Some(document_id.into()),
            ..Default::default()
        }
    }

    /// The document file was persisted.
    pub fn document_fetched() -> Self {
        Self {
            document_done: Some(true),
            ..Default::default()
        }
    }
}
