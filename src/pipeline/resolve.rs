use tracing::{debug, info};

use super::{StageObserver, StageReport};
use crate::client::{CaseResolver, ClientError};
use crate::error::PipelineError;
use crate::record::{CaseRecord, RecordKey, RecordUpdate, Stage};
use crate::store::{RecordStore, StoreError};

/// Case type sent with every lookup. Only civil dockets are collected.
pub const CASE_TYPE: &str = "cv";

/// Looks up the external case id and title for every unresolved record.
pub async fn resolve_identifiers(
    store: &mut RecordStore,
    client: &impl CaseResolver,
    observer: &impl StageObserver,
) -> Result<StageReport, StoreError> {
    let eligible = store.find(Stage::ResolveIds.predicate());
    info!(eligible = eligible.len(), "resolving external case identifiers");

    let mut report = StageReport::new(Stage::ResolveIds, eligible.len());
    for (key, record) in eligible {
        observer.record_started(key, &record);
        let result = resolve_one(store, client, key, &record).await;
        report.record(key, result, observer)?;
    }
    Ok(report)
}

async fn resolve_one(
    store: &mut RecordStore,
    client: &impl CaseResolver,
    key: RecordKey,
    record: &CaseRecord,
) -> Result<(), PipelineError> {
    let lookup = match client
        .resolve(&record.court, &record.docket_number, &record.office, CASE_TYPE)
        .await
    {
        Ok(lookup) => lookup,
        Err(e @ ClientError::NoMatch { .. }) => return Err(PipelineError::Lookup(e)),
        Err(e) => return Err(e.into()),
    };

    // Id and title land in one update, so a failure persists neither.
    store.update(
        key,
        &RecordUpdate::resolved(&lookup.external_case_id, &lookup.title),
    )?;
    debug!(key, external_case_id = %lookup.external_case_id, "case resolved");
    Ok(())
}
