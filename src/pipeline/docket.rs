use tracing::{debug, info};

use super::{ArtifactLayout, StageObserver, StageReport, write_artifact};
use crate::client::{Docket, DocketOptions, DocketSource};
use crate::error::PipelineError;
use crate::record::{CaseRecord, RecordKey, RecordUpdate, Stage};
use crate::store::{RecordStore, StoreError};

/// Fetches and persists the docket of every resolved record that does not
/// have one yet.
///
/// All eligible records are processed in one call, so a batch interrupted
/// halfway picks up at the first record it had not finished.
pub async fn fetch_dockets(
    store: &mut RecordStore,
    client: &impl DocketSource,
    layout: &ArtifactLayout,
    observer: &impl StageObserver,
) -> Result<StageReport, StoreError> {
    let eligible = store.find(Stage::FetchDockets.predicate());
    info!(eligible = eligible.len(), "fetching dockets");

    let options = DocketOptions::full();
    let mut report = StageReport::new(Stage::FetchDockets, eligible.len());
    for (key, record) in eligible {
        observer.record_started(key, &record);
        let result = fetch_one(store, client, layout, &options, key, &record).await;
        report.record(key, result, observer)?;
    }
    Ok(report)
}

async fn fetch_one(
    store: &mut RecordStore,
    client: &impl DocketSource,
    layout: &ArtifactLayout,
    options: &DocketOptions,
    key: RecordKey,
    record: &CaseRecord,
) -> Result<(), PipelineError> {
    let case_id = record.external_case_id.as_str();
    let docket = client.fetch_docket(&record.court, case_id, options).await?;

    let document_id = docket
        .data
        .first_document_id()
        .ok_or_else(|| PipelineError::MissingDocument {
            external_case_id: case_id.to_string(),
        })?
        .to_string();

    write_docket(layout, case_id, &docket)?;
    store.update(key, &RecordUpdate::docket_fetched(&document_id))?;
    debug!(key, external_case_id = case_id, document_id = %document_id, "docket stored");
    Ok(())
}

fn write_docket(layout: &ArtifactLayout, case_id: &str, docket: &Docket) -> Result<(), PipelineError> {
    // Going through `Value` sorts the keys.
    let value = serde_json::to_value(&docket.data)?;
    let json = serde_json::to_string_pretty(&value)?;
    write_artifact(&layout.docket_json_path(case_id), json.as_bytes())?;
    write_artifact(&layout.docket_html_path(case_id), docket.raw_response.as_bytes())?;
    Ok(())
}
