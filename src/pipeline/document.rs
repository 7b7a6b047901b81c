use tracing::{debug, info};

use super::{ArtifactLayout, StageObserver, StageReport, write_artifact};
use crate::client::DocumentSource;
use crate::error::PipelineError;
use crate::record::{CaseRecord, RecordKey, RecordUpdate, Stage};
use crate::store::{RecordStore, StoreError};

/// Downloads the first docket document of every record whose docket is in.
pub async fn fetch_documents(
    store: &mut RecordStore,
    client: &impl DocumentSource,
    layout: &ArtifactLayout,
    observer: &impl StageObserver,
) -> Result<StageReport, StoreError> {
    let eligible = store.find(Stage::FetchDocuments.predicate());
    info!(eligible = eligible.len(), "fetching documents");

    let mut report = StageReport::new(Stage::FetchDocuments, eligible.len());
    for (key, record) in eligible {
        observer.record_started(key, &record);
        let result = fetch_one(store, client, layout, key, &record).await;
        report.record(key, result, observer)?;
    }
    Ok(report)
}

async fn fetch_one(
    store: &mut RecordStore,
    client: &impl DocumentSource,
    layout: &ArtifactLayout,
    key: RecordKey,
    record: &CaseRecord,
) -> Result<(), PipelineError> {
    let case_id = record.external_case_id.as_str();
    // The predicate only matches records with a document id.
    let Some(document_id) = record.document_id.as_deref() else {
        return Err(PipelineError::MissingDocument {
            external_case_id: case_id.to_string(),
        });
    };

    info!(key, external_case_id = case_id, title = %record.title, "collecting document");
    let bytes = client
        .fetch_document(&record.court, case_id, document_id)
        .await?;
    write_artifact(&layout.document_path(case_id), &bytes)?;

    store.update(key, &RecordUpdate::document_fetched())?;
    debug!(key, external_case_id = case_id, size = bytes.len(), "document stored");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{ScriptedClient, docket_done, resolved, temp_store};
    use crate::record::StageState;
    use std::fs;

    #[tokio::test]
    async fn writes_document_and_completes_record() {
        let (tmp, mut store) = temp_store();
        let layout = ArtifactLayout::new(tmp.path().join("downloads"));
        let key = store.insert(docket_done("12-cv-00345", "123456", "0001")).unwrap();
        let client = ScriptedClient::default().with_document("123456", b"%PDF-1.7 body");

        let report = fetch_documents(&mut store, &client, &layout, &()).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(client.calls(), vec!["document mad 123456 0001"]);
        assert_eq!(
            fs::read(layout.document_path("123456")).unwrap(),
            b"%PDF-1.7 body"
        );

        let record = store.get(key).unwrap();
        assert!(record.document_done);
        assert_eq!(record.state(), StageState::Complete);
    }

    #[tokio::test]
    async fn fetch_failure_leaves_record_eligible() {
        let (tmp, mut store) = temp_store();
        let layout = ArtifactLayout::new(tmp.path().join("downloads"));
        let failing = store.insert(docket_done("12-cv-00001", "101", "0001")).unwrap();
        let ok = store.insert(docket_done("12-cv-00002", "102", "0002")).unwrap();
        let client = ScriptedClient::default()
            .failing_for("101")
            .with_document("102", b"pdf");

        let report = fetch_documents(&mut store, &client, &layout, &()).await.unwrap();
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].key, failing);
        assert!(matches!(report.failures[0].error, PipelineError::Client(_)));

        assert!(Stage::FetchDocuments.is_eligible(store.get(failing).unwrap()));
        assert!(!layout.document_path("101").exists());
        assert!(store.get(ok).unwrap().document_done);
    }

    #[tokio::test]
    async fn write_failure_does_not_mark_done() {
        let (tmp, mut store) = temp_store();
        let downloads = tmp.path().join("downloads");
        // A plain file where the document directory should be.
        fs::create_dir_all(&downloads).unwrap();
        fs::write(downloads.join("pdf"), b"not a dir").unwrap();
        let layout = ArtifactLayout::new(&downloads);

        let key = store.insert(docket_done("12-cv-00345", "123456", "0001")).unwrap();
        let client = ScriptedClient::default().with_document("123456", b"pdf");

        let report = fetch_documents(&mut store, &client, &layout, &()).await.unwrap();
        assert!(matches!(report.failures[0].error, PipelineError::Io { .. }));
        assert!(!store.get(key).unwrap().document_done);
    }

    #[tokio::test]
    async fn records_without_docket_are_skipped() {
        let (tmp, mut store) = temp_store();
        let layout = ArtifactLayout::new(tmp.path().join("downloads"));
        store.insert(resolved("12-cv-00345", "123456")).unwrap();
        let client = ScriptedClient::default().with_document("123456", b"pdf");

        let report = fetch_documents(&mut store, &client, &layout, &()).await.unwrap();
        assert_eq!(report.eligible, 0);
        assert!(client.calls().is_empty());
    }

    #[tokio::test]
    async fn second_run_is_a_no_op() {
        let (tmp, mut store) = temp_store();
        let layout = ArtifactLayout::new(tmp.path().join("downloads"));
        store.insert(docket_done("12-cv-00345", "123456", "0001")).unwrap();
        let client = ScriptedClient::default().with_document("123456", b"pdf");

        fetch_documents(&mut store, &client, &layout, &()).await.unwrap();
        let report = fetch_documents(&mut store, &client, &layout, &()).await.unwrap();
        assert_eq!(report.eligible, 0);
        assert_eq!(client.calls().len(), 1);
    }
}
