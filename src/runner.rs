use anyhow::{Context, Result};

use crate::client::{CaseResolver, DocketSource, DocumentSource};
use crate::pipeline::{
    ArchiveBundle, ArtifactLayout, StageObserver, StageReport, archive_outputs, fetch_dockets,
    fetch_documents, resolve_identifiers,
};
use crate::record::Stage;
use crate::store::RecordStore;

/// What one invocation produced.
#[derive(Debug)]
pub enum RunOutcome {
    Records(StageReport),
    Archived(Vec<ArchiveBundle>),
}

impl RunOutcome {
    /// True when nothing failed along the way.
    pub fn is_clean(&self) -> bool {
        match self {
            RunOutcome::Records(report) => report.is_clean(),
            RunOutcome::Archived(_) => true,
        }
    }
}

/// Runs exactly one pipeline stage per call against the record store.
pub struct Runner<C> {
    store: RecordStore,
    /// Court-records client. Only the archive stage runs without one.
    client: Option<C>,
    layout: ArtifactLayout,
}

impl<C> Runner<C>
where
    C: CaseResolver + DocketSource + DocumentSource,
{
    pub fn new(store: RecordStore, client: Option<C>, layout: ArtifactLayout) -> Self {
        Self {
            store,
            client,
            layout,
        }
    }

    #[allow(dead_code)]
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub async fn run(&mut self, stage: Stage, observer: &impl StageObserver) -> Result<RunOutcome> {
        if stage == Stage::Archive {
            let bundles = archive_outputs(&self.layout).context("failed to archive outputs")?;
            return Ok(RunOutcome::Archived(bundles));
        }

        let client = self.client.as_ref().with_context(|| {
            format!("{stage} needs the court-records service; set base_url in docketrun.toml")
        })?;

        let report = match stage {
            Stage::ResolveIds => resolve_identifiers(&mut self.store, client, observer).await,
            Stage::FetchDockets => {
                fetch_dockets(&mut self.store, client, &self.layout, observer).await
            }
            Stage::FetchDocuments => {
                fetch_documents(&mut self.store, client, &self.layout, observer).await
            }
            Stage::Archive => unreachable!("archive handled above"),
        }
        .with_context(|| format!("{stage} aborted on a record store failure"))?;

        Ok(RunOutcome::Records(report))
    }
}
