pub mod client;
pub mod error;
pub mod types;

pub use client::CourtRecordsClient;
pub use error::ClientError;
pub use types::{CaseLookup, Docket, DocketOptions};

/// Looks up the service's own identifier for a docket number.
#[allow(async_fn_in_trait)]
pub trait CaseResolver {
    async fn resolve(
        &self,
        court: &str,
        docket_number: &str,
        office: &str,
        case_type: &str,
    ) -> Result<CaseLookup, ClientError>;
}

/// Fetches a case's docket: structured data plus the raw response body.
#[allow(async_fn_in_trait)]
pub trait DocketSource {
    async fn fetch_docket(
        &self,
        court: &str,
        external_case_id: &str,
        options: &DocketOptions,
    ) -> Result<Docket, ClientError>;
}

/// Downloads the binary content of one document.
#[allow(async_fn_in_trait)]
pub trait DocumentSource {
    async fn fetch_document(
        &self,
        court: &str,
        external_case_id: &str,
        document_id: &str,
    ) -> Result<Vec<u8>, ClientError>;
}
