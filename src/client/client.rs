use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use tracing::debug;

use super::error::ClientError;
use super::types::{CaseLookup, Docket, DocketData, DocketOptions};
use super::{CaseResolver, DocketSource, DocumentSource};
use crate::config::DocketrunConfig;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP client for the court-records service.
///
/// Credentials, when configured, are sent as basic auth on every request.
/// Court, case and document ids are opaque and always percent-encoded as
/// single path segments.
pub struct CourtRecordsClient {
    client: Client,
    base_url: Url,
    credentials: Option<(String, String)>,
}

impl CourtRecordsClient {
    #[allow(dead_code)]
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_timeouts(base_url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(
        base_url: impl Into<String>,
        connect_timeout: Duration,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .map_err(|e| ClientError::InvalidBaseUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::InvalidBaseUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            client,
            base_url,
            credentials: None,
        })
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    /// Builds a client from the `base_url`, timeouts and credentials in `config`.
    pub fn from_config(config: &DocketrunConfig) -> Result<Self, ClientError> {
        let client = Self::with_timeouts(
            config.base_url.clone(),
            Duration::from_secs(config.connect_timeout_secs),
            Duration::from_secs(config.request_timeout_secs),
        )?;
        Ok(if config.username.is_empty() {
            client
        } else {
            client.with_credentials(config.username.clone(), config.password.clone())
        })
    }

    /// Appends `segments` to the base URL, one encoded path segment each.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn get(&self, segments: &[&str]) -> Result<RequestBuilder, ClientError> {
        let url = self.endpoint(segments)?;
        debug!(url = %url, "GET");
        let request = self.client.get(url);
        Ok(match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        })
    }
}

/// Turns any non-2xx response into [`ClientError::ApiError`].
async fn ensure_success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    Err(ClientError::ApiError {
        status: status.as_u16(),
        message,
    })
}

impl CaseResolver for CourtRecordsClient {
    async fn resolve(
        &self,
        court: &str,
        docket_number: &str,
        office: &str,
        case_type: &str,
    ) -> Result<CaseLookup, ClientError> {
        let no_match = || ClientError::NoMatch {
            court: court.to_string(),
            docket_number: docket_number.to_string(),
            office: office.to_string(),
        };

        let response = self
            .get(&["courts", court, "case-lookup"])?
            .query(&[
                ("docket_number", docket_number),
                ("office", office),
                ("case_type", case_type),
            ])
            .send()
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(no_match());
        }

        let lookup = ensure_success(response)
            .await?
            .json::<CaseLookup>()
            .await
            .map_err(|e| ClientError::ParseError(e.to_string()))?;
        if lookup.external_case_id.is_empty() {
            return Err(no_match());
        }
        Ok(lookup)
    }
}

impl DocketSource for CourtRecordsClient {
    async fn fetch_docket(
        &self,
        court: &str,
        external_case_id: &str,
        options: &DocketOptions,
    ) -> Result<Docket, ClientError> {
        let response = self
            .get(&["courts", court, "cases", external_case_id, "docket"])?
            .query(&options.query_pairs())
            .send()
            .await?;

        let raw_response = ensure_success(response).await?.text().await?;
        let data: DocketData = serde_json::from_str(&raw_response)
            .map_err(|e| ClientError::ParseError(format!("docket {external_case_id}: {e}")))?;
        Ok(Docket { data, raw_response })
    }
}

impl DocumentSource for CourtRecordsClient {
    async fn fetch_document(
        &self,
        court: &str,
        external_case_id: &str,
        document_id: &str,
    ) -> Result<Vec<u8>, ClientError> {
        let response = self
            .get(&[
                "courts",
                court,
                "cases",
                external_case_id,
                "documents",
                document_id,
            ])?
            .send()
            .await?;

        let bytes = ensure_success(response).await?.bytes().await?;
        Ok(bytes.to_vec())
    }
}
