//! HTTP record store
//!
//! Saving and the existence check go through the application API; fetching
//! reads the record table through its REST interface.

use async_trait::async_trait;
use reqwest::{Client as HttpClient, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{EngineConfig, PersistenceSettings, DEFAULT_TIME_DIFF_MS};
use crate::error::{Result, ResultExt, RetypeError};
use crate::types::{PatchEntry, SessionId, SessionLog};

use super::{normalize_time_diffs, RecordStore};

/// Header carrying the session id on table fetches
pub const SESSION_HEADER: &str = "X-Session-ID";

#[derive(Serialize)]
struct SaveRequest<'a> {
    #[serde(rename = "sessionId")]
    session_id: &'a SessionId,
    records: &'a SessionLog,
}

#[derive(Deserialize)]
struct ExistsResponse {
    exists: bool,
}

/// [`RecordStore`] backed by the application API and the record table
#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    http_client: HttpClient,
    api_base: Url,
    rest_base: Url,
    api_key: Option<String>,
    table: String,
    order_by: String,
    default_time_diff_ms: u64,
}

impl HttpRecordStore {
    /// Create a store from persistence settings
    pub fn new(settings: &PersistenceSettings) -> Result<Self> {
        let http_client = HttpClient::builder()
            .user_agent(concat!("retype-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.timeout())
            .build()?;
        Self::with_client(http_client, settings)
    }

    /// Create a store from the engine config, using its persistence
    /// endpoints and the playback fallback for missing timing data
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Ok(Self::new(&config.persistence)?
            .with_default_time_diff(config.playback.default_time_diff_ms))
    }

    /// Create a store that sends requests through `http_client`
    pub fn with_client(http_client: HttpClient, settings: &PersistenceSettings) -> Result<Self> {
        let api_base = Url::parse(&settings.api_base)
            .map_err(RetypeError::from)
            .context("Invalid api_base")?;
        let rest_base = Url::parse(&settings.rest_base)
            .map_err(RetypeError::from)
            .context("Invalid rest_base")?;
        Ok(Self {
            http_client,
            api_base,
            rest_base,
            api_key: settings.api_key.clone(),
            table: settings.table.clone(),
            order_by: settings.order_by.clone(),
            default_time_diff_ms: DEFAULT_TIME_DIFF_MS,
        })
    }

    /// Override the pacing given to fetched entries without timing data
    pub fn with_default_time_diff(mut self, millis: u64) -> Self {
        self.default_time_diff_ms = millis;
        self
    }

    pub fn api_base(&self) -> &Url {
        &self.api_base
    }

    fn endpoint(base: &Url, segments: &[&str]) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| RetypeError::Config(format!("{} cannot be a base URL", base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn table_url(&self, session_id: &SessionId) -> Result<Url> {
        let mut url = Self::endpoint(&self.rest_base, &[self.table.as_str()])?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("session_id", &format!("eq.{}", session_id))
            .append_pair("order", &format!("{}.asc", self.order_by));
        Ok(url)
    }

    /// Turn a non-success status into a persistence failure
    async fn check(operation: &str, response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::error!(operation, %status, %body, "Record store request failed");
        Err(RetypeError::PersistenceFailure(format!(
            "{} returned {}: {}",
            operation, status, body
        )))
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    async fn save(&self, session_id: &SessionId, log: &SessionLog) -> Result<()> {
        let url = Self::endpoint(&self.api_base, &["api", "saveRecords"])?;
        let body = SaveRequest {
            session_id,
            records: log,
        };

        let response = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(RetypeError::from)
            .context("saveRecords request failed")?;
        Self::check("saveRecords", response).await?;

        tracing::info!(%session_id, entries = log.len(), "Saved session log");
        Ok(())
    }

    async fn exists(&self, session_id: &SessionId) -> Result<bool> {
        let mut url = Self::endpoint(&self.api_base, &["api", "checkSession"])?;
        url.query_pairs_mut()
            .append_pair("sessionId", session_id.as_str());

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(RetypeError::from)
            .context("checkSession request failed")?;
        let response = Self::check("checkSession", response).await?;
        let body: ExistsResponse = response
            .json()
            .await
            .map_err(RetypeError::from)
            .context("checkSession returned an unexpected body")?;

        tracing::debug!(%session_id, exists = body.exists, "Checked session id");
        Ok(body.exists)
    }

    async fn fetch_by_session(&self, session_id: &SessionId) -> Result<SessionLog> {
        let url = self.table_url(session_id)?;
        let mut request = self
            .http_client
            .get(url)
            .header(SESSION_HEADER, session_id.as_str());
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key).bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(RetypeError::from)
            .context("Record fetch failed")?;
        let response = Self::check("fetch", response).await?;
        let rows: Vec<PatchEntry> = response
            .json()
            .await
            .map_err(RetypeError::from)
            .context("Record fetch returned malformed rows")?;

        let mut log = SessionLog::from_entries(rows);
        normalize_time_diffs(&mut log, self.default_time_diff_ms);
        tracing::info!(%session_id, entries = log.len(), "Fetched session log");
        Ok(log)
    }
}
