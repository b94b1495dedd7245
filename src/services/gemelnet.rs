//! Gemelnet (data.gov.il CKAN datastore) client
//!
//! Pages through the `datastore_search` action of a resource. A failed page
//! fails the whole fetch; there is no retry and no partial result.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// One raw row of the dataset: column name → string/number/null.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

pub const DEFAULT_API_URL: &str = "https://data.gov.il/api/3/action/datastore_search";

/// Monthly provident-fund reports, the resource the sync reads by default
pub const DEFAULT_RESOURCE_ID: &str = "a30dcbea-a1d2-482c-ae29-8f781f5025fb";

/// Fund performance reports from 2016 onwards
pub const RECENT_RESOURCE_ID: &str = "2016d770-f094-4a2e-983e-797c26479720";

/// Fund performance reports from 1999, used to backfill history
pub const HISTORICAL_RESOURCE_ID: &str = "91c849ed-ddc4-472b-bd09-0f5486cea35c";

pub const DEFAULT_BATCH_SIZE: usize = 1000;

const DEFAULT_TIMEOUT_SECS: u64 = 60;

const ENV_API_URL: &str = "GEMELNET_API_URL";
const ENV_RESOURCE_ID: &str = "GEMELNET_RESOURCE_ID";
const ENV_BATCH_SIZE: &str = "GEMELNET_BATCH_SIZE";
const ENV_TIMEOUT_SECS: &str = "GEMELNET_TIMEOUT_SECS";

/// Which report archives a backfill reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillSource {
    Recent,
    Historical,
    Both,
}

impl BackfillSource {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "recent" => Some(Self::Recent),
            "historical" => Some(Self::Historical),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    /// Resource ids in fetch order. For `Both` the recent archive comes
    /// first, so its rows win where the archives overlap.
    pub fn resource_ids(self) -> Vec<String> {
        let ids: &[&str] = match self {
            Self::Recent => &[RECENT_RESOURCE_ID],
            Self::Historical => &[HISTORICAL_RESOURCE_ID],
            Self::Both => &[RECENT_RESOURCE_ID, HISTORICAL_RESOURCE_ID],
        };
        ids.iter().map(|id| id.to_string()).collect()
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Gemelnet request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Gemelnet API error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Gemelnet API returned an unsuccessful response: {0}")]
    Unsuccessful(String),

    #[error("Malformed Gemelnet response: {0}")]
    Malformed(String),
}

/// One page of the dataset.
#[derive(Debug, Clone, Default)]
pub struct DatasetPage {
    pub records: Vec<RawRecord>,
    /// Total record count reported by the source
    pub total: usize,
}

#[derive(Debug, Deserialize)]
struct DatastoreResponse {
    success: bool,
    #[serde(default)]
    result: Option<DatastoreResult>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct DatastoreResult {
    #[serde(default)]
    records: Vec<RawRecord>,
    #[serde(default)]
    total: Option<u64>,
}

/// Source of dataset pages. The HTTP client implements it; tests provide
/// in-memory datasets.
#[async_trait]
pub trait DatasetClient: Send + Sync {
    async fn fetch_page(
        &self,
        resource_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<DatasetPage, FetchError>;
}

/// Connection settings for the Gemelnet API, read from the environment.
#[derive(Debug, Clone)]
pub struct GemelnetConfig {
    pub api_url: String,
    pub resource_id: String,
    pub batch_size: usize,
    pub timeout: Duration,
}

impl Default for GemelnetConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            resource_id: DEFAULT_RESOURCE_ID.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl GemelnetConfig {
    /// Environment Variables
    ///
    /// * `GEMELNET_API_URL` - datastore_search endpoint
    /// * `GEMELNET_RESOURCE_ID` - dataset resource id
    /// * `GEMELNET_BATCH_SIZE` - records per page (default: 1000)
    /// * `GEMELNET_TIMEOUT_SECS` - per-request timeout (default: 60)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let batch_size = env::var(ENV_BATCH_SIZE)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .filter(|n| *n > 0)
            .unwrap_or(defaults.batch_size);

        let timeout = env::var(ENV_TIMEOUT_SECS)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout);

        Self {
            api_url: env::var(ENV_API_URL).unwrap_or(defaults.api_url),
            resource_id: env::var(ENV_RESOURCE_ID).unwrap_or(defaults.resource_id),
            batch_size,
            timeout,
        }
    }
}

#[derive(Clone)]
pub struct GemelnetService {
    client: Client,
    api_url: String,
}

impl GemelnetService {
    pub fn new(config: &GemelnetConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

#[async_trait]
impl DatasetClient for GemelnetService {
    async fn fetch_page(
        &self,
        resource_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<DatasetPage, FetchError> {
        tracing::debug!(resource_id, limit, offset, "Fetching Gemelnet page");

        let response = self
            .client
            .get(&self.api_url)
            .header("accept", "application/json")
            .query(&[
                ("resource_id", resource_id.to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(FetchError::Status { status, body });
        }

        let data: DatastoreResponse = response
            .json()
            .await
            .map_err(|e| FetchError::Malformed(e.to_string()))?;

        parse_datastore_response(data)
    }
}

fn parse_datastore_response(data: DatastoreResponse) -> Result<DatasetPage, FetchError> {
    if !data.success {
        let detail = data
            .error
            .map(|e| e.to_string())
            .unwrap_or_else(|| "no error detail".to_string());
        return Err(FetchError::Unsuccessful(detail));
    }

    let result = data
        .result
        .ok_or_else(|| FetchError::Malformed("missing `result` object".to_string()))?;

    Ok(DatasetPage {
        records: result.records,
        total: result.total.unwrap_or(0) as usize,
    })
}

/// Fetch every record of a resource.
///
/// With an explicit `limit` a single page of `limit` rows is requested.
/// Otherwise pages of `batch_size` are requested until a page comes back
/// empty or the source-reported total has been reached.
pub async fn fetch_all_records(
    client: &dyn DatasetClient,
    resource_id: &str,
    limit: Option<usize>,
    batch_size: usize,
) -> Result<Vec<RawRecord>, FetchError> {
    let page_size = limit.unwrap_or(batch_size);
    let mut all_records: Vec<RawRecord> = Vec::new();
    let mut offset = 0;

    tracing::info!(resource_id, ?limit, page_size, "Fetching data from Gemelnet API");

    loop {
        let page = client.fetch_page(resource_id, page_size, offset).await?;

        if page.records.is_empty() {
            break;
        }

        all_records.extend(page.records);

        tracing::info!(
            fetched = all_records.len(),
            total = page.total,
            "Fetched Gemelnet records"
        );

        if limit.is_some() || all_records.len() >= page.total {
            break;
        }

        offset += batch_size;
    }

    tracing::info!(count = all_records.len(), "Finished fetching Gemelnet records");

    Ok(all_records)
}
