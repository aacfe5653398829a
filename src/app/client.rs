//! HTTP client for the BDC map API
//!
//! The public map API authenticates with plain `username`/`hash_value`
//! request headers and serves JSON listings wrapped in a `data` envelope
//! plus raw file downloads. The client owns rate limiting and status
//! mapping; it performs exactly one attempt per file transfer — retry is a
//! caller decision, never done here.

use std::collections::HashSet;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use governor::{clock::DefaultClock, state::InMemoryState, Jitter, Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::Client;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::app::catalog::{normalize_as_of_date, ChallengeCatalog, ReferenceCatalog};
use crate::app::planner::SelectedFile;
use crate::auth::Credentials;
use crate::constants::{api, http, limits};
use crate::errors::{SourceError, SourceResult, TransferError, TransferResult};

/// Configuration for the map API client
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the map API
    pub base_url: String,
    /// Request timeout
    pub request_timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
    /// Connection pool idle timeout
    pub pool_idle_timeout: Option<Duration>,
    /// Maximum connections per host
    pub pool_max_per_host: usize,
    /// Rate limit (requests per second)
    pub rate_limit_rps: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: api::DEFAULT_BASE_URL.to_string(),
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            pool_idle_timeout: Some(http::POOL_IDLE_TIMEOUT),
            pool_max_per_host: http::POOL_MAX_PER_HOST,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
        }
    }
}

/// An as-of date the service can serve a catalog for
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct AsOfDate {
    #[serde(default)]
    pub data_type: String,
    pub as_of_date: String,
}

/// HTTP client for the BDC map API
#[derive(Debug)]
pub struct BdcClient {
    client: Client,
    rate_limiter: RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock>,
    base_url: Url,
}

impl BdcClient {
    /// Create a client with default configuration
    pub fn new(credentials: &Credentials) -> SourceResult<Self> {
        Self::with_config(credentials, ClientConfig::default())
    }

    /// Create a client with explicit configuration
    pub fn with_config(credentials: &Credentials, config: ClientConfig) -> SourceResult<Self> {
        let base_url = Url::parse(&config.base_url).map_err(|_| SourceError::InvalidUrl {
            url: config.base_url.clone(),
        })?;
        let client = Self::build_http_client(credentials, &config)?;
        let rate_limiter = Self::build_rate_limiter(config.rate_limit_rps);

        tracing::debug!(base_url = %base_url, "created BDC map API client");

        Ok(Self {
            client,
            rate_limiter,
            base_url,
        })
    }

    fn build_http_client(credentials: &Credentials, config: &ClientConfig) -> SourceResult<Client> {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::HEADER_USERNAME,
            HeaderValue::from_str(credentials.username()).map_err(|_| {
                SourceError::InvalidUrl {
                    url: "username header".to_string(),
                }
            })?,
        );
        headers.insert(
            http::HEADER_HASH_VALUE,
            HeaderValue::from_str(credentials.hash_value()).map_err(|_| {
                SourceError::InvalidUrl {
                    url: "hash_value header".to_string(),
                }
            })?,
        );

        let mut builder = Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(http::USER_AGENT)
            .pool_max_idle_per_host(config.pool_max_per_host);

        if let Some(idle_timeout) = config.pool_idle_timeout {
            builder = builder.pool_idle_timeout(idle_timeout);
        }

        builder.build().map_err(SourceError::Http)
    }

    fn build_rate_limiter(
        rate_limit_rps: u32,
    ) -> RateLimiter<governor::state::NotKeyed, InMemoryState, DefaultClock> {
        let quota = Quota::per_second(
            NonZeroU32::new(rate_limit_rps).unwrap_or(NonZeroU32::MIN),
        );
        RateLimiter::direct(quota)
    }

    fn endpoint(&self, path: &str) -> SourceResult<Url> {
        self.base_url
            .join(path)
            .map_err(|_| SourceError::InvalidUrl {
                url: format!("{}{}", self.base_url, path),
            })
    }

    /// Issue a rate-limited GET and map the status class: 401 carries the
    /// credential hint, other 4xx are rejections, 5xx is unavailability
    async fn get(&self, url: Url) -> SourceResult<reqwest::Response> {
        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.as_u16() == 401 {
            return Err(SourceError::Unauthorized);
        }
        if status.is_client_error() {
            return Err(SourceError::Rejected {
                status: status.as_u16(),
            });
        }
        if status.is_server_error() {
            return Err(SourceError::Unavailable {
                status: status.as_u16(),
            });
        }
        tracing::debug!(%url, %status, "map API request succeeded");
        Ok(response)
    }

    /// Fetch a JSON listing and unwrap its `data` envelope
    async fn get_listing(&self, url: Url) -> SourceResult<serde_json::Value> {
        let response = self.get(url).await?;
        let body: serde_json::Value = response.json().await?;
        Ok(body.get("data").cloned().unwrap_or(serde_json::Value::Null))
    }

    /// List the as-of dates catalogs can be fetched for, normalized to
    /// `YYYY-MM-DD`
    pub async fn list_as_of_dates(&self) -> SourceResult<Vec<AsOfDate>> {
        let url = self.endpoint(api::LIST_AS_OF_DATES)?;
        let data = self.get_listing(url).await?;
        let mut dates: Vec<AsOfDate> = serde_json::from_value(data)?;
        for entry in &mut dates {
            if let Some(normalized) = normalize_as_of_date(&entry.as_of_date) {
                entry.as_of_date = normalized;
            }
        }
        Ok(dates)
    }

    /// Fetch the availability reference catalog for one as-of date
    pub async fn fetch_reference_catalog(
        &self,
        as_of_date: &str,
    ) -> SourceResult<ReferenceCatalog> {
        let url = self.endpoint(&format!("{}/{}", api::LIST_AVAILABILITY_DATA, as_of_date))?;
        let data = self.get_listing(url).await?;
        let catalog = ReferenceCatalog::from_json_data(as_of_date, &data)?;

        // file_id is unique within one fetch; a duplicate means the
        // listing itself is suspect
        let mut seen = HashSet::new();
        for row in catalog.rows() {
            if !seen.insert(row.file_id.as_str()) {
                tracing::warn!(file_id = %row.file_id, "duplicate file_id in reference listing");
            }
        }

        tracing::info!(
            as_of_date,
            rows = catalog.len(),
            "fetched availability reference catalog"
        );
        Ok(catalog)
    }

    /// Fetch the challenge listing for one as-of date and category
    pub async fn list_challenge_data(
        &self,
        as_of_date: &str,
        category: &str,
    ) -> SourceResult<ChallengeCatalog> {
        let mut url = self.endpoint(&format!("{}/{}", api::LIST_CHALLENGE_DATA, as_of_date))?;
        url.query_pairs_mut().append_pair("category", category);
        let data = self.get_listing(url).await?;
        let catalog = ChallengeCatalog::from_json_data(as_of_date, category, &data)?;
        tracing::info!(
            as_of_date,
            category,
            rows = catalog.len(),
            "fetched challenge listing"
        );
        Ok(catalog)
    }

    /// Build the download endpoint path for a selected file. GIS downloads
    /// append the numeric format code; plain CSV payloads omit it.
    pub fn download_path(selected: &SelectedFile) -> String {
        match selected.gis_format {
            Some(format) => format!(
                "{}/{}/{}/{}",
                api::DOWNLOAD_FILE,
                selected.data_type,
                selected.file_id,
                format.download_code()
            ),
            None => format!(
                "{}/{}/{}",
                api::DOWNLOAD_FILE,
                selected.data_type,
                selected.file_id
            ),
        }
    }

    /// Download one selected file into `dest_dir` under its synthesized
    /// name. One attempt, no retry; a failure is reported to the caller
    /// and the rest of the batch is their decision.
    pub async fn download_file(
        &self,
        selected: &SelectedFile,
        dest_dir: &Path,
    ) -> TransferResult<PathBuf> {
        let path = Self::download_path(selected);
        let url = self
            .base_url
            .join(&path)
            .map_err(|_| TransferError::Status {
                status: 0,
                file_id: selected.file_id.clone(),
            })?;

        self.rate_limiter
            .until_ready_with_jitter(Jitter::up_to(Duration::from_millis(100)))
            .await;

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                status: status.as_u16(),
                file_id: selected.file_id.clone(),
            });
        }

        let destination = dest_dir.join(&selected.file_name);
        let bytes = response.bytes().await?;

        let io_err = |source| TransferError::Io {
            path: destination.clone(),
            source,
        };
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let mut file = File::create(&destination).await.map_err(io_err)?;
        file.write_all(&bytes).await.map_err(io_err)?;
        file.flush().await.map_err(io_err)?;

        tracing::info!(file = %destination.display(), bytes = bytes.len(), "saved download");
        Ok(destination)
    }
}
