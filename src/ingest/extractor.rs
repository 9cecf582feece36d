//! Raw layer extractor
//!
//! Downloads source files and paginated API payloads into the raw layer
//! without modifying them, then loads them as tables.

use crate::config::HttpConfig;
use crate::dataset::{Dataset, DatasetInput, Table};
use crate::engine::{CsvOptions, InputFormat, QueryEngine};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestOptions};
use crate::output::json_to_arrow;
use crate::types::ParsePolicy;
use serde_json::Value;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Upper bound for a single backoff delay
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Fetches raw sources over HTTP and persists verbatim copies
#[derive(Debug)]
pub struct RawExtractor {
    client: HttpClient,
    download_timeout: Duration,
    read_timeout: Duration,
    api_timeout: Duration,
    policy: ParsePolicy,
}

impl RawExtractor {
    /// Create an extractor from the HTTP settings
    pub fn new(settings: &HttpConfig) -> Result<Self> {
        let config = HttpClientConfig::builder()
            .timeout(settings.download_timeout())
            .max_retries(settings.max_retries)
            .backoff(settings.backoff_type, settings.backoff(), MAX_BACKOFF)
            .build();

        Ok(Self {
            client: HttpClient::with_config(config)?,
            download_timeout: settings.download_timeout(),
            read_timeout: settings.read_timeout(),
            api_timeout: settings.api_timeout(),
            policy: ParsePolicy::Permissive,
        })
    }

    /// Set how malformed rows are handled when loading downloaded files
    #[must_use]
    pub fn with_parse_policy(mut self, policy: ParsePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Download a delimited text file and load it
    ///
    /// An existing file at `destination` is reused without any network
    /// access. Otherwise the body is streamed to a sibling `.part` file
    /// that is renamed into place once complete and removed on failure.
    /// `options` decide which columns keep their source text; the parse
    /// policy of the extractor overrides the one they carry.
    pub async fn fetch_file(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
        options: CsvOptions,
    ) -> Result<Dataset> {
        let destination = destination.as_ref();

        if destination.is_file() {
            info!("Using cached file {}", destination.display());
        } else {
            self.download(url, destination).await?;
        }

        let table = load_csv(destination, options.policy(self.policy))?;
        info!(
            "Loaded {} rows from {}",
            table.num_rows(),
            destination.display()
        );
        Ok(Dataset::new(table, destination))
    }

    /// Fetch one API page per key and persist the concatenated payload
    ///
    /// Pages are requested from `{base_url}/{page}/{key}`. A page that
    /// fails is logged and skipped; if no page succeeds, or the pages hold
    /// no records at all, the call fails with [`Error::NoData`] and nothing
    /// is written. The combined records are written to
    /// `destination` as a pretty-printed JSON array.
    pub async fn fetch_paginated_api<K: Display>(
        &self,
        base_url: &str,
        key: &str,
        page_keys: &[K],
        destination: impl AsRef<Path>,
    ) -> Result<Dataset> {
        let destination = destination.as_ref();
        let base = base_url.trim_end_matches('/');

        let mut records: Vec<Value> = Vec::new();
        let mut fetched_pages = 0usize;

        for page in page_keys {
            let url = format!("{base}/{page}/{key}");
            let request = RequestOptions::new().timeout(self.api_timeout);
            match self
                .client
                .get_json::<Vec<Value>>(&url, request)
                .await
            {
                Ok(items) => {
                    debug!("Fetched {} records from {}", items.len(), url);
                    fetched_pages += 1;
                    records.extend(items);
                }
                Err(e) => warn!("Skipping page {}: {}", url, e),
            }
        }

        if fetched_pages == 0 {
            return Err(Error::no_data(format!(
                "none of {} pages from {base} could be fetched",
                page_keys.len()
            )));
        }
        if records.is_empty() {
            return Err(Error::no_data(format!(
                "{fetched_pages} pages from {base} returned no records"
            )));
        }

        ensure_parent(destination).await?;
        tokio::fs::write(destination, serde_json::to_vec_pretty(&records)?).await?;
        info!(
            "Saved {} records from {}/{} pages to {}",
            records.len(),
            fetched_pages,
            page_keys.len(),
            destination.display()
        );

        let table = Table::from_batch(json_to_arrow(&records, None)?);
        Ok(Dataset::new(table, destination))
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<()> {
        ensure_parent(destination).await?;
        let partial = partial_path(destination);

        info!("Downloading {} to {}", url, destination.display());
        match self.stream_to_file(url, &partial).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial, destination).await?;
                info!("Downloaded {} bytes to {}", bytes, destination.display());
                Ok(())
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    debug!(
                        "No partial file to remove at {}: {}",
                        partial.display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    async fn stream_to_file(&self, url: &str, path: &Path) -> Result<u64> {
        let request = RequestOptions::new().timeout(self.download_timeout);
        let mut response = self.client.get(url, request).await?;
        let mut file = tokio::fs::File::create(path).await?;
        let mut written = 0u64;

        loop {
            let chunk = tokio::time::timeout(self.read_timeout, response.chunk())
                .await
                .map_err(|_| Error::Timeout {
                    timeout_ms: self.read_timeout.as_millis() as u64,
                })??;
            let Some(bytes) = chunk else { break };
            file.write_all(&bytes).await?;
            written += bytes.len() as u64;
        }

        file.flush().await?;
        Ok(written)
    }
}

/// Load a delimited text file into an in-memory table
pub fn load_csv(path: &Path, options: CsvOptions) -> Result<Table> {
    let engine = QueryEngine::new()?;
    engine.register_input(
        "raw",
        &DatasetInput::from(path),
        &InputFormat::Csv(options),
    )?;
    engine.query_table("SELECT * FROM raw")
}

fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

