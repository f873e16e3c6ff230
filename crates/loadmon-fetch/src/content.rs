//! Remote content-store client.
//!
//! The upstream is a GitHub-contents-style API: a GET keyed by path
//! returns either a directory listing (entries with `path`,
//! `download_url`, `type`) or a file payload. HTTP 403 is the upstream's
//! rate-limit signal and maps to [`FetchError::RateLimited`]; any other
//! non-2xx status is a generic [`FetchError::Http`].

use crate::error::{FetchError, Result};
use crate::Fetcher;
use async_trait::async_trait;
use loadmon_common::records;
use loadmon_common::types::Sample;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Dir,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentEntry {
    pub path: String,
    pub download_url: Option<String>,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
}

/// Maps a response status to an error classification, or `None` for 2xx.
pub fn classify_status(status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }
    if status == StatusCode::FORBIDDEN {
        return Some(FetchError::RateLimited);
    }
    Some(FetchError::Http {
        status: status.as_u16(),
        body: String::new(),
    })
}

pub struct ContentStore {
    base_url: String,
    client: Client,
}

impl ContentStore {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Ok(Self { base_url, client })
    }

    fn url_for(&self, path: &str) -> String {
        if path == "/" || path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    async fn get_checked(&self, url: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?;
        let status = response.status();
        match classify_status(status) {
            None => Ok(response),
            Some(FetchError::Http { status, .. }) => {
                let body = response.text().await.unwrap_or_default();
                Err(FetchError::Http { status, body })
            }
            Some(err) => Err(err),
        }
    }

    /// Lists the entries under `path`.
    pub async fn list(&self, path: &str) -> Result<Vec<ContentEntry>> {
        let url = self.url_for(path);
        let response = self.get_checked(&url).await?;
        let entries: Vec<ContentEntry> = response.json().await?;
        Ok(entries)
    }

    /// Downloads a file payload by its direct URL.
    pub async fn download(&self, url: &str) -> Result<String> {
        let response = self.get_checked(url).await?;
        Ok(response.text().await?)
    }
}

/// Resolves a host alias to its decoded sample series: list the host's
/// directory, download the most recent export file, decode the CSV body.
///
/// Designed to sit behind a [`crate::cache::FetchCache`] so overlapping
/// consumers share one upstream round trip per alias.
pub struct SampleFetcher {
    store: ContentStore,
}

impl SampleFetcher {
    pub fn new(store: ContentStore) -> Self {
        Self { store }
    }

    fn latest_file(mut entries: Vec<ContentEntry>) -> Option<ContentEntry> {
        entries.retain(|e| e.entry_type == EntryType::File);
        // Export filenames embed the period (`alias-YYYY-MM.csv`), so
        // lexicographic order is chronological.
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries.pop()
    }

    async fn fetch_samples(&self, alias: &str) -> Result<Vec<Sample>> {
        let entries = self.store.list(alias).await?;
        let latest = Self::latest_file(entries).ok_or_else(|| FetchError::NoData {
            path: alias.to_string(),
        })?;
        let url = latest.download_url.ok_or_else(|| FetchError::NoData {
            path: latest.path.clone(),
        })?;
        let body = self.store.download(&url).await?;
        let samples = records::read_records_str(&body)?;
        tracing::debug!(alias, rows = samples.len(), file = %latest.path, "Fetched sample series");
        Ok(samples)
    }
}

#[async_trait]
impl Fetcher for SampleFetcher {
    type Output = Vec<Sample>;

    async fn fetch(&self, key: &str) -> Result<Vec<Sample>> {
        self.fetch_samples(key).await
    }
}
