use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client as HttpClient;
use reqwest::header::USER_AGENT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::dates::parse_day;

pub const DATASET_URL: &str = "https://cdn.jsdelivr.net/gh/GCA-Classroom/apod/data.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    #[serde(other)]
    Other,
}

/// One day of the archive.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Item {
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub explanation: String,
    #[serde(default)]
    pub media_type: Option<MediaType>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub hdurl: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub copyright: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Item {
    pub fn day(&self) -> Option<NaiveDate> {
        self.date.as_deref().and_then(parse_day)
    }

    pub fn date_key(&self) -> Option<&str> {
        self.date.as_deref().filter(|date| !date.is_empty())
    }

    pub fn is_video(&self) -> bool {
        self.media_type == Some(MediaType::Video)
    }

    pub fn is_image(&self) -> bool {
        self.media_type == Some(MediaType::Image)
    }

    pub fn url(&self) -> Option<&str> {
        non_empty(&self.url)
    }

    pub fn hdurl(&self) -> Option<&str> {
        non_empty(&self.hdurl)
    }

    pub fn thumbnail_url(&self) -> Option<&str> {
        non_empty(&self.thumbnail_url)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Network error fetching data: {0}")]
    Network(String),
    #[error("Data fetch error: {0}")]
    Status(StatusCode),
    #[error("Invalid JSON response: {0}")]
    DataFormat(#[source] serde_json::Error),
    #[error("read dataset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Network("request aborted/timed out".to_string())
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// Source of archive items. The UI only talks to this trait so tests and
/// offline runs can swap the HTTP client out.
pub trait DatasetService: Send + Sync {
    fn fetch_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Item>, FetchError>;

    fn probe_image(&self, url: &str) -> Result<(), FetchError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub dataset_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub http_client: Option<HttpClient>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            dataset_url: DATASET_URL.to_string(),
            user_agent: format!("apod-tui/{}", crate::VERSION),
            timeout: DEFAULT_TIMEOUT,
            http_client: None,
        }
    }
}

pub struct Client {
    http: HttpClient,
    user_agent: String,
    dataset_url: String,
}

impl Client {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.dataset_url.trim().is_empty() {
            anyhow::bail!("apod client dataset url required");
        }

        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder().timeout(config.timeout).build()?,
        };

        Ok(Client {
            http,
            user_agent: config.user_agent,
            dataset_url: config.dataset_url,
        })
    }

    fn fetch_body(&self) -> Result<Option<String>, FetchError> {
        if let Some(path) = local_path(&self.dataset_url) {
            let body = fs::read_to_string(&path).map_err(|source| FetchError::Io {
                path: path.clone(),
                source,
            })?;
            return Ok(Some(body));
        }

        let response = self
            .http
            .get(&self.dataset_url)
            .header(USER_AGENT, &self.user_agent)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(response.text()?))
    }
}

impl DatasetService for Client {
    fn fetch_range(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Vec<Item>, FetchError> {
        tracing::info!(url = %self.dataset_url, ?start, ?end, "Fetching dataset");
        let items = match self.fetch_body()? {
            Some(body) => normalize(&body)?,
            None => Vec::new(),
        };
        let total = items.len();
        let items = filter_range(items, start, end);
        tracing::info!(total, in_range = items.len(), "Dataset fetched");
        Ok(items)
    }

    fn probe_image(&self, url: &str) -> Result<(), FetchError> {
        if let Some(path) = local_path(url) {
            return fs::metadata(&path)
                .map(|_| ())
                .map_err(|source| FetchError::Io { path, source });
        }

        let response = self
            .http
            .head(url)
            .header(USER_AGENT, &self.user_agent)
            .send()?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(FetchError::Status(response.status()))
        }
    }
}

fn local_path(raw: &str) -> Option<PathBuf> {
    let parsed = Url::parse(raw).ok()?;
    if parsed.scheme() != "file" {
        return None;
    }
    parsed.to_file_path().ok()
}

/// Flattens any of the payload shapes the dataset has been published in
/// (array, single record, or an object keyed by date) into items.
pub fn normalize(body: &str) -> Result<Vec<Item>, FetchError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(body).map_err(FetchError::DataFormat)?;

    let records = match value {
        Value::Array(values) => values,
        Value::Object(map) if map.get("date").is_some_and(Value::is_string) => {
            vec![Value::Object(map)]
        }
        Value::Object(map) => map.into_iter().map(|(_, value)| value).collect(),
        _ => Vec::new(),
    };

    Ok(records
        .into_iter()
        .filter_map(|record| match serde_json::from_value::<Item>(record) {
            Ok(item) => Some(item),
            Err(err) => {
                tracing::debug!(error = %err, "Skipping malformed dataset record");
                None
            }
        })
        .collect())
}

/// Keeps items whose day falls within `[start, end]`. Without bounds every
/// item is returned, dated or not.
pub fn filter_range(
    items: Vec<Item>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Vec<Item> {
    if start.is_none() && end.is_none() {
        return items;
    }
    items
        .into_iter()
        .filter(|item| {
            let Some(day) = item.day() else {
                return false;
            };
            start.map_or(true, |start| day >= start) && end.map_or(true, |end| day <= end)
        })
        .collect()
}
