use async_trait::async_trait;
use bones_shared::constants::{FILE_METADATA_PATH, HYDRUS_ACCESS_KEY_HEADER, SEARCH_FILES_PATH};
use serde::de::DeserializeOwned;

use crate::models::{FileId, FileMetadata, FileMetadataResponse, SearchFilesResponse};

#[derive(Debug, thiserror::Error)]
pub enum HydrusError {
    #[error("hydrus request failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("hydrus returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("hydrus response could not be decoded: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("failed to encode query: {0}")]
    Encode(#[from] serde_json::Error),
}

/// The two lookups the resolver needs from a media index.
#[async_trait]
pub trait MediaIndex: Send + Sync {
    /// Ids of inbox files carrying every tag in `tags`.
    async fn search_files(&self, tags: &[String]) -> Result<Vec<FileId>, HydrusError>;

    /// Metadata for a single file, `None` if the index returned no record.
    async fn file_metadata(&self, file_id: FileId) -> Result<Option<FileMetadata>, HydrusError>;
}

#[derive(Clone)]
pub struct HydrusClient {
    http: reqwest::Client,
    base_url: String,
    access_key: String,
}

impl HydrusClient {
    pub fn new(base_url: &str, access_key: &str) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, access_key)
    }

    pub fn with_client(http: reqwest::Client, base_url: &str, access_key: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_key: access_key.to_string(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, HydrusError> {
        let url = format!("{}{}", self.base_url, path_and_query);
        tracing::debug!("GET {}", url);

        let res = self
            .http
            .get(&url)
            .header(HYDRUS_ACCESS_KEY_HEADER, &self.access_key)
            .send()
            .await
            .map_err(HydrusError::Request)?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            tracing::error!("Hydrus request failed ({}): {}", status, body);
            return Err(HydrusError::Status { status, body });
        }

        res.json().await.map_err(HydrusError::Decode)
    }
}

/// JSON-encodes `value` and percent-encodes the result for a query string.
pub fn encode_json_param<T: serde::Serialize + ?Sized>(value: &T) -> Result<String, HydrusError> {
    let json = serde_json::to_string(value)?;
    Ok(urlencoding::encode(&json).into_owned())
}

#[async_trait]
impl MediaIndex for HydrusClient {
    async fn search_files(&self, tags: &[String]) -> Result<Vec<FileId>, HydrusError> {
        let encoded = encode_json_param(tags)?;
        let res: SearchFilesResponse = self
            .get_json(&format!(
                "{}?system_inbox=true&tags={}",
                SEARCH_FILES_PATH, encoded
            ))
            .await?;
        Ok(res.file_ids)
    }

    async fn file_metadata(&self, file_id: FileId) -> Result<Option<FileMetadata>, HydrusError> {
        let encoded = encode_json_param(&[file_id])?;
        let res: FileMetadataResponse = self
            .get_json(&format!("{}?file_ids={}", FILE_METADATA_PATH, encoded))
            .await?;
        Ok(res.metadata.into_iter().next())
    }
}
