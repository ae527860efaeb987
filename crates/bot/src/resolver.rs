use bones_shared::validation::validate_tags;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::Mutex;

use crate::hydrus::{HydrusError, MediaIndex};
use crate::models::{ContentLocator, FileId, ReplyPayload};

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("invalid tag: {0}")]
    InvalidTag(String),
    #[error("tag search failed: {0}")]
    Search(#[source] HydrusError),
    #[error("metadata fetch for file {file_id} failed: {source}")]
    Metadata {
        file_id: FileId,
        #[source]
        source: HydrusError,
    },
    #[error("no metadata returned for file {file_id}")]
    MissingMetadata { file_id: FileId },
}

/// Turns a tag list into an `m.image` reply for one random matching file.
pub struct MediaResolver<M, R = StdRng> {
    index: M,
    locator: ContentLocator,
    rng: Mutex<R>,
}

impl<M: MediaIndex> MediaResolver<M> {
    pub fn new(index: M, locator: ContentLocator) -> Self {
        Self::with_rng(index, locator, StdRng::from_entropy())
    }
}

impl<M, R> MediaResolver<M, R>
where
    M: MediaIndex,
    R: Rng + Send,
{
    pub fn with_rng(index: M, locator: ContentLocator, rng: R) -> Self {
        Self {
            index,
            locator,
            rng: Mutex::new(rng),
        }
    }

    /// Search, pick, fetch metadata, build the payload. `Ok(None)` means
    /// there was nothing to look up or nothing matched.
    pub async fn resolve(&self, tags: &[String]) -> Result<Option<ReplyPayload>, ResolveError> {
        if tags.is_empty() {
            return Ok(None);
        }
        validate_tags(tags).map_err(ResolveError::InvalidTag)?;

        let file_ids = self
            .index
            .search_files(tags)
            .await
            .map_err(ResolveError::Search)?;
        tracing::debug!(?tags, matches = file_ids.len(), "tag search finished");

        let Some(file_id) = self.pick(&file_ids).await else {
            return Ok(None);
        };

        let metadata = self
            .index
            .file_metadata(file_id)
            .await
            .map_err(|source| ResolveError::Metadata { file_id, source })?
            .ok_or(ResolveError::MissingMetadata { file_id })?;
        tracing::debug!(file_id, hash = %metadata.hash, mime = %metadata.mime, "picked file");

        Ok(Some(ReplyPayload::image(&metadata, &self.locator)))
    }

    /// Uniform draw over `file_ids`.
    pub async fn pick(&self, file_ids: &[FileId]) -> Option<FileId> {
        if file_ids.is_empty() {
            return None;
        }
        let index = self.rng.lock().await.gen_range(0..file_ids.len());
        Some(file_ids[index])
    }
}
