use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    models::{ContentId, UserId},
    services::{
        batch_store::BatchStore, blender::Blender, content_store::ContentStore,
        strategies::StrategyFilters,
    },
};

/// A resolved slice of the recommendation stream, still un-hydrated
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPage {
    pub content_ids: Vec<ContentId>,
    pub has_next: bool,
    pub next_cursor: Option<String>,
}

impl ResolvedPage {
    fn empty() -> Self {
        Self {
            content_ids: Vec::new(),
            has_next: false,
            next_cursor: None,
        }
    }
}

/// Parses a main-feed cursor into a stream offset
///
/// An absent cursor means the top of the stream. Anything that is not a
/// non-negative integer is a client error, never silently coerced to zero.
pub fn parse_cursor(cursor: Option<&str>) -> AppResult<u64> {
    match cursor {
        None => Ok(0),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map_err(|_| AppError::InvalidInput(format!("Malformed cursor: {}", raw))),
    }
}

/// Translates cursor/limit page requests into batch/offset addressing
///
/// Owns the cursor math and the cache-then-generate flow; hydration is the
/// feed service's job. Two concurrent requests hitting the same uncached
/// batch index may both generate; the last write wins and both serve their
/// in-memory copy, which is an accepted cost rather than a correctness bug.
pub struct FeedPaginator {
    batch_store: Arc<dyn BatchStore>,
    content_store: Arc<dyn ContentStore>,
    blender: Blender,
    batch_size: usize,
    viewed_window: usize,
}

impl FeedPaginator {
    pub fn new(
        batch_store: Arc<dyn BatchStore>,
        content_store: Arc<dyn ContentStore>,
        blender: Blender,
        batch_size: usize,
        viewed_window: usize,
    ) -> Self {
        Self {
            batch_store,
            content_store,
            blender,
            batch_size,
            viewed_window,
        }
    }

    /// Resolves one page of content ids plus its pagination metadata
    ///
    /// Requests `limit + 1` ids from the batch so `has_next` needs no second
    /// round-trip: a full probe means another page exists at
    /// `offset + limit`.
    pub async fn resolve(
        &self,
        user_id: UserId,
        cursor: Option<&str>,
        limit: usize,
        filters: &StrategyFilters,
    ) -> AppResult<ResolvedPage> {
        let offset = parse_cursor(cursor)?;
        let batch_index = offset / self.batch_size as u64;
        let inner_offset = (offset % self.batch_size as u64) as usize;

        // An offset past the end of a stored (possibly short, exhausted)
        // batch is an empty page, not an error. The size probe answers that
        // without reading batch content.
        match self.batch_store.size(user_id, batch_index).await {
            Ok(size) if size > 0 && inner_offset >= size => {
                tracing::debug!(
                    user_id = %user_id,
                    batch_index,
                    inner_offset,
                    size,
                    "Offset past end of cached batch"
                );
                return Ok(ResolvedPage::empty());
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    batch_index,
                    error = %e,
                    "Batch size lookup failed, treating as miss"
                );
            }
        }

        let batch = self.load_or_generate(user_id, batch_index, filters).await;

        if inner_offset >= batch.len() {
            return Ok(ResolvedPage::empty());
        }

        let end = (inner_offset + limit + 1).min(batch.len());
        let slice = &batch[inner_offset..end];

        if slice.len() == limit + 1 {
            Ok(ResolvedPage {
                content_ids: slice[..limit].to_vec(),
                has_next: true,
                next_cursor: Some((offset + limit as u64).to_string()),
            })
        } else {
            Ok(ResolvedPage {
                content_ids: slice.to_vec(),
                has_next: false,
                next_cursor: None,
            })
        }
    }

    /// Serves the batch from cache, generating and storing it on a miss
    ///
    /// Store errors on read degrade to a miss; a failed write is logged and
    /// the freshly generated batch still serves the current response.
    async fn load_or_generate(
        &self,
        user_id: UserId,
        batch_index: u64,
        filters: &StrategyFilters,
    ) -> Vec<ContentId> {
        match self.batch_store.get(user_id, batch_index).await {
            Ok(Some(batch)) => {
                tracing::debug!(user_id = %user_id, batch_index, size = batch.len(), "Batch cache hit");
                return batch;
            }
            Ok(None) => {
                tracing::debug!(user_id = %user_id, batch_index, "Batch cache miss");
            }
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    batch_index,
                    error = %e,
                    "Batch cache read failed, treating as miss"
                );
            }
        }

        let exclude: HashSet<ContentId> = match self
            .content_store
            .find_recently_viewed_ids(user_id, self.viewed_window)
            .await
        {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %e,
                    "Viewed-history lookup failed, generating without exclusions"
                );
                HashSet::new()
            }
        };

        let batch = self
            .blender
            .generate(user_id, self.batch_size, &exclude, filters)
            .await;

        // An empty batch is served but not cached, so the next request
        // regenerates instead of pinning "no content" for a full TTL.
        if batch.is_empty() {
            return batch;
        }

        if let Err(e) = self.batch_store.put(user_id, batch_index, &batch).await {
            tracing::warn!(
                user_id = %user_id,
                batch_index,
                error = %e,
                "Batch cache write failed, serving uncached"
            );
        }

        batch
    }
}
