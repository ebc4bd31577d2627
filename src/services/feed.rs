use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{ContentId, FeedItem, FeedPage, UserId},
    services::{content_store::ContentStore, paginator::FeedPaginator, strategies::StrategyFilters},
};

/// Assembles feed pages from resolved identifier slices
///
/// The main feed goes through the paginator (batched, recommended); the
/// following feed is a plain chronological read from the content store with
/// the same `limit + 1` probe and no batching involved.
pub struct FeedService {
    paginator: FeedPaginator,
    content_store: Arc<dyn ContentStore>,
}

impl FeedService {
    pub fn new(paginator: FeedPaginator, content_store: Arc<dyn ContentStore>) -> Self {
        Self {
            paginator,
            content_store,
        }
    }

    /// The recommended main feed
    pub async fn main_feed(
        &self,
        user_id: UserId,
        cursor: Option<&str>,
        limit: usize,
        filters: &StrategyFilters,
    ) -> AppResult<FeedPage> {
        let resolved = self.paginator.resolve(user_id, cursor, limit, filters).await?;
        let items = self.hydrate(user_id, &resolved.content_ids).await?;
        Ok(FeedPage::new(items, resolved.has_next, resolved.next_cursor))
    }

    /// Chronological content from followed creators
    ///
    /// The cursor here is the last-seen content id, not a stream offset.
    pub async fn following_feed(
        &self,
        user_id: UserId,
        cursor: Option<&str>,
        limit: usize,
    ) -> AppResult<FeedPage> {
        let after_id = match cursor {
            None => None,
            Some(raw) => Some(
                raw.trim()
                    .parse::<Uuid>()
                    .map_err(|_| AppError::InvalidInput(format!("Malformed cursor: {}", raw)))?,
            ),
        };

        let mut rows = self
            .content_store
            .find_following_feed(user_id, after_id, limit + 1)
            .await?;

        let has_next = rows.len() > limit;
        rows.truncate(limit);
        let next_cursor = if has_next {
            rows.last().map(|item| item.id.to_string())
        } else {
            None
        };

        Ok(FeedPage::new(rows, has_next, next_cursor))
    }

    /// Resolves ids to live rows, preserving id order and dropping gaps
    ///
    /// Deleted content silently disappears from the page; pagination math
    /// stays defined over the identifier batch, so `has_next` is untouched.
    async fn hydrate(&self, user_id: UserId, ids: &[ContentId]) -> AppResult<Vec<FeedItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = self.content_store.find_by_ids(user_id, ids).await?;
        let mut by_id: HashMap<ContentId, FeedItem> =
            rows.into_iter().map(|row| (row.id, row)).collect();

        let items: Vec<FeedItem> = ids.iter().filter_map(|id| by_id.remove(id)).collect();

        if items.len() < ids.len() {
            tracing::debug!(
                user_id = %user_id,
                requested = ids.len(),
                hydrated = items.len(),
                "Dropped identifiers with no live content"
            );
        }

        Ok(items)
    }
}
