use crate::{
    error::AppResult,
    models::{ContentId, FeedItem, UserId},
};

#[cfg(test)]
use mockall::automock;

/// Read interface over the content collaborator
///
/// The feed core never writes content; it hydrates identifier batches,
/// reads the viewed-history window that seeds the exclusion set, and pulls
/// the chronological following feed.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait ContentStore: Send + Sync {
    /// Fetches live content rows for the given ids, in arbitrary order
    ///
    /// Ids that no longer resolve (deleted content) are simply absent from
    /// the result; the caller re-orders and drops the gaps.
    async fn find_by_ids(&self, user_id: UserId, ids: &[ContentId]) -> AppResult<Vec<FeedItem>>;

    /// The user's most recently viewed content ids, newest first, bounded
    async fn find_recently_viewed_ids(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<ContentId>>;

    /// Content from followed creators, chronological, strictly after the
    /// given cursor row when present
    async fn find_following_feed(
        &self,
        user_id: UserId,
        after_id: Option<ContentId>,
        limit: usize,
    ) -> AppResult<Vec<FeedItem>>;
}
