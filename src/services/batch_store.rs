use crate::{
    error::AppResult,
    models::{ContentId, UserId},
};

#[cfg(test)]
use mockall::automock;

/// Narrow interface over the recommendation batch cache
///
/// Keyed by (user, batch index). TTL and eviction belong to the backing
/// store; none of its specifics leak into the blender or the paginator,
/// which keeps the core testable against an in-memory fake.
///
/// Callers treat read errors as a miss and write errors as a logged no-op:
/// caching is an optimization, never a correctness requirement.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait BatchStore: Send + Sync {
    /// Returns the stored batch, or `None` on a miss (a miss is not an error)
    async fn get(&self, user_id: UserId, batch_index: u64) -> AppResult<Option<Vec<ContentId>>>;

    /// Stores a batch, fully replacing any previous value for the key
    async fn put(&self, user_id: UserId, batch_index: u64, batch: &[ContentId]) -> AppResult<()>;

    /// Length of the stored batch, or 0 when absent
    ///
    /// Lets the paginator answer past-the-end requests without reading the
    /// batch content.
    async fn size(&self, user_id: UserId, batch_index: u64) -> AppResult<usize>;
}
