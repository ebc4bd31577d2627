use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a piece of feed content
pub type ContentId = Uuid;

/// Identifier of a user
pub type UserId = Uuid;

/// A hydrated content row as served in a feed page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeedItem {
    pub id: ContentId,
    pub creator_id: UserId,
    pub title: String,
    pub description: Option<String>,
    pub media_url: Option<String>,
    pub language: Option<String>,
    pub category: Option<String>,
    pub like_count: i64,
    pub created_at: DateTime<Utc>,
}

/// One page of the feed as returned to the client
///
/// `has_next` is computed against the underlying identifier batch, not the
/// hydrated item count, so a page may carry fewer than `limit` items (deleted
/// content is dropped during hydration) while `has_next` stays accurate.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub content: Vec<FeedItem>,
    pub next_cursor: Option<String>,
    pub has_next: bool,
    pub count: usize,
}

impl FeedPage {
    pub fn new(content: Vec<FeedItem>, has_next: bool, next_cursor: Option<String>) -> Self {
        let count = content.len();
        Self {
            content,
            next_cursor,
            has_next,
            count,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), false, None)
    }
}
