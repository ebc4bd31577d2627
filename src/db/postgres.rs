use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    error::AppResult,
    models::{ContentId, FeedItem, UserId},
    services::content_store::ContentStore,
};

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// PostgreSQL-backed content reads for the feed core
pub struct PgContentStore {
    pool: PgPool,
}

impl PgContentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ContentStore for PgContentStore {
    async fn find_by_ids(&self, user_id: UserId, ids: &[ContentId]) -> AppResult<Vec<FeedItem>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let query = r#"
            SELECT id, creator_id, title, description, media_url,
                   language, category, like_count, created_at
            FROM content
            WHERE id = ANY($2)
              AND (visibility = 'public' OR creator_id = $1)
            "#;

        let rows: Vec<FeedItem> = sqlx::query_as(query)
            .bind(user_id)
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn find_recently_viewed_ids(
        &self,
        user_id: UserId,
        limit: usize,
    ) -> AppResult<Vec<ContentId>> {
        let ids: Vec<ContentId> = sqlx::query_scalar(
            r#"
            SELECT content_id
            FROM content_views
            WHERE user_id = $1
            ORDER BY viewed_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    async fn find_following_feed(
        &self,
        user_id: UserId,
        after_id: Option<ContentId>,
        limit: usize,
    ) -> AppResult<Vec<FeedItem>> {
        // Keyset pagination over (created_at, id); the cursor row anchors
        // the comparison so the ordering stays stable under inserts.
        let query = r#"
            SELECT c.id, c.creator_id, c.title, c.description, c.media_url,
                   c.language, c.category, c.like_count, c.created_at
            FROM content c
            JOIN follows f ON f.followee_id = c.creator_id
            WHERE f.follower_id = $1
              AND c.visibility = 'public'
              AND ($2::uuid IS NULL
                   OR (c.created_at, c.id) < (SELECT created_at, id FROM content WHERE id = $2))
            ORDER BY c.created_at DESC, c.id DESC
            LIMIT $3
            "#;

        let rows: Vec<FeedItem> = sqlx::query_as(query)
            .bind(user_id)
            .bind(after_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }
}
