use std::collections::HashSet;

use sqlx::PgPool;

use super::{exclude_vec, RecommendationStrategy, StrategyFilters, StrategyKind};
use crate::{
    error::AppResult,
    models::{ContentId, UserId},
};

/// Collaborative filtering over like co-occurrence
///
/// Scores content by how many of the user's "taste neighbors" (users who
/// liked the same things this user liked) have liked it. A user with no like
/// history has no neighbors and legitimately gets zero results here; the
/// blender redistributes the quota to the popular strategy in that case.
pub struct CollaborativeStrategy {
    pool: PgPool,
}

impl CollaborativeStrategy {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecommendationStrategy for CollaborativeStrategy {
    async fn fetch(
        &self,
        user_id: UserId,
        count: usize,
        exclude: &HashSet<ContentId>,
        filters: &StrategyFilters,
    ) -> AppResult<Vec<ContentId>> {
        let excluded = exclude_vec(exclude);

        let ids: Vec<ContentId> = sqlx::query_scalar(
            r#"
            WITH neighbors AS (
                SELECT DISTINCT l.user_id
                FROM likes l
                JOIN likes mine ON mine.content_id = l.content_id
                WHERE mine.user_id = $1
                  AND l.user_id <> $1
            )
            SELECT c.id
            FROM content c
            JOIN likes l ON l.content_id = c.id
            JOIN neighbors n ON n.user_id = l.user_id
            WHERE c.visibility = 'public'
              AND c.creator_id <> $1
              AND c.id <> ALL($2)
              AND ($3::text IS NULL OR c.language = $3)
              AND ($4::text IS NULL OR c.category = $4)
              AND NOT EXISTS (
                  SELECT 1 FROM likes mine
                  WHERE mine.user_id = $1 AND mine.content_id = c.id
              )
            GROUP BY c.id
            ORDER BY COUNT(DISTINCT l.user_id) DESC, MAX(l.created_at) DESC, c.id
            LIMIT $5
            "#,
        )
        .bind(user_id)
        .bind(&excluded)
        .bind(filters.language.as_deref())
        .bind(filters.category.as_deref())
        .bind(count as i64)
        .fetch_all(&self.pool)
        .await?;

        tracing::debug!(
            user_id = %user_id,
            requested = count,
            returned = ids.len(),
            "Collaborative strategy fetch"
        );

        Ok(ids)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Collaborative
    }
}
