use std::collections::HashSet;

use sqlx::PgPool;

use super::{exclude_vec, RecommendationStrategy, StrategyFilters, StrategyKind};
use crate::{
    error::AppResult,
    models::{ContentId, UserId},
};

/// Uniformly sampled content for serendipity
///
/// The shuffle lives in the database (`ORDER BY random()`); the blender
/// itself stays deterministic for a given set of strategy outputs.
pub struct RandomStrategy {
    pool: PgPool,
}

impl RandomStrategy {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecommendationStrategy for RandomStrategy {
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
            SELECT id
            FROM content
            WHERE visibility = 'public'
              AND creator_id <> $1
              AND id <> ALL($2)
              AND ($3::text IS NULL OR language = $3)
              AND ($4::text IS NULL OR category = $4)
            ORDER BY random()
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
            "Random strategy fetch"
        );

        Ok(ids)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Random
    }
}
