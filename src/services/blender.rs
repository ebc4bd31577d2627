use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::{
    config::BlendWeights,
    models::{ContentId, UserId},
    services::strategies::{RecommendationStrategy, StrategyFilters},
};

/// Per-strategy item counts for one batch, derived from the blend weights
///
/// Uses floor division with the remainder handed out largest-fraction-first
/// (ties broken in strategy order) so the quotas always sum exactly to the
/// batch size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategyQuota {
    pub collaborative: usize,
    pub popular: usize,
    pub newest: usize,
    pub random: usize,
}

impl StrategyQuota {
    pub fn from_weights(weights: &BlendWeights, batch_size: usize) -> Self {
        let percents = [
            weights.collaborative,
            weights.popular,
            weights.newest,
            weights.random,
        ];

        let mut shares = [0usize; 4];
        let mut fractions = [0u64; 4];
        for (i, percent) in percents.iter().enumerate() {
            let scaled = batch_size as u64 * u64::from(*percent);
            shares[i] = (scaled / 100) as usize;
            fractions[i] = scaled % 100;
        }

        let mut leftover = batch_size.saturating_sub(shares.iter().sum());
        let mut order = [0usize, 1, 2, 3];
        order.sort_by_key(|&i| (std::cmp::Reverse(fractions[i]), i));
        for &i in &order {
            if leftover == 0 {
                break;
            }
            shares[i] += 1;
            leftover -= 1;
        }

        Self {
            collaborative: shares[0],
            popular: shares[1],
            newest: shares[2],
            random: shares[3],
        }
    }

    pub fn total(&self) -> usize {
        self.collaborative + self.popular + self.newest + self.random
    }
}

/// Blends the four recommendation strategies into one batch
///
/// Stateless: every call produces a fresh value; batch ownership lives with
/// the batch store. Strategy invocation order is fixed (collaborative,
/// popular, newest, random) so exclusion propagation and backfill are
/// reproducible for a given upstream snapshot.
pub struct Blender {
    collaborative: Arc<dyn RecommendationStrategy>,
    popular: Arc<dyn RecommendationStrategy>,
    newest: Arc<dyn RecommendationStrategy>,
    random: Arc<dyn RecommendationStrategy>,
    weights: BlendWeights,
}

impl Blender {
    pub fn new(
        collaborative: Arc<dyn RecommendationStrategy>,
        popular: Arc<dyn RecommendationStrategy>,
        newest: Arc<dyn RecommendationStrategy>,
        random: Arc<dyn RecommendationStrategy>,
        weights: BlendWeights,
    ) -> Self {
        Self {
            collaborative,
            popular,
            newest,
            random,
            weights,
        }
    }

    /// Produces a de-duplicated, quota-respecting batch of content ids
    ///
    /// Collaborative runs first because its result sizes the popular
    /// request: a zero-result collaborative hands its whole quota to
    /// popular, a partial result hands over the shortfall. The remaining
    /// three strategies are independent once the exclusion set is fixed,
    /// so they run concurrently.
    ///
    /// The result may be shorter than `batch_size` when every source is
    /// depleted; that is a valid outcome, not an error.
    pub async fn generate(
        &self,
        user_id: UserId,
        batch_size: usize,
        exclude_ids: &HashSet<ContentId>,
        filters: &StrategyFilters,
    ) -> Vec<ContentId> {
        let start = Instant::now();
        let quota = StrategyQuota::from_weights(&self.weights, batch_size);

        let collab = self
            .fetch_guarded(&self.collaborative, user_id, quota.collaborative, exclude_ids, filters)
            .await;

        let shortfall = quota.collaborative.saturating_sub(collab.len());
        if shortfall > 0 {
            tracing::debug!(
                user_id = %user_id,
                quota = quota.collaborative,
                returned = collab.len(),
                shortfall,
                "Collaborative under-delivered, routing shortfall to popular"
            );
        }
        let popular_count = quota.popular + shortfall;

        let mut exclude = exclude_ids.clone();
        exclude.extend(collab.iter().copied());

        let (popular, newest, random) = tokio::join!(
            self.fetch_guarded(&self.popular, user_id, popular_count, &exclude, filters),
            self.fetch_guarded(&self.newest, user_id, quota.newest, &exclude, filters),
            self.fetch_guarded(&self.random, user_id, quota.random, &exclude, filters),
        );

        let mut seen: HashSet<ContentId> = HashSet::with_capacity(batch_size);
        let mut batch = Vec::with_capacity(batch_size);
        for id in collab
            .into_iter()
            .chain(popular)
            .chain(newest)
            .chain(random)
        {
            if exclude_ids.contains(&id) {
                continue;
            }
            if seen.insert(id) {
                batch.push(id);
            }
        }
        batch.truncate(batch_size);

        tracing::info!(
            user_id = %user_id,
            generated = batch.len(),
            target = batch_size,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generated recommendation batch"
        );

        batch
    }

    /// Invokes one strategy, treating failure as an empty result
    async fn fetch_guarded(
        &self,
        strategy: &Arc<dyn RecommendationStrategy>,
        user_id: UserId,
        count: usize,
        exclude: &HashSet<ContentId>,
        filters: &StrategyFilters,
    ) -> Vec<ContentId> {
        if count == 0 {
            return Vec::new();
        }

        match strategy.fetch(user_id, count, exclude, filters).await {
            Ok(mut ids) => {
                ids.truncate(count);
                ids
            }
            Err(e) => {
                tracing::warn!(
                    strategy = strategy.kind().as_str(),
                    user_id = %user_id,
                    error = %e,
                    "Strategy fetch failed, treating as empty"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::strategies::{MockRecommendationStrategy, StrategyKind};
    use uuid::Uuid;

    fn ids(n: usize) -> Vec<ContentId> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn mock_returning(kind: StrategyKind, result: Vec<ContentId>) -> Arc<dyn RecommendationStrategy> {
        let mut mock = MockRecommendationStrategy::new();
        mock.expect_kind().return_const(kind);
        mock.expect_fetch()
            .returning(move |_, count, _, _| Ok(result.iter().copied().take(count).collect()));
        Arc::new(mock)
    }

    fn mock_failing(kind: StrategyKind) -> Arc<dyn RecommendationStrategy> {
        let mut mock = MockRecommendationStrategy::new();
        mock.expect_kind().return_const(kind);
        mock.expect_fetch()
            .returning(|_, _, _, _| Err(AppError::Internal("provider down".to_string())));
        Arc::new(mock)
    }

    #[test]
    fn test_quota_for_default_weights_at_250() {
        let quota = StrategyQuota::from_weights(&BlendWeights::default(), 250);
        assert_eq!(quota.collaborative, 100);
        assert_eq!(quota.popular, 75);
        assert_eq!(quota.newest, 25);
        assert_eq!(quota.random, 50);
    }

    #[test]
    fn test_quota_sums_to_batch_size_for_all_sizes() {
        let weights = BlendWeights::default();
        for batch_size in 1..=512 {
            let quota = StrategyQuota::from_weights(&weights, batch_size);
            assert_eq!(quota.total(), batch_size, "batch_size {}", batch_size);
        }
    }

    #[test]
    fn test_quota_remainder_goes_to_largest_fraction_first() {
        // 7 items: floors are 2/2/0/1, fractions 80/10/70/40, so the two
        // leftover slots go to collaborative and newest.
        let quota = StrategyQuota::from_weights(&BlendWeights::default(), 7);
        assert_eq!(quota.collaborative, 3);
        assert_eq!(quota.popular, 2);
        assert_eq!(quota.newest, 1);
        assert_eq!(quota.random, 1);
    }

    #[test]
    fn test_quota_for_batch_of_one() {
        let quota = StrategyQuota::from_weights(&BlendWeights::default(), 1);
        assert_eq!(quota.collaborative, 1);
        assert_eq!(quota.total(), 1);
    }

    #[tokio::test]
    async fn test_full_supply_preserves_strategy_order() {
        let collab_ids = ids(4);
        let popular_ids = ids(3);
        let newest_ids = ids(1);
        let random_ids = ids(2);

        let blender = Blender::new(
            mock_returning(StrategyKind::Collaborative, collab_ids.clone()),
            mock_returning(StrategyKind::Popular, popular_ids.clone()),
            mock_returning(StrategyKind::Newest, newest_ids.clone()),
            mock_returning(StrategyKind::Random, random_ids.clone()),
            BlendWeights::default(),
        );

        let batch = blender
            .generate(Uuid::new_v4(), 10, &HashSet::new(), &StrategyFilters::default())
            .await;

        let mut expected = collab_ids;
        expected.extend(popular_ids);
        expected.extend(newest_ids);
        expected.extend(random_ids);
        assert_eq!(batch, expected);
    }

    #[tokio::test]
    async fn test_collaborative_fallback_redistributes_full_quota_to_popular() {
        // batch of 10: quotas are 4/3/1/2
        let mut collab = MockRecommendationStrategy::new();
        collab.expect_kind().return_const(StrategyKind::Collaborative);
        collab.expect_fetch().returning(|_, _, _, _| Ok(Vec::new()));

        let popular_supply = ids(10);
        let mut popular = MockRecommendationStrategy::new();
        popular.expect_kind().return_const(StrategyKind::Popular);
        let supply = popular_supply.clone();
        popular
            .expect_fetch()
            .withf(|_, count, _, _| *count == 7)
            .returning(move |_, count, _, _| Ok(supply.iter().copied().take(count).collect()));

        let blender = Blender::new(
            Arc::new(collab),
            Arc::new(popular),
            mock_returning(StrategyKind::Newest, ids(1)),
            mock_returning(StrategyKind::Random, ids(2)),
            BlendWeights::default(),
        );

        let batch = blender
            .generate(Uuid::new_v4(), 10, &HashSet::new(), &StrategyFilters::default())
            .await;

        assert_eq!(batch.len(), 10);
        assert_eq!(&batch[..7], &popular_supply[..7]);
    }

    #[tokio::test]
    async fn test_partial_collaborative_backfills_shortfall_from_popular() {
        // batch of 10: collaborative owes 4, delivers 2; popular is asked
        // for 3 + 2 and must see the collaborative picks in its exclusions.
        let collab_ids = ids(2);
        let mut collab = MockRecommendationStrategy::new();
        collab.expect_kind().return_const(StrategyKind::Collaborative);
        let supply = collab_ids.clone();
        collab
            .expect_fetch()
            .returning(move |_, _, _, _| Ok(supply.clone()));

        let mut popular = MockRecommendationStrategy::new();
        popular.expect_kind().return_const(StrategyKind::Popular);
        let excluded = collab_ids.clone();
        popular
            .expect_fetch()
            .withf(move |_, count, exclude, _| {
                *count == 5 && excluded.iter().all(|id| exclude.contains(id))
            })
            .returning(move |_, count, _, _| Ok(ids(count)));

        let blender = Blender::new(
            Arc::new(collab),
            Arc::new(popular),
            mock_returning(StrategyKind::Newest, ids(1)),
            mock_returning(StrategyKind::Random, ids(2)),
            BlendWeights::default(),
        );

        let batch = blender
            .generate(Uuid::new_v4(), 10, &HashSet::new(), &StrategyFilters::default())
            .await;

        assert_eq!(batch.len(), 10);
        assert_eq!(&batch[..2], &collab_ids[..]);
    }

    #[tokio::test]
    async fn test_duplicates_across_strategies_are_removed_first_seen() {
        let shared = ids(2);
        let mut popular_ids = ids(1);
        popular_ids.extend(shared.iter().copied());

        let blender = Blender::new(
            mock_returning(StrategyKind::Collaborative, shared.clone()),
            mock_returning(StrategyKind::Popular, popular_ids.clone()),
            mock_returning(StrategyKind::Newest, Vec::new()),
            mock_returning(StrategyKind::Random, Vec::new()),
            BlendWeights::default(),
        );

        let batch = blender
            .generate(Uuid::new_v4(), 10, &HashSet::new(), &StrategyFilters::default())
            .await;

        // Shared ids keep their collaborative position; popular contributes
        // only its unique id.
        assert_eq!(batch.len(), 3);
        assert_eq!(&batch[..2], &shared[..]);
        assert_eq!(batch[2], popular_ids[0]);
    }

    #[tokio::test]
    async fn test_caller_exclusions_never_appear_in_output() {
        let excluded_id = Uuid::new_v4();
        let mut popular_ids = ids(2);
        // A misbehaving strategy echoes an excluded id back.
        popular_ids.push(excluded_id);

        let blender = Blender::new(
            mock_returning(StrategyKind::Collaborative, Vec::new()),
            mock_returning(StrategyKind::Popular, popular_ids.clone()),
            mock_returning(StrategyKind::Newest, Vec::new()),
            mock_returning(StrategyKind::Random, Vec::new()),
            BlendWeights::default(),
        );

        let exclude: HashSet<ContentId> = [excluded_id].into_iter().collect();
        let batch = blender
            .generate(Uuid::new_v4(), 10, &exclude, &StrategyFilters::default())
            .await;

        assert!(!batch.contains(&excluded_id));
        assert_eq!(batch, popular_ids[..2].to_vec());
    }

    #[tokio::test]
    async fn test_failing_provider_is_absorbed_by_backfill() {
        // Collaborative errors out entirely; popular has unlimited supply
        // and absorbs the whole quota, so the batch still fills.
        let blender = Blender::new(
            mock_failing(StrategyKind::Collaborative),
            mock_returning(StrategyKind::Popular, ids(20)),
            mock_returning(StrategyKind::Newest, ids(1)),
            mock_returning(StrategyKind::Random, ids(2)),
            BlendWeights::default(),
        );

        let batch = blender
            .generate(Uuid::new_v4(), 10, &HashSet::new(), &StrategyFilters::default())
            .await;

        assert_eq!(batch.len(), 10);
    }

    #[tokio::test]
    async fn test_all_strategies_failing_yields_empty_batch() {
        let blender = Blender::new(
            mock_failing(StrategyKind::Collaborative),
            mock_failing(StrategyKind::Popular),
            mock_failing(StrategyKind::Newest),
            mock_failing(StrategyKind::Random),
            BlendWeights::default(),
        );

        let batch = blender
            .generate(Uuid::new_v4(), 250, &HashSet::new(), &StrategyFilters::default())
            .await;

        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_over_delivering_strategy_is_truncated_to_its_request() {
        // A strategy returning more than asked must not inflate the batch.
        let blender = Blender::new(
            mock_returning(StrategyKind::Collaborative, ids(50)),
            mock_returning(StrategyKind::Popular, ids(50)),
            mock_returning(StrategyKind::Newest, ids(50)),
            mock_returning(StrategyKind::Random, ids(50)),
            BlendWeights::default(),
        );

        let batch = blender
            .generate(Uuid::new_v4(), 10, &HashSet::new(), &StrategyFilters::default())
            .await;

        assert_eq!(batch.len(), 10);
    }
}
