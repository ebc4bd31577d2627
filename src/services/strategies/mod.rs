/// Recommendation strategy abstraction
///
/// This module provides a pluggable architecture for the independent content
/// selection sources blended into the main feed. Each strategy returns a
/// bounded, ordered list of content ids given a requested count, an exclusion
/// set, and context filters. How a strategy scores content is its own
/// business; the blender only relies on this contract.
use std::collections::HashSet;

#[cfg(test)]
use mockall::automock;

use crate::{
    error::AppResult,
    models::{ContentId, UserId},
};

pub mod collaborative;
pub mod newest;
pub mod popular;
pub mod random;

pub use collaborative::CollaborativeStrategy;
pub use newest::NewestStrategy;
pub use popular::PopularStrategy;
pub use random::RandomStrategy;

/// The four blending strategies, in their deterministic invocation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    Collaborative,
    Popular,
    Newest,
    Random,
}

impl StrategyKind {
    /// Strategy name for logging and debugging
    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Collaborative => "collaborative",
            StrategyKind::Popular => "popular",
            StrategyKind::Newest => "newest",
            StrategyKind::Random => "random",
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context filters applied by every strategy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyFilters {
    pub language: Option<String>,
    pub category: Option<String>,
}

/// Trait for recommendation strategies
///
/// Implementations must respect the requested `count` (return at most that
/// many ids), never return anything present in `exclude`, and honor the
/// context filters. Returning fewer ids than requested is a normal outcome
/// for a depleted source; the blender's backfill logic absorbs it.
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait RecommendationStrategy: Send + Sync {
    /// Fetch up to `count` recommended content ids for `user_id`
    async fn fetch(
        &self,
        user_id: UserId,
        count: usize,
        exclude: &HashSet<ContentId>,
        filters: &StrategyFilters,
    ) -> AppResult<Vec<ContentId>>;

    /// Which strategy this is, for quota lookup and logging
    fn kind(&self) -> StrategyKind;
}

/// Renders an exclusion set as a bind-ready uuid vector
pub(crate) fn exclude_vec(exclude: &HashSet<ContentId>) -> Vec<ContentId> {
    exclude.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_kind_names() {
        assert_eq!(StrategyKind::Collaborative.as_str(), "collaborative");
        assert_eq!(StrategyKind::Popular.as_str(), "popular");
        assert_eq!(StrategyKind::Newest.as_str(), "newest");
        assert_eq!(StrategyKind::Random.as_str(), "random");
    }
}
