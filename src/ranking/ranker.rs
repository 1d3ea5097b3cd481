use parking_lot::RwLock;
use std::sync::Arc;

use super::moods::resolve_mood;
use super::scoring::{apply_preferred_bonus, explain, score};
use super::types::{
    BacklogItem, RankOptions, RankedItem, ScoreBreakdown, ScoringContext, Weights, WeightsPatch,
};
use crate::clock::Clock;
use crate::errors::Result;

/// Items longer than this multiple of the available time are filtered out.
const TIME_BUDGET_SLACK: f64 = 2.0;

/// Ranks backlog items by score.
///
/// The active weights live behind a lock holding an `Arc`, so a weight update
/// swaps the whole set at once and a ranking in progress keeps scoring with
/// the snapshot it started with.
pub struct Ranker {
    weights: RwLock<Arc<Weights>>,
    clock: Arc<dyn Clock>,
}

impl Ranker {
    pub fn new(weights: Weights, clock: Arc<dyn Clock>) -> Self {
        Self {
            weights: RwLock::new(Arc::new(weights)),
            clock,
        }
    }

    /// Snapshot of the active weights.
    pub fn weights(&self) -> Arc<Weights> {
        self.weights.read().clone()
    }

    /// Apply a partial update. Invalid patches leave the weights untouched.
    pub fn update_weights(&self, patch: &WeightsPatch) -> Result<Weights> {
        let mut guard = self.weights.write();
        let updated = guard.patched(patch)?;
        *guard = Arc::new(updated.clone());
        log::info!("Scoring weights updated: {:?}", updated);
        Ok(updated)
    }

    pub fn replace_weights(&self, weights: Weights) -> Result<()> {
        weights.validate()?;
        log::info!("Scoring weights replaced: {:?}", weights);
        *self.weights.write() = Arc::new(weights);
        Ok(())
    }

    pub fn score(&self, item: &BacklogItem, context: &ScoringContext) -> ScoreBreakdown {
        let weights = self.weights();
        score(item, context, &weights)
    }

    pub fn rank(&self, items: Vec<BacklogItem>, options: &RankOptions) -> Vec<RankedItem> {
        let weights = self.weights();
        let context = ScoringContext::new(options.now.unwrap_or_else(|| self.clock.now()))
            .with_recent_genres(options.recent_genres.clone());
        let preferred = preferred_genres(options);

        let candidates = items.len();
        let mut ranked: Vec<RankedItem> = items
            .into_iter()
            .filter(|item| options.include_terminal || !item.status.is_terminal())
            .filter(|item| fits_time_budget(item, options.max_hours))
            .map(|item| {
                let mut breakdown = score(&item, &context, &weights);
                apply_preferred_bonus(&mut breakdown, &item, &preferred);
                let reasons = explain(&item, &breakdown, &weights);
                RankedItem {
                    item,
                    breakdown,
                    reasons,
                }
            })
            .collect();

        // Stable: equal scores keep input order.
        ranked.sort_by(|a, b| b.breakdown.raw_total.total_cmp(&a.breakdown.raw_total));

        if let Some(limit) = options.limit {
            ranked.truncate(limit);
        }

        log::debug!("Ranked {} of {} backlog items", ranked.len(), candidates);
        ranked
    }
}

fn preferred_genres(options: &RankOptions) -> Vec<String> {
    if !options.preferred_genres.is_empty() {
        return options.preferred_genres.clone();
    }
    options
        .mood
        .as_deref()
        .map(resolve_mood)
        .unwrap_or_default()
}

/// Unknown lengths always pass.
fn fits_time_budget(item: &BacklogItem, max_hours: Option<f64>) -> bool {
    match (max_hours, item.effective_hours()) {
        (Some(budget), Some(hours)) if budget.is_finite() && budget > 0.0 => {
            hours <= budget * TIME_BUDGET_SLACK
        }
        _ => true,
    }
}
