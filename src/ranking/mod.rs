//! "What to play next": weighted scoring and ranking of backlog items.
//!
//! Scoring is pure and deterministic given the item, the weights and a
//! reference time. The [`Ranker`] adds filtering, preference bonuses and
//! ordering on top, and owns the swappable weight set.

pub mod moods;
pub mod ranker;
pub mod scoring;
pub mod types;

pub use moods::{resolve_mood, Mood};
pub use ranker::Ranker;
pub use scoring::PREFERRED_GENRE_BONUS;
pub use types::{
    BacklogItem, ItemStatus, RankOptions, RankedItem, ScoreBreakdown, ScoreComponent,
    ScoringContext, Weights, WeightsPatch,
};
