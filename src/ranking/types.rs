//! Data types for backlog scoring and ranking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::errors::{NextUpError, Result};
use crate::models::CatalogRecord;

/// Range accepted for `BacklogItem::manual_adjustment`.
pub const MANUAL_ADJUSTMENT_LIMIT: f64 = 10.0;

/// One named input to the score, plus the ranker's bonus slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreComponent {
    Interest,
    BacklogAge,
    ContentLength,
    GenreDiversity,
    CriticScore,
    ManualOverride,
    /// Fixed bonus added by the ranker, not weight-driven.
    PreferredGenre,
}

impl ScoreComponent {
    pub const FACTORS: [ScoreComponent; 6] = [
        ScoreComponent::Interest,
        ScoreComponent::BacklogAge,
        ScoreComponent::ContentLength,
        ScoreComponent::GenreDiversity,
        ScoreComponent::CriticScore,
        ScoreComponent::ManualOverride,
    ];
}

/// Points available per factor. Any weight may be zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Weights {
    pub interest: f64,
    pub backlog_age: f64,
    pub content_length: f64,
    pub genre_diversity: f64,
    pub critic_score: f64,
    pub manual_override: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            interest: 30.0,
            backlog_age: 20.0,
            content_length: 15.0,
            genre_diversity: 10.0,
            critic_score: 5.0,
            manual_override: 50.0,
        }
    }
}

impl Weights {
    pub fn get(&self, component: ScoreComponent) -> f64 {
        match component {
            ScoreComponent::Interest => self.interest,
            ScoreComponent::BacklogAge => self.backlog_age,
            ScoreComponent::ContentLength => self.content_length,
            ScoreComponent::GenreDiversity => self.genre_diversity,
            ScoreComponent::CriticScore => self.critic_score,
            ScoreComponent::ManualOverride => self.manual_override,
            ScoreComponent::PreferredGenre => 0.0,
        }
    }

    pub fn total(&self) -> f64 {
        ScoreComponent::FACTORS.iter().map(|c| self.get(*c)).sum()
    }

    pub fn validate(&self) -> Result<()> {
        for component in ScoreComponent::FACTORS {
            let weight = self.get(component);
            if !weight.is_finite() || weight < 0.0 {
                return Err(NextUpError::Config(format!(
                    "weight for {:?} must be a non-negative number, got {}",
                    component, weight
                )));
            }
        }
        Ok(())
    }

    /// A copy with the patch applied, validated as a whole.
    pub fn patched(&self, patch: &WeightsPatch) -> Result<Weights> {
        let weights = Weights {
            interest: patch.interest.unwrap_or(self.interest),
            backlog_age: patch.backlog_age.unwrap_or(self.backlog_age),
            content_length: patch.content_length.unwrap_or(self.content_length),
            genre_diversity: patch.genre_diversity.unwrap_or(self.genre_diversity),
            critic_score: patch.critic_score.unwrap_or(self.critic_score),
            manual_override: patch.manual_override.unwrap_or(self.manual_override),
        };
        weights.validate()?;
        Ok(weights)
    }
}

/// Partial weight update; `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeightsPatch {
    pub interest: Option<f64>,
    pub backlog_age: Option<f64>,
    pub content_length: Option<f64>,
    pub genre_diversity: Option<f64>,
    pub critic_score: Option<f64>,
    pub manual_override: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Backlog,
    Playing,
    Paused,
    Wishlist,
    Completed,
    Abandoned,
}

impl ItemStatus {
    /// Terminal items are dropped from rankings unless explicitly included.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Abandoned)
    }
}

/// A caller-owned backlog entry, optionally enriched with catalog data.
///
/// Fields set on the item itself win over the catalog record, so an item
/// whose fetch failed is still fully scoreable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacklogItem {
    pub id: String,
    pub title: String,
    pub status: ItemStatus,
    /// 1-5; unset scores at the midpoint of the interest weight.
    pub interest: Option<u8>,
    pub added_at: Option<DateTime<Utc>>,
    pub estimated_hours: Option<f64>,
    pub genres: Vec<String>,
    /// Signed nudge in -10..=10, scaled by the manual-override weight.
    pub manual_adjustment: f64,
    pub catalog: Option<CatalogRecord>,
}

impl Default for BacklogItem {
    fn default() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            status: ItemStatus::Backlog,
            interest: None,
            added_at: None,
            estimated_hours: None,
            genres: Vec::new(),
            manual_adjustment: 0.0,
            catalog: None,
        }
    }
}

impl BacklogItem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Self::default()
        }
    }

    /// Build an item straight from a catalog record.
    pub fn from_record(record: CatalogRecord) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            catalog: Some(record),
            ..Self::default()
        }
    }

    /// Attach catalog data, keeping manual fields.
    pub fn enrich(&mut self, record: CatalogRecord) {
        if self.title.trim().is_empty() {
            self.title = record.title.clone();
        }
        self.catalog = Some(record);
    }

    pub fn effective_genres(&self) -> &[String] {
        if !self.genres.is_empty() {
            return &self.genres;
        }
        self.catalog
            .as_ref()
            .map(|c| c.genres.as_slice())
            .unwrap_or(&[])
    }

    /// Known, positive length estimate in hours.
    pub fn effective_hours(&self) -> Option<f64> {
        self.estimated_hours
            .or_else(|| self.catalog.as_ref().and_then(|c| c.playtime_hours))
            .filter(|h| h.is_finite() && *h > 0.0)
    }

    pub fn critic_score(&self) -> Option<u32> {
        self.catalog.as_ref().and_then(|c| c.metacritic)
    }
}

/// Inputs beyond the item and the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringContext {
    /// Reference point for backlog age.
    pub now: DateTime<Utc>,
    /// Genres played recently; empty means no diversity context.
    pub recent_genres: Vec<String>,
}

impl ScoringContext {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now,
            recent_genres: Vec::new(),
        }
    }

    pub fn with_recent_genres(mut self, genres: Vec<String>) -> Self {
        self.recent_genres = genres;
        self
    }
}

/// Explainable score for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    /// Rounded sum of contributions.
    pub total: i64,
    /// Unrounded sum, used for ordering.
    pub raw_total: f64,
    pub contributions: BTreeMap<ScoreComponent, f64>,
    /// Sum of all weights, plus the bonus ceiling when a bonus was in play.
    pub max_possible: f64,
}

impl ScoreBreakdown {
    pub fn contribution(&self, component: ScoreComponent) -> f64 {
        self.contributions.get(&component).copied().unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankOptions {
    /// Keep completed/abandoned items.
    pub include_terminal: bool,
    /// Available hours; items longer than twice this are dropped.
    pub max_hours: Option<f64>,
    /// Explicit preferences win over `mood`.
    pub preferred_genres: Vec<String>,
    pub mood: Option<String>,
    pub recent_genres: Vec<String>,
    pub limit: Option<usize>,
    /// Defaults to the ranker's clock.
    pub now: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub item: BacklogItem,
    pub breakdown: ScoreBreakdown,
    /// Short human-readable explanations, strongest first.
    pub reasons: Vec<String>,
}
