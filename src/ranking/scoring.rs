//! Weighted, explainable scoring of a single backlog item.
//!
//! Each factor yields a fraction in 0..=1 that is multiplied by its weight,
//! so no factor can contribute more than its weight. The manual override is
//! the only signed factor. Every missing input has a defined default; a zero
//! weight simply zeroes that factor.

use std::collections::{BTreeMap, HashSet};

use super::types::{
    BacklogItem, ScoreBreakdown, ScoreComponent, ScoringContext, Weights, MANUAL_ADJUSTMENT_LIMIT,
};

/// Fixed, weight-independent bonus for matching a preferred genre.
pub const PREFERRED_GENRE_BONUS: f64 = 15.0;

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Fraction used whenever a factor's input is unknown.
const UNKNOWN_FRACTION: f64 = 0.5;

pub fn score(item: &BacklogItem, context: &ScoringContext, weights: &Weights) -> ScoreBreakdown {
    let mut contributions = BTreeMap::new();

    contributions.insert(
        ScoreComponent::Interest,
        interest_fraction(item) * weights.interest,
    );
    contributions.insert(
        ScoreComponent::BacklogAge,
        age_fraction(item, context) * weights.backlog_age,
    );
    contributions.insert(
        ScoreComponent::ContentLength,
        length_fraction(item.effective_hours()) * weights.content_length,
    );
    contributions.insert(
        ScoreComponent::GenreDiversity,
        diversity_fraction(item.effective_genres(), &context.recent_genres) * weights.genre_diversity,
    );
    contributions.insert(
        ScoreComponent::CriticScore,
        critic_fraction(item.critic_score()) * weights.critic_score,
    );
    contributions.insert(
        ScoreComponent::ManualOverride,
        manual_factor(item.manual_adjustment) * weights.manual_override,
    );

    let raw_total: f64 = contributions.values().sum();

    ScoreBreakdown {
        total: raw_total.round() as i64,
        raw_total,
        contributions,
        max_possible: weights.total(),
    }
}

/// Add the preferred-genre bonus once if any of the item's genres match.
///
/// The bonus ceiling is added to `max_possible` whenever preferences are
/// active, match or not, so totals stay comparable across items.
pub fn apply_preferred_bonus(
    breakdown: &mut ScoreBreakdown,
    item: &BacklogItem,
    preferred_genres: &[String],
) -> bool {
    if preferred_genres.is_empty() {
        return false;
    }
    breakdown.max_possible += PREFERRED_GENRE_BONUS;

    let preferred = genre_set(preferred_genres);
    let matched = item
        .effective_genres()
        .iter()
        .any(|g| preferred.contains(&normalize_genre(g)));

    if matched {
        breakdown
            .contributions
            .insert(ScoreComponent::PreferredGenre, PREFERRED_GENRE_BONUS);
        breakdown.raw_total = breakdown.contributions.values().sum();
        breakdown.total = breakdown.raw_total.round() as i64;
    }
    matched
}

/// Interest 1-5 as a fraction of 5. Unset interest sits at the midpoint
/// of the contribution range.
fn interest_fraction(item: &BacklogItem) -> f64 {
    match item.interest {
        Some(level) => level.clamp(1, 5) as f64 / 5.0,
        None => UNKNOWN_FRACTION,
    }
}

/// Share of a year spent in the backlog, capped at one.
fn age_fraction(item: &BacklogItem, context: &ScoringContext) -> f64 {
    match item.added_at {
        Some(added_at) => {
            let seconds = (context.now - added_at).num_seconds().max(0) as f64;
            (seconds / SECONDS_PER_YEAR).min(1.0)
        }
        None => UNKNOWN_FRACTION,
    }
}

fn length_fraction(hours: Option<f64>) -> f64 {
    match hours {
        None => UNKNOWN_FRACTION,
        Some(h) if h <= 10.0 => 1.0,
        Some(h) if h <= 30.0 => 0.75,
        Some(h) if h <= 50.0 => 0.5,
        Some(h) if h <= 100.0 => 0.25,
        Some(_) => 0.1,
    }
}

fn diversity_fraction(genres: &[String], recent_genres: &[String]) -> f64 {
    if recent_genres.is_empty() {
        return 1.0;
    }

    let own = genre_set(genres);
    if own.is_empty() {
        return UNKNOWN_FRACTION;
    }

    let recent = genre_set(recent_genres);
    let overlap = own.iter().filter(|g| recent.contains(*g)).count();
    1.0 - overlap as f64 / own.len() as f64
}

fn critic_fraction(metacritic: Option<u32>) -> f64 {
    match metacritic {
        Some(score) if score > 0 => score.min(100) as f64 / 100.0,
        _ => 0.0,
    }
}

/// -10..=10 mapped onto -1..=1 of the override weight.
fn manual_factor(adjustment: f64) -> f64 {
    if !adjustment.is_finite() {
        return 0.0;
    }
    adjustment.clamp(-MANUAL_ADJUSTMENT_LIMIT, MANUAL_ADJUSTMENT_LIMIT) / 10.0
}

fn normalize_genre(genre: &str) -> String {
    genre.trim().to_lowercase()
}

fn genre_set(genres: &[String]) -> HashSet<String> {
    genres
        .iter()
        .map(|g| normalize_genre(g))
        .filter(|g| !g.is_empty())
        .collect()
}

/// Human-readable reasons for the strongest parts of a score.
pub fn explain(item: &BacklogItem, breakdown: &ScoreBreakdown, weights: &Weights) -> Vec<String> {
    let mut reasons: Vec<(f64, String)> = Vec::new();

    let strong = |component: ScoreComponent| {
        let weight = weights.get(component);
        weight > 0.0 && breakdown.contribution(component) >= 0.75 * weight
    };

    if strong(ScoreComponent::Interest) && item.interest.is_some() {
        reasons.push((
            breakdown.contribution(ScoreComponent::Interest),
            format!("High personal interest ({}/5)", item.interest.unwrap_or(0)),
        ));
    }
    if strong(ScoreComponent::BacklogAge) && item.added_at.is_some() {
        reasons.push((
            breakdown.contribution(ScoreComponent::BacklogAge),
            "Waiting in the backlog for a long time".to_string(),
        ));
    }
    if strong(ScoreComponent::ContentLength) {
        if let Some(hours) = item.effective_hours() {
            reasons.push((
                breakdown.contribution(ScoreComponent::ContentLength),
                format!("Short enough to finish (~{:.0}h)", hours),
            ));
        }
    }
    if strong(ScoreComponent::GenreDiversity) && !item.effective_genres().is_empty() {
        reasons.push((
            breakdown.contribution(ScoreComponent::GenreDiversity),
            "A change of pace from recent genres".to_string(),
        ));
    }
    if strong(ScoreComponent::CriticScore) {
        if let Some(score) = item.critic_score() {
            reasons.push((
                breakdown.contribution(ScoreComponent::CriticScore),
                format!("Critically acclaimed ({})", score),
            ));
        }
    }

    let manual = breakdown.contribution(ScoreComponent::ManualOverride);
    if manual > 0.0 {
        reasons.push((manual, "Manually boosted".to_string()));
    } else if manual < 0.0 {
        reasons.push((manual.abs(), "Manually demoted".to_string()));
    }

    let bonus = breakdown.contribution(ScoreComponent::PreferredGenre);
    if bonus > 0.0 {
        reasons.push((bonus, "Matches a preferred genre".to_string()));
    }

    reasons.sort_by(|a, b| b.0.total_cmp(&a.0));
    reasons.into_iter().map(|(_, reason)| reason).collect()
}
