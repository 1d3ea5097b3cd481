use serde::{Deserialize, Serialize};

/// A game as the rest of the crate sees it, normalized from the provider's
/// JSON. Summary records (from search) leave the detail-only fields empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: u64,
    pub slug: String,
    pub title: String,
    /// As sent by the provider, usually `YYYY-MM-DD`.
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub genres: Vec<String>,
    pub platforms: Vec<String>,
    /// Average playtime in hours. Zero from the provider means unknown.
    pub playtime_hours: Option<f64>,
    /// Aggregate critic score, 0-100.
    pub metacritic: Option<u32>,
    /// Community rating, 0-5.
    pub rating: Option<f64>,
    pub cover_url: Option<String>,

    // === Detail-only fields ===
    pub description: Option<String>,
    pub developers: Vec<String>,
    pub publishers: Vec<String>,
    pub tags: Vec<String>,
}

impl CatalogRecord {
    /// Whether this came from a detail lookup rather than a search page.
    pub fn is_detailed(&self) -> bool {
        self.description.is_some()
            || !self.developers.is_empty()
            || !self.publishers.is_empty()
            || !self.tags.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    /// Total matches reported by the provider, if it said.
    pub total: Option<u64>,
    pub records: Vec<CatalogRecord>,
}

impl SearchPage {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
