//! Provider wire shapes. Only the fields the pipeline extracts are declared;
//! every one of them is optional because partial records are routine.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformEntry {
    #[serde(default)]
    pub platform: Option<NamedRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawGame {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub released: Option<String>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub metacritic: Option<f64>,
    #[serde(default)]
    pub rating: Option<f64>,
    /// Average hours.
    #[serde(default)]
    pub playtime: Option<f64>,
    #[serde(default)]
    pub platforms: Option<Vec<PlatformEntry>>,
    #[serde(default)]
    pub genres: Option<Vec<NamedRef>>,

    // Detail endpoint only
    #[serde(default)]
    pub description_raw: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub developers: Option<Vec<NamedRef>>,
    #[serde(default)]
    pub publishers: Option<Vec<NamedRef>>,
    #[serde(default)]
    pub tags: Option<Vec<NamedRef>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSearchPage {
    #[serde(default)]
    pub count: Option<u64>,
    /// Kept as raw values so a single malformed item can be skipped
    /// without losing the page.
    #[serde(default)]
    pub results: Option<Vec<serde_json::Value>>,
}
