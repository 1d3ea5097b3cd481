use serde::{Deserialize, Serialize};

use crate::config::MAX_PAGE_SIZE;

/// Optional knobs for a free-text search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchOptions {
    /// Falls back to the configured default page size.
    pub page_size: Option<u32>,
    /// Provider platform ids or slugs.
    pub platforms: Vec<String>,
    /// Provider genre ids or slugs.
    pub genres: Vec<String>,
    /// Provider ordering, e.g. `-metacritic` or `released`.
    pub ordering: Option<String>,
}

/// One of the two logical catalog reads.
#[derive(Debug, Clone, PartialEq)]
pub enum Endpoint {
    Search {
        query: String,
        page_size: u32,
        platforms: Vec<String>,
        genres: Vec<String>,
        ordering: Option<String>,
    },
    Detail {
        id: u64,
    },
}

impl Endpoint {
    /// Build a search descriptor with normalized parameters: trimmed,
    /// lower-cased, filters sorted and de-duplicated, page size clamped.
    pub fn search(query: &str, options: &SearchOptions, default_page_size: u32) -> Self {
        let page_size = options
            .page_size
            .unwrap_or(default_page_size)
            .clamp(1, MAX_PAGE_SIZE);

        Endpoint::Search {
            query: normalize_text(query),
            page_size,
            platforms: normalize_list(&options.platforms),
            genres: normalize_list(&options.genres),
            ordering: options
                .ordering
                .as_deref()
                .map(normalize_text)
                .filter(|o| !o.is_empty()),
        }
    }

    pub fn detail(id: u64) -> Self {
        Endpoint::Detail { id }
    }

    /// Name used in logs.
    pub fn operation(&self) -> &'static str {
        match self {
            Endpoint::Search { .. } => "search",
            Endpoint::Detail { .. } => "get_by_id",
        }
    }

    pub fn path(&self) -> String {
        match self {
            Endpoint::Search { .. } => "/games".to_string(),
            Endpoint::Detail { id } => format!("/games/{}", id),
        }
    }

    /// Query parameters, excluding the access key.
    pub fn query_params(&self) -> Vec<(String, String)> {
        match self {
            Endpoint::Search {
                query,
                page_size,
                platforms,
                genres,
                ordering,
            } => {
                let mut params = vec![
                    ("search".to_string(), query.clone()),
                    ("page_size".to_string(), page_size.to_string()),
                ];
                if !platforms.is_empty() {
                    params.push(("platforms".to_string(), platforms.join(",")));
                }
                if !genres.is_empty() {
                    params.push(("genres".to_string(), genres.join(",")));
                }
                if let Some(ordering) = ordering {
                    params.push(("ordering".to_string(), ordering.clone()));
                }
                params
            }
            Endpoint::Detail { .. } => Vec::new(),
        }
    }

    /// Stable textual identity of this request, the input to the cache key.
    ///
    /// Components are emitted in a fixed order and url-encoded so separator
    /// characters inside values cannot make two requests look alike.
    pub fn canonical_identity(&self) -> String {
        match self {
            Endpoint::Search {
                query,
                page_size,
                platforms,
                genres,
                ordering,
            } => format!(
                "search|genres={}|ordering={}|page_size={}|platforms={}|query={}",
                encode_list(genres),
                urlencoding::encode(ordering.as_deref().unwrap_or("")),
                page_size,
                encode_list(platforms),
                urlencoding::encode(query),
            ),
            Endpoint::Detail { id } => format!("detail|id={}", id),
        }
    }

    pub fn page_size(&self) -> usize {
        match self {
            Endpoint::Search { page_size, .. } => *page_size as usize,
            Endpoint::Detail { .. } => 1,
        }
    }
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn normalize_list(items: &[String]) -> Vec<String> {
    let mut list: Vec<String> = items
        .iter()
        .map(|s| normalize_text(s))
        .filter(|s| !s.is_empty())
        .collect();
    list.sort();
    list.dedup();
    list
}

fn encode_list(items: &[String]) -> String {
    items
        .iter()
        .map(|s| urlencoding::encode(s).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}
