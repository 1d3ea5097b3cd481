//! Provider JSON → [`CatalogRecord`].
//!
//! Missing fields become `None` or empty lists; only a missing identifier on
//! a search item causes that item to be skipped.

use serde_json::Value;

use super::models::{NamedRef, RawGame, RawSearchPage};
use crate::errors::{NextUpError, Result};
use crate::models::{CatalogRecord, SearchPage};

pub fn normalize_search(data: Value, page_size: usize) -> Result<SearchPage> {
    if !data.is_object() {
        return Err(NextUpError::Parse(
            "search response is not a JSON object".to_string(),
        ));
    }

    let page: RawSearchPage = serde_json::from_value(data)?;

    let records: Vec<CatalogRecord> = page
        .results
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<RawGame>(item) {
            Ok(raw) => match raw.id {
                Some(id) => Some(to_record(raw, id)),
                None => {
                    log::debug!("Skipping search item without id");
                    None
                }
            },
            Err(e) => {
                log::debug!("Skipping malformed search item: {}", e);
                None
            }
        })
        .take(page_size)
        .collect();

    Ok(SearchPage {
        total: page.count,
        records,
    })
}

/// `requested_id` stands in when the provider omits the id.
pub fn normalize_detail(data: Value, requested_id: u64) -> Result<CatalogRecord> {
    if !data.is_object() {
        return Err(NextUpError::Parse(
            "detail response is not a JSON object".to_string(),
        ));
    }

    let raw: RawGame = serde_json::from_value(data)?;
    let id = raw.id.unwrap_or(requested_id);
    Ok(to_record(raw, id))
}

fn to_record(raw: RawGame, id: u64) -> CatalogRecord {
    let title = non_empty(raw.name).unwrap_or_else(|| format!("Game {}", id));
    let slug = non_empty(raw.slug).unwrap_or_else(|| slugify(&title));
    let release_date = non_empty(raw.released);
    let release_year = release_date.as_deref().and_then(parse_year);

    let platforms = raw
        .platforms
        .unwrap_or_default()
        .into_iter()
        .filter_map(|p| p.platform.and_then(|n| non_empty(n.name)))
        .collect();

    let description = non_empty(raw.description_raw).or_else(|| {
        non_empty(raw.description)
            .map(|html| strip_tags(&html))
            .and_then(|text| non_empty(Some(text)))
    });

    CatalogRecord {
        id,
        slug,
        title,
        release_date,
        release_year,
        genres: names(raw.genres),
        platforms,
        playtime_hours: raw.playtime.filter(|h| h.is_finite() && *h > 0.0),
        metacritic: raw
            .metacritic
            .filter(|m| m.is_finite() && *m > 0.0)
            .map(|m| m.round().min(100.0) as u32),
        rating: raw.rating.filter(|r| r.is_finite() && *r > 0.0),
        cover_url: non_empty(raw.background_image),
        description,
        developers: names(raw.developers),
        publishers: names(raw.publishers),
        tags: names(raw.tags),
    }
}

fn names(list: Option<Vec<NamedRef>>) -> Vec<String> {
    list.unwrap_or_default()
        .into_iter()
        .filter_map(|n| non_empty(n.name))
        .collect()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_year(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

/// Crude HTML-to-text for providers that only send the HTML description.
fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
