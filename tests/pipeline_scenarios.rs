use async_trait::async_trait;
use chrono::{DateTime, TimeDelta};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use nextup::cache::MemoryBackend;
use nextup::ranking::{BacklogItem, RankOptions};
use nextup::{
    CatalogTransport, FetchSource, ManualClock, NextUp, NextUpError, PipelineConfig, SearchOptions,
    TransportResponse,
};

/// Answers with queued responses, then repeats the last one.
struct FakeCatalog {
    responses: Mutex<VecDeque<(u16, String)>>,
    last: Mutex<(u16, String)>,
    calls: Mutex<Vec<String>>,
}

impl FakeCatalog {
    fn new(responses: Vec<(u16, serde_json::Value)>) -> Arc<Self> {
        let responses: VecDeque<(u16, String)> = responses
            .into_iter()
            .map(|(status, body)| (status, body.to_string()))
            .collect();
        let last = responses.back().cloned().unwrap_or((500, String::new()));
        Arc::new(Self {
            responses: Mutex::new(responses),
            last: Mutex::new(last),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl CatalogTransport for FakeCatalog {
    async fn get(
        &self,
        url: &str,
        _params: &[(String, String)],
        _timeout: Duration,
    ) -> nextup::Result<TransportResponse> {
        self.calls.lock().push(url.to_string());
        // Let concurrent callers interleave.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let next = self.responses.lock().pop_front();
        let (status, body) = next.unwrap_or_else(|| self.last.lock().clone());
        Ok(TransportResponse { status, body })
    }
}

fn start() -> ManualClock {
    ManualClock::new(DateTime::from_timestamp(1_750_000_000, 0).unwrap())
}

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.api_key = "test-key".into();
    config.retry.base_delay_ms = 100;
    config.rate_limit.period_ms = 200;
    config
}

fn service(transport: Arc<FakeCatalog>, clock: &ManualClock) -> NextUp {
    NextUp::new(
        config(),
        transport,
        Arc::new(MemoryBackend::new()),
        Arc::new(clock.clone()),
    )
    .unwrap()
}

fn detail(id: u64, name: &str) -> serde_json::Value {
    json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase().replace(' ', "-"),
        "released": "2020-09-17",
        "metacritic": 93,
        "playtime": 22,
        "genres": [{ "name": "Action" }, { "name": "Indie" }],
        "platforms": [{ "platform": { "name": "PC" } }],
        "description_raw": "Defy the god of the dead."
    })
}

#[tokio::test(start_paused = true)]
async fn cached_record_expires_after_seven_days() {
    let clock = start();
    let catalog = FakeCatalog::new(vec![(200, detail(1, "Hades"))]);
    let app = service(catalog.clone(), &clock);

    let first = app.get_by_id(1).await.unwrap();
    assert_eq!(first.source, FetchSource::Network);
    assert_eq!(first.value.release_year, Some(2020));

    clock.advance(TimeDelta::days(6));
    let second = app.get_by_id(1).await.unwrap();
    assert!(second.from_cache());
    assert_eq!(catalog.calls(), 1);

    clock.advance(TimeDelta::days(2));
    let third = app.get_by_id(1).await.unwrap();
    assert_eq!(third.source, FetchSource::Network);
    assert_eq!(catalog.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn concurrent_identical_lookups_share_one_call() {
    let clock = start();
    let catalog = FakeCatalog::new(vec![(200, detail(7, "Celeste"))]);
    let app = service(catalog.clone(), &clock);

    let (a, b, c) = tokio::join!(app.get_by_id(7), app.get_by_id(7), app.get_by_id(7));

    assert_eq!(catalog.calls(), 1);
    let sources = [a.unwrap().source, b.unwrap().source, c.unwrap().source];
    assert_eq!(
        sources.iter().filter(|s| **s == FetchSource::Network).count(),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn transient_failures_are_retried_then_cached() {
    let clock = start();
    let page = json!({
        "count": 2,
        "results": [
            { "id": 1, "name": "Hades" },
            { "id": 2, "name": "Hades II" }
        ]
    });
    let catalog = FakeCatalog::new(vec![
        (503, json!({ "error": "busy" })),
        (502, json!({ "error": "bad gateway" })),
        (200, page),
    ]);
    let app = service(catalog.clone(), &clock);

    let fetched = app.search("  HADES ", &SearchOptions::default()).await.unwrap();
    assert_eq!(fetched.attempts, 3);
    assert_eq!(fetched.value.records.len(), 2);

    // Same query modulo case and whitespace hits the cache.
    let again = app.search("hades", &SearchOptions::default()).await.unwrap();
    assert!(again.from_cache());
    assert_eq!(catalog.calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_is_not_cached() {
    let clock = start();
    let catalog = FakeCatalog::new(vec![(401, json!({ "error": "bad key" }))]);
    let app = service(catalog.clone(), &clock);

    let err = app.get_by_id(5).await.unwrap_err();
    assert!(matches!(err, NextUpError::Http { status: 401, .. }));
    assert_eq!(catalog.calls(), 1);

    assert!(app.get_by_id(5).await.is_err());
    assert_eq!(catalog.calls(), 2);
    assert_eq!(app.cache_stats().await.entries, 0);
}

#[tokio::test(start_paused = true)]
async fn ranking_prefers_short_beloved_backlog_item() {
    let clock = start();
    let app = service(FakeCatalog::new(vec![]), &clock);
    let now = DateTime::from_timestamp(1_750_000_000, 0).unwrap();

    let mut a = BacklogItem::new("A", "Short favorite");
    a.interest = Some(5);
    a.estimated_hours = Some(8.0);
    a.added_at = Some(now - TimeDelta::days(400));
    let mut record = app_record(90);
    record.title = "Short favorite".into();
    a.catalog = Some(record);

    let mut b = BacklogItem::new("B", "Long new arrival");
    b.interest = Some(2);
    b.estimated_hours = Some(120.0);
    b.added_at = Some(now - TimeDelta::days(10));
    b.catalog = Some(app_record(40));

    let ranked = app.rank(vec![b, a], &RankOptions::default());

    assert_eq!(ranked[0].item.id, "A");
    assert_eq!(ranked[0].breakdown.total, 80);
    assert_eq!(ranked[1].item.id, "B");
    assert!(ranked[0].breakdown.total > ranked[1].breakdown.total);
    assert!(!ranked[0].reasons.is_empty());
}

fn app_record(metacritic: u32) -> nextup::CatalogRecord {
    nextup::CatalogRecord {
        id: 0,
        slug: String::new(),
        title: String::new(),
        release_date: None,
        release_year: None,
        genres: vec![],
        platforms: vec![],
        playtime_hours: None,
        metacritic: Some(metacritic),
        rating: None,
        cover_url: None,
        description: None,
        developers: vec![],
        publishers: vec![],
        tags: vec![],
    }
}
