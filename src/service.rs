//! The surface collaborators call: catalog reads, ranking, weights and
//! cache housekeeping behind one handle.

use std::path::Path;
use std::sync::Arc;

use crate::cache::{CacheBackend, CacheStats, CacheStore, MemoryBackend, SqliteBackend};
use crate::catalog::{CatalogTransport, Fetched, FetchPipeline, HttpTransport, SearchOptions};
use crate::clock::{Clock, SystemClock};
use crate::config::PipelineConfig;
use crate::errors::{NextUpError, Result};
use crate::models::{CatalogRecord, SearchPage};
use crate::ranking::{
    BacklogItem, RankOptions, RankedItem, Ranker, ScoreBreakdown, ScoringContext, Weights,
    WeightsPatch,
};

pub struct NextUp {
    pipeline: FetchPipeline,
    cache: Arc<CacheStore>,
    ranker: Ranker,
}

impl NextUp {
    pub fn new(
        config: PipelineConfig,
        transport: Arc<dyn CatalogTransport>,
        backend: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        config.validate()?;

        let cache = Arc::new(CacheStore::new(backend, clock.clone(), &config.cache));
        let pipeline = FetchPipeline::new(&config, transport, cache.clone());
        let ranker = Ranker::new(config.weights.clone(), clock);

        log::info!(
            "NextUp ready (catalog {}, {} attempt(s), cache max age {}s)",
            config.api_base_url,
            config.retry.max_attempts,
            config.cache.max_age_secs
        );

        Ok(Self {
            pipeline,
            cache,
            ranker,
        })
    }

    /// Real HTTP transport with an in-memory cache.
    pub fn with_http(config: PipelineConfig) -> Result<Self> {
        let transport = HttpTransport::new(config.request_timeout())?;
        Self::new(
            config,
            Arc::new(transport),
            Arc::new(MemoryBackend::new()),
            Arc::new(SystemClock),
        )
    }

    /// Real HTTP transport with a cache persisted in a SQLite file.
    pub async fn with_sqlite(config: PipelineConfig, db_path: &Path) -> Result<Self> {
        let backend = SqliteBackend::open(db_path)
            .await
            .map_err(|e| NextUpError::Config(format!("cannot open cache database: {}", e)))?;
        let transport = HttpTransport::new(config.request_timeout())?;
        Self::new(
            config,
            Arc::new(transport),
            Arc::new(backend),
            Arc::new(SystemClock),
        )
    }

    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Fetched<SearchPage>> {
        self.pipeline.search(query, options).await
    }

    pub async fn get_by_id(&self, id: u64) -> Result<Fetched<CatalogRecord>> {
        self.pipeline.get_by_id(id).await
    }

    pub async fn get_many(&self, ids: &[u64]) -> Vec<CatalogRecord> {
        self.pipeline.get_many(ids).await
    }

    /// Attach catalog data to items whose id is a catalog id and that carry
    /// none yet. Items whose lookup fails are kept as they are.
    pub async fn enrich(&self, items: &mut [BacklogItem]) -> usize {
        let mut enriched = 0;

        for item in items.iter_mut().filter(|i| i.catalog.is_none()) {
            let Ok(id) = item.id.trim().parse::<u64>() else {
                continue;
            };
            match self.pipeline.get_by_id(id).await {
                Ok(fetched) => {
                    item.enrich(fetched.value);
                    enriched += 1;
                }
                Err(e) => {
                    log::warn!("Keeping manual record for {} ({}): {}", item.title, id, e);
                }
            }
        }

        enriched
    }

    pub fn rank(&self, items: Vec<BacklogItem>, options: &RankOptions) -> Vec<RankedItem> {
        self.ranker.rank(items, options)
    }

    /// Score one item, with the active weights unless others are given.
    pub fn score(
        &self,
        item: &BacklogItem,
        context: &ScoringContext,
        weights: Option<&Weights>,
    ) -> ScoreBreakdown {
        match weights {
            Some(weights) => crate::ranking::scoring::score(item, context, weights),
            None => self.ranker.score(item, context),
        }
    }

    pub fn update_weights(&self, patch: &WeightsPatch) -> Result<Weights> {
        self.ranker.update_weights(patch)
    }

    pub fn weights(&self) -> Weights {
        (*self.ranker.weights()).clone()
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await
    }

    pub async fn evict_expired(&self) -> usize {
        self.cache.evict_expired().await
    }
}
