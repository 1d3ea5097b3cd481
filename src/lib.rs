//! Backlog "what next" core: a cached, rate-limited, retrying client for an
//! external game catalog feeding an explainable ranking engine.

pub mod cache;
pub mod catalog;
pub mod clock;
pub mod config;
pub mod errors;
pub mod models;
pub mod ranking;
pub mod ratelimit;
pub mod service;

pub use cache::{CacheStats, CacheStore};
pub use catalog::{CatalogTransport, Fetched, FetchSource, SearchOptions, TransportResponse};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::PipelineConfig;
pub use errors::{NextUpError, Result};
pub use models::{CatalogRecord, SearchPage};
pub use ranking::{BacklogItem, RankOptions, RankedItem, ScoreBreakdown, Weights, WeightsPatch};
pub use service::NextUp;
