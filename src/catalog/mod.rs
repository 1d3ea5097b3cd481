//! External game catalog access.
//!
//! Two reads are exposed (free-text search and lookup by id), both routed
//! through the same cached, rate-limited, retrying [`FetchPipeline`].

pub mod endpoint;
pub mod models;
pub mod normalize;
pub mod pipeline;
pub mod transport;

pub use endpoint::{Endpoint, SearchOptions};
pub use pipeline::{FetchPipeline, FetchSource, Fetched};
pub use transport::{CatalogTransport, HttpTransport, TransportResponse};
