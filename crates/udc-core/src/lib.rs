//! # udc-core: the Universal Data Connector query pipeline
//!
//! Everything a connector needs to answer a fetch, independent of transport:
//!
//! - [`cursor`]: opaque pagination tokens
//! - [`store`]: loading and normalizing a source's backing document
//! - [`filter`]: named filters, free-text query, time range
//! - [`pipeline`]: load, filter, sort, paginate
//! - [`classify`]: structural shape of a page
//! - [`aggregate`]: average, extremes and trend of a metric window
//! - [`voice`]: summaries and highlights for speech
//! - [`freshness`]: age and staleness of a result set

pub mod aggregate;
pub mod classify;
pub mod cursor;
pub mod error;
pub mod filter;
pub mod freshness;
pub mod pipeline;
pub mod record;
pub mod store;
pub mod voice;

pub use aggregate::{MetricSummary, Trend};
pub use classify::{classify, DataShape};
pub use error::ConnectorError;
pub use filter::{FilterKey, FilterMap, TimeRange};
pub use freshness::Freshness;
pub use pipeline::{FetchRequest, FetchResult, Page, PageLimits, Selection};
pub use record::{Customer, MetricPoint, Record, RecordId, Source, SupportTicket};
pub use store::{JsonFileStore, MemoryStore, RecordStore};
