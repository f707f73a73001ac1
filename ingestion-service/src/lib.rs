pub mod api;
pub mod config;
pub mod metrics_server;
pub mod observability;
pub mod pipeline;
pub mod sources;
pub mod stores;
pub mod transform;

pub use pipeline::{IngestMode, IngestReport, IngestionError};
pub use stores::{MeterStore, Store};
