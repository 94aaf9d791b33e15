pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod table;

// Layered boundaries for application ports and infrastructure adapters
pub mod app;
pub mod infra;

pub use config::Config;
pub use error::{CleanerError, Result};
pub use pipeline::{Pipeline, PipelineResult, PipelineStage};
pub use table::{ColumnType, RecordTable, Value};
