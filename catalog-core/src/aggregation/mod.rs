//! Post-scan aggregation of top-level directories into media entities.

mod config;
mod service;
pub mod title_parser;

pub use config::AggregationConfig;
pub use service::{AggregationService, AggregationSummary, detect_media_kind};
pub use title_parser::ParsedTitle;
