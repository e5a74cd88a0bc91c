//! Feed ingestion: author dedup plus the batch pipeline

mod dedup;
mod pipeline;

pub use dedup::{AuthorDeduplicator, Resolution};
pub use pipeline::{IngestPipeline, IngestReport};
