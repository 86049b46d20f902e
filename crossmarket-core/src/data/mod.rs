//! Source adapters, normalization, and staging.

pub mod canonicalize;
pub mod coingecko;
pub mod extract;
pub mod normalize;
pub mod oil;
pub mod provider;
pub mod staging;
pub mod yahoo;

pub use canonicalize::Canonicalizer;
pub use extract::{extract_to_staging, ExtractSummary, StepReport};
pub use provider::{
    DataError, ExtractProgress, HttpClient, HttpSource, SourceBatch, StdoutProgress, TracingProgress,
};
pub use staging::{HashCheck, StagedFile, StagingDir, StagingManifest, StagingStatus};
