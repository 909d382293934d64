//! Fetch-parse-normalize-cache pipeline for tabvault.
//!
//! Given a relative tab path, [`TabResolutionService`] answers from the
//! cache when it holds real content, otherwise fetches the remote page,
//! extracts its embedded JSON payload, normalizes it into songs and tab
//! versions, and writes the result back in the background.

#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

pub mod cache;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod resilience;
pub mod resolve;

pub use cache::{CacheWriteReport, TabCache};
pub use config::Config;
pub use error::{ExtractionError, FetchError, FetchResult, PipelineError};
pub use extract::PayloadExtractor;
pub use fetch::{DocumentSource, RemoteDocumentFetcher};
pub use normalize::{NormalizedTab, TabNormalizer};
pub use resolve::{normalize_key, Resolution, TabResolutionService};
