//! Cache-first tab resolution.
//!
//! Per request: cache hit → done. Otherwise fetch → extract → normalize,
//! answer the caller, and hand the cache write to the blocking pool. The
//! write is never awaited on the request path and its failures only show up
//! in the log. Writes are detached tasks: dropping the service does not
//! cancel them, but shutting the runtime down before they start does, so
//! short-lived callers should [`flush`](TabResolutionService::flush) first.
//!
//! Concurrent requests for the same key may both miss and both fetch; the
//! writes are idempotent upserts, so the cost is a duplicate fetch.

use std::iter;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::task::JoinHandle;

use tabvault_core::model::{AltVersionRef, Song, TabDocument, TabVersion, VersionRef};

use crate::cache::{CacheWriteReport, TabCache};
use crate::config::Config;
use crate::error::{FetchError, FetchResult, PipelineError};
use crate::extract::PayloadExtractor;
use crate::fetch::{DocumentSource, RemoteDocumentFetcher};
use crate::normalize::{NormalizedTab, TabNormalizer};

/// Writes tracked for [`TabResolutionService::flush`] before finished ones
/// are released.
pub const MAX_TRACKED_WRITES: usize = 64;

/// Outcome of resolving one tab key.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// Real tab content, from the cache or freshly fetched.
    Found(TabDocument),
    /// The page exists but its content type cannot be shown as text.
    /// `document` describes the type; it is never cached.
    Unsupported {
        content_type: String,
        document: TabDocument,
    },
    /// No usable page: fetch failure, missing payload, or no song.
    NotFound,
}

impl Resolution {
    pub fn document(&self) -> Option<&TabDocument> {
        match self {
            Self::Found(document) | Self::Unsupported { document, .. } => Some(document),
            Self::NotFound => None,
        }
    }

    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Reduce an inbound key to the relative tab path.
///
/// Accepts either the relative path or the full remote URL.
pub fn normalize_key(input: &str, base_url: &str) -> FetchResult<String> {
    let trimmed = input.trim();
    let key = trimmed
        .strip_prefix(base_url)
        .unwrap_or(trimmed)
        .trim_matches('/');

    if key.is_empty() {
        return Err(FetchError::InvalidKey(input.to_string()));
    }
    Ok(key.to_string())
}

/// A missing page is routine, a transient failure worth noticing, anything
/// else a sign the site or configuration changed.
fn fetch_failure_level(error: &FetchError) -> log::Level {
    if error.is_not_found() {
        log::Level::Debug
    } else if error.is_transient() {
        log::Level::Warn
    } else {
        log::Level::Error
    }
}

#[derive(Debug)]
pub struct TabResolutionService {
    source: Arc<dyn DocumentSource>,
    extractor: PayloadExtractor,
    normalizer: TabNormalizer,
    cache: TabCache,
    base_url: String,
    pending: Mutex<Vec<JoinHandle<CacheWriteReport>>>,
}

impl TabResolutionService {
    /// Build the service against the live remote site.
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        let fetcher = RemoteDocumentFetcher::new(config)?;
        Self::with_source(config, Arc::new(fetcher))
    }

    /// Build the service with any document source.
    pub fn with_source(
        config: &Config,
        source: Arc<dyn DocumentSource>,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            source,
            extractor: PayloadExtractor::store()?,
            normalizer: TabNormalizer::from_config(config),
            cache: TabCache::new(&config.database_path, config.refresh_policy),
            base_url: config.base_url.clone(),
            pending: Mutex::new(Vec::new()),
        })
    }

    pub const fn cache(&self) -> &TabCache {
        &self.cache
    }

    /// Resolve a tab key to a document.
    pub async fn resolve(&self, key: &str) -> Resolution {
        let key = match normalize_key(key, &self.base_url) {
            Ok(key) => key,
            Err(e) => {
                log::warn!("{e}");
                return Resolution::NotFound;
            }
        };

        if let Some(document) = self.cache.lookup(&key) {
            log::debug!("Cache hit for {key}");
            return Resolution::Found(document);
        }

        let url = format!("{}{}", self.base_url, key);
        log::info!("Cache miss for {key}, fetching");

        let html = match self.source.fetch(&url).await {
            Ok(html) => html,
            Err(e) => {
                log::log!(fetch_failure_level(&e), "Fetch failed for {key}: {e}");
                return Resolution::NotFound;
            }
        };

        let tree = self.extractor.extract(&html);
        let NormalizedTab {
            song,
            mut tab,
            alt_versions,
            unsupported_type,
        } = self.normalizer.normalize(&tree);
        tab.tab_url.clone_from(&key);

        if let Some(content_type) = unsupported_type {
            let document = TabDocument::assemble(&song, &tab, Vec::new());
            return Resolution::Unsupported {
                content_type,
                document,
            };
        }

        if song.name.is_empty() || !song.has_identity() {
            log::info!("No song found in page for {key}");
            return Resolution::NotFound;
        }

        let alt_versions: Vec<AltVersionRef> = alt_versions
            .into_iter()
            .filter(|alt| alt.tab_url != key)
            .collect();

        let versions = alt_versions
            .iter()
            .map(|alt| VersionRef {
                tab_url: alt.tab_url.clone(),
                version: alt.version,
                rating: alt.rating,
            })
            .chain(iter::once(VersionRef {
                tab_url: tab.tab_url.clone(),
                version: tab.version,
                rating: tab.rating,
            }))
            .collect();
        let document = TabDocument::assemble(&song, &tab, versions);

        self.spawn_write(song, tab, alt_versions);

        Resolution::Found(document)
    }

    /// Wait for every cache write still tracked and return their reports.
    ///
    /// Once [`MAX_TRACKED_WRITES`] writes are tracked, finished ones are
    /// released unreported.
    pub async fn flush(&self) -> Vec<CacheWriteReport> {
        let pending = std::mem::take(&mut *self.pending());
        let mut reports = Vec::with_capacity(pending.len());

        for handle in pending {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => log::warn!("Cache write task failed: {e}"),
            }
        }
        reports
    }

    fn spawn_write(&self, song: Song, tab: TabVersion, alts: Vec<AltVersionRef>) {
        let cache = self.cache.clone();
        let mut pending = self.pending();

        if pending.len() >= MAX_TRACKED_WRITES {
            pending.retain(|handle| !handle.is_finished());
        }
        pending.push(tokio::task::spawn_blocking(move || {
            cache.persist(&song, &tab, &alts)
        }));
    }

    fn pending(&self) -> MutexGuard<'_, Vec<JoinHandle<CacheWriteReport>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://tabs.ultimate-guitar.com/tab/";

    #[test]
    fn test_normalize_key_relative() {
        assert_eq!(
            normalize_key("oasis/wonderwall-chords-1", BASE).unwrap(),
            "oasis/wonderwall-chords-1"
        );
        assert_eq!(
            normalize_key("  /oasis/wonderwall-chords-1/ ", BASE).unwrap(),
            "oasis/wonderwall-chords-1"
        );
    }

    #[test]
    fn test_normalize_key_full_url() {
        let key = normalize_key(&format!("{BASE}oasis/wonderwall-chords-1"), BASE).unwrap();
        assert_eq!(key, "oasis/wonderwall-chords-1");
    }

    #[test]
    fn test_normalize_key_rejects_empty() {
        assert!(matches!(
            normalize_key(" / ", BASE),
            Err(FetchError::InvalidKey(_))
        ));
        assert!(normalize_key(BASE, BASE).is_err());
    }

    #[test]
    fn test_fetch_failure_level() {
        let status = |status| FetchError::Status {
            url: BASE.to_string(),
            status,
        };
        assert_eq!(fetch_failure_level(&status(404)), log::Level::Debug);
        assert_eq!(fetch_failure_level(&status(410)), log::Level::Debug);
        assert_eq!(fetch_failure_level(&status(503)), log::Level::Warn);
        assert_eq!(
            fetch_failure_level(&FetchError::Timeout {
                url: BASE.to_string()
            }),
            log::Level::Warn
        );
        assert_eq!(fetch_failure_level(&status(403)), log::Level::Error);
    }

    #[test]
    fn test_resolution_document_accessor() {
        assert!(Resolution::NotFound.document().is_none());
        assert!(!Resolution::NotFound.is_found());
    }
}
