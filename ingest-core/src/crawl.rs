//! Batch runner: fetch, classify, and stage many URLs concurrently.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info_span, Instrument};

use crate::candidates::{discover_recipe_links, search_page_url, UrlTemplates};
use crate::classify::record_for_attempt;
use crate::config::ExtractConfig;
use crate::error::ConfigError;
use crate::http::Fetcher;
use crate::sink::StagingSink;
use crate::types::{ExtractStatus, RecipeRecord};

pub const DEFAULT_CONCURRENCY: usize = 4;

/// What happened to one URL.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub record: RecipeRecord,
    /// False when the sink rejected the record
    pub staged: bool,
}

/// Per-status tallies for a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    counts: HashMap<ExtractStatus, usize>,
    pub sink_failures: usize,
}

impl BatchSummary {
    pub fn add(&mut self, outcome: &IngestOutcome) {
        *self.counts.entry(outcome.record.extract_status).or_default() += 1;
        if !outcome.staged {
            self.sink_failures += 1;
        }
    }

    pub fn count(&self, status: ExtractStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Processed: {}", self.total())?;
        for status in ExtractStatus::ALL {
            let count = self.count(*status);
            if count > 0 {
                writeln!(f, "  {:<22} {}", status.as_str(), count)?;
            }
        }
        write!(f, "Sink failures: {}", self.sink_failures)
    }
}

/// Fetches pages, turns each into a record and hands it to the sink.
#[derive(Clone)]
pub struct Crawler {
    fetcher: Arc<dyn Fetcher>,
    sink: Arc<dyn StagingSink>,
    config: Arc<ExtractConfig>,
    concurrency: usize,
}

impl Crawler {
    pub fn new(fetcher: Arc<dyn Fetcher>, sink: Arc<dyn StagingSink>, config: ExtractConfig) -> Self {
        Self {
            fetcher,
            sink,
            config: Arc::new(config),
            concurrency: DEFAULT_CONCURRENCY,
        }
    }

    /// Maximum number of URLs in flight. Values below 1 are treated as 1.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Fetch, classify and stage a single URL.
    pub async fn ingest_url(&self, url: &str) -> IngestOutcome {
        async {
            let attempt = self.fetcher.fetch(url).await;
            let record = record_for_attempt(&attempt, &self.config);

            tracing::info!(
                status = record.extract_status.as_str(),
                error = record.extract_error.as_deref().unwrap_or(""),
                "record ready"
            );

            let staged = match self.sink.upsert(&record).await {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to stage record");
                    false
                }
            };
            IngestOutcome { record, staged }
        }
        .instrument(info_span!("ingest_url", url))
        .await
    }

    /// Ingest every URL, keeping at most `concurrency` in flight.
    ///
    /// Duplicate URLs are processed once. Records reach the sink in
    /// completion order.
    pub async fn ingest_urls<I>(&self, urls: I) -> BatchSummary
    where
        I: IntoIterator<Item = String>,
    {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();
        let mut seen = HashSet::new();
        let mut summary = BatchSummary::default();

        for url in urls {
            if !seen.insert(url.clone()) {
                continue;
            }
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let crawler = self.clone();
            tasks.spawn(async move {
                let outcome = crawler.ingest_url(&url).await;
                drop(permit);
                outcome
            });

            // Reap finished tasks as we go so results do not pile up.
            while let Some(joined) = tasks.try_join_next() {
                collect(&mut summary, joined);
            }
        }

        while let Some(joined) = tasks.join_next().await {
            collect(&mut summary, joined);
        }
        summary
    }

    /// Walk search result pages and collect recipe URLs in first-seen order.
    ///
    /// Stops early at the first page that fails or yields no new links.
    pub async fn discover_from_search(
        &self,
        templates: &UrlTemplates,
        keyword: &str,
        pages: u32,
    ) -> Result<Vec<String>, ConfigError> {
        let mut found = Vec::new();
        let mut seen = HashSet::new();

        for page in 1..=pages {
            let search_url = search_page_url(&templates.search, keyword, page)?;
            let raw = match self.fetcher.fetch(&search_url).await {
                Ok(raw) if raw.is_success() => raw,
                Ok(raw) => {
                    tracing::warn!(url = %search_url, status = raw.http_status, "search page not available");
                    break;
                }
                Err(failure) => {
                    tracing::warn!(url = %search_url, error = failure.kind.code(), "search page fetch failed");
                    break;
                }
            };

            let links = discover_recipe_links(&raw.html_body, &raw.final_url, &templates.recipe_href)?;
            let before = found.len();
            found.extend(links.into_iter().filter(|link| seen.insert(link.clone())));

            tracing::info!(page, keyword, new_links = found.len() - before, "search page scanned");
            if found.len() == before {
                break;
            }
        }
        Ok(found)
    }
}

fn collect(summary: &mut BatchSummary, joined: Result<IngestOutcome, tokio::task::JoinError>) {
    match joined {
        Ok(outcome) => summary.add(&outcome),
        Err(e) => tracing::error!(error = %e, "ingest task panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::test_support::record;

    #[test]
    fn summary_counts_by_status() {
        let mut summary = BatchSummary::default();
        for (status, staged) in [
            (ExtractStatus::Ok, true),
            (ExtractStatus::Ok, true),
            (ExtractStatus::NotFound, false),
        ] {
            summary.add(&IngestOutcome {
                record: record("https://a/1", status),
                staged,
            });
        }
        assert_eq!(summary.total(), 3);
        assert_eq!(summary.count(ExtractStatus::Ok), 2);
        assert_eq!(summary.count(ExtractStatus::NotFound), 1);
        assert_eq!(summary.count(ExtractStatus::Fail), 0);
        assert_eq!(summary.sink_failures, 1);

        let text = summary.to_string();
        assert!(text.contains("not_found"));
        assert!(!text.contains("fail "));
    }
}
