use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use ingest_core::candidates::{id_range_urls, UrlTemplates};
use ingest_core::sink::{FileSink, PostgrestConfig, PostgrestSink, StagingSink, StdoutSink};
use ingest_core::{BatchSummary, Crawler, ExtractConfig, FetchConfig, HttpFetcher};

use crate::{RunArgs, SinkKind};

pub async fn ingest_urls(urls: Vec<String>, run: &RunArgs) -> Result<()> {
    let crawler = build_crawler(run)?;
    report(&crawler, urls, run).await;
    Ok(())
}

pub async fn ingest_id_range(from: u64, to: u64, run: &RunArgs) -> Result<()> {
    if from > to {
        bail!("--from ({}) must not be greater than --to ({})", from, to);
    }
    let templates = UrlTemplates::from_env().context("Invalid URL template configuration")?;
    let urls = id_range_urls(&templates.recipe, from..=to)?;

    let crawler = build_crawler(run)?;
    eprintln!("Scanning recipe IDs {}..={}", from, to);
    report(&crawler, urls, run).await;
    Ok(())
}

pub async fn ingest_search(keyword: &str, pages: u32, run: &RunArgs) -> Result<()> {
    let templates = UrlTemplates::from_env().context("Invalid URL template configuration")?;
    let crawler = build_crawler(run)?;

    let urls = crawler
        .discover_from_search(&templates, keyword, pages)
        .await
        .context("Search discovery failed")?;
    tracing::info!(keyword, found = urls.len(), "search discovery finished");
    if urls.is_empty() {
        eprintln!("No recipe links found for {:?}", keyword);
        return Ok(());
    }

    report(&crawler, urls, run).await;
    Ok(())
}

async fn report<I>(crawler: &Crawler, urls: I, run: &RunArgs)
where
    I: IntoIterator<Item = String>,
{
    eprintln!("Ingesting URLs (concurrency {})", run.concurrency);

    let start = Instant::now();
    let summary: BatchSummary = crawler.ingest_urls(urls).await;

    eprintln!();
    eprintln!("Ingest finished in {:.1}s", start.elapsed().as_secs_f64());
    eprintln!("{}", summary);
}

fn build_crawler(run: &RunArgs) -> Result<Crawler> {
    let config = load_extract_config(run.config.as_deref())?;
    let fetcher = HttpFetcher::builder()
        .config(FetchConfig::from_env())
        .build()
        .context("Failed to build HTTP client")?;
    let sink = build_sink(run)?;

    Ok(Crawler::new(Arc::new(fetcher), sink, config).with_concurrency(run.concurrency))
}

/// `--config` when given, otherwise `INGEST_EXTRACT_CONFIG`, otherwise the
/// built-in settings.
pub fn load_extract_config(path: Option<&Path>) -> Result<ExtractConfig> {
    match path {
        Some(path) => ExtractConfig::from_file(path)
            .with_context(|| format!("Failed to load extract config: {}", path.display())),
        None => ExtractConfig::from_env().context("Failed to load INGEST_EXTRACT_CONFIG"),
    }
}

fn build_sink(run: &RunArgs) -> Result<Arc<dyn StagingSink>> {
    let sink: Arc<dyn StagingSink> = match run.sink {
        SinkKind::File => {
            let dir = run.out.clone().unwrap_or_else(default_out_dir);
            eprintln!("Writing records to {}", dir.display());
            Arc::new(FileSink::new(dir))
        }
        SinkKind::Postgrest => {
            let config = PostgrestConfig::from_env().context("PostgREST sink is not configured")?;
            eprintln!("Upserting records into {}", config.table);
            Arc::new(PostgrestSink::new(config)?)
        }
        SinkKind::Stdout => Arc::new(StdoutSink),
    };
    Ok(sink)
}

/// `<local data dir>/recipe-ingest/staging`, or `./staging` when the platform
/// has no data dir.
fn default_out_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("recipe-ingest").join("staging"))
        .unwrap_or_else(|| PathBuf::from("staging"))
}
