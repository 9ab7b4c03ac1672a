mod ingest;
mod parse_html;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recipe-ingest")]
#[command(about = "Crawl recipe pages into a staging table", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest specific recipe URLs
    Url {
        /// URLs to fetch
        #[arg(required = true)]
        urls: Vec<String>,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Scan a range of numeric recipe IDs
    Ids {
        /// First ID (inclusive)
        #[arg(long)]
        from: u64,
        /// Last ID (inclusive)
        #[arg(long)]
        to: u64,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Discover recipes through search result pages, then ingest them
    Search {
        /// Search keyword
        #[arg(long)]
        keyword: String,
        /// Number of result pages to walk
        #[arg(long, default_value = "1")]
        pages: u32,
        #[command(flatten)]
        run: RunArgs,
    },
    /// Classify a saved HTML page and print the resulting record
    ParseHtml {
        /// Path to HTML file
        file: PathBuf,
        /// Source URL the page was fetched from
        #[arg(long)]
        url: String,
        /// HTTP status to assume for the page
        #[arg(long, default_value = "200")]
        status: u16,
        /// Extraction settings JSON file (default: $INGEST_EXTRACT_CONFIG)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum SinkKind {
    /// One JSON file per record under --out
    File,
    /// Upsert into Supabase via PostgREST
    Postgrest,
    /// Print records as JSON lines
    Stdout,
}

/// Options shared by every crawling subcommand.
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Where records are staged
    #[arg(long, value_enum, default_value = "file")]
    pub sink: SinkKind,
    /// Output directory for the file sink
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Maximum number of URLs in flight
    #[arg(long, default_value = "4")]
    pub concurrency: usize,
    /// Extraction settings JSON file (default: $INGEST_EXTRACT_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

fn init_telemetry() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_telemetry();
    let cli = Cli::parse();

    match cli.command {
        Commands::Url { urls, run } => {
            ingest::ingest_urls(urls, &run).await?;
        }
        Commands::Ids { from, to, run } => {
            ingest::ingest_id_range(from, to, &run).await?;
        }
        Commands::Search {
            keyword,
            pages,
            run,
        } => {
            ingest::ingest_search(&keyword, pages, &run).await?;
        }
        Commands::ParseHtml {
            file,
            url,
            status,
            config,
        } => {
            parse_html::parse_html(&file, &url, status, config.as_deref())?;
        }
    }

    Ok(())
}
