pub mod candidates;
pub mod classify;
pub mod config;
pub mod crawl;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod http;
pub mod normalize;
pub mod sink;
pub mod types;

pub use candidates::{discover_recipe_links, id_range_urls, search_page_url, UrlTemplates};
pub use classify::{record_for_attempt, record_for_failure, record_for_page, validate, ValidRecipe};
pub use config::{ExtractConfig, ExtractSettings, FetchConfig};
pub use crawl::{BatchSummary, Crawler, IngestOutcome};
pub use error::{ConfigError, FetchError, SinkError, ValidationError};
pub use extract::{extract_from_markup, extract_recipe, extract_section_by_heading, extract_structured};
pub use fingerprint::{fingerprint, fingerprint_outcome};
pub use http::{Fetcher, HttpFetcher, MockFetcher};
pub use normalize::{clean_line_list, clean_lines, clean_lines_strict, normalize_for_identity, normalize_line};
pub use sink::{FileSink, MemorySink, PostgrestConfig, PostgrestSink, StagingSink, StdoutSink};
pub use types::{
    ExtractResult, ExtractSource, ExtractStatus, FailureKind, FetchFailure, RawPage, RecipeRecord,
};
