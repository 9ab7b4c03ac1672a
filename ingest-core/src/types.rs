use serde::{Deserialize, Serialize};

/// A fetched page as handed over by the fetch layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPage {
    pub requested_url: String,
    /// URL after following redirects
    pub final_url: String,
    pub http_status: u16,
    pub redirected: bool,
    pub html_body: String,
}

impl RawPage {
    /// A 200 response served from the requested URL without redirects.
    pub fn ok(url: &str, html: &str) -> Self {
        Self {
            requested_url: url.to_string(),
            final_url: url.to_string(),
            http_status: 200,
            redirected: false,
            html_body: html.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status)
    }
}

/// Why the fetch layer could not obtain a response at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Dns,
    Timeout,
    ConnectionLost,
    Other,
}

impl FailureKind {
    /// Short cause code stored in `extract_error`.
    pub fn code(&self) -> &'static str {
        match self {
            FailureKind::Dns => "dns_error",
            FailureKind::Timeout => "timeout",
            FailureKind::ConnectionLost => "connection_lost",
            FailureKind::Other => "request_error",
        }
    }
}

/// Transport failure signal from the fetch layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub requested_url: String,
    pub kind: FailureKind,
    /// Underlying error text, for logs only
    pub message: String,
}

/// Which extractor produced the accepted content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractSource {
    Structured,
    Dom,
}

/// Fields pulled out of a page by one extractor, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractResult {
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub ingredients_raw: Vec<String>,
    pub instructions_raw: Vec<String>,
    pub servings_raw: Option<String>,
    pub cuisine: Option<String>,
    pub description: Option<String>,
    pub author_name: Option<String>,
    pub extract_source: ExtractSource,
}

impl ExtractResult {
    pub fn empty(extract_source: ExtractSource) -> Self {
        Self {
            name: None,
            image_url: None,
            ingredients_raw: Vec::new(),
            instructions_raw: Vec::new(),
            servings_raw: None,
            cuisine: None,
            description: None,
            author_name: None,
            extract_source,
        }
    }

    /// True when either ordered list came back empty.
    pub fn is_incomplete(&self) -> bool {
        self.ingredients_raw.is_empty() || self.instructions_raw.is_empty()
    }
}

/// Terminal outcome of one fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractStatus {
    Ok,
    Fail,
    NotFound,
    Gone,
    RateLimited,
    ServerError,
    RedirectedNonTarget,
    BlockedOrUnexpected,
    RequestFailed,
}

impl ExtractStatus {
    /// All statuses, in the order they are reported in summaries.
    pub const ALL: &'static [ExtractStatus] = &[
        ExtractStatus::Ok,
        ExtractStatus::Fail,
        ExtractStatus::NotFound,
        ExtractStatus::Gone,
        ExtractStatus::RateLimited,
        ExtractStatus::ServerError,
        ExtractStatus::RedirectedNonTarget,
        ExtractStatus::BlockedOrUnexpected,
        ExtractStatus::RequestFailed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractStatus::Ok => "ok",
            ExtractStatus::Fail => "fail",
            ExtractStatus::NotFound => "not_found",
            ExtractStatus::Gone => "gone",
            ExtractStatus::RateLimited => "rate_limited",
            ExtractStatus::ServerError => "server_error",
            ExtractStatus::RedirectedNonTarget => "redirected_non_target",
            ExtractStatus::BlockedOrUnexpected => "blocked_or_unexpected",
            ExtractStatus::RequestFailed => "request_failed",
        }
    }
}

/// One row for the staging table, keyed by `source_url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    pub source_url: String,
    pub final_url: String,
    pub http_status: Option<u16>,
    pub was_redirected: bool,
    pub name: Option<String>,
    pub image_url: Option<String>,
    pub ingredients_raw: Vec<String>,
    pub instructions_raw: Vec<String>,
    pub servings_raw: Option<String>,
    pub cuisine: Option<String>,
    pub description: Option<String>,
    pub author_name: Option<String>,
    /// SHA-256 hex digest, present for every outcome
    pub content_fingerprint: String,
    pub extract_status: ExtractStatus,
    /// Machine-readable cause; `None` only when status is `Ok`
    pub extract_error: Option<String>,
    pub extract_source: Option<ExtractSource>,
}

impl RecipeRecord {
    pub fn is_ok(&self) -> bool {
        self.extract_status == ExtractStatus::Ok
    }
}
