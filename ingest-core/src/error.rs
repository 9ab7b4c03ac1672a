use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid regex for {field}: {source}")]
    InvalidPattern {
        field: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("URL template {template:?} is missing the {placeholder} placeholder")]
    InvalidTemplate {
        template: String,
        placeholder: &'static str,
    },

    #[error("Invalid URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write record: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Upsert request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Upsert rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Sink storage lock poisoned")]
    LockPoisoned,
}

/// A recipe that made it through extraction but is missing a mandatory field.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing_name")]
    MissingName,

    #[error("missing_ingredients")]
    MissingIngredients,

    #[error("missing_instructions")]
    MissingInstructions,
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingName => "missing_name",
            ValidationError::MissingIngredients => "missing_ingredients",
            ValidationError::MissingInstructions => "missing_instructions",
        }
    }
}
