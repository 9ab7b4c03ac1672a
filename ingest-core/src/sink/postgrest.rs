use async_trait::async_trait;
use std::env;
use std::time::Duration;

use crate::error::{ConfigError, SinkError};
use crate::types::RecipeRecord;

use super::StagingSink;

pub const DEFAULT_STAGING_TABLE: &str = "recipes_staging";

/// Connection settings for a PostgREST endpoint (Supabase).
#[derive(Debug, Clone)]
pub struct PostgrestConfig {
    pub base_url: String,
    pub service_key: String,
    pub table: String,
}

impl PostgrestConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `SUPABASE_URL`: project URL
    /// - `SUPABASE_SERVICE_ROLE_KEY`: service role key
    ///
    /// Optional:
    /// - `SUPABASE_STAGING_TABLE`: target table (default: recipes_staging)
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = env::var("SUPABASE_URL")
            .map_err(|_| ConfigError::MissingEnvVar("SUPABASE_URL".to_string()))?;
        let service_key = env::var("SUPABASE_SERVICE_ROLE_KEY")
            .map_err(|_| ConfigError::MissingEnvVar("SUPABASE_SERVICE_ROLE_KEY".to_string()))?;
        let table = env::var("SUPABASE_STAGING_TABLE")
            .unwrap_or_else(|_| DEFAULT_STAGING_TABLE.to_string());

        Ok(Self {
            base_url,
            service_key,
            table,
        })
    }

    /// `POST` target for upserts keyed on `source_url`.
    pub fn upsert_url(&self) -> String {
        format!(
            "{}/rest/v1/{}?on_conflict=source_url",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }
}

/// Upserts records into a staging table through PostgREST.
pub struct PostgrestSink {
    client: reqwest::Client,
    config: PostgrestConfig,
    endpoint: String,
}

impl PostgrestSink {
    pub fn new(config: PostgrestConfig) -> Result<Self, SinkError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.upsert_url(),
            config,
        })
    }
}

#[async_trait]
impl StagingSink for PostgrestSink {
    async fn upsert(&self, record: &RecipeRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("apikey", &self.config.service_key)
            .bearer_auth(&self.config.service_key)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&[record])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
