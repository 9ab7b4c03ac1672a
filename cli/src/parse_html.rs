use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use ingest_core::{record_for_page, RawPage};

use crate::ingest::load_extract_config;

/// Classify a saved HTML page and print the record as JSON.
/// Exits non-zero unless the record is OK.
pub fn parse_html(file: &Path, source_url: &str, status: u16, config: Option<&Path>) -> Result<()> {
    let html = fs::read_to_string(file)
        .with_context(|| format!("Failed to read HTML file: {}", file.display()))?;
    let config = load_extract_config(config)?;

    let page = RawPage {
        http_status: status,
        ..RawPage::ok(source_url, &html)
    };
    let record = record_for_page(&page, &config);
    println!("{}", serde_json::to_string_pretty(&record)?);

    if !record.is_ok() {
        anyhow::bail!(
            "Extraction ended with {} ({})",
            record.extract_status.as_str(),
            record.extract_error.as_deref().unwrap_or("unknown")
        );
    }
    Ok(())
}
