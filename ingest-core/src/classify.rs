//! Turns one fetch attempt into exactly one [`RecipeRecord`].
//!
//! Outcomes are checked in a fixed order and the first match is terminal:
//! transport failure, non-2xx status, off-target redirect, missing page title,
//! then content extraction and validation. Nothing here returns an error;
//! every failure becomes a status plus a short cause code.

use scraper::Html;

use crate::config::ExtractConfig;
use crate::error::ValidationError;
use crate::extract::{extract_recipe, fallback_title, page_title};
use crate::fingerprint::{fingerprint, fingerprint_outcome};
use crate::types::{ExtractResult, ExtractStatus, FetchFailure, RawPage, RecipeRecord};

/// Cause code for redirects that leave the recipe URL space.
pub const REDIRECTED_NON_TARGET: &str = "redirected_non_target";

/// Cause code for 2xx pages without a title (anti-bot walls, consent pages).
pub const BLOCKED_NO_TITLE: &str = "blocked_no_title";

/// Record for an attempt where no HTTP response was obtained.
pub fn record_for_failure(failure: &FetchFailure) -> RecipeRecord {
    let cause = failure.kind.code();
    let url = failure.requested_url.as_str();
    RecipeRecord {
        content_fingerprint: fingerprint_outcome(&[url, url, cause]),
        ..bare_record(url, url, None, false, ExtractStatus::RequestFailed, cause)
    }
}

/// Classify a fetched page and extract its recipe when it looks like one.
pub fn record_for_page(page: &RawPage, config: &ExtractConfig) -> RecipeRecord {
    if !page.is_success() {
        let (status, label) = classify_http_status(page.http_status);
        return outcome_record(page, status, &label);
    }

    if page.redirected && !config.is_target_url(&page.final_url) {
        return outcome_record(page, ExtractStatus::RedirectedNonTarget, REDIRECTED_NON_TARGET);
    }

    let document = Html::parse_document(&page.html_body);

    if page_title(&document).is_none() {
        return outcome_record(page, ExtractStatus::BlockedOrUnexpected, BLOCKED_NO_TITLE);
    }

    let mut extracted = extract_recipe(&document, config);
    if extracted.name.is_none() {
        extracted.name = fallback_title(&document, config);
    }

    match validate(&extracted) {
        Ok(valid) => {
            let content_fingerprint = valid.fingerprint();
            content_record(page, extracted, ExtractStatus::Ok, None, content_fingerprint)
        }
        Err(e) => {
            tracing::debug!(url = %page.requested_url, cause = e.code(), "recipe failed validation");
            // Unnamed pages are seeded with the URL so distinct pages never
            // share a fingerprint.
            let seed = extracted.name.as_deref().unwrap_or(&page.requested_url);
            let content_fingerprint =
                fingerprint(seed, &extracted.ingredients_raw, &extracted.instructions_raw);
            content_record(page, extracted, ExtractStatus::Fail, Some(e), content_fingerprint)
        }
    }
}

/// Either a fetched page or a transport failure, as produced by the fetch layer.
pub fn record_for_attempt(
    attempt: &Result<RawPage, FetchFailure>,
    config: &ExtractConfig,
) -> RecipeRecord {
    match attempt {
        Ok(page) => record_for_page(page, config),
        Err(failure) => record_for_failure(failure),
    }
}

/// Map a non-2xx status to its terminal status and `http_<code>` label.
pub fn classify_http_status(code: u16) -> (ExtractStatus, String) {
    let status = match code {
        404 => ExtractStatus::NotFound,
        410 => ExtractStatus::Gone,
        429 => ExtractStatus::RateLimited,
        500..=599 => ExtractStatus::ServerError,
        _ => ExtractStatus::BlockedOrUnexpected,
    };
    (status, format!("http_{}", code))
}

/// Borrowed view of an extraction that has every mandatory field.
#[derive(Debug, Clone, Copy)]
pub struct ValidRecipe<'a> {
    pub name: &'a str,
    pub ingredients: &'a [String],
    pub instructions: &'a [String],
}

impl ValidRecipe<'_> {
    pub fn fingerprint(&self) -> String {
        fingerprint(self.name, self.ingredients, self.instructions)
    }
}

/// Check mandatory fields in a fixed order so the reported cause is stable.
pub fn validate(result: &ExtractResult) -> Result<ValidRecipe<'_>, ValidationError> {
    let name = result
        .name
        .as_deref()
        .filter(|n| !n.is_empty())
        .ok_or(ValidationError::MissingName)?;
    if result.ingredients_raw.is_empty() {
        return Err(ValidationError::MissingIngredients);
    }
    if result.instructions_raw.is_empty() {
        return Err(ValidationError::MissingInstructions);
    }
    Ok(ValidRecipe {
        name,
        ingredients: &result.ingredients_raw,
        instructions: &result.instructions_raw,
    })
}

fn content_record(
    page: &RawPage,
    extracted: ExtractResult,
    status: ExtractStatus,
    error: Option<ValidationError>,
    content_fingerprint: String,
) -> RecipeRecord {
    RecipeRecord {
        source_url: page.requested_url.clone(),
        final_url: page.final_url.clone(),
        http_status: Some(page.http_status),
        was_redirected: page.redirected,
        name: extracted.name,
        image_url: extracted.image_url,
        ingredients_raw: extracted.ingredients_raw,
        instructions_raw: extracted.instructions_raw,
        servings_raw: extracted.servings_raw,
        cuisine: extracted.cuisine,
        description: extracted.description,
        author_name: extracted.author_name,
        content_fingerprint,
        extract_status: status,
        extract_error: error.map(|e| e.code().to_string()),
        extract_source: Some(extracted.extract_source),
    }
}

fn outcome_record(page: &RawPage, status: ExtractStatus, cause: &str) -> RecipeRecord {
    RecipeRecord {
        content_fingerprint: fingerprint_outcome(&[
            page.requested_url.as_str(),
            page.final_url.as_str(),
            cause,
        ]),
        ..bare_record(
            &page.requested_url,
            &page.final_url,
            Some(page.http_status),
            page.redirected,
            status,
            cause,
        )
    }
}

fn bare_record(
    source_url: &str,
    final_url: &str,
    http_status: Option<u16>,
    was_redirected: bool,
    status: ExtractStatus,
    cause: &str,
) -> RecipeRecord {
    RecipeRecord {
        source_url: source_url.to_string(),
        final_url: final_url.to_string(),
        http_status,
        was_redirected,
        name: None,
        image_url: None,
        ingredients_raw: Vec::new(),
        instructions_raw: Vec::new(),
        servings_raw: None,
        cuisine: None,
        description: None,
        author_name: None,
        content_fingerprint: String::new(),
        extract_status: status,
        extract_error: Some(cause.to_string()),
        extract_source: None,
    }
}
