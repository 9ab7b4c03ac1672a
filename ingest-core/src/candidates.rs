//! Candidate URL generation: numeric ID scans and search result pages.

use std::collections::HashSet;
use std::env;
use std::ops::RangeInclusive;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::error::ConfigError;

pub const DEFAULT_RECIPE_URL_TEMPLATE: &str = "https://cookpad.com/vn/cong-thuc/{id}";
pub const DEFAULT_SEARCH_URL_TEMPLATE: &str = "https://cookpad.com/vn/tim-kiem/{keyword}?page={page}";
pub const DEFAULT_RECIPE_HREF_PATTERN: &str = r"^(https?://(www\.)?cookpad\.com)?/vn/cong-thuc/\d+";

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Invalid selector"));

/// Where candidate URLs come from.
#[derive(Debug, Clone)]
pub struct UrlTemplates {
    /// Recipe page URL with an `{id}` placeholder
    pub recipe: String,
    /// Search page URL with `{keyword}` and `{page}` placeholders
    pub search: String,
    /// Hrefs on search pages that point at recipes
    pub recipe_href: Regex,
}

impl UrlTemplates {
    /// Load templates from the environment.
    ///
    /// Optional:
    /// - `INGEST_RECIPE_URL_TEMPLATE` (default: Cookpad VN recipe pages)
    /// - `INGEST_SEARCH_URL_TEMPLATE` (default: Cookpad VN search)
    /// - `INGEST_RECIPE_HREF_PATTERN`: regex for recipe links on search pages
    pub fn from_env() -> Result<Self, ConfigError> {
        let recipe = env::var("INGEST_RECIPE_URL_TEMPLATE")
            .unwrap_or_else(|_| DEFAULT_RECIPE_URL_TEMPLATE.to_string());
        let search = env::var("INGEST_SEARCH_URL_TEMPLATE")
            .unwrap_or_else(|_| DEFAULT_SEARCH_URL_TEMPLATE.to_string());
        let pattern = env::var("INGEST_RECIPE_HREF_PATTERN")
            .unwrap_or_else(|_| DEFAULT_RECIPE_HREF_PATTERN.to_string());

        require_placeholder(&recipe, "{id}")?;
        require_placeholder(&search, "{keyword}")?;
        require_placeholder(&search, "{page}")?;
        let recipe_href = Regex::new(&pattern).map_err(|source| ConfigError::InvalidPattern {
            field: "recipe_href_pattern",
            source,
        })?;

        Ok(Self {
            recipe,
            search,
            recipe_href,
        })
    }
}

fn require_placeholder(template: &str, placeholder: &'static str) -> Result<(), ConfigError> {
    if template.contains(placeholder) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTemplate {
            template: template.to_string(),
            placeholder,
        })
    }
}

/// One URL per ID, in ascending order.
pub fn id_range_urls(
    template: &str,
    ids: RangeInclusive<u64>,
) -> Result<impl Iterator<Item = String> + '_, ConfigError> {
    require_placeholder(template, "{id}")?;
    Ok(ids.map(move |id| template.replace("{id}", &id.to_string())))
}

/// URL of one search result page. The keyword is percent-encoded.
pub fn search_page_url(template: &str, keyword: &str, page: u32) -> Result<String, ConfigError> {
    require_placeholder(template, "{keyword}")?;
    require_placeholder(template, "{page}")?;
    Ok(template
        .replace("{keyword}", &urlencoding::encode(keyword))
        .replace("{page}", &page.to_string()))
}

/// Absolute recipe URLs linked from a page, first-seen order, no duplicates.
///
/// Query strings and fragments are dropped so tracking parameters do not
/// produce distinct keys for the same recipe.
pub fn discover_recipe_links(
    html: &str,
    base_url: &str,
    href_pattern: &Regex,
) -> Result<Vec<String>, ConfigError> {
    let base = Url::parse(base_url).map_err(|source| ConfigError::InvalidUrl {
        url: base_url.to_string(),
        source,
    })?;
    let document = Html::parse_document(html);

    let mut seen = HashSet::new();
    let links = document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::trim)
        .filter(|href| href_pattern.is_match(href))
        .filter_map(|href| base.join(href).ok())
        .map(|mut url| {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        })
        .filter(|url| seen.insert(url.clone()))
        .collect();
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_range_expands_template() {
        let urls: Vec<_> = id_range_urls(DEFAULT_RECIPE_URL_TEMPLATE, 9..=11)
            .unwrap()
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://cookpad.com/vn/cong-thuc/9",
                "https://cookpad.com/vn/cong-thuc/10",
                "https://cookpad.com/vn/cong-thuc/11",
            ]
        );
    }

    #[test]
    fn id_range_is_generated_lazily() {
        let mut urls = id_range_urls(DEFAULT_RECIPE_URL_TEMPLATE, 1..=u64::MAX).unwrap();
        assert_eq!(urls.next().as_deref(), Some("https://cookpad.com/vn/cong-thuc/1"));
        assert_eq!(urls.next().as_deref(), Some("https://cookpad.com/vn/cong-thuc/2"));
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let err = id_range_urls("https://cookpad.com/vn", 1..=2).err().unwrap();
        assert!(matches!(
            err,
            ConfigError::InvalidTemplate {
                placeholder: "{id}",
                ..
            }
        ));
    }

    #[test]
    fn search_keyword_is_percent_encoded() {
        assert_eq!(
            search_page_url(DEFAULT_SEARCH_URL_TEMPLATE, "bánh mì", 2).unwrap(),
            "https://cookpad.com/vn/tim-kiem/b%C3%A1nh%20m%C3%AC?page=2"
        );
    }

    #[test]
    fn links_are_absolute_and_deduplicated() {
        let html = r#"<html><body>
            <a href="/vn/cong-thuc/2">two</a>
            <a href="/vn/cong-thuc/1?ref=search#top">one</a>
            <a href="https://cookpad.com/vn/cong-thuc/2">two again</a>
            <a href="/vn/tim-kiem/pho?page=2">next</a>
            <a href="/vn/cong-thuc/1">one again</a>
            </body></html>"#;
        let pattern = Regex::new(DEFAULT_RECIPE_HREF_PATTERN).unwrap();
        let links = discover_recipe_links(
            html,
            "https://cookpad.com/vn/tim-kiem/pho?page=1",
            &pattern,
        )
        .unwrap();
        assert_eq!(
            links,
            vec![
                "https://cookpad.com/vn/cong-thuc/2",
                "https://cookpad.com/vn/cong-thuc/1",
            ]
        );
    }

    #[test]
    fn invalid_base_url() {
        let pattern = Regex::new(DEFAULT_RECIPE_HREF_PATTERN).unwrap();
        assert!(matches!(
            discover_recipe_links("", "not a url", &pattern),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }
}
