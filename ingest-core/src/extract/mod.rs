//! Recipe content extraction: JSON-LD first, markup heuristics as fallback.

mod dom;
mod structured;

use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

use crate::config::ExtractConfig;
use crate::normalize::clean_line_list;
use crate::types::{ExtractResult, ExtractSource};

pub use dom::{extract_from_markup, extract_section_by_heading};
pub use structured::extract_structured;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("Invalid selector"));

/// Extract recipe content from a parsed page.
///
/// JSON-LD is preferred. When it is missing, or either the ingredient or
/// the instruction list came back empty, the markup fallback runs and fills
/// in whatever the structured data lacked. The result is tagged `Dom` as soon
/// as one of the two lists comes from the markup.
pub fn extract_recipe(document: &Html, config: &ExtractConfig) -> ExtractResult {
    let mut result = match extract_structured(document) {
        Some(structured) if !structured.is_incomplete() => structured,
        Some(structured) => {
            tracing::debug!(
                ingredients = structured.ingredients_raw.len(),
                instructions = structured.instructions_raw.len(),
                "structured data incomplete, trying markup fallback"
            );
            merge_with_markup(structured, extract_from_markup(document, config))
        }
        None => {
            tracing::debug!("no JSON-LD recipe, using markup fallback");
            extract_from_markup(document, config)
        }
    };

    result.ingredients_raw = clean_line_list(&result.ingredients_raw);
    result.instructions_raw = clean_line_list(&result.instructions_raw);
    if result.image_url.is_none() {
        result.image_url = og_image(document);
    }
    result
}

fn merge_with_markup(structured: ExtractResult, dom: ExtractResult) -> ExtractResult {
    let ingredients_from_dom =
        structured.ingredients_raw.is_empty() && !dom.ingredients_raw.is_empty();
    let instructions_from_dom =
        structured.instructions_raw.is_empty() && !dom.instructions_raw.is_empty();

    let extract_source = if ingredients_from_dom || instructions_from_dom {
        ExtractSource::Dom
    } else {
        ExtractSource::Structured
    };

    ExtractResult {
        name: structured.name.or(dom.name),
        image_url: structured.image_url.or(dom.image_url),
        ingredients_raw: if ingredients_from_dom {
            dom.ingredients_raw
        } else {
            structured.ingredients_raw
        },
        instructions_raw: if instructions_from_dom {
            dom.instructions_raw
        } else {
            structured.instructions_raw
        },
        servings_raw: structured.servings_raw.or(dom.servings_raw),
        cuisine: structured.cuisine.or(dom.cuisine),
        description: structured.description.or(dom.description),
        author_name: structured.author_name.or(dom.author_name),
        extract_source,
    }
}

/// Element text with all whitespace runs collapsed to single spaces.
///
/// Text nodes are joined as-is first, so inline tags like `<b>200</b>g`
/// never introduce a space of their own.
pub(crate) fn normalized_text(el: ElementRef<'_>) -> String {
    el.text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Raw `<title>` text, if the page has a non-blank one.
pub fn page_title(document: &Html) -> Option<String> {
    document
        .select(&TITLE_SELECTOR)
        .map(normalized_text)
        .find(|t| !t.is_empty())
}

/// `<title>` with the trailing site name removed.
pub fn fallback_title(document: &Html, config: &ExtractConfig) -> Option<String> {
    let title = config.strip_title_suffix(&page_title(document)?);
    (!title.is_empty()).then_some(title)
}

pub(crate) fn og_image(document: &Html) -> Option<String> {
    meta_content(document, r#"meta[property="og:image"]"#)
}

/// Trimmed `content` attribute of the first element matching `selector`.
pub(crate) fn meta_content(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(html: &str) -> ExtractResult {
        extract_recipe(&Html::parse_document(html), ExtractConfig::default_ref())
    }

    #[test]
    fn complete_structured_data_skips_markup() {
        let result = extract(
            r#"<html><head><script type="application/ld+json">
            {"@type": "Recipe", "name": "Chả giò", "recipeIngredient": ["thịt"], "recipeInstructions": ["cuốn"]}
            </script></head><body><h2>Nguyên liệu</h2><ul><li>dom item</li></ul></body></html>"#,
        );
        assert_eq!(result.extract_source, ExtractSource::Structured);
        assert_eq!(result.ingredients_raw, vec!["thịt"]);
    }

    #[test]
    fn empty_structured_ingredients_fall_back_to_markup() {
        let result = extract(
            r#"<html><head><script type="application/ld+json">
            {"@type": "Recipe", "name": "Chả giò", "recipeIngredient": [], "recipeInstructions": ["cuốn"]}
            </script></head><body>
            <h2>Nguyên liệu</h2><ul><li>bánh tráng</li><li>thịt</li></ul>
            <h2>Cách làm</h2><ul><li>dom step</li></ul>
            </body></html>"#,
        );
        assert_eq!(result.extract_source, ExtractSource::Dom);
        assert_eq!(result.name.as_deref(), Some("Chả giò"));
        assert_eq!(result.ingredients_raw, vec!["bánh tráng", "thịt"]);
        assert_eq!(result.instructions_raw, vec!["cuốn"]);
    }

    #[test]
    fn incomplete_structured_data_without_markup_keeps_structured_source() {
        let result = extract(
            r#"<html><head><script type="application/ld+json">
            {"@type": "Recipe", "name": "Trà", "recipeIngredient": ["lá trà"]}
            </script></head><body></body></html>"#,
        );
        assert_eq!(result.extract_source, ExtractSource::Structured);
        assert_eq!(result.ingredients_raw, vec!["lá trà"]);
        assert!(result.instructions_raw.is_empty());
    }

    #[test]
    fn og_image_fills_missing_structured_image() {
        let result = extract(
            r#"<html><head>
            <meta property="og:image" content="https://img/og.jpg">
            <script type="application/ld+json">
            {"@type": "Recipe", "name": "X", "recipeIngredient": ["a"], "recipeInstructions": ["b"]}
            </script></head></html>"#,
        );
        assert_eq!(result.image_url.as_deref(), Some("https://img/og.jpg"));
    }

    #[test]
    fn page_title_requires_text() {
        assert_eq!(
            page_title(&Html::parse_document("<html><head><title>  </title></head></html>")),
            None
        );
        assert_eq!(
            page_title(&Html::parse_document("<title> Hi  there </title>")).as_deref(),
            Some("Hi there")
        );
    }
}
