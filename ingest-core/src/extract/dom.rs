//! Markup fallback for pages without usable JSON-LD.
//!
//! Every field is an ordered list of independent strategies; the first one
//! that yields something wins. Strategies never fail, they just come back
//! empty.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use super::{fallback_title, meta_content, normalized_text, og_image};
use crate::config::ExtractConfig;
use crate::normalize::clean_lines;
use crate::types::{ExtractResult, ExtractSource};

type ListStrategy = fn(&Html, &ExtractConfig) -> Vec<String>;
type TextStrategy = fn(&Html, &ExtractConfig) -> Option<String>;

const NAME_STRATEGIES: &[TextStrategy] = &[name_from_h1, name_from_title_testid, fallback_title];
const IMAGE_STRATEGIES: &[TextStrategy] = &[image_from_og, image_from_first_img];
const INGREDIENT_STRATEGIES: &[ListStrategy] = &[ingredients_by_testid, ingredients_by_heading];
const INSTRUCTION_STRATEGIES: &[ListStrategy] = &[instructions_by_testid, instructions_by_heading];

static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("Invalid selector"));
static TITLE_TESTID_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[data-testid*="recipe-title"]"#).expect("Invalid selector")
});
static IMG_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img[src]").expect("Invalid selector"));
static INGREDIENTS_TESTID_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[data-testid*="ingredients"] li"#).expect("Invalid selector")
});
static INSTRUCTIONS_TESTID_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"[data-testid*="instructions"] li"#).expect("Invalid selector")
});
static LI_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li").expect("Invalid selector"));

/// Best-effort extraction from the page markup.
pub fn extract_from_markup(document: &Html, config: &ExtractConfig) -> ExtractResult {
    ExtractResult {
        name: first_text(NAME_STRATEGIES, document, config),
        image_url: first_text(IMAGE_STRATEGIES, document, config),
        ingredients_raw: first_list(INGREDIENT_STRATEGIES, document, config),
        instructions_raw: first_list(INSTRUCTION_STRATEGIES, document, config),
        servings_raw: servings_near_label(document, config.servings_labels()),
        cuisine: None,
        description: meta_content(document, r#"meta[name="description"]"#),
        author_name: None,
        extract_source: ExtractSource::Dom,
    }
}

fn first_text(strategies: &[TextStrategy], document: &Html, config: &ExtractConfig) -> Option<String> {
    strategies.iter().find_map(|strategy| strategy(document, config))
}

fn first_list(strategies: &[ListStrategy], document: &Html, config: &ExtractConfig) -> Vec<String> {
    strategies
        .iter()
        .map(|strategy| strategy(document, config))
        .find(|items| !items.is_empty())
        .unwrap_or_default()
}

fn first_nonempty_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(normalized_text)
        .find(|text| !text.is_empty())
}

fn name_from_h1(document: &Html, _config: &ExtractConfig) -> Option<String> {
    first_nonempty_text(document, &H1_SELECTOR)
}

fn name_from_title_testid(document: &Html, _config: &ExtractConfig) -> Option<String> {
    first_nonempty_text(document, &TITLE_TESTID_SELECTOR)
}

fn image_from_og(document: &Html, _config: &ExtractConfig) -> Option<String> {
    og_image(document)
}

fn image_from_first_img(document: &Html, _config: &ExtractConfig) -> Option<String> {
    document
        .select(&IMG_SELECTOR)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

fn list_items(document: &Html, selector: &Selector) -> Vec<String> {
    clean_lines(document.select(selector).map(|li| Some(normalized_text(li))))
}

fn ingredients_by_testid(document: &Html, _config: &ExtractConfig) -> Vec<String> {
    list_items(document, &INGREDIENTS_TESTID_SELECTOR)
}

fn instructions_by_testid(document: &Html, _config: &ExtractConfig) -> Vec<String> {
    list_items(document, &INSTRUCTIONS_TESTID_SELECTOR)
}

fn ingredients_by_heading(document: &Html, config: &ExtractConfig) -> Vec<String> {
    extract_section_by_heading(document, config.ingredient_labels(), config.max_section_items())
}

fn instructions_by_heading(document: &Html, config: &ExtractConfig) -> Vec<String> {
    extract_section_by_heading(document, config.instruction_labels(), config.max_section_items())
}

/// Heading-anchored list search.
///
/// For each label in priority order:
/// 1. an element whose text starts with the label, followed (in document
///    order, outside the element itself) by a `<ul>`/`<ol>`;
/// 2. an `h1`-`h4` starting with the label whose next element sibling is a list.
///
/// The first label with a non-empty list wins; the result is capped at
/// `max_items`.
pub fn extract_section_by_heading<S: AsRef<str>>(
    document: &Html,
    labels: &[S],
    max_items: usize,
) -> Vec<String> {
    for label in labels {
        let label = label.as_ref();

        let anchored = innermost_elements(document, |text| text.starts_with(label))
            .into_iter()
            .filter_map(|anchor| following_elements(anchor).find(is_list))
            .map(list_item_texts)
            .find(|items| !items.is_empty());
        if let Some(mut items) = anchored {
            items.truncate(max_items);
            return items;
        }

        let sibling = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .filter(|el| matches!(el.value().name(), "h1" | "h2" | "h3" | "h4"))
            .filter(|el| normalized_text(*el).starts_with(label))
            .filter_map(|heading| heading.next_siblings().find_map(ElementRef::wrap))
            .filter(|next| is_list(next))
            .map(list_item_texts)
            .find(|items| !items.is_empty());
        if let Some(mut items) = sibling {
            items.truncate(max_items);
            return items;
        }
    }
    Vec::new()
}

/// Text of the element right after the innermost element mentioning a
/// servings label.
fn servings_near_label<S: AsRef<str>>(document: &Html, labels: &[S]) -> Option<String> {
    labels.iter().find_map(|label| {
        let label = label.as_ref();
        innermost_elements(document, |text| text.contains(label))
            .into_iter()
            .find_map(|el| {
                following_elements(el)
                    .next()
                    .map(normalized_text)
                    .filter(|text| !text.is_empty())
            })
    })
}

/// Elements whose normalized text satisfies `pred` while none of their child
/// elements does, in document order. Wrappers like `<body>` that merely
/// contain the match are skipped this way, and so are non-rendered elements
/// such as JSON-LD `<script>` blocks.
fn innermost_elements<'a, F>(document: &'a Html, pred: F) -> Vec<ElementRef<'a>>
where
    F: Fn(&str) -> bool,
{
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !is_non_rendered(el))
        .filter(|el| pred(&normalized_text(*el)))
        .filter(|el| {
            !el.children()
                .filter_map(ElementRef::wrap)
                .any(|child| pred(&normalized_text(child)))
        })
        .collect()
}

/// Elements after `el` in document order, excluding its descendants.
fn following_elements(el: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    std::iter::successors(Some(*el), |node| node.parent())
        .flat_map(|node| node.next_siblings())
        .flat_map(|sibling| sibling.descendants())
        .filter_map(ElementRef::wrap)
}

fn is_non_rendered(el: &ElementRef<'_>) -> bool {
    matches!(
        el.value().name(),
        "script" | "style" | "noscript" | "template" | "title" | "head"
    )
}

fn is_list(el: &ElementRef<'_>) -> bool {
    matches!(el.value().name(), "ul" | "ol")
}

fn list_item_texts(list: ElementRef<'_>) -> Vec<String> {
    clean_lines(list.select(&LI_SELECTOR).map(|li| Some(normalized_text(li))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> &'static ExtractConfig {
        ExtractConfig::default_ref()
    }

    #[test]
    fn heading_followed_by_list_inside_wrapper() {
        let html = r#"<html><body>
            <section>
              <div><h2>Nguyên Liệu</h2></div>
              <div class="list"><ul><li>200g thịt bò</li><li>1  củ hành</li></ul></div>
            </section>
            <section>
              <h2>Cách làm</h2>
              <ol><li>Thái thịt</li><li>Xào thịt</li></ol>
            </section>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let result = extract_from_markup(&doc, config());
        assert_eq!(result.ingredients_raw, vec!["200g thịt bò", "1 củ hành"]);
        assert_eq!(result.instructions_raw, vec!["Thái thịt", "Xào thịt"]);
        assert_eq!(result.extract_source, ExtractSource::Dom);
    }

    #[test]
    fn wrapper_starting_with_label_does_not_skip_its_own_list() {
        let html = r#"<html><body>
            <div><h3>Ingredients</h3><ul><li>flour</li></ul></div>
            <div><h3>Instructions</h3><ul><li>bake</li></ul></div>
            </body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            extract_section_by_heading(&doc, &["Ingredients"], 50),
            vec!["flour"]
        );
        assert_eq!(
            extract_section_by_heading(&doc, &["Instructions"], 50),
            vec!["bake"]
        );
    }

    #[test]
    fn labels_are_tried_in_priority_order() {
        let html = r#"<html><body>
            <h2>Directions</h2><ul><li>second</li></ul>
            <h2>Hướng dẫn cách làm</h2><ul><li>first</li></ul>
            </body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            extract_section_by_heading(&doc, config().instruction_labels(), 50),
            vec!["first"]
        );
    }

    #[test]
    fn section_is_capped() {
        let items: String = (0..80).map(|i| format!("<li>item {}</li>", i)).collect();
        let html = format!("<html><body><h2>Ingredients</h2><ul>{}</ul></body></html>", items);
        let doc = Html::parse_document(&html);
        let result = extract_section_by_heading(&doc, &["Ingredients"], 50);
        assert_eq!(result.len(), 50);
        assert_eq!(result[0], "item 0");
        assert_eq!(result[49], "item 49");
    }

    #[test]
    fn no_match_is_empty() {
        let doc = Html::parse_document("<html><body><p>Nothing here</p><ul><li>x</li></ul></body></html>");
        assert!(extract_section_by_heading(&doc, &["Ingredients"], 50).is_empty());
    }

    #[test]
    fn testid_container_wins_over_heading() {
        let html = r#"<html><body>
            <div data-testid="recipe-ingredients"><ol><li>trứng</li><li>trứng</li><li>muối</li></ol></div>
            <h2>Nguyên liệu</h2><ul><li>other</li></ul>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let result = extract_from_markup(&doc, config());
        assert_eq!(result.ingredients_raw, vec!["trứng", "muối"]);
    }

    #[test]
    fn name_image_and_description_fallbacks() {
        let html = r#"<html><head>
            <title>Canh chua cá | Cookpad Việt Nam</title>
            <meta name="description" content=" Món canh ngon ">
            </head><body><img src="/a.jpg"></body></html>"#;
        let doc = Html::parse_document(html);
        let result = extract_from_markup(&doc, config());
        assert_eq!(result.name.as_deref(), Some("Canh chua cá"));
        assert_eq!(result.image_url.as_deref(), Some("/a.jpg"));
        assert_eq!(result.description.as_deref(), Some("Món canh ngon"));
    }

    #[test]
    fn h1_and_og_image_preferred() {
        let html = r#"<html><head>
            <title>Other | Cookpad</title>
            <meta property="og:image" content="https://img/og.jpg">
            </head><body>
            <h1>  Bánh  xèo </h1>
            <span data-testid="recipe-title">Ignored</span>
            <img src="/a.jpg">
            </body></html>"#;
        let doc = Html::parse_document(html);
        let result = extract_from_markup(&doc, config());
        assert_eq!(result.name.as_deref(), Some("Bánh xèo"));
        assert_eq!(result.image_url.as_deref(), Some("https://img/og.jpg"));
    }

    #[test]
    fn servings_follow_label() {
        let html = r#"<html><body>
            <div><span>Khẩu phần</span><span> 4 người </span></div>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let result = extract_from_markup(&doc, config());
        assert_eq!(result.servings_raw.as_deref(), Some("4 người"));
    }

    #[test]
    fn inline_tags_do_not_split_item_text() {
        let html = r#"<html><body>
            <h2>Nguyên liệu</h2>
            <ul><li><b>200</b>g thịt bò</li><li>Hành<span>,</span> tỏi</li></ul>
            </body></html>"#;
        let doc = Html::parse_document(html);
        assert_eq!(
            extract_section_by_heading(&doc, &["Nguyên liệu"], 50),
            vec!["200g thịt bò", "Hành, tỏi"]
        );
    }

    #[test]
    fn servings_label_inside_script_is_ignored() {
        let html = r#"<html><head>
            <script type="application/ld+json">{"description":"Khẩu phần 4 người"}</script>
            </head><body>
            <p>Very long intro paragraph about the dish</p>
            <div><span>Khẩu phần</span><span>4 người</span></div>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let result = extract_from_markup(&doc, config());
        assert_eq!(result.servings_raw.as_deref(), Some("4 người"));
    }

    #[test]
    fn empty_servings_anchor_falls_through_to_next_one() {
        let html = r#"<html><body>
            <div><b>Khẩu phần</b><i></i></div>
            <p>Khẩu phần</p><p>2 người</p>
            </body></html>"#;
        let doc = Html::parse_document(html);
        let result = extract_from_markup(&doc, config());
        assert_eq!(result.servings_raw.as_deref(), Some("2 người"));
    }

    #[test]
    fn empty_page_yields_empty_result() {
        let doc = Html::parse_document("<html><body></body></html>");
        let result = extract_from_markup(&doc, config());
        assert_eq!(result.name, None);
        assert!(result.ingredients_raw.is_empty());
        assert!(result.instructions_raw.is_empty());
        assert_eq!(result.servings_raw, None);
    }
}
