//! JSON-LD (`application/ld+json`) Recipe extraction.
//!
//! Schema.org fields are duck-typed in the wild: the same property can be a
//! string, an object, or an array of either. Each field goes through exactly
//! one `coerce_*` function that matches on the JSON shape.

use scraper::{Html, Selector};
use serde_json::Value;
use std::sync::LazyLock;

use crate::normalize::{clean_lines, normalize_line};
use crate::types::{ExtractResult, ExtractSource};

static JSONLD_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"script[type="application/ld+json"]"#).expect("Invalid selector")
});

/// Find the first Recipe node across all JSON-LD blocks and map its fields.
/// Returns `None` when no block contains a Recipe.
pub fn extract_structured(document: &Html) -> Option<ExtractResult> {
    for (index, element) in document.select(&JSONLD_SELECTOR).enumerate() {
        let raw = element.text().collect::<String>();
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }

        let json: Value = match serde_json::from_str(&sanitize_json(raw)) {
            Ok(v) => v,
            Err(e) => {
                tracing::debug!(block = index, error = %e, "skipping malformed JSON-LD block");
                continue;
            }
        };

        if let Some(recipe) = find_recipe_node(&json) {
            return Some(map_recipe(recipe));
        }
    }
    None
}

/// Escape raw control characters inside JSON string literals.
/// Some sites emit literal newlines/tabs in JSON-LD strings.
fn sanitize_json(json: &str) -> String {
    let mut result = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for c in json.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            result.push(c);
            continue;
        }

        if escaped {
            escaped = false;
            result.push(c);
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                result.push(c);
            }
            '"' => {
                in_string = false;
                result.push(c);
            }
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            c if c.is_control() => {}
            _ => result.push(c),
        }
    }

    result
}

/// Locate a Recipe node: the block itself, an entry of a top-level array,
/// an entry of a top-level `@graph`, or an entry of a `@graph` inside an
/// array item. The first match in that order wins.
fn find_recipe_node(json: &Value) -> Option<&Value> {
    match json {
        Value::Object(obj) => {
            if is_recipe_type(obj.get("@type")) {
                return Some(json);
            }
            graph_recipe(json)
        }
        Value::Array(items) => items.iter().find_map(|item| {
            if is_recipe_node(item) {
                Some(item)
            } else {
                graph_recipe(item)
            }
        }),
        _ => None,
    }
}

fn graph_recipe(node: &Value) -> Option<&Value> {
    node.get("@graph")
        .and_then(Value::as_array)
        .and_then(|graph| graph.iter().find(|n| is_recipe_node(n)))
}

fn is_recipe_node(node: &Value) -> bool {
    node.is_object() && is_recipe_type(node.get("@type"))
}

fn is_recipe_type(type_val: Option<&Value>) -> bool {
    match type_val {
        Some(Value::String(s)) => s == "Recipe",
        Some(Value::Array(arr)) => arr.iter().any(|v| v == "Recipe"),
        _ => false,
    }
}

fn map_recipe(recipe: &Value) -> ExtractResult {
    ExtractResult {
        name: coerce_name(recipe.get("name")),
        image_url: coerce_image(recipe.get("image")),
        ingredients_raw: coerce_ingredients(recipe.get("recipeIngredient")),
        instructions_raw: coerce_instructions(recipe.get("recipeInstructions")),
        servings_raw: coerce_text(recipe.get("recipeYield")),
        cuisine: coerce_text(recipe.get("recipeCuisine")),
        description: coerce_text(recipe.get("description")),
        author_name: coerce_author(recipe.get("author")),
        extract_source: ExtractSource::Structured,
    }
}

fn non_blank(s: &str) -> Option<String> {
    let s = normalize_line(s);
    (!s.is_empty()).then_some(s)
}

/// Free-text fields keep their inner spacing; only the ends are trimmed.
fn trimmed(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn coerce_name(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => non_blank(s),
        _ => None,
    }
}

/// string -> itself; array -> first non-empty string or object with `url`;
/// object -> its `url`.
pub(crate) fn coerce_image(value: Option<&Value>) -> Option<String> {
    let value = value?;
    match value {
        Value::String(s) => non_blank(s),
        Value::Array(items) => items.iter().find_map(|item| match item {
            Value::String(s) => non_blank(s),
            Value::Object(_) => image_object_url(item),
            _ => None,
        }),
        Value::Object(_) => image_object_url(value),
        _ => None,
    }
}

fn image_object_url(obj: &Value) -> Option<String> {
    match obj.get("url")? {
        Value::String(s) => non_blank(s),
        _ => None,
    }
}

fn coerce_ingredients(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => clean_lines([Some(s.as_str())]),
        Some(Value::Array(items)) => clean_lines(items.iter().map(Value::as_str)),
        _ => Vec::new(),
    }
}

fn coerce_instructions(value: Option<&Value>) -> Vec<String> {
    let mut steps = Vec::new();
    match value {
        Some(Value::String(s)) => steps.push(s.clone()),
        Some(Value::Array(items)) => {
            for item in items {
                collect_instruction(item, &mut steps);
            }
        }
        _ => {}
    }
    clean_lines(steps.into_iter().map(Some))
}

/// HowToStep -> its `text` (or `name`); HowToSection -> its steps, in order.
fn collect_instruction(item: &Value, steps: &mut Vec<String>) {
    match item {
        Value::String(s) => steps.push(s.clone()),
        Value::Object(obj) => {
            if let Some(Value::Array(section)) = obj.get("itemListElement") {
                for step in section {
                    collect_instruction(step, steps);
                }
                return;
            }
            let text = [obj.get("text"), obj.get("name")]
                .into_iter()
                .flatten()
                .find_map(|v| v.as_str().and_then(non_blank));
            if let Some(text) = text {
                steps.push(text);
            }
        }
        _ => {}
    }
}

/// Stringify a scalar field; arrays yield their first scalar entry.
fn coerce_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => trimmed(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items.iter().find_map(|item| coerce_text(Some(item))),
        Value::Bool(_) | Value::Null | Value::Object(_) => None,
    }
}

fn coerce_author(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Object(obj) => obj.get("name").and_then(Value::as_str).and_then(non_blank),
        Value::Array(items) => items
            .first()
            .filter(|first| first.is_object())
            .and_then(|first| first.get("name"))
            .and_then(Value::as_str)
            .and_then(non_blank),
        Value::String(s) => non_blank(s),
        _ => None,
    }
}
