//! schema.org `Recipe` extraction from `<script type="application/ld+json">` blocks.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

use super::html::{decode_entities, strip_tags};
use crate::grocery::parse_ingredient_line;
use crate::types::Recipe;

static LD_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?is)<script\b[^>]*type\s*=\s*["']?application/ld\+json["']?[^>]*>(.*?)</script\s*>"#,
    )
    .expect("valid regex")
});

static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^P(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("valid regex")
});

static FIRST_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").expect("valid regex"));

/// First qualifying recipe across all JSON-LD blocks of a page.
pub fn recipe_from_html(html: &str) -> Option<Recipe> {
    LD_JSON
        .captures_iter(html)
        .filter_map(|caps| parse_block(&caps[1]))
        .find_map(|doc| {
            let mut nodes = Vec::new();
            collect_recipe_nodes(&doc, &mut nodes);
            nodes.into_iter().find_map(map_recipe)
        })
}

fn parse_block(raw: &str) -> Option<Value> {
    let raw = raw.trim();
    // some sites wrap the block in CDATA or leave trailing semicolons
    let raw = raw
        .strip_prefix("<![CDATA[")
        .and_then(|r| r.strip_suffix("]]>"))
        .unwrap_or(raw)
        .trim()
        .trim_end_matches(';');
    serde_json::from_str(raw).ok()
}

fn is_recipe_type(node: &Value) -> bool {
    match node.get("@type") {
        Some(Value::String(t)) => type_is_recipe(t),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(Value::as_str)
            .any(type_is_recipe),
        _ => false,
    }
}

fn type_is_recipe(t: &str) -> bool {
    t == "Recipe" || t.ends_with("/Recipe") || t.ends_with(":Recipe")
}

fn collect_recipe_nodes<'a>(value: &'a Value, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) => items.iter().for_each(|v| collect_recipe_nodes(v, out)),
        Value::Object(obj) => {
            if is_recipe_type(value) {
                out.push(value);
            }
            for key in ["@graph", "mainEntity", "mainEntityOfPage", "itemListElement", "item"] {
                if let Some(child) = obj.get(key) {
                    collect_recipe_nodes(child, out);
                }
            }
        }
        _ => {}
    }
}

/// A node qualifies only with a name and at least one ingredient.
pub fn map_recipe(node: &Value) -> Option<Recipe> {
    let name = text(node.get("name")?)?;
    let ingredients: Vec<_> = node
        .get("recipeIngredient")
        .or_else(|| node.get("ingredients"))
        .map(string_list)
        .unwrap_or_default()
        .iter()
        .map(|line| parse_ingredient_line(line))
        .collect();
    if ingredients.is_empty() {
        return None;
    }

    let prep = node.get("prepTime").and_then(duration_field);
    let cook = node.get("cookTime").and_then(duration_field);
    let total = node.get("totalTime").and_then(duration_field);
    let cook = match (prep, cook, total) {
        (None, None, Some(total)) => Some(total),
        (_, cook, _) => cook,
    };

    let mut instructions = Vec::new();
    if let Some(v) = node.get("recipeInstructions") {
        flatten_instructions(v, &mut instructions);
    }

    Some(Recipe {
        name,
        description: node.get("description").and_then(text),
        cuisine: node
            .get("recipeCuisine")
            .map(string_list)
            .and_then(|c| c.into_iter().next()),
        prep_minutes: prep,
        cook_minutes: cook,
        servings: node.get("recipeYield").and_then(first_integer),
        ingredients,
        instructions,
        dietary_tags: node
            .get("suitableForDiet")
            .map(string_list)
            .unwrap_or_default()
            .iter()
            .filter_map(|d| diet_tag(d))
            .collect(),
        image_url: node.get("image").and_then(image_url),
        source_url: node.get("url").and_then(Value::as_str).map(str::to_string),
    })
}

fn text(value: &Value) -> Option<String> {
    let s = strip_tags(value.as_str()?);
    (!s.is_empty()).then_some(s)
}

/// A string or an array of strings.
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::String(_) => text(value).into_iter().collect(),
        Value::Array(items) => items.iter().filter_map(text).collect(),
        _ => Vec::new(),
    }
}

fn duration_field(value: &Value) -> Option<u32> {
    parse_iso_duration(value.as_str()?)
}

/// ISO-8601 duration to whole minutes, rounding seconds up. `PT1H30M` is 90.
pub fn parse_iso_duration(raw: &str) -> Option<u32> {
    let caps = ISO_DURATION.captures(raw.trim())?;
    let part = |i: usize| -> f64 {
        caps.get(i)
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    if (1..=4).all(|i| caps.get(i).is_none()) {
        return None;
    }
    let minutes = part(1) * 1440.0 + part(2) * 60.0 + part(3) + part(4) / 60.0;
    Some(minutes.ceil() as u32)
}

/// First integer in a number, string or array (`"4 servings"`, `["6", "6 bowls"]`).
fn first_integer(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_f64().filter(|f| *f >= 1.0).map(|f| f as u32),
        Value::String(s) => FIRST_INT.find(s).and_then(|m| m.as_str().parse().ok()),
        Value::Array(items) => items.iter().find_map(first_integer),
        _ => None,
    }
}

fn flatten_instructions(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            // a single blob may still carry markup breaks
            let s = s.replace("<br>", "\n").replace("<br/>", "\n").replace("<br />", "\n");
            out.extend(
                s.lines()
                    .map(strip_tags)
                    .filter(|line| !line.is_empty()),
            );
        }
        Value::Array(items) => items.iter().for_each(|v| flatten_instructions(v, out)),
        Value::Object(obj) => {
            if let Some(children) = obj.get("itemListElement") {
                flatten_instructions(children, out);
            } else if let Some(step) = obj.get("text").or_else(|| obj.get("name")).and_then(text) {
                out.push(step);
            }
        }
        _ => {}
    }
}

fn image_url(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(decode_entities(s.trim())).filter(|s| !s.is_empty()),
        Value::Array(items) => items.iter().find_map(image_url),
        Value::Object(obj) => obj.get("url").or_else(|| obj.get("contentUrl")).and_then(image_url),
        _ => None,
    }
}

/// `https://schema.org/GlutenFreeDiet` -> `gluten-free`.
fn diet_tag(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', ':']).next()?.trim();
    let base = last.strip_suffix("Diet").unwrap_or(last);
    if base.is_empty() {
        return None;
    }
    let mut tag = String::with_capacity(base.len() + 2);
    for (i, c) in base.chars().enumerate() {
        if c.is_uppercase() && i > 0 {
            tag.push('-');
        }
        tag.extend(c.to_lowercase());
    }
    Some(tag)
}
