//! Lenient mapping from model JSON to domain recipes.
//!
//! Models drift from the requested schema in small ways: numbers as strings,
//! ingredients as free text, `title` instead of `name`. Everything here bends
//! rather than fails. A recipe is dropped only when it has no name or no
//! usable ingredients.

use serde_json::{Map, Value};

use super::json::extract_json;
use crate::error::MealwiseError;
use crate::grocery::parse::parse_number;
use crate::grocery::{categorize, parse_ingredient_line};
use crate::types::{GroceryCategory, Ingredient, Recipe};

/// Decode a list of recipes from `{"recipes": [...]}`, a bare array or a single object.
pub fn recipes_from_text(text: &str) -> Result<Vec<Recipe>, MealwiseError> {
    let value = extract_json(text)
        .ok_or_else(|| MealwiseError::LlmOutput("reply contained no JSON".to_string()))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("recipes").or_else(|| obj.remove("meals")) {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => vec![Value::Object(obj)],
        },
        _ => Vec::new(),
    };
    Ok(items.iter().filter_map(recipe_from_value).collect())
}

/// Decode `{"recipe": {...}}`, `{"recipe": null}` or a bare recipe object.
pub fn optional_recipe_from_text(text: &str) -> Result<Option<Recipe>, MealwiseError> {
    let value = extract_json(text)
        .ok_or_else(|| MealwiseError::LlmOutput("reply contained no JSON".to_string()))?;
    let inner = match &value {
        Value::Object(obj) if obj.contains_key("recipe") => &obj["recipe"],
        other => other,
    };
    if inner.is_null() {
        return Ok(None);
    }
    Ok(recipe_from_value(inner))
}

pub fn recipe_from_value(value: &Value) -> Option<Recipe> {
    let obj = value.as_object()?;
    let name = text_field(obj, &["name", "title"])?;
    let ingredients: Vec<Ingredient> = obj
        .get("ingredients")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(ingredient_from_value).collect())
        .unwrap_or_default();
    if ingredients.is_empty() {
        return None;
    }
    Some(Recipe {
        name,
        description: text_field(obj, &["description", "summary"]),
        cuisine: text_field(obj, &["cuisine"]),
        prep_minutes: obj.get("prep_minutes").and_then(lenient_u32),
        cook_minutes: obj.get("cook_minutes").and_then(lenient_u32),
        servings: obj.get("servings").and_then(lenient_u32),
        ingredients,
        instructions: obj
            .get("instructions")
            .or_else(|| obj.get("steps"))
            .map(instructions_from_value)
            .unwrap_or_default(),
        dietary_tags: obj
            .get("dietary_tags")
            .and_then(Value::as_array)
            .map(|tags| {
                tags.iter()
                    .filter_map(Value::as_str)
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default(),
        image_url: None,
        source_url: None,
    })
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Accepts `30`, `30.0`, `"30"` and `"30 minutes"`.
pub(crate) fn lenient_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .and_then(|n| u32::try_from(n).ok()),
        Value::String(s) => {
            let digits: String = s
                .trim()
                .chars()
                .take_while(|c| c.is_ascii_digit())
                .collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

fn lenient_quantity(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|q| *q > 0.0),
        Value::String(s) => {
            // "1 1/2" style mixed numbers
            let total: Option<f64> = s
                .split_whitespace()
                .map(parse_number)
                .try_fold(0.0, |acc, n| n.map(|n| acc + n));
            total.filter(|q| *q > 0.0)
        }
        _ => None,
    }
}

fn ingredient_from_value(value: &Value) -> Option<Ingredient> {
    match value {
        Value::String(line) if !line.trim().is_empty() => Some(parse_ingredient_line(line)),
        Value::Object(obj) => {
            let name = text_field(obj, &["name", "item", "ingredient"])?;
            let category = obj
                .get("category")
                .and_then(Value::as_str)
                .map(parse_category)
                .filter(|c| *c != GroceryCategory::Other)
                .unwrap_or_else(|| categorize(&name));
            Some(Ingredient {
                quantity: obj
                    .get("quantity")
                    .or_else(|| obj.get("amount"))
                    .and_then(lenient_quantity),
                unit: text_field(obj, &["unit"]),
                note: text_field(obj, &["note", "notes"]),
                category,
                name,
            })
        }
        _ => None,
    }
}

/// Accepts snake_case names and display labels such as "Meat & Seafood".
fn parse_category(raw: &str) -> GroceryCategory {
    let snake = raw
        .trim()
        .to_lowercase()
        .replace(" & ", "_")
        .replace(" and ", "_")
        .replace([' ', '-'], "_");
    serde_json::from_value(Value::String(snake)).unwrap_or_default()
}

fn instructions_from_value(value: &Value) -> Vec<String> {
    let raw: Vec<String> = match value {
        Value::String(s) => s.lines().map(str::to_string).collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.clone()),
                Value::Object(obj) => text_field(obj, &["text", "step"]),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    };
    raw.iter()
        .map(|s| strip_step_number(s.trim()))
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// "1. Boil water" -> "Boil water"; "1.5 cups flour" is left alone.
fn strip_step_number(step: &str) -> &str {
    let digits = step.chars().take_while(char::is_ascii_digit).count();
    if digits == 0 {
        return step;
    }
    match step[digits..].strip_prefix(['.', ')']) {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest.trim_start(),
        _ => step,
    }
}
