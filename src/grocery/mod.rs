//! Grocery list consolidation.
//!
//! Layout:
//! - `parse.rs`: free-text ingredient lines into structured ingredients
//! - `units.rs`: unit aliases, families, conversion and quantity formatting
//! - `category.rs`: keyword-based store section guess

pub mod category;
pub mod parse;
pub mod units;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::{GroceryCategory, Ingredient};
use units::{UnitFamily, best_unit, format_quantity, pluralize, resolve_unit, singularize, unit_label};

pub use category::categorize;
pub use parse::parse_ingredient_line;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupBy {
    #[default]
    Category,
    Meal,
}

impl GroupBy {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupBy::Category => "category",
            GroupBy::Meal => "meal",
        }
    }
}

/// One meal's contribution to a grocery list.
#[derive(Debug, Clone, Copy)]
pub struct MealIngredients<'a> {
    pub meal_name: &'a str,
    pub ingredients: &'a [Ingredient],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryItem {
    /// Stable identity used for checked-off state.
    pub key: String,
    pub name: String,
    pub quantity: Option<f64>,
    pub unit: Option<String>,
    pub category: GroceryCategory,
    pub display: String,
    pub meals: Vec<String>,
    #[serde(default)]
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrocerySection {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<GroceryCategory>,
    pub items: Vec<GroceryItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroceryList {
    pub group_by: GroupBy,
    pub sections: Vec<GrocerySection>,
}

impl GroceryList {
    pub fn item_count(&self) -> usize {
        self.sections.iter().map(|s| s.items.len()).sum()
    }

    pub fn items(&self) -> impl Iterator<Item = &GroceryItem> {
        self.sections.iter().flat_map(|s| s.items.iter())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.items().any(|i| i.key == key)
    }

    /// Mark items whose key is in `checked`.
    pub fn apply_checked(&mut self, checked: &[String]) {
        for item in self.sections.iter_mut().flat_map(|s| s.items.iter_mut()) {
            item.checked = checked.iter().any(|k| *k == item.key);
        }
    }
}

/// Running total for one `(name, unit family)` line.
struct Accumulator {
    key: String,
    name: String,
    category: GroceryCategory,
    family: UnitFamily,
    base_total: Option<f64>,
    units_seen: Vec<(String, f64)>,
    meals: Vec<String>,
}

impl Accumulator {
    fn add(&mut self, ingredient: &Ingredient, meal: &str) {
        let unit = resolve_unit(ingredient.unit.as_deref());
        if let Some(q) = ingredient.quantity.filter(|q| q.is_finite() && *q > 0.0) {
            *self.base_total.get_or_insert(0.0) += q * unit.factor;
            if !self.units_seen.iter().any(|(n, _)| *n == unit.name) {
                self.units_seen.push((unit.name.clone(), unit.factor));
            }
        }
        if self.category == GroceryCategory::Other && ingredient.category != GroceryCategory::Other
        {
            self.category = ingredient.category;
        }
        if !self.meals.iter().any(|m| m == meal) {
            self.meals.push(meal.to_string());
        }
    }

    fn finish(self) -> GroceryItem {
        let (quantity, unit) = match self.base_total {
            None => (None, None),
            Some(total) => match self.units_seen.as_slice() {
                // every contributor used the same unit: keep it
                [(name, factor)] => (Some(total / factor), Some(name.clone())),
                _ => match best_unit(&self.family, total) {
                    Some((name, value)) => (Some(value), Some(name.to_string())),
                    None => (Some(total), None),
                },
            },
        };
        let unit = unit.filter(|u| !u.is_empty());
        let display = display_line(&self.name, quantity, unit.as_deref(), &self.family);
        GroceryItem {
            key: self.key,
            name: self.name,
            quantity,
            unit,
            category: self.category,
            display,
            meals: self.meals,
            checked: false,
        }
    }
}

/// Consolidate ingredients across meals in one pass.
///
/// By category, identical ingredients (same normalized name and unit family) are
/// merged across meals and sections follow store order. By meal, each meal gets its
/// own section and merging happens only within it.
pub fn build_grocery_list(meals: &[MealIngredients<'_>], group_by: GroupBy) -> GroceryList {
    match group_by {
        GroupBy::Category => by_category(meals),
        GroupBy::Meal => by_meal(meals),
    }
}

fn by_category(meals: &[MealIngredients<'_>]) -> GroceryList {
    let items = consolidate(
        meals
            .iter()
            .flat_map(|m| m.ingredients.iter().map(move |i| (m.meal_name, i))),
        "",
    );

    let mut sections: Vec<GrocerySection> = GroceryCategory::ALL
        .iter()
        .map(|c| GrocerySection {
            title: c.label().to_string(),
            category: Some(*c),
            items: Vec::new(),
        })
        .collect();
    for item in items {
        if let Some(section) = sections.iter_mut().find(|s| s.category == Some(item.category)) {
            section.items.push(item);
        }
    }
    for section in sections.iter_mut() {
        section
            .items
            .sort_by_key(|item| item.name.to_lowercase());
    }
    sections.retain(|s| !s.items.is_empty());

    GroceryList {
        group_by: GroupBy::Category,
        sections,
    }
}

fn by_meal(meals: &[MealIngredients<'_>]) -> GroceryList {
    let sections = meals
        .iter()
        .enumerate()
        .map(|(idx, m)| GrocerySection {
            title: m.meal_name.to_string(),
            category: None,
            items: consolidate(
                m.ingredients.iter().map(|i| (m.meal_name, i)),
                &format!("{idx}|"),
            ),
        })
        .collect();
    GroceryList {
        group_by: GroupBy::Meal,
        sections,
    }
}

fn consolidate<'a>(
    ingredients: impl Iterator<Item = (&'a str, &'a Ingredient)>,
    key_prefix: &str,
) -> Vec<GroceryItem> {
    let mut order: Vec<Accumulator> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for (meal, ingredient) in ingredients {
        let normalized = normalize_name(&ingredient.name);
        if normalized.is_empty() {
            continue;
        }
        let family = resolve_unit(ingredient.unit.as_deref()).family;
        let key = format!("{key_prefix}{normalized}|{}", family.key());

        let slot = *index.entry(key.clone()).or_insert_with(|| {
            order.push(Accumulator {
                key,
                name: ingredient.name.trim().to_string(),
                category: ingredient.category,
                family,
                base_total: None,
                units_seen: Vec::new(),
                meals: Vec::new(),
            });
            order.len() - 1
        });
        order[slot].add(ingredient, meal);
    }

    order.into_iter().map(Accumulator::finish).collect()
}

/// Lowercased, whitespace-collapsed, with the last word singular.
pub fn normalize_name(name: &str) -> String {
    let mut words: Vec<String> = name.split_whitespace().map(str::to_lowercase).collect();
    if let Some(last) = words.last_mut() {
        *last = singularize(last);
    }
    words.join(" ")
}

fn display_line(name: &str, quantity: Option<f64>, unit: Option<&str>, family: &UnitFamily) -> String {
    let Some(q) = quantity else {
        return name.to_string();
    };
    let amount = format_quantity(q, family);
    match unit {
        Some(u) => format!("{amount} {} {name}", unit_label(u, q)),
        None if q > 1.0 && normalize_name(name) == name.to_lowercase() => {
            format!("{amount} {}", pluralize(name))
        }
        None => format!("{amount} {name}"),
    }
}
