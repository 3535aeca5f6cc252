//! Free-text ingredient lines ("1 1/2 cups flour, sifted") into [`Ingredient`]s.

use regex::Regex;
use std::sync::LazyLock;

use super::category::categorize;
use super::units::lookup_unit;
use crate::types::Ingredient;

static PARENS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]*)\)").expect("valid regex"));

/// "200g", "8oz": a number glued to a unit.
static GLUED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)([a-zA-Z]+\.?)$").expect("valid regex"));

/// "2-3", "2–3", "1/2-1"
static RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+(?:[./]\d+)?)\s*[-–]\s*(\d+(?:[./]\d+)?)$").expect("valid regex")
});

const VULGAR: &[(char, &str)] = &[
    ('½', "1/2"),
    ('⅓', "1/3"),
    ('⅔', "2/3"),
    ('¼', "1/4"),
    ('¾', "3/4"),
    ('⅕', "1/5"),
    ('⅛', "1/8"),
    ('⅜', "3/8"),
    ('⅝', "5/8"),
    ('⅞', "7/8"),
];

pub fn parse_ingredient_line(line: &str) -> Ingredient {
    let mut notes: Vec<String> = Vec::new();

    let mut text = String::with_capacity(line.len() + 4);
    for c in line.trim().chars() {
        match VULGAR.iter().find(|(v, _)| *v == c) {
            Some((_, frac)) => {
                text.push(' ');
                text.push_str(frac);
                text.push(' ');
            }
            None if c == '⁄' => text.push('/'),
            None => text.push(c),
        }
    }

    let text = PARENS
        .replace_all(&text, |caps: &regex::Captures| {
            let inner = caps[1].trim();
            if !inner.is_empty() {
                notes.push(inner.to_string());
            }
            " "
        })
        .into_owned();

    let mut tokens: Vec<String> = text.split_whitespace().map(str::to_string).collect();
    // "2 - 3 cups": fold spaced ranges into one token
    fold_spaced_range(&mut tokens);

    let mut idx = 0;
    let mut quantity: Option<f64> = None;
    let mut glued_unit: Option<String> = None;

    if let Some(tok) = tokens.first() {
        if let Some(caps) = RANGE.captures(tok) {
            quantity = parse_number(&caps[2]);
            idx = 1;
        } else if let Some(caps) = GLUED.captures(tok) {
            if lookup_unit(&caps[2]).is_some() {
                quantity = caps[1].parse().ok();
                glued_unit = Some(caps[2].to_string());
                idx = 1;
            }
        } else if let Some(n) = parse_number(tok) {
            quantity = Some(n);
            idx = 1;
            // mixed number: "1 1/2"
            if let Some(next) = tokens.get(1)
                && next.contains('/')
                && let Some(frac) = parse_number(next)
            {
                quantity = Some(n + frac);
                idx = 2;
            }
        }
    }

    let mut unit: Option<String> = glued_unit.and_then(|u| lookup_unit(&u)).map(|u| u.name);
    if unit.is_none() && idx < tokens.len() {
        // two-word units first ("fl oz", "fluid ounces")
        if let Some(next) = tokens.get(idx + 1) {
            let pair = format!("{} {}", tokens[idx], next);
            if let Some(u) = lookup_unit(&pair) {
                unit = Some(u.name);
                idx += 2;
            }
        }
        if unit.is_none()
            && let Some(u) = lookup_unit(&tokens[idx])
            && (quantity.is_some() || tokens.len() > idx + 1)
        {
            unit = Some(u.name);
            idx += 1;
        }
    }
    if unit.is_some() && tokens.get(idx).is_some_and(|t| t.eq_ignore_ascii_case("of")) {
        idx += 1;
    }

    let rest = tokens[idx.min(tokens.len())..].join(" ");
    let (name, trailing) = match rest.split_once(',') {
        Some((n, t)) => (n.trim().to_string(), Some(t.trim().to_string())),
        None => (rest.trim().to_string(), None),
    };
    if let Some(t) = trailing.filter(|t| !t.is_empty()) {
        notes.push(t);
    }

    // nothing left after the amount: keep the line whole rather than split it
    let name = if name.is_empty() {
        quantity = None;
        unit = None;
        line.trim().to_string()
    } else {
        name
    };
    Ingredient {
        category: categorize(&name),
        name,
        quantity,
        unit,
        note: (!notes.is_empty()).then(|| notes.join("; ")),
    }
}

fn fold_spaced_range(tokens: &mut Vec<String>) {
    if tokens.len() >= 3
        && parse_number(&tokens[0]).is_some()
        && matches!(tokens[1].as_str(), "-" | "–" | "to")
        && parse_number(&tokens[2]).is_some()
    {
        let folded = format!("{}-{}", tokens[0], tokens[2]);
        tokens.splice(0..3, [folded]);
    }
}

/// Integer, decimal or simple fraction.
pub fn parse_number(token: &str) -> Option<f64> {
    let token = token.trim();
    if let Some((num, den)) = token.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        return (den != 0.0).then_some(num / den);
    }
    if token.chars().all(|c| c.is_ascii_digit() || c == '.') && !token.is_empty() {
        return token.parse().ok();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GroceryCategory;

    #[test]
    fn mixed_number_with_unit_and_note() {
        let i = parse_ingredient_line("1 1/2 cups all-purpose flour, sifted");
        assert_eq!(i.quantity, Some(1.5));
        assert_eq!(i.unit.as_deref(), Some("cup"));
        assert_eq!(i.name, "all-purpose flour");
        assert_eq!(i.note.as_deref(), Some("sifted"));
        assert_eq!(i.category, GroceryCategory::Pantry);
    }

    #[test]
    fn unicode_fractions() {
        let i = parse_ingredient_line("1½ tsp kosher salt");
        assert_eq!(i.quantity, Some(1.5));
        assert_eq!(i.unit.as_deref(), Some("tsp"));
        assert_eq!(i.name, "kosher salt");

        let i = parse_ingredient_line("¾ cup milk");
        assert_eq!(i.quantity, Some(0.75));
    }

    #[test]
    fn ranges_take_upper_bound() {
        assert_eq!(parse_ingredient_line("2-3 cloves garlic").quantity, Some(3.0));
        let i = parse_ingredient_line("2 to 3 tbsp olive oil");
        assert_eq!(i.quantity, Some(3.0));
        assert_eq!(i.unit.as_deref(), Some("tbsp"));
    }

    #[test]
    fn glued_units_and_parentheses() {
        let i = parse_ingredient_line("200g dark chocolate");
        assert_eq!(i.quantity, Some(200.0));
        assert_eq!(i.unit.as_deref(), Some("g"));
        assert_eq!(i.name, "dark chocolate");

        let i = parse_ingredient_line("1 (14 oz) can diced tomatoes");
        assert_eq!(i.quantity, Some(1.0));
        assert_eq!(i.unit.as_deref(), Some("can"));
        assert_eq!(i.name, "diced tomatoes");
        assert_eq!(i.note.as_deref(), Some("14 oz"));
        assert_eq!(i.category, GroceryCategory::CannedJarred);
    }

    #[test]
    fn unitless_and_bare_lines() {
        let i = parse_ingredient_line("3 large eggs");
        assert_eq!(i.quantity, Some(3.0));
        assert_eq!(i.unit, None);
        assert_eq!(i.name, "large eggs");

        let i = parse_ingredient_line("Salt and pepper, to taste");
        assert_eq!(i.quantity, None);
        assert_eq!(i.name, "Salt and pepper");
        assert_eq!(i.note.as_deref(), Some("to taste"));

        let i = parse_ingredient_line("2 cups of water");
        assert_eq!(i.name, "water");
    }

    #[test]
    fn amount_only_line_is_not_doubled() {
        let i = parse_ingredient_line("2 cups");
        assert_eq!(i.name, "2 cups");
        assert_eq!(i.quantity, None);
        assert_eq!(i.unit, None);
    }
}
