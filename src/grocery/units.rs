//! Unit canonicalization, conversion and quantity formatting.

/// Units only merge with units of the same family.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitFamily {
    UsVolume,
    MetricVolume,
    UsWeight,
    MetricWeight,
    /// Counted things (`clove`, `can`, ...): merge only with the identical unit.
    Count(String),
    Unitless,
}

impl UnitFamily {
    pub fn key(&self) -> String {
        match self {
            UnitFamily::UsVolume => "us_volume".to_string(),
            UnitFamily::MetricVolume => "metric_volume".to_string(),
            UnitFamily::UsWeight => "us_weight".to_string(),
            UnitFamily::MetricWeight => "metric_weight".to_string(),
            UnitFamily::Count(u) => format!("count:{u}"),
            UnitFamily::Unitless => "none".to_string(),
        }
    }

    fn is_metric(&self) -> bool {
        matches!(self, UnitFamily::MetricVolume | UnitFamily::MetricWeight)
    }

    /// Units a merged total may be re-expressed in, largest first, with the
    /// minimum value each needs to be chosen.
    fn ladder(&self) -> &'static [(&'static str, f64)] {
        match self {
            UnitFamily::UsVolume => &[("cup", 0.25), ("tbsp", 1.0), ("tsp", 0.0)],
            UnitFamily::MetricVolume => &[("l", 1.0), ("ml", 0.0)],
            UnitFamily::UsWeight => &[("lb", 1.0), ("oz", 0.0)],
            UnitFamily::MetricWeight => &[("kg", 1.0), ("g", 0.0)],
            UnitFamily::Count(_) | UnitFamily::Unitless => &[],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// Canonical spelling; empty for [`UnitFamily::Unitless`].
    pub name: String,
    pub family: UnitFamily,
    /// Multiplier into the family's base unit (tsp, ml, oz, g).
    pub factor: f64,
}

impl Unit {
    pub fn unitless() -> Self {
        Unit {
            name: String::new(),
            family: UnitFamily::Unitless,
            factor: 1.0,
        }
    }

    pub fn as_option(&self) -> Option<String> {
        (!self.name.is_empty()).then(|| self.name.clone())
    }
}

struct UnitDef {
    name: &'static str,
    family: UnitFamily,
    factor: f64,
    aliases: &'static [&'static str],
}

#[rustfmt::skip]
const MEASURED: &[UnitDef] = &[
    UnitDef { name: "tsp", family: UnitFamily::UsVolume, factor: 1.0, aliases: &["tsp", "tsps", "teaspoon", "teaspoons"] },
    UnitDef { name: "tbsp", family: UnitFamily::UsVolume, factor: 3.0, aliases: &["tbsp", "tbsps", "tbs", "tbl", "tablespoon", "tablespoons"] },
    UnitDef { name: "fl oz", family: UnitFamily::UsVolume, factor: 6.0, aliases: &["fl oz", "fl. oz", "fluid ounce", "fluid ounces"] },
    UnitDef { name: "cup", family: UnitFamily::UsVolume, factor: 48.0, aliases: &["cup", "cups", "c"] },
    UnitDef { name: "pint", family: UnitFamily::UsVolume, factor: 96.0, aliases: &["pint", "pints", "pt"] },
    UnitDef { name: "quart", family: UnitFamily::UsVolume, factor: 192.0, aliases: &["quart", "quarts", "qt"] },
    UnitDef { name: "gallon", family: UnitFamily::UsVolume, factor: 768.0, aliases: &["gallon", "gallons", "gal"] },
    UnitDef { name: "ml", family: UnitFamily::MetricVolume, factor: 1.0, aliases: &["ml", "milliliter", "milliliters", "millilitre", "millilitres"] },
    UnitDef { name: "l", family: UnitFamily::MetricVolume, factor: 1000.0, aliases: &["l", "liter", "liters", "litre", "litres"] },
    UnitDef { name: "oz", family: UnitFamily::UsWeight, factor: 1.0, aliases: &["oz", "ounce", "ounces"] },
    UnitDef { name: "lb", family: UnitFamily::UsWeight, factor: 16.0, aliases: &["lb", "lbs", "pound", "pounds"] },
    UnitDef { name: "g", family: UnitFamily::MetricWeight, factor: 1.0, aliases: &["g", "gr", "gram", "grams", "gramme", "grammes"] },
    UnitDef { name: "kg", family: UnitFamily::MetricWeight, factor: 1000.0, aliases: &["kg", "kgs", "kilogram", "kilograms"] },
];

const COUNTED: &[(&str, &[&str])] = &[
    ("clove", &["clove", "cloves"]),
    ("can", &["can", "cans"]),
    ("jar", &["jar", "jars"]),
    ("package", &["package", "packages", "pkg", "pkgs", "packet", "packets"]),
    ("pinch", &["pinch", "pinches"]),
    ("dash", &["dash", "dashes"]),
    ("slice", &["slice", "slices"]),
    ("bunch", &["bunch", "bunches"]),
    ("sprig", &["sprig", "sprigs"]),
    ("stalk", &["stalk", "stalks"]),
    ("head", &["head", "heads"]),
    ("piece", &["piece", "pieces"]),
    ("handful", &["handful", "handfuls"]),
    ("stick", &["stick", "sticks"]),
    ("fillet", &["fillet", "fillets", "filet", "filets"]),
];

/// Canonical unit for a known alias, case-sensitive for the `t`/`T` shorthand.
pub fn lookup_unit(raw: &str) -> Option<Unit> {
    let trimmed = raw.trim().trim_end_matches('.');
    match trimmed {
        "t" => return lookup_unit("tsp"),
        "T" => return lookup_unit("tbsp"),
        _ => {}
    }
    let lowered = trimmed.to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    if let Some(def) = MEASURED.iter().find(|d| d.aliases.contains(&lowered.as_str())) {
        return Some(Unit {
            name: def.name.to_string(),
            family: def.family.clone(),
            factor: def.factor,
        });
    }
    COUNTED
        .iter()
        .find(|(_, aliases)| aliases.contains(&lowered.as_str()))
        .map(|(name, _)| Unit {
            name: name.to_string(),
            family: UnitFamily::Count(name.to_string()),
            factor: 1.0,
        })
}

/// Resolve any unit string; unknown units become their own counted family.
pub fn resolve_unit(raw: Option<&str>) -> Unit {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Unit::unitless();
    };
    lookup_unit(raw).unwrap_or_else(|| {
        let name = singularize(&raw.to_lowercase());
        Unit {
            family: UnitFamily::Count(name.clone()),
            name,
            factor: 1.0,
        }
    })
}

/// Express a base-unit total in the best unit of its family.
pub fn best_unit(family: &UnitFamily, base_total: f64) -> Option<(&'static str, f64)> {
    let ladder = family.ladder();
    let factor_of = |name: &str| {
        MEASURED
            .iter()
            .find(|d| d.name == name)
            .map(|d| d.factor)
            .unwrap_or(1.0)
    };
    ladder
        .iter()
        .map(|(name, min)| (*name, base_total / factor_of(name), *min))
        .find(|(_, value, min)| *value >= *min)
        .map(|(name, value, _)| (name, value))
}

/// Singular form of the last word, good enough for shopping-list keys.
pub fn singularize(word: &str) -> String {
    let w = word.trim();
    if w.len() <= 3 || w.ends_with("ss") || w.ends_with("us") || w.ends_with("is") {
        return w.to_string();
    }
    if let Some(stem) = w.strip_suffix("ies") {
        return format!("{stem}y");
    }
    if let Some(stem) = w.strip_suffix("oes") {
        return format!("{stem}o");
    }
    for suffix in ["ches", "shes", "xes"] {
        if w.ends_with(suffix) {
            return w[..w.len() - 2].to_string();
        }
    }
    match w.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => w.to_string(),
    }
}

pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if ["tomato", "potato"].iter().any(|w| lower.ends_with(w)) {
        return format!("{word}es");
    }
    if ["ch", "sh", "x", "s", "z"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    let mut chars = lower.chars().rev();
    if let (Some('y'), Some(prev)) = (chars.next(), chars.next())
        && !"aeiou".contains(prev)
    {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    format!("{word}s")
}

/// Display form of a unit for the given amount.
pub fn unit_label(unit: &str, quantity: f64) -> String {
    const ABBREVIATED: &[&str] = &["tsp", "tbsp", "fl oz", "oz", "lb", "g", "kg", "ml", "l"];
    if quantity <= 1.0 || ABBREVIATED.contains(&unit) {
        unit.to_string()
    } else {
        pluralize(unit)
    }
}

/// Render a quantity as a mixed fraction to the nearest eighth (thirds kept),
/// or as a short decimal for metric units.
pub fn format_quantity(quantity: f64, family: &UnitFamily) -> String {
    if family.is_metric() {
        return if quantity >= 10.0 {
            format!("{}", quantity.round() as i64)
        } else {
            let s = format!("{:.1}", quantity);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        };
    }

    let mut whole = quantity.trunc() as i64;
    let frac = quantity - quantity.trunc();
    let fraction = if (frac - 1.0 / 3.0).abs() < 0.04 {
        Some("1/3")
    } else if (frac - 2.0 / 3.0).abs() < 0.04 {
        Some("2/3")
    } else {
        match (frac * 8.0).round() as i64 {
            0 => None,
            1 => Some("1/8"),
            2 => Some("1/4"),
            3 => Some("3/8"),
            4 => Some("1/2"),
            5 => Some("5/8"),
            6 => Some("3/4"),
            7 => Some("7/8"),
            _ => {
                whole += 1;
                None
            }
        }
    };

    match (whole, fraction) {
        (0, None) if quantity > 0.0 => "1/8".to_string(),
        (w, None) => w.to_string(),
        (0, Some(f)) => f.to_string(),
        (w, Some(f)) => format!("{w} {f}"),
    }
}
