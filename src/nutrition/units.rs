//! Quantity parsing and gram conversion

use crate::recipe::Amount;
use once_cell::sync::Lazy;
use regex::Regex;

/// Grams assumed when nothing better is known
pub const DEFAULT_GRAMS: f64 = 100.0;

static QUANTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d+(?:\.\d+)?(?:/\d+(?:\.\d+)?)?)\s*(kg|g|ml|l|L|개|컵|큰술|작은술)")
        .expect("Valid regex pattern")
});

static EMBEDDED_COUNT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]+[가-힣]*\s*").expect("Valid regex pattern"));

/// Grams per one unit, for the units the converter knows
pub fn grams_per_unit(unit: &str) -> Option<f64> {
    match unit.trim() {
        "g" => Some(1.0),
        "kg" => Some(1000.0),
        "ml" => Some(1.0),
        "l" | "L" => Some(1000.0),
        "개" => Some(100.0),
        "컵" => Some(200.0),
        "큰술" => Some(15.0),
        "작은술" => Some(5.0),
        _ => None,
    }
}

/// Parse `2`, `1.5` or `1/2`
pub fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let value = match text.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => text.parse().ok()?,
    };
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Ingredient name and gram weight read from a free-text line
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIngredient {
    pub name: String,
    pub grams: f64,
}

/// Split `"두부 300g"` into name and grams; no quantity means 100 g
pub fn parse_ingredient_text(text: &str) -> ParsedIngredient {
    if let Some(caps) = QUANTITY.captures(text) {
        let quantity = parse_number(&caps[1]);
        let per_unit = grams_per_unit(&caps[2]);
        if let (Some(quantity), Some(per_unit)) = (quantity, per_unit) {
            let name = QUANTITY.replace(text, "");
            return ParsedIngredient {
                name: collapse_whitespace(&name),
                grams: quantity * per_unit,
            };
        }
    }
    ParsedIngredient {
        name: collapse_whitespace(text),
        grams: DEFAULT_GRAMS,
    }
}

/// Gram weight of a structured `{amount, unit}` pair
///
/// Non-numeric amounts count as one unit and unknown units as 100 g each.
pub fn grams_for(amount: &Amount, unit: &str) -> f64 {
    if unit.trim().is_empty() {
        if let Amount::Text(text) = amount {
            if QUANTITY.is_match(text) {
                return parse_ingredient_text(text).grams;
            }
        }
    }
    let quantity = match amount {
        Amount::Number(n) if n.is_finite() && *n >= 0.0 => *n,
        Amount::Number(_) => 1.0,
        Amount::Text(text) => parse_number(text).unwrap_or(1.0),
    };
    quantity * grams_per_unit(unit).unwrap_or(DEFAULT_GRAMS)
}

/// Strip embedded counts such as `"2개"` or `"300g"` from a name
pub fn clean_ingredient_name(name: &str) -> String {
    let without_units = QUANTITY.replace_all(name, "");
    let cleaned = EMBEDDED_COUNT.replace_all(&without_units, "");
    let cleaned = collapse_whitespace(&cleaned);
    if cleaned.is_empty() {
        collapse_whitespace(name)
    } else {
        cleaned
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
