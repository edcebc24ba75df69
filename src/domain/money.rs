// Parsing of human-formatted currency and markup text

use once_cell::sync::Lazy;
use regex::Regex;

/// Tolerance under which an amount counts as zero
pub const ZERO_TOLERANCE: f64 = 0.005;

static CURRENCY_SHAPE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\(?[-+]?\s*[$€£]?\s*[-+]?(\d{1,3}(,\d{3})+|\d+)(\.\d+)?\)?-?$").unwrap()
});

/// Outcome of reading a money cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MoneyCell {
    Blank,
    Amount { magnitude: f64, negative: bool },
    Unparseable,
}

impl MoneyCell {
    /// Magnitude used for cost math; blank and unparseable count as zero
    pub fn magnitude(&self) -> f64 {
        match self {
            MoneyCell::Amount { magnitude, .. } => *magnitude,
            _ => 0.0,
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, MoneyCell::Amount { negative: true, .. })
    }
}

/// Outcome of reading a markup cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentCell {
    Blank,
    Fraction { value: f64, negative: bool },
    Unparseable,
}

impl PercentCell {
    pub fn fraction(&self) -> Option<f64> {
        match self {
            PercentCell::Fraction { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Round to cents, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn is_zero(value: f64) -> bool {
    value.abs() < ZERO_TOLERANCE
}

/// Parse a money cell such as `$10,000.00`, `(1,250)` or `-300`.
///
/// Signs and parentheses only set the `negative` flag; the magnitude is
/// always positive. Accounting dashes (`-`, `$ -`) read as zero.
pub fn parse_money(raw: &str) -> MoneyCell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return MoneyCell::Blank;
    }

    let (body, mut negative) = strip_parens(trimmed);

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | '¥' | ',') && !c.is_whitespace())
        .collect();

    if matches!(cleaned.as_str(), "" | "-" | "–" | "—") {
        return MoneyCell::Amount {
            magnitude: 0.0,
            negative: false,
        };
    }

    let (digits, signed) = strip_sign(&cleaned);
    negative |= signed;

    match parse_unsigned_decimal(digits) {
        Some(magnitude) => MoneyCell::Amount {
            magnitude,
            negative: negative && magnitude > 0.0,
        },
        None => MoneyCell::Unparseable,
    }
}

/// Parse a markup cell into a fraction.
///
/// `25%`, `25` and `0.25` all read as 0.25. Bare values above 1 are taken
/// as percentages; a bare `1` stays 1.0.
pub fn parse_percent(raw: &str) -> PercentCell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return PercentCell::Blank;
    }

    let (body, mut negative) = strip_parens(trimmed);
    let has_percent_sign = body.contains('%');

    let cleaned: String = body
        .chars()
        .filter(|c| *c != '%' && !c.is_whitespace())
        .collect();

    let (digits, signed) = strip_sign(&cleaned);
    negative |= signed;

    let Some(value) = parse_unsigned_decimal(digits) else {
        return PercentCell::Unparseable;
    };

    let fraction = if has_percent_sign || value > 1.0 {
        value / 100.0
    } else {
        value
    };

    PercentCell::Fraction {
        value: fraction,
        negative: negative && fraction > 0.0,
    }
}

/// Whether a cell looks like a currency amount (data rather than a header label)
pub fn is_currency_shaped(raw: &str) -> bool {
    let trimmed = raw.trim();
    !trimmed.is_empty() && CURRENCY_SHAPE_PATTERN.is_match(trimmed)
}

fn strip_parens(value: &str) -> (&str, bool) {
    match value.strip_prefix('(').and_then(|v| v.strip_suffix(')')) {
        Some(inner) => (inner.trim(), true),
        None => (value, false),
    }
}

fn strip_sign(value: &str) -> (&str, bool) {
    if let Some(rest) = value.strip_prefix('-') {
        (rest, true)
    } else if let Some(rest) = value.strip_prefix('+') {
        (rest, false)
    } else if let Some(rest) = value.strip_suffix('-') {
        (rest, true)
    } else {
        (value, false)
    }
}

/// Digits with at most one decimal point; rejects `nan`, `inf` and exponents
fn parse_unsigned_decimal(value: &str) -> Option<f64> {
    let mut seen_digit = false;
    let mut seen_dot = false;

    for c in value.chars() {
        match c {
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => return None,
        }
    }

    if !seen_digit {
        return None;
    }

    value.parse::<f64>().ok()
}
