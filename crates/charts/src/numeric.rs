//! Reading chart values out of extracted strings. Extraction keeps every
//! value as text; this is the only place numbers are parsed.

// Longest first so "bn" is not read as "b"
const SCALE_SUFFIXES: &[(&str, f64)] = &[
    ("billion", 1e9),
    ("million", 1e6),
    ("thousand", 1e3),
    ("bn", 1e9),
    ("mn", 1e6),
    ("k", 1e3),
    ("m", 1e6),
    ("b", 1e9),
];

/// Parse a display value such as "$1,200.50", "12%", "4.5M" or "(30)".
/// Scale suffixes are applied, so "$1.2B" and "$800M" land on one axis.
pub fn parse_number(raw: &str) -> Option<f64> {
    let mut s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let negative = s.starts_with('(') && s.ends_with(')');
    if negative {
        s = s[1..s.len() - 1].trim();
    }

    s = s.trim_start_matches(['$', '€', '£', '¥']).trim();
    s = s.trim_end_matches('%').trim();

    let lowered = s.to_ascii_lowercase();
    let mut scale = 1.0;
    for (suffix, multiplier) in SCALE_SUFFIXES {
        if lowered.ends_with(suffix) && lowered.len() > suffix.len() {
            s = s[..s.len() - suffix.len()].trim();
            scale = *multiplier;
            break;
        }
    }

    let cleaned: String = s.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    let value = cleaned.parse::<f64>().ok()? * scale;
    if !value.is_finite() {
        return None;
    }
    Some(if negative { -value } else { value })
}

pub fn is_percentage(raw: &str) -> bool {
    raw.trim().ends_with('%')
}

/// Every cell parsed, or `None` if any cell is not a number.
pub fn parse_all<'a>(cells: impl IntoIterator<Item = &'a str>) -> Option<Vec<f64>> {
    cells.into_iter().map(parse_number).collect()
}
