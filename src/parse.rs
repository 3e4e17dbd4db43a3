//! Parsing utilities for scalar configuration text
//!
//! Every leaf of a value tree is text. These helpers turn that text into the
//! scalar a field expects, and format scalars back into canonical text.

/// Parse boolean text
///
/// Returns `None` if the text is not a recognized boolean.
///
/// # Supported formats
/// - `"true"` / `"1"` - true
/// - `"false"` / `"0"` - false
///
/// Matching is ASCII case-insensitive and ignores surrounding whitespace.
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// Parse signed decimal integer text (e.g., `"46"`, `"-1"`)
pub fn parse_int(s: &str) -> Option<i64> {
    s.trim().parse::<i64>().ok()
}

/// Parse decimal number text (e.g., `"9"`, `"6.5"`)
///
/// Rejects `NaN` and infinities, which have no place on a severity scale.
pub fn parse_float(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Format a float without forced trailing zeros
///
/// `9.0` formats as `"9"`, `6.5` as `"6.5"`. The output is the shortest text
/// that parses back to the same value.
pub fn format_float(n: f64) -> String {
    format!("{}", n)
}

/// Format a boolean as `"true"` or `"false"`
pub fn format_bool(b: bool) -> String {
    if b { "true" } else { "false" }.to_string()
}
