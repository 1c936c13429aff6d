//! Shared JSON field helpers used by all exchange parsers.
//!
//! Exchanges encode numbers either as JSON strings (`"30000.5"`) or as native
//! numbers (`30000.5`). With `serde_json`'s `arbitrary_precision` feature a
//! native number keeps its lexical form, so both shapes become the same
//! decimal string without a round trip through `f64`.

use serde_json::Value;

/// Read a string-or-number value as its decimal text.
#[inline]
pub fn decimal_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Read a string-or-number value as `i64`.
#[inline]
pub fn parse_i64(v: Option<&Value>) -> Option<i64> {
    let v = v?;
    if let Some(s) = v.as_str() { s.parse().ok() } else { v.as_i64() }
}

/// Read a string-or-number value as an identifier string.
#[inline]
pub fn id_string(v: Option<&Value>) -> Option<String> {
    match v? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Shorten a payload for log lines.
pub fn preview(text: &str) -> String {
    const MAX: usize = 160;
    if text.len() <= MAX {
        return text.to_string();
    }
    let mut end = MAX;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_keep_their_lexical_form() {
        let v: Value = serde_json::from_str(r#"{"p":401.74000,"q":"0.0010","n":2}"#).unwrap();
        assert_eq!(decimal_string(v.get("p")).as_deref(), Some("401.74000"));
        assert_eq!(decimal_string(v.get("q")).as_deref(), Some("0.0010"));
        assert_eq!(decimal_string(v.get("n")).as_deref(), Some("2"));
        assert_eq!(decimal_string(v.get("missing")), None);
    }

    #[test]
    fn large_mantissa_is_not_rounded() {
        let v: Value = serde_json::from_str(r#"{"p":0.123456789012345678901}"#).unwrap();
        assert_eq!(decimal_string(v.get("p")).as_deref(), Some("0.123456789012345678901"));
    }

    #[test]
    fn integers_from_strings_or_numbers() {
        let v: Value = serde_json::from_str(r#"{"a":"1700000000000","b":42,"c":"x"}"#).unwrap();
        assert_eq!(parse_i64(v.get("a")), Some(1_700_000_000_000));
        assert_eq!(parse_i64(v.get("b")), Some(42));
        assert_eq!(parse_i64(v.get("c")), None);
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let long = "é".repeat(200);
        let p = preview(&long);
        assert!(p.ends_with("..."));
        assert!(p.len() <= 163);
    }
}
