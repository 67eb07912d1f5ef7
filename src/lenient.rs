//! Loose readers for values that come back from the store.
//!
//! Records written by older clients keep whatever the user typed, so a money
//! field may arrive as `120.5`, `"120.50"`, `"120,50"`, `""` or `null`. These
//! helpers turn that into typed values and treat anything unreadable as absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parses the leading numeric part of `text`, accepting `,` as the decimal mark.
///
/// `"12.5kg"` reads as `12.5`, `"abc"` as `None`.
pub fn parse_amount_text(text: &str) -> Option<f64> {
    let normalized = text.trim().replace(',', ".");
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (idx, ch) in normalized.char_indices() {
        match ch {
            '+' | '-' if idx == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = idx + ch.len_utf8();
    }
    if !seen_digit {
        return None;
    }
    normalized[..end]
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Parses the leading integer part of `text` (`"10A"` reads as `10`).
pub fn parse_int_prefix(text: &str) -> Option<i64> {
    let trimmed = text.trim();
    let (sign, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let end = digits
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map(|(idx, _)| idx)
        .unwrap_or(digits.len());
    digits[..end].parse::<i64>().ok().map(|value| value * sign)
}

pub fn amount_value(value: Option<&Value>) -> Option<f64> {
    match value {
        Some(Value::Number(number)) => number.as_f64().filter(|v| v.is_finite()),
        Some(Value::String(text)) => parse_amount_text(text),
        _ => None,
    }
}

pub fn text_value(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        _ => None,
    }
}

/// Reads a quantity; negative, fractional-garbage or unreadable input gives `None`.
pub fn quantity_value(value: &Value) -> Option<u32> {
    let parsed = match value {
        Value::Number(number) => {
            if let Some(n) = number.as_i64() {
                Some(n)
            } else if let Some(n) = number.as_u64() {
                i64::try_from(n).ok()
            } else {
                number.as_f64().map(|n| n.round() as i64)
            }
        }
        Value::String(text) => parse_int_prefix(text),
        _ => None,
    }?;
    u32::try_from(parsed).ok()
}

pub fn timestamp_value(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let text = value?.as_str()?;
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|parsed| parsed.with_timezone(&Utc))
}

/// Trims, strips control characters and caps the length in characters.
pub fn clean_text(value: &str, max_len: usize) -> String {
    value
        .trim()
        .chars()
        .filter(|ch| {
            let code = *ch as u32;
            code >= 32 && code != 127
        })
        .take(max_len)
        .collect()
}

pub fn amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(amount_value(value.as_ref()))
}

pub fn amount_or_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(amount(deserializer)?.unwrap_or(0.0))
}

pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(text_value(value.as_ref()).filter(|text| !text.is_empty()))
}

pub fn text_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(text(deserializer)?.unwrap_or_default())
}

pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(timestamp_value(value.as_ref()))
}

/// Like `#[serde(default)]`, but an explicit `null` also falls back to the default.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Identifiers are uuids on the hosted store but integers on some older tables.
pub fn id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    text_or_empty(deserializer)
}

pub fn optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    text(deserializer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn amount_text_accepts_comma_and_trailing_garbage() {
        assert_eq!(parse_amount_text("120,50"), Some(120.5));
        assert_eq!(parse_amount_text(" 12.5kg"), Some(12.5));
        assert_eq!(parse_amount_text("7."), Some(7.0));
        assert_eq!(parse_amount_text(".5"), Some(0.5));
        assert_eq!(parse_amount_text("abc"), None);
        assert_eq!(parse_amount_text(""), None);
        assert_eq!(parse_amount_text("."), None);
    }

    #[test]
    fn int_prefix_matches_leading_digits() {
        assert_eq!(parse_int_prefix("10"), Some(10));
        assert_eq!(parse_int_prefix("10A"), Some(10));
        assert_eq!(parse_int_prefix("-3"), Some(-3));
        assert_eq!(parse_int_prefix("GG"), None);
        assert_eq!(parse_int_prefix(""), None);
    }

    #[test]
    fn amount_value_handles_loose_shapes() {
        assert_eq!(amount_value(Some(&json!(10))), Some(10.0));
        assert_eq!(amount_value(Some(&json!("99.90"))), Some(99.9));
        assert_eq!(amount_value(Some(&json!(""))), None);
        assert_eq!(amount_value(Some(&json!(null))), None);
        assert_eq!(amount_value(Some(&json!([1]))), None);
        assert_eq!(amount_value(None), None);
    }

    #[test]
    fn quantity_value_rejects_negative() {
        assert_eq!(quantity_value(&json!(4)), Some(4));
        assert_eq!(quantity_value(&json!("12")), Some(12));
        assert_eq!(quantity_value(&json!(2.6)), Some(3));
        assert_eq!(quantity_value(&json!(-1)), None);
        assert_eq!(quantity_value(&json!("x")), None);
        assert_eq!(quantity_value(&json!(null)), None);
    }

    #[test]
    fn timestamp_value_reads_offsets() {
        let parsed = timestamp_value(Some(&json!("2025-03-01T10:00:00.123456+00:00")));
        assert!(parsed.is_some());
        let shifted = timestamp_value(Some(&json!("2025-03-01T10:00:00-03:00")))
            .map(|ts| ts.to_rfc3339());
        assert_eq!(shifted.as_deref(), Some("2025-03-01T13:00:00+00:00"));
        assert_eq!(timestamp_value(Some(&json!("yesterday"))), None);
    }

    #[test]
    fn clean_text_strips_controls_and_caps_length() {
        assert_eq!(clean_text("  Escola\u{7}  Centro ", 80), "Escola  Centro");
        assert_eq!(clean_text("Calça", 3), "Cal");
    }
}
