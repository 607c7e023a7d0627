//! Serde helpers for upstream payloads, which are loose about scalar types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// A string that may arrive as a JSON number.
pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    scalar_text(Value::deserialize(d)?)
        .ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}

/// Like [`text`], but null and absent become `None`.
pub fn opt_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<Value>::deserialize(d)?.and_then(scalar_text))
}

/// A year given as `2024` or `"2024"`.
pub fn year<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    text(d)?
        .trim()
        .parse()
        .map_err(|_| serde::de::Error::custom("invalid year"))
}

/// RFC 3339, or a zone-less timestamp taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_timestamps() {
        let expected = Utc.with_ymd_and_hms(2024, 4, 1, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-04-01T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-04-01T03:00:00-07:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-04-01T10:00:00.000"), Some(expected));
        assert_eq!(parse_timestamp("April"), None);
    }
}
