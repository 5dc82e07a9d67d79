//! Attribute casting
//!
//! Casts are applied when an attribute is read or serialized. Stored values
//! are never rewritten, so the dirty check always compares raw values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::{Number, Value};

/// Target type of an attribute cast
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastKind {
    Int,
    Float,
    Str,
    Bool,
    Array,
    Json,
    Date,
}

impl CastKind {
    /// Convert a raw attribute value; `Null` always stays `Null`
    pub fn apply(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }

        match self {
            CastKind::Int => cast_int(value),
            CastKind::Float => cast_float(value),
            CastKind::Str => cast_str(value),
            CastKind::Bool => Value::Bool(cast_bool(value)),
            CastKind::Array => cast_structured(value, Value::is_array),
            CastKind::Json => cast_structured(value, |_| true),
            CastKind::Date => cast_date(value),
        }
    }
}

fn cast_int(value: &Value) -> Value {
    let int = match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f.trunc() as i64))
        }
        Value::Bool(b) => Some(i64::from(*b)),
        _ => None,
    };

    int.map(Value::from).unwrap_or(Value::Null)
}

fn cast_float(value: &Value) -> Value {
    let float = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };

    float
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

fn cast_str(value: &Value) -> Value {
    match value {
        Value::String(_) => value.clone(),
        other => Value::String(other.to_string()),
    }
}

fn cast_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => {
            let s = s.trim();
            !(s.is_empty() || s == "0" || s.eq_ignore_ascii_case("false"))
        }
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::Null => false,
    }
}

// Text columns holding JSON are decoded; anything unparseable becomes Null
fn cast_structured(value: &Value, accept: fn(&Value) -> bool) -> Value {
    match value {
        Value::String(s) => serde_json::from_str::<Value>(s)
            .ok()
            .filter(accept)
            .unwrap_or(Value::Null),
        other if accept(other) => other.clone(),
        _ => Value::Null,
    }
}

fn cast_date(value: &Value) -> Value {
    let parsed = match value {
        Value::String(s) => parse_datetime(s.trim()),
        Value::Number(n) => n.as_i64().and_then(|secs| Utc.timestamp_opt(secs, 0).single()),
        _ => None,
    };

    match parsed {
        Some(datetime) => Value::String(datetime.to_rfc3339_opts(SecondsFormat::Secs, true)),
        None => value.clone(),
    }
}

/// Parse the date formats SQLite commonly stores
pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(s) {
        return Some(datetime.with_timezone(&Utc));
    }

    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Current UTC time in the format written to timestamp columns
pub fn fresh_timestamp() -> Value {
    Value::String(Utc::now().format("%Y-%m-%d %H:%M:%S").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_null_stays_null() {
        for kind in [
            CastKind::Int,
            CastKind::Float,
            CastKind::Str,
            CastKind::Bool,
            CastKind::Array,
            CastKind::Json,
            CastKind::Date,
        ] {
            assert_eq!(kind.apply(&Value::Null), Value::Null, "{:?}", kind);
        }
    }

    #[test]
    fn test_numeric_casts_parse_text() {
        assert_eq!(CastKind::Int.apply(&json!("30")), json!(30));
        assert_eq!(CastKind::Int.apply(&json!(" 7.9 ")), json!(7));
        assert_eq!(CastKind::Int.apply(&json!("abc")), Value::Null);
        assert_eq!(CastKind::Float.apply(&json!("2.5")), json!(2.5));
        assert_eq!(CastKind::Float.apply(&json!(3)), json!(3.0));
    }

    #[test]
    fn test_bool_cast() {
        assert_eq!(CastKind::Bool.apply(&json!(1)), json!(true));
        assert_eq!(CastKind::Bool.apply(&json!(0)), json!(false));
        assert_eq!(CastKind::Bool.apply(&json!("0")), json!(false));
        assert_eq!(CastKind::Bool.apply(&json!("")), json!(false));
        assert_eq!(CastKind::Bool.apply(&json!("FALSE")), json!(false));
        assert_eq!(CastKind::Bool.apply(&json!("yes")), json!(true));
    }

    #[test]
    fn test_structured_casts_decode_text() {
        assert_eq!(CastKind::Array.apply(&json!("[1,2]")), json!([1, 2]));
        assert_eq!(CastKind::Array.apply(&json!("{\"a\":1}")), Value::Null);
        assert_eq!(CastKind::Json.apply(&json!("{\"a\":1}")), json!({"a": 1}));
        assert_eq!(CastKind::Json.apply(&json!("not json")), Value::Null);
    }

    #[test]
    fn test_date_cast() {
        assert_eq!(
            CastKind::Date.apply(&json!("2024-03-01 12:30:00")),
            json!("2024-03-01T12:30:00Z")
        );
        assert_eq!(CastKind::Date.apply(&json!("2024-03-01")), json!("2024-03-01T00:00:00Z"));
        assert_eq!(CastKind::Date.apply(&json!("someday")), json!("someday"));
    }

    #[test]
    fn test_str_cast() {
        assert_eq!(CastKind::Str.apply(&json!(42)), json!("42"));
        assert_eq!(CastKind::Str.apply(&json!("x")), json!("x"));
    }
}
