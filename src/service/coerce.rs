//! Per-type coercion of inbound JSON values into typed field values.

use crate::config::FieldType;
use crate::schema::FieldValue;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::sync::OnceLock;

pub(crate) const MSG_REQUIRED: &str = "This field is required.";
pub(crate) const MSG_NULL: &str = "This field may not be null.";
pub(crate) const MSG_BLANK: &str = "This field may not be blank.";
const MSG_INTEGER: &str = "A valid integer is required.";
const MSG_NUMBER: &str = "A valid number is required.";
const MSG_STRING: &str = "Not a valid string.";
const MSG_EMAIL: &str = "Enter a valid email address.";
const MSG_URL: &str = "Enter a valid URL.";
const MSG_UUID: &str = "Must be a valid UUID.";
const MSG_BOOLEAN: &str = "Boolean type requires either true or false";
const MAX_STRING_LENGTH: usize = 1000;

const TRUE_TOKENS: [&str; 8] = ["true", "t", "True", "1", "yes", "YES", "Yes", "TRUE"];
const FALSE_TOKENS: [&str; 8] = ["false", "f", "False", "0", "no", "NO", "No", "FALSE"];

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@(?:localhost|[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*\.[A-Za-z]{2,63})$",
        )
        .expect("email pattern compiles")
    })
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:https?|ftps?)://(?:[^\s:@/]+(?::[^\s:@/]*)?@)?(?:localhost|\d{1,3}(?:\.\d{1,3}){3}|\[[0-9a-f:.]+\]|[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*\.[a-z]{2,63}\.?)(?::\d{1,5})?(?:[/?#]\S*)?$",
        )
        .expect("url pattern compiles")
    })
}

/// Parameters a coercion needs beyond the type tag.
pub(crate) struct CoerceParams<'a> {
    pub allow_blank: bool,
    pub format: Option<&'a str>,
    pub max_digits: u32,
    pub decimal_places: u32,
}

/// Coerce one present, non-null value. Errors are user-facing messages.
pub(crate) fn coerce(field_type: FieldType, value: &Value, params: &CoerceParams<'_>) -> Result<FieldValue, String> {
    match field_type {
        FieldType::Integer => coerce_integer(value),
        FieldType::Float => coerce_float(value),
        FieldType::String => coerce_text(value, params.allow_blank),
        FieldType::Email => coerce_pattern(value, params.allow_blank, email_re(), MSG_EMAIL),
        FieldType::Url => coerce_pattern(value, params.allow_blank, url_re(), MSG_URL),
        FieldType::Uuid => coerce_uuid(value),
        FieldType::Boolean => coerce_boolean(value),
        FieldType::DateTime => coerce_datetime(value, params.format.unwrap_or(DEFAULT_DATETIME_FORMAT)),
        FieldType::Date => coerce_date(value, params.format.unwrap_or(DEFAULT_DATE_FORMAT)),
        FieldType::Time => coerce_time(value, params.format.unwrap_or(DEFAULT_TIME_FORMAT)),
        FieldType::Decimal => coerce_decimal(value, params.max_digits, params.decimal_places),
        FieldType::Json => Ok(FieldValue::Json(value.clone())),
    }
}

pub(crate) const DEFAULT_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub(crate) const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
pub(crate) const DEFAULT_TIME_FORMAT: &str = "%H:%M:%S";

fn coerce_integer(value: &Value) -> Result<FieldValue, String> {
    let text = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(FieldValue::Integer(i));
            }
            n.to_string()
        }
        Value::String(s) if s.len() <= MAX_STRING_LENGTH => s.trim().to_string(),
        _ => return Err(MSG_INTEGER.into()),
    };
    // "12.0" and "12.000" are integers; "12.5" is not.
    let integral = match text.split_once('.') {
        Some((whole, frac)) if frac.chars().all(|c| c == '0') => whole,
        Some(_) => return Err(MSG_INTEGER.into()),
        None => text.as_str(),
    };
    integral
        .parse::<i64>()
        .map(FieldValue::Integer)
        .map_err(|_| MSG_INTEGER.into())
}

fn coerce_float(value: &Value) -> Result<FieldValue, String> {
    let f = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.len() <= MAX_STRING_LENGTH => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match f {
        Some(f) if f.is_finite() => Ok(FieldValue::Float(f)),
        _ => Err(MSG_NUMBER.into()),
    }
}

fn text_of(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(MSG_STRING.into()),
    }
}

fn coerce_text(value: &Value, allow_blank: bool) -> Result<FieldValue, String> {
    let s = text_of(value)?;
    if s.is_empty() && !allow_blank {
        return Err(MSG_BLANK.into());
    }
    Ok(FieldValue::Text(s))
}

fn coerce_pattern(value: &Value, allow_blank: bool, re: &Regex, message: &str) -> Result<FieldValue, String> {
    let s = text_of(value)?;
    if s.is_empty() {
        return if allow_blank {
            Ok(FieldValue::Text(s))
        } else {
            Err(MSG_BLANK.into())
        };
    }
    if !re.is_match(&s) {
        return Err(message.into());
    }
    Ok(FieldValue::Text(s))
}

/// Validates the format, then keeps the canonical string form (the store has no UUID type).
fn coerce_uuid(value: &Value) -> Result<FieldValue, String> {
    let s = match value {
        Value::String(s) => s.trim(),
        _ => return Err(MSG_UUID.into()),
    };
    uuid::Uuid::parse_str(s)
        .map(|u| FieldValue::Text(u.hyphenated().to_string()))
        .map_err(|_| MSG_UUID.into())
}

fn coerce_boolean(value: &Value) -> Result<FieldValue, String> {
    let parsed = match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) if TRUE_TOKENS.contains(&s.as_str()) => Some(true),
        Value::String(s) if FALSE_TOKENS.contains(&s.as_str()) => Some(false),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f == 1.0 => Some(true),
            Some(f) if f == 0.0 => Some(false),
            _ => None,
        },
        _ => None,
    };
    parsed.map(FieldValue::Boolean).ok_or_else(|| MSG_BOOLEAN.into())
}

/// Parses per `format` (RFC 3339 also accepted), then pins the wall-clock time to UTC.
/// Any offset in the input is discarded, not converted.
fn coerce_datetime(value: &Value, format: &str) -> Result<FieldValue, String> {
    let wrong = || format!("Datetime has wrong format. Use one of these formats instead: {}.", format);
    let s = value.as_str().map(str::trim).ok_or_else(wrong)?;
    let naive = DateTime::parse_from_str(s, format)
        .map(|d| d.naive_local())
        .or_else(|_| NaiveDateTime::parse_from_str(s, format))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|d| d.naive_local()))
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map_err(|_| wrong())?;
    Ok(FieldValue::DateTime(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc)))
}

fn coerce_date(value: &Value, format: &str) -> Result<FieldValue, String> {
    let wrong = || format!("Date has wrong format. Use one of these formats instead: {}.", format);
    let s = value.as_str().map(str::trim).ok_or_else(wrong)?;
    NaiveDate::parse_from_str(s, format)
        .map(FieldValue::Date)
        .map_err(|_| wrong())
}

fn coerce_time(value: &Value, format: &str) -> Result<FieldValue, String> {
    let wrong = || format!("Time has wrong format. Use one of these formats instead: {}.", format);
    let s = value.as_str().map(str::trim).ok_or_else(wrong)?;
    NaiveTime::parse_from_str(s, format)
        .map(FieldValue::Time)
        .map_err(|_| wrong())
}

fn coerce_decimal(value: &Value, max_digits: u32, decimal_places: u32) -> Result<FieldValue, String> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) if s.len() <= MAX_STRING_LENGTH => s.trim().to_string(),
        _ => return Err(MSG_NUMBER.into()),
    };
    let mut d = Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| MSG_NUMBER.to_string())?;
    check_precision(&d, max_digits, decimal_places)?;
    d.rescale(decimal_places);
    Ok(FieldValue::Decimal(d))
}

fn check_precision(d: &Decimal, max_digits: u32, decimal_places: u32) -> Result<(), String> {
    let digits = d.mantissa().unsigned_abs().to_string().len() as u32;
    let scale = d.scale();
    let (total, decimals) = if scale > digits { (scale, scale) } else { (digits, scale) };
    let whole = total - decimals;
    let max_whole = max_digits.saturating_sub(decimal_places);
    if total > max_digits {
        return Err(format!(
            "Ensure that there are no more than {} digits in total.",
            max_digits
        ));
    }
    if decimals > decimal_places {
        return Err(format!(
            "Ensure that there are no more than {} decimal places.",
            decimal_places
        ));
    }
    if whole > max_whole {
        return Err(format!(
            "Ensure that there are no more than {} digits before the decimal point.",
            max_whole
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use serde_json::json;

    fn params() -> CoerceParams<'static> {
        CoerceParams {
            allow_blank: false,
            format: None,
            max_digits: 10,
            decimal_places: 8,
        }
    }

    #[test]
    fn test_boolean_true_tokens() {
        for token in TRUE_TOKENS {
            assert_eq!(coerce_boolean(&json!(token)), Ok(FieldValue::Boolean(true)), "{}", token);
        }
        assert_eq!(coerce_boolean(&json!(1)), Ok(FieldValue::Boolean(true)));
        assert_eq!(coerce_boolean(&json!(true)), Ok(FieldValue::Boolean(true)));
    }

    #[test]
    fn test_boolean_false_tokens() {
        for token in FALSE_TOKENS {
            assert_eq!(coerce_boolean(&json!(token)), Ok(FieldValue::Boolean(false)), "{}", token);
        }
        assert_eq!(coerce_boolean(&json!(0)), Ok(FieldValue::Boolean(false)));
    }

    #[test]
    fn test_boolean_rejects_other_tokens() {
        for bad in [json!("y"), json!("n"), json!("tRuE"), json!(""), json!(2), json!(-1), json!([]), json!({})] {
            assert_eq!(coerce_boolean(&bad), Err(MSG_BOOLEAN.to_string()), "{}", bad);
        }
    }

    #[test]
    fn test_integer_accepts_integral_forms() {
        assert_eq!(coerce_integer(&json!(7)), Ok(FieldValue::Integer(7)));
        assert_eq!(coerce_integer(&json!("  42 ")), Ok(FieldValue::Integer(42)));
        assert_eq!(coerce_integer(&json!("12.00")), Ok(FieldValue::Integer(12)));
        assert_eq!(coerce_integer(&json!(3.0)), Ok(FieldValue::Integer(3)));
        assert!(coerce_integer(&json!("12.5")).is_err());
        assert!(coerce_integer(&json!(true)).is_err());
        assert!(coerce_integer(&json!("abc")).is_err());
    }

    #[test]
    fn test_float_rejects_non_numbers() {
        assert_eq!(coerce_float(&json!("1.5")), Ok(FieldValue::Float(1.5)));
        assert!(coerce_float(&json!("inf")).is_err());
        assert!(coerce_float(&json!(false)).is_err());
    }

    #[test]
    fn test_text_trims_and_blank_rules() {
        assert_eq!(coerce_text(&json!("  hi "), false), Ok(FieldValue::Text("hi".into())));
        assert_eq!(coerce_text(&json!(12), false), Ok(FieldValue::Text("12".into())));
        assert_eq!(coerce_text(&json!("   "), false), Err(MSG_BLANK.to_string()));
        assert_eq!(coerce_text(&json!(""), true), Ok(FieldValue::Text(String::new())));
        assert_eq!(coerce_text(&json!(true), true), Err(MSG_STRING.to_string()));
    }

    #[test]
    fn test_email_and_url() {
        let p = params();
        assert!(coerce(FieldType::Email, &json!("a.b@example.com"), &p).is_ok());
        assert_eq!(coerce(FieldType::Email, &json!("nope"), &p), Err(MSG_EMAIL.to_string()));
        assert!(coerce(FieldType::Url, &json!("https://example.com/a?b=1"), &p).is_ok());
        assert!(coerce(FieldType::Url, &json!("http://localhost:8080"), &p).is_ok());
        assert_eq!(coerce(FieldType::Url, &json!("example com"), &p), Err(MSG_URL.to_string()));
    }

    #[test]
    fn test_uuid_becomes_string() {
        let v = coerce_uuid(&json!("936DA01F-9ABD-4D9D-80C7-02AF85C822A8")).unwrap();
        assert_eq!(v, FieldValue::Text("936da01f-9abd-4d9d-80c7-02af85c822a8".into()));
        assert_eq!(coerce_uuid(&json!("not-a-uuid")), Err(MSG_UUID.to_string()));
    }

    #[test]
    fn test_datetime_default_format_is_utc() {
        let v = coerce_datetime(&json!("2024-03-01 10:30:00"), DEFAULT_DATETIME_FORMAT).unwrap();
        assert_eq!(v, FieldValue::DateTime(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()));
    }

    #[test]
    fn test_datetime_offset_is_overwritten_not_converted() {
        let fmt = "%Y-%m-%dT%H:%M:%S%:z";
        let v = coerce_datetime(&json!("2024-03-01T10:30:00+05:00"), fmt).unwrap();
        match v {
            FieldValue::DateTime(d) => {
                assert_eq!(d.hour(), 10);
                assert_eq!(d.timezone(), Utc);
            }
            other => panic!("unexpected {:?}", other),
        }
        let v = coerce_datetime(&json!("2024-03-01T10:30:00-08:00"), DEFAULT_DATETIME_FORMAT).unwrap();
        assert_eq!(v, FieldValue::DateTime(Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap()));
    }

    #[test]
    fn test_datetime_wrong_format() {
        let err = coerce_datetime(&json!("03/01/2024"), DEFAULT_DATETIME_FORMAT).unwrap_err();
        assert!(err.starts_with("Datetime has wrong format"));
        assert!(coerce_datetime(&json!(12), DEFAULT_DATETIME_FORMAT).is_err());
    }

    #[test]
    fn test_date_and_time_formats() {
        assert_eq!(
            coerce_date(&json!("01-23-2019"), "%m-%d-%Y"),
            Ok(FieldValue::Date(NaiveDate::from_ymd_opt(2019, 1, 23).unwrap()))
        );
        assert_eq!(
            coerce_time(&json!("12:10:30"), DEFAULT_TIME_FORMAT),
            Ok(FieldValue::Time(NaiveTime::from_hms_opt(12, 10, 30).unwrap()))
        );
        assert!(coerce_time(&json!("25:00:00"), DEFAULT_TIME_FORMAT).is_err());
    }

    #[test]
    fn test_decimal_precision() {
        let v = coerce_decimal(&json!("1.5"), 10, 8).unwrap();
        assert_eq!(v, FieldValue::Decimal(Decimal::from_str("1.50000000").unwrap()));
        if let FieldValue::Decimal(d) = v {
            assert_eq!(d.to_string(), "1.50000000");
        }
        assert_eq!(
            coerce_decimal(&json!("1.123"), 5, 2),
            Err("Ensure that there are no more than 2 decimal places.".to_string())
        );
        assert_eq!(
            coerce_decimal(&json!("12345.1"), 5, 2),
            Err("Ensure that there are no more than 5 digits in total.".to_string())
        );
        assert_eq!(
            coerce_decimal(&json!("1234.1"), 5, 2),
            Err("Ensure that there are no more than 3 digits before the decimal point.".to_string())
        );
        assert_eq!(coerce_decimal(&json!("abc"), 5, 2), Err(MSG_NUMBER.to_string()));
        assert!(coerce_decimal(&json!(2.25), 5, 2).is_ok());
    }
}
