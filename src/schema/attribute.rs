//! Store-level attribute values and the typed field values they carry.

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Persisted datetime layout: fixed width, so lexical order is chronological.
pub const STORED_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f+0000";
const STORED_DATETIME_PARSE: &str = "%Y-%m-%dT%H:%M:%S%.f%z";
pub const STORED_DATE_FORMAT: &str = "%Y-%m-%d";
pub const STORED_TIME_FORMAT: &str = "%H:%M:%S%.6f";
const STORED_TIME_PARSE: &str = "%H:%M:%S%.f";

/// A single attribute as the key-value store sees it, tagged the DynamoDB way
/// (`{"S": "..."}`, `{"N": "12"}`, `{"BOOL": true}`).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeValue {
    S(String),
    N(String),
    #[serde(rename = "BOOL")]
    Bool(bool),
    #[serde(rename = "NULL")]
    Null(bool),
    M(BTreeMap<String, AttributeValue>),
    L(Vec<AttributeValue>),
}

impl AttributeValue {
    pub fn as_s(&self) -> Option<&str> {
        match self {
            AttributeValue::S(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering used for key comparisons: numbers numerically, strings lexically.
    pub fn key_cmp(&self, other: &AttributeValue) -> Ordering {
        match (self, other) {
            (AttributeValue::N(a), AttributeValue::N(b)) => {
                match (Decimal::from_str(a), Decimal::from_str(b)) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    _ => a.cmp(b),
                }
            }
            (AttributeValue::S(a), AttributeValue::S(b)) => a.cmp(b),
            (AttributeValue::Bool(a), AttributeValue::Bool(b)) => a.cmp(b),
            (a, b) => a.rank().cmp(&b.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            AttributeValue::Null(_) => 0,
            AttributeValue::Bool(_) => 1,
            AttributeValue::N(_) => 2,
            AttributeValue::S(_) => 3,
            AttributeValue::L(_) => 4,
            AttributeValue::M(_) => 5,
        }
    }
}

/// One stored item: attribute name -> value.
pub type Item = BTreeMap<String, AttributeValue>;

/// A value after validation/decoding, typed per field.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    DateTime(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Decimal(Decimal),
    Json(Value),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Integer(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "string",
            FieldValue::Boolean(_) => "boolean",
            FieldValue::DateTime(_) => "datetime",
            FieldValue::Date(_) => "date",
            FieldValue::Time(_) => "time",
            FieldValue::Decimal(_) => "decimal",
            FieldValue::Json(_) => "json",
        }
    }

    /// JSON rendering. `format` applies to temporal values; without it they use ISO 8601.
    pub fn to_json(&self, format: Option<&str>) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Integer(n) => Value::Number((*n).into()),
            FieldValue::Float(f) => serde_json::Number::from_f64(*f).map(Value::Number).unwrap_or(Value::Null),
            FieldValue::Text(s) => Value::String(s.clone()),
            FieldValue::Boolean(b) => Value::Bool(*b),
            FieldValue::DateTime(d) => Value::String(match format {
                Some(f) => d.format(f).to_string(),
                None => d.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            }),
            FieldValue::Date(d) => Value::String(d.format(format.unwrap_or(STORED_DATE_FORMAT)).to_string()),
            FieldValue::Time(t) => Value::String(t.format(format.unwrap_or("%H:%M:%S")).to_string()),
            FieldValue::Decimal(d) => Value::String(d.to_string()),
            FieldValue::Json(v) => v.clone(),
        }
    }

    /// Untyped conversion for attributes the model does not describe.
    pub fn from_untyped(value: &AttributeValue) -> FieldValue {
        match value {
            AttributeValue::S(s) => FieldValue::Text(s.clone()),
            AttributeValue::N(n) => n
                .parse::<i64>()
                .map(FieldValue::Integer)
                .or_else(|_| n.parse::<f64>().map(FieldValue::Float))
                .unwrap_or_else(|_| FieldValue::Text(n.clone())),
            AttributeValue::Bool(b) => FieldValue::Boolean(*b),
            AttributeValue::Null(_) => FieldValue::Null,
            AttributeValue::M(_) | AttributeValue::L(_) => FieldValue::Json(attribute_to_json(value)),
        }
    }
}

fn attribute_to_json(value: &AttributeValue) -> Value {
    match value {
        AttributeValue::M(m) => Value::Object(m.iter().map(|(k, v)| (k.clone(), attribute_to_json(v))).collect()),
        AttributeValue::L(l) => Value::Array(l.iter().map(attribute_to_json).collect()),
        other => FieldValue::from_untyped(other).to_json(None),
    }
}

pub(crate) fn format_stored_datetime(d: &DateTime<Utc>) -> String {
    d.format(STORED_DATETIME_FORMAT).to_string()
}

pub(crate) fn parse_stored_datetime(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_str(s, STORED_DATETIME_PARSE)
        .map(|d| d.with_timezone(&Utc))
        .or_else(|_| DateTime::parse_from_rfc3339(s).map(|d| d.with_timezone(&Utc)))
        .ok()
}

pub(crate) fn format_stored_time(t: &NaiveTime) -> String {
    t.format(STORED_TIME_FORMAT).to_string()
}

pub(crate) fn parse_stored_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, STORED_TIME_PARSE).ok()
}
