//! Raw config types matching the JSON resource definition.

use crate::error::SchemaError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

/// Closed set of field types a tenant may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Integer,
    Float,
    String,
    Boolean,
    Email,
    Url,
    Uuid,
    DateTime,
    Date,
    Time,
    Decimal,
    Json,
}

impl FieldType {
    pub const ALL: [FieldType; 12] = [
        FieldType::Integer,
        FieldType::Float,
        FieldType::String,
        FieldType::Boolean,
        FieldType::Email,
        FieldType::Url,
        FieldType::Uuid,
        FieldType::DateTime,
        FieldType::Date,
        FieldType::Time,
        FieldType::Decimal,
        FieldType::Json,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::String => "string",
            FieldType::Boolean => "boolean",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Uuid => "uuid",
            FieldType::DateTime => "datetime",
            FieldType::Date => "date",
            FieldType::Time => "time",
            FieldType::Decimal => "decimal",
            FieldType::Json => "json",
        }
    }

    /// url, string and email: may accept blank when optional.
    pub fn is_text_like(&self) -> bool {
        matches!(self, FieldType::String | FieldType::Email | FieldType::Url)
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        FieldType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == lower)
            .ok_or_else(|| SchemaError::UnsupportedType {
                field: String::new(),
                type_name: s.to_string(),
            })
    }
}

impl Serialize for FieldType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(|_| {
            serde::de::Error::custom(format!(
                "unsupported field type '{}' (expected one of: {})",
                s,
                FieldType::ALL.iter().map(FieldType::as_str).collect::<Vec<_>>().join(", ")
            ))
        })
    }
}

/// Decimal precision: total digits and digits after the point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precision {
    pub max_digits: u32,
    pub decimal_places: u32,
}

impl Default for Precision {
    fn default() -> Self {
        Precision {
            max_digits: 10,
            decimal_places: 8,
        }
    }
}

/// Declarative description of one data field.
#[derive(Clone, Debug, Serialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<Precision>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        FieldSpec {
            name: name.into(),
            field_type,
            required: false,
            format: None,
            precision: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_precision(mut self, max_digits: u32, decimal_places: u32) -> Self {
        self.precision = Some(Precision {
            max_digits,
            decimal_places,
        });
        self
    }

    /// Parse a field whose type arrives as free text; unknown names fail with the field attached.
    pub fn parse(name: &str, type_name: &str, required: bool) -> Result<Self, SchemaError> {
        let field_type = type_name.parse::<FieldType>().map_err(|_| SchemaError::UnsupportedType {
            field: name.to_string(),
            type_name: type_name.to_string(),
        })?;
        Ok(FieldSpec {
            required,
            ..FieldSpec::new(name, field_type)
        })
    }
}

/// Accepts both `{name, type, required, precision}` and the legacy
/// `{field, type, is_required, max_digits, decimal_places}` spelling.
#[derive(Deserialize)]
struct RawFieldSpec {
    #[serde(alias = "field")]
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default, alias = "is_required")]
    required: bool,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    precision: Option<Precision>,
    #[serde(default)]
    max_digits: Option<u32>,
    #[serde(default)]
    decimal_places: Option<u32>,
}

impl<'de> Deserialize<'de> for FieldSpec {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawFieldSpec::deserialize(deserializer)?;
        let mut spec = FieldSpec::parse(&raw.name, &raw.field_type, raw.required)
            .map_err(serde::de::Error::custom)?;
        spec.format = raw.format;
        spec.precision = match (raw.precision, raw.max_digits, raw.decimal_places) {
            (Some(p), _, _) => Some(p),
            (None, None, None) => None,
            (None, digits, places) => {
                let d = Precision::default();
                Some(Precision {
                    max_digits: digits.unwrap_or(d.max_digits),
                    decimal_places: places.unwrap_or(d.decimal_places),
                })
            }
        };
        Ok(spec)
    }
}

/// Key attribute type for the table hash key.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    #[default]
    String,
    Number,
}

/// Secondary index used to partition one logical extension/tenant within the table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    pub hash_key: String,
    #[serde(default)]
    pub range_key: Option<String>,
    /// Static partition value. When unset, the value comes from the tenant header.
    #[serde(default)]
    pub value: Option<String>,
}

fn default_limit() -> usize {
    25
}

/// One exposed collection: table identity, key layout, endpoint capabilities and fields.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub path_segment: String,
    pub table_name: String,
    pub hash_key: String,
    #[serde(default)]
    pub hash_key_type: KeyType,
    #[serde(default)]
    pub range_key: Option<String>,
    /// Path parameter name for item routes. Defaults to the hash key.
    #[serde(default)]
    pub lookup: Option<String>,
    /// Fill a v4 UUID hash key on create when the payload does not supply one.
    #[serde(default)]
    pub generate_id: bool,
    #[serde(default)]
    pub index: Option<IndexConfig>,
    #[serde(default)]
    pub hard_delete: bool,
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default)]
    pub max_limit: Option<usize>,
    pub fields: Vec<FieldSpec>,
}

impl ResourceConfig {
    pub fn lookup_key(&self) -> &str {
        self.lookup.as_deref().unwrap_or(&self.hash_key)
    }
}

/// All resources in one struct for in-memory loading.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FullConfig {
    pub resources: Vec<ResourceConfig>,
}
