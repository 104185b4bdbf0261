//! Storage attribute model: field name -> typed attribute descriptor, built from field specs.

use crate::config::{FieldSpec, FieldType, KeyType};
use crate::error::{SchemaError, StoreError};
use crate::schema::attribute::{
    format_stored_datetime, format_stored_time, parse_stored_datetime, parse_stored_time, AttributeValue,
    FieldValue, Item, STORED_DATE_FORMAT,
};
use crate::schema::record::Record;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::str::FromStr;

/// Storage type tag of one attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeType {
    Integer,
    Float,
    Unicode,
    Boolean,
    UtcDateTime,
    Date,
    Time,
    Decimal,
    Json,
}

impl AttributeType {
    /// Exhaustive: every declared field type has a storage representation.
    pub fn for_field(field_type: FieldType) -> AttributeType {
        match field_type {
            FieldType::Integer => AttributeType::Integer,
            FieldType::Float => AttributeType::Float,
            FieldType::String | FieldType::Email | FieldType::Url | FieldType::Uuid => AttributeType::Unicode,
            FieldType::Boolean => AttributeType::Boolean,
            FieldType::DateTime => AttributeType::UtcDateTime,
            FieldType::Date => AttributeType::Date,
            FieldType::Time => AttributeType::Time,
            FieldType::Decimal => AttributeType::Decimal,
            FieldType::Json => AttributeType::Json,
        }
    }

    pub fn for_key(key_type: KeyType) -> AttributeType {
        match key_type {
            KeyType::String => AttributeType::Unicode,
            KeyType::Number => AttributeType::Integer,
        }
    }

    /// DynamoDB scalar tag the value is written with.
    pub fn wire_tag(&self) -> &'static str {
        match self {
            AttributeType::Integer | AttributeType::Float | AttributeType::Decimal => "N",
            AttributeType::Boolean => "BOOL",
            AttributeType::Unicode
            | AttributeType::UtcDateTime
            | AttributeType::Date
            | AttributeType::Time
            | AttributeType::Json => "S",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeDescriptor {
    /// External attribute name used for persistence.
    pub attr_name: String,
    pub attr_type: AttributeType,
    pub nullable: bool,
}

impl AttributeDescriptor {
    pub fn from_field(spec: &FieldSpec) -> Self {
        AttributeDescriptor {
            attr_name: spec.name.clone(),
            attr_type: AttributeType::for_field(spec.field_type),
            nullable: !spec.required,
        }
    }

    pub fn encode(&self, value: &FieldValue) -> Result<AttributeValue, StoreError> {
        let mismatch = || {
            StoreError::Backend(format!(
                "attribute '{}' cannot store a {} value",
                self.attr_name,
                value.kind()
            ))
        };
        Ok(match (self.attr_type, value) {
            (_, FieldValue::Null) => AttributeValue::Null(true),
            (AttributeType::Integer, FieldValue::Integer(n)) => AttributeValue::N(n.to_string()),
            (AttributeType::Float, FieldValue::Float(f)) => AttributeValue::N(f.to_string()),
            (AttributeType::Float, FieldValue::Integer(n)) => AttributeValue::N(n.to_string()),
            (AttributeType::Decimal, FieldValue::Decimal(d)) => AttributeValue::N(d.to_string()),
            (AttributeType::Decimal, FieldValue::Integer(n)) => AttributeValue::N(n.to_string()),
            (AttributeType::Unicode, FieldValue::Text(s)) => AttributeValue::S(s.clone()),
            (AttributeType::Boolean, FieldValue::Boolean(b)) => AttributeValue::Bool(*b),
            (AttributeType::UtcDateTime, FieldValue::DateTime(d)) => AttributeValue::S(format_stored_datetime(d)),
            (AttributeType::Date, FieldValue::Date(d)) => AttributeValue::S(d.format(STORED_DATE_FORMAT).to_string()),
            (AttributeType::Time, FieldValue::Time(t)) => AttributeValue::S(format_stored_time(t)),
            (AttributeType::Json, v) => AttributeValue::S(v.to_json(None).to_string()),
            _ => return Err(mismatch()),
        })
    }

    /// Inverse of `encode`; values that do not fit the descriptor fall back to untyped decoding.
    pub fn decode(&self, value: &AttributeValue) -> FieldValue {
        let typed = match (self.attr_type, value) {
            (_, AttributeValue::Null(_)) => Some(FieldValue::Null),
            (AttributeType::Integer, AttributeValue::N(n)) => n.parse().ok().map(FieldValue::Integer),
            (AttributeType::Float, AttributeValue::N(n)) => n.parse().ok().map(FieldValue::Float),
            (AttributeType::Decimal, AttributeValue::N(n)) => Decimal::from_str(n).ok().map(FieldValue::Decimal),
            (AttributeType::Unicode, AttributeValue::S(s)) => Some(FieldValue::Text(s.clone())),
            (AttributeType::Boolean, AttributeValue::Bool(b)) => Some(FieldValue::Boolean(*b)),
            (AttributeType::UtcDateTime, AttributeValue::S(s)) => parse_stored_datetime(s).map(FieldValue::DateTime),
            (AttributeType::Date, AttributeValue::S(s)) => {
                NaiveDate::parse_from_str(s, STORED_DATE_FORMAT).ok().map(FieldValue::Date)
            }
            (AttributeType::Time, AttributeValue::S(s)) => parse_stored_time(s).map(FieldValue::Time),
            (AttributeType::Json, AttributeValue::S(s)) => serde_json::from_str(s).ok().map(FieldValue::Json),
            _ => None,
        };
        typed.unwrap_or_else(|| FieldValue::from_untyped(value))
    }
}

/// Secondary index identity within the table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexIdentity {
    pub name: String,
    pub hash_key: String,
    pub range_key: Option<String>,
}

/// Which table a model persists to and how its items are keyed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModelIdentity {
    pub table_name: String,
    pub hash_key: String,
    pub hash_key_type: KeyType,
    pub range_key: Option<String>,
    pub index: Option<IndexIdentity>,
}

impl ModelIdentity {
    pub fn new(table_name: impl Into<String>, hash_key: impl Into<String>) -> Self {
        ModelIdentity {
            table_name: table_name.into(),
            hash_key: hash_key.into(),
            hash_key_type: KeyType::String,
            range_key: None,
            index: None,
        }
    }

    /// Primary key attribute names (hash, then range).
    pub fn key_names(&self) -> Vec<&str> {
        let mut out = vec![self.hash_key.as_str()];
        if let Some(r) = &self.range_key {
            out.push(r.as_str());
        }
        out
    }

    pub fn index_named(&self, name: &str) -> Option<&IndexIdentity> {
        self.index.as_ref().filter(|i| i.name == name)
    }
}

/// Runtime storage model for one table/tenant.
#[derive(Clone, Debug)]
pub struct StorageModel {
    identity: ModelIdentity,
    attributes: BTreeMap<String, AttributeDescriptor>,
}

impl StorageModel {
    /// Build one descriptor per field. Empty field sets and duplicate names fail.
    pub fn build(identity: ModelIdentity, fields: &[FieldSpec]) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::EmptyFields(identity.table_name.clone()));
        }
        let mut attributes = BTreeMap::new();
        for spec in fields {
            if spec.name.trim().is_empty() {
                return Err(SchemaError::MissingName(identity.table_name.clone()));
            }
            let descriptor = AttributeDescriptor::from_field(spec);
            if attributes.insert(spec.name.clone(), descriptor).is_some() {
                return Err(SchemaError::DuplicateField {
                    model: identity.table_name.clone(),
                    field: spec.name.clone(),
                });
            }
        }
        Ok(StorageModel { identity, attributes })
    }

    /// Additive registration. An attribute already described keeps its descriptor.
    pub fn register(&mut self, descriptor: AttributeDescriptor) -> bool {
        if self.attributes.contains_key(&descriptor.attr_name) {
            return false;
        }
        self.attributes.insert(descriptor.attr_name.clone(), descriptor);
        true
    }

    /// Register the table and index key attributes that no field already describes.
    pub fn register_keys(&mut self) {
        let identity = self.identity.clone();
        self.register(AttributeDescriptor {
            attr_name: identity.hash_key.clone(),
            attr_type: AttributeType::for_key(identity.hash_key_type),
            nullable: false,
        });
        if let Some(range) = &identity.range_key {
            self.register(AttributeDescriptor {
                attr_name: range.clone(),
                attr_type: AttributeType::Unicode,
                nullable: false,
            });
        }
        if let Some(index) = &identity.index {
            self.register(AttributeDescriptor {
                attr_name: index.hash_key.clone(),
                attr_type: AttributeType::Unicode,
                nullable: true,
            });
            if let Some(range) = &index.range_key {
                self.register(AttributeDescriptor {
                    attr_name: range.clone(),
                    attr_type: AttributeType::UtcDateTime,
                    nullable: true,
                });
            }
        }
    }

    pub fn identity(&self) -> &ModelIdentity {
        &self.identity
    }

    pub fn table_name(&self) -> &str {
        &self.identity.table_name
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDescriptor> {
        self.attributes.get(name)
    }

    pub fn attributes(&self) -> impl Iterator<Item = &AttributeDescriptor> {
        self.attributes.values()
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Serialize a record for `save`. Unknown attributes and missing non-nullable ones fail;
    /// null values are omitted.
    pub fn serialize(&self, record: &Record) -> Result<Item, StoreError> {
        let mut item = Item::new();
        for (name, value) in record.iter() {
            let descriptor = self
                .attributes
                .get(name)
                .ok_or_else(|| StoreError::Backend(format!("attribute '{}' specified does not exist", name)))?;
            if value.is_null() {
                continue;
            }
            item.insert(descriptor.attr_name.clone(), descriptor.encode(value)?);
        }
        for descriptor in self.attributes.values() {
            if !descriptor.nullable && !item.contains_key(&descriptor.attr_name) {
                return Err(StoreError::Backend(format!(
                    "attribute '{}' cannot be None",
                    descriptor.attr_name
                )));
            }
        }
        Ok(item)
    }

    /// Encode a single attribute for an update action.
    pub fn encode_attribute(&self, name: &str, value: &FieldValue) -> Result<AttributeValue, StoreError> {
        let descriptor = self
            .attributes
            .get(name)
            .ok_or_else(|| StoreError::Backend(format!("attribute '{}' specified does not exist", name)))?;
        if value.is_null() && !descriptor.nullable {
            return Err(StoreError::Backend(format!("attribute '{}' cannot be None", name)));
        }
        descriptor.encode(value)
    }

    pub fn deserialize(&self, item: &Item) -> Record {
        let mut record = Record::new();
        for (name, value) in item {
            let decoded = match self.attributes.get(name) {
                Some(descriptor) => descriptor.decode(value),
                None => FieldValue::from_untyped(value),
            };
            record.set(name.clone(), decoded);
        }
        record
    }

    /// Primary key attributes of an item, as the store addresses it.
    pub fn key_of(&self, item: &Item) -> Result<Item, StoreError> {
        let mut key = Item::new();
        for name in self.identity.key_names() {
            let value = item.get(name).ok_or_else(|| StoreError::MissingKey(name.to_string()))?;
            key.insert(name.to_string(), value.clone());
        }
        Ok(key)
    }

    /// Store representation of a lookup path value for the hash key.
    pub fn hash_key_value(&self, raw: &str) -> Result<AttributeValue, StoreError> {
        match self.identity.hash_key_type {
            KeyType::String => Ok(AttributeValue::S(raw.to_string())),
            KeyType::Number => raw
                .trim()
                .parse::<i64>()
                .map(|n| AttributeValue::N(n.to_string()))
                .map_err(|_| StoreError::Backend(format!("'{}' is not a valid {}", raw, self.identity.hash_key))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn fields() -> Vec<FieldSpec> {
        vec![
            FieldSpec::new("title", FieldType::String).required(),
            FieldSpec::new("count", FieldType::Integer),
            FieldSpec::new("price", FieldType::Decimal),
            FieldSpec::new("done", FieldType::Boolean),
            FieldSpec::new("seen_at", FieldType::DateTime),
            FieldSpec::new("meta", FieldType::Json),
        ]
    }

    #[test]
    fn test_build_one_descriptor_per_field() {
        let specs = fields();
        let model = StorageModel::build(ModelIdentity::new("t", "id"), &specs).unwrap();
        assert_eq!(model.len(), specs.len());
        for spec in &specs {
            let d = model.attribute(&spec.name).unwrap();
            assert_eq!(d.attr_name, spec.name);
            assert_eq!(d.nullable, !spec.required);
        }
    }

    #[test]
    fn test_every_field_type_maps_to_storage() {
        let specs: Vec<FieldSpec> = FieldType::ALL
            .iter()
            .map(|t| FieldSpec::new(format!("f_{}", t), *t))
            .collect();
        let model = StorageModel::build(ModelIdentity::new("t", "id"), &specs).unwrap();
        assert_eq!(model.len(), FieldType::ALL.len());
    }

    #[test]
    fn test_empty_fields_rejected() {
        let err = StorageModel::build(ModelIdentity::new("t", "id"), &[]).unwrap_err();
        assert!(matches!(err, SchemaError::EmptyFields(_)));
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let specs = vec![
            FieldSpec::new("a", FieldType::String),
            FieldSpec::new("a", FieldType::Integer),
        ];
        let err = StorageModel::build(ModelIdentity::new("t", "id"), &specs).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateField { .. }));
    }

    #[test]
    fn test_register_is_additive() {
        let mut model = StorageModel::build(ModelIdentity::new("t", "title"), &fields()).unwrap();
        let before = model.len();
        model.register_keys();
        // hash key is a declared field, so nothing new
        assert_eq!(model.len(), before);
        assert!(!model.attribute("title").unwrap().nullable);
        let added = model.register(AttributeDescriptor {
            attr_name: "extension".into(),
            attr_type: AttributeType::Unicode,
            nullable: true,
        });
        assert!(added);
        assert_eq!(model.len(), before + 1);
    }

    #[test]
    fn test_serialize_and_deserialize_typed_values() {
        let mut model = StorageModel::build(ModelIdentity::new("t", "id"), &fields()).unwrap();
        model.register_keys();
        let mut record = Record::new();
        record.set("id", FieldValue::Text("r1".into()));
        record.set("title", FieldValue::Text("hello".into()));
        record.set("count", FieldValue::Integer(3));
        record.set("price", FieldValue::Decimal(Decimal::from_str("1.25").unwrap()));
        record.set("done", FieldValue::Boolean(true));
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        record.set("seen_at", FieldValue::DateTime(at));
        record.set("meta", FieldValue::Json(serde_json::json!({"k": [1, 2]})));

        let item = model.serialize(&record).unwrap();
        assert_eq!(item.get("count"), Some(&AttributeValue::N("3".into())));
        assert_eq!(item.get("done"), Some(&AttributeValue::Bool(true)));
        assert!(matches!(item.get("meta"), Some(AttributeValue::S(_))));

        let back = model.deserialize(&item);
        assert_eq!(back, record);
    }

    #[test]
    fn test_serialize_rejects_unknown_and_missing_required() {
        let mut model = StorageModel::build(ModelIdentity::new("t", "id"), &fields()).unwrap();
        model.register_keys();
        let mut record = Record::new();
        record.set("id", FieldValue::Text("r1".into()));
        let err = model.serialize(&record).unwrap_err();
        assert!(err.to_string().contains("title"));

        record.set("title", FieldValue::Text("x".into()));
        record.set("bogus", FieldValue::Integer(1));
        let err = model.serialize(&record).unwrap_err();
        assert!(err.to_string().contains("bogus"));
    }

    #[test]
    fn test_serialize_omits_nulls() {
        let mut model = StorageModel::build(ModelIdentity::new("t", "id"), &fields()).unwrap();
        model.register_keys();
        let mut record = Record::new();
        record.set("id", FieldValue::Text("r1".into()));
        record.set("title", FieldValue::Text("x".into()));
        record.set("count", FieldValue::Null);
        let item = model.serialize(&record).unwrap();
        assert!(!item.contains_key("count"));
    }

    #[test]
    fn test_numeric_hash_key_lookup() {
        let mut identity = ModelIdentity::new("t", "id");
        identity.hash_key_type = KeyType::Number;
        let model = StorageModel::build(identity, &fields()).unwrap();
        assert_eq!(model.hash_key_value("17").unwrap(), AttributeValue::N("17".into()));
        assert!(model.hash_key_value("abc").is_err());
    }
}
