//! Validation model built from field specs: checks and coerces values crossing the API boundary.

use crate::config::{FieldSpec, FieldType, Precision};
use crate::error::{FieldErrors, SchemaError};
use crate::schema::{FieldValue, Record};
use crate::service::coerce::{
    coerce, CoerceParams, DEFAULT_DATETIME_FORMAT, DEFAULT_DATE_FORMAT, DEFAULT_TIME_FORMAT, MSG_NULL, MSG_REQUIRED,
};
use chrono::format::{Item, StrftimeItems};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Full: every field is checked and required fields must be present (create).
/// Partial: only supplied fields are checked and returned (update).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValidationMode {
    Full,
    Partial,
}

/// Typed validation rule for one field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldRule {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    /// Optional url/string/email fields accept "".
    pub allow_blank: bool,
    /// Parse/render format for date, time and datetime.
    pub format: Option<String>,
    /// Digits for decimal.
    pub precision: Option<Precision>,
}

impl FieldRule {
    pub fn from_spec(spec: &FieldSpec) -> Result<Self, SchemaError> {
        let format = match spec.field_type {
            FieldType::Date => Some(spec.format.clone().unwrap_or_else(|| DEFAULT_DATE_FORMAT.into())),
            FieldType::Time => Some(spec.format.clone().unwrap_or_else(|| DEFAULT_TIME_FORMAT.into())),
            FieldType::DateTime => Some(spec.format.clone().unwrap_or_else(|| DEFAULT_DATETIME_FORMAT.into())),
            _ => None,
        };
        if let Some(f) = &format {
            check_format(&spec.name, f)?;
        }
        let precision = match spec.field_type {
            FieldType::Decimal => {
                let p = spec.precision.unwrap_or_default();
                if p.max_digits == 0 || p.decimal_places > p.max_digits || p.max_digits > 28 {
                    return Err(SchemaError::Validation(format!(
                        "field '{}': invalid precision ({}, {})",
                        spec.name, p.max_digits, p.decimal_places
                    )));
                }
                Some(p)
            }
            _ => None,
        };
        Ok(FieldRule {
            name: spec.name.clone(),
            field_type: spec.field_type,
            required: spec.required,
            allow_blank: spec.field_type.is_text_like() && !spec.required,
            format,
            precision,
        })
    }

    fn check(&self, value: &Value) -> Result<FieldValue, String> {
        if value.is_null() {
            return Err(MSG_NULL.into());
        }
        let precision = self.precision.unwrap_or_default();
        let params = CoerceParams {
            allow_blank: self.allow_blank,
            format: self.format.as_deref(),
            max_digits: precision.max_digits,
            decimal_places: precision.decimal_places,
        };
        coerce(self.field_type, value, &params)
    }
}

fn check_format(field: &str, format: &str) -> Result<(), SchemaError> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(SchemaError::Validation(format!(
            "field '{}': invalid format '{}'",
            field, format
        )));
    }
    Ok(())
}

/// Runtime validator for one resource; immutable once built.
#[derive(Clone, Debug)]
pub struct ValidationModel {
    rules: Vec<FieldRule>,
    by_name: HashMap<String, usize>,
}

impl ValidationModel {
    pub fn build(fields: &[FieldSpec]) -> Result<Self, SchemaError> {
        if fields.is_empty() {
            return Err(SchemaError::EmptyFields("validator".into()));
        }
        let mut rules = Vec::with_capacity(fields.len());
        let mut by_name = HashMap::with_capacity(fields.len());
        for spec in fields {
            if spec.name.trim().is_empty() {
                return Err(SchemaError::MissingName("validator".into()));
            }
            if by_name.insert(spec.name.clone(), rules.len()).is_some() {
                return Err(SchemaError::DuplicateField {
                    model: "validator".into(),
                    field: spec.name.clone(),
                });
            }
            rules.push(FieldRule::from_spec(spec)?);
        }
        Ok(ValidationModel { rules, by_name })
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.by_name.get(name).map(|&i| &self.rules[i])
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Validate and coerce. Unknown keys are ignored; errors are collected for every field.
    pub fn validate(&self, values: &Map<String, Value>, mode: ValidationMode) -> Result<Record, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut out = Record::new();
        for rule in &self.rules {
            match values.get(&rule.name) {
                None => {
                    if rule.required && mode == ValidationMode::Full {
                        errors.push(&rule.name, MSG_REQUIRED);
                    }
                }
                Some(v) => match rule.check(v) {
                    Ok(coerced) => out.set(rule.name.clone(), coerced),
                    Err(msg) => errors.push(&rule.name, msg),
                },
            }
        }
        if errors.is_empty() {
            Ok(out)
        } else {
            Err(errors)
        }
    }

    /// Output representation: declared temporal fields use their format, decimals render
    /// as strings, attributes without a rule pass through.
    pub fn represent(&self, record: &Record) -> Map<String, Value> {
        record
            .iter()
            .map(|(name, value)| {
                let format = self.rule(name).and_then(|r| r.format.as_deref());
                (name.clone(), value.to_json(format))
            })
            .collect()
    }
}
