//! Config validation: resource identity and API consistency.

use crate::config::{FullConfig, KeyType, ResourceConfig};
use crate::error::SchemaError;
use crate::routes::RESERVED_SEGMENTS;
use std::collections::HashSet;

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_path_segment(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn validate_resource(r: &ResourceConfig) -> Result<(), SchemaError> {
    let ctx = |msg: &str| SchemaError::Validation(format!("resource '{}': {}", r.path_segment, msg));
    if r.table_name.trim().is_empty() {
        return Err(ctx("table_name must not be empty"));
    }
    if r.hash_key.trim().is_empty() {
        return Err(ctx("hash_key must not be empty"));
    }
    if matches!(&r.range_key, Some(k) if k.trim().is_empty()) {
        return Err(ctx("range_key must not be empty"));
    }
    if !is_identifier(r.lookup_key()) {
        return Err(ctx("lookup must be an identifier"));
    }
    if r.generate_id && r.hash_key_type != KeyType::String {
        return Err(ctx("generate_id requires a string hash key"));
    }
    if let Some(index) = &r.index {
        if index.name.trim().is_empty() || index.hash_key.trim().is_empty() {
            return Err(ctx("index name and hash_key must not be empty"));
        }
        if matches!(&index.range_key, Some(k) if k.trim().is_empty()) {
            return Err(ctx("index range_key must not be empty"));
        }
    }
    if r.default_limit == 0 {
        return Err(ctx("default_limit must be at least 1"));
    }
    if matches!(r.max_limit, Some(max) if max < r.default_limit) {
        return Err(ctx("max_limit must not be below default_limit"));
    }
    if r.fields.is_empty() {
        return Err(SchemaError::EmptyFields(r.path_segment.clone()));
    }
    let mut names = HashSet::new();
    for f in &r.fields {
        if f.name.trim().is_empty() {
            return Err(SchemaError::MissingName(r.path_segment.clone()));
        }
        if !names.insert(f.name.as_str()) {
            return Err(SchemaError::DuplicateField {
                model: r.path_segment.clone(),
                field: f.name.clone(),
            });
        }
    }
    Ok(())
}

pub fn validate(config: &FullConfig) -> Result<(), SchemaError> {
    if config.resources.is_empty() {
        return Err(SchemaError::Validation("at least one resource required".into()));
    }
    let mut path_segments = HashSet::new();
    for r in &config.resources {
        if !is_path_segment(&r.path_segment) {
            return Err(SchemaError::Validation(format!("invalid path segment: '{}'", r.path_segment)));
        }
        if RESERVED_SEGMENTS.contains(&r.path_segment.as_str()) {
            return Err(SchemaError::Validation(format!("path segment '{}' is reserved", r.path_segment)));
        }
        if !path_segments.insert(r.path_segment.as_str()) {
            return Err(SchemaError::DuplicatePathSegment(r.path_segment.clone()));
        }
        validate_resource(r)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FieldSpec, FieldType};

    fn resource(path: &str) -> ResourceConfig {
        ResourceConfig {
            path_segment: path.into(),
            table_name: "notes".into(),
            hash_key: "id".into(),
            hash_key_type: KeyType::String,
            range_key: None,
            lookup: None,
            generate_id: true,
            index: None,
            hard_delete: false,
            default_limit: 25,
            max_limit: None,
            fields: vec![FieldSpec::new("title", FieldType::String)],
        }
    }

    #[test]
    fn test_valid_config() {
        let config = FullConfig {
            resources: vec![resource("notes"), resource("tasks")],
        };
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_empty_config_rejected() {
        assert!(validate(&FullConfig::default()).is_err());
    }

    #[test]
    fn test_duplicate_path_segment_rejected() {
        let config = FullConfig {
            resources: vec![resource("notes"), resource("notes")],
        };
        assert!(matches!(validate(&config), Err(SchemaError::DuplicatePathSegment(_))));
    }

    #[test]
    fn test_reserved_path_segment_rejected() {
        let config = FullConfig {
            resources: vec![resource("health")],
        };
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_bad_lookup_and_limits_rejected() {
        let mut r = resource("notes");
        r.lookup = Some("note id".into());
        assert!(validate(&FullConfig { resources: vec![r] }).is_err());

        let mut r = resource("notes");
        r.default_limit = 0;
        assert!(validate(&FullConfig { resources: vec![r] }).is_err());

        let mut r = resource("notes");
        r.max_limit = Some(10);
        assert!(validate(&FullConfig { resources: vec![r] }).is_err());
    }

    #[test]
    fn test_empty_and_duplicate_fields_rejected() {
        let mut r = resource("notes");
        r.fields.clear();
        assert!(matches!(
            validate(&FullConfig { resources: vec![r] }),
            Err(SchemaError::EmptyFields(_))
        ));

        let mut r = resource("notes");
        r.fields.push(FieldSpec::new("title", FieldType::Integer));
        assert!(matches!(
            validate(&FullConfig { resources: vec![r] }),
            Err(SchemaError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_generate_id_needs_string_key() {
        let mut r = resource("notes");
        r.hash_key_type = KeyType::Number;
        assert!(validate(&FullConfig { resources: vec![r] }).is_err());
    }
}
