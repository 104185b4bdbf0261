//! Load config from JSON text or a file, and resolve it into runtime models.

use crate::config::resolved::{ResolvedModel, ResolvedResource};
use crate::config::{validate, FullConfig, ResourceConfig};
use crate::error::SchemaError;
use crate::schema::{IndexIdentity, ModelIdentity, StorageModel};
use crate::service::ValidationModel;
use std::collections::HashMap;
use std::path::Path;

pub fn load_from_str(json: &str) -> Result<FullConfig, SchemaError> {
    serde_json::from_str(json).map_err(|e| SchemaError::Load(e.to_string()))
}

pub async fn load_from_path(path: impl AsRef<Path>) -> Result<FullConfig, SchemaError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SchemaError::Load(format!("{}: {}", path.display(), e)))?;
    load_from_str(&text)
}

fn identity(r: &ResourceConfig) -> ModelIdentity {
    ModelIdentity {
        table_name: r.table_name.clone(),
        hash_key: r.hash_key.clone(),
        hash_key_type: r.hash_key_type,
        range_key: r.range_key.clone(),
        index: r.index.as_ref().map(|i| IndexIdentity {
            name: i.name.clone(),
            hash_key: i.hash_key.clone(),
            range_key: i.range_key.clone(),
        }),
    }
}

pub fn resolve_resource(r: &ResourceConfig) -> Result<ResolvedResource, SchemaError> {
    let mut storage = StorageModel::build(identity(r), &r.fields)?;
    storage.register_keys();
    let validation = ValidationModel::build(&r.fields)?;
    Ok(ResolvedResource {
        path_segment: r.path_segment.clone(),
        lookup: r.lookup_key().to_string(),
        generate_id: r.generate_id,
        hard_delete: r.hard_delete,
        default_limit: r.default_limit,
        max_limit: r.max_limit,
        index_value: r.index.as_ref().and_then(|i| i.value.clone()),
        storage,
        validation,
    })
}

/// Build resolved model from full config (validates first).
pub fn resolve(config: &FullConfig) -> Result<ResolvedModel, SchemaError> {
    validate(config)?;
    let mut resources = Vec::with_capacity(config.resources.len());
    let mut by_path = HashMap::new();
    for r in &config.resources {
        let resolved = resolve_resource(r)?;
        by_path.insert(resolved.path_segment.clone(), resources.len());
        resources.push(resolved);
    }
    tracing::debug!(resources = resources.len(), "config resolved");
    Ok(ResolvedModel { resources, by_path })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FieldType;
    use crate::schema::AttributeType;

    const CONFIG: &str = r#"{
        "resources": [{
            "path_segment": "notes",
            "table_name": "user_data",
            "hash_key": "id",
            "generate_id": true,
            "hard_delete": true,
            "index": {"name": "extension-index", "hash_key": "extension", "range_key": "created_at", "value": "notes"},
            "fields": [
                {"name": "title", "type": "string", "required": true},
                {"field": "price", "type": "Decimal", "is_required": false, "max_digits": 6, "decimal_places": 2},
                {"name": "due", "type": "datetime", "format": "%d/%m/%Y %H:%M"}
            ]
        }]
    }"#;

    #[test]
    fn test_load_and_resolve() {
        let config = load_from_str(CONFIG).unwrap();
        let model = resolve(&config).unwrap();
        let notes = model.resource_by_path("notes").unwrap();
        assert_eq!(notes.lookup, "id");
        assert_eq!(notes.index_value.as_deref(), Some("notes"));
        assert_eq!(notes.validation.len(), 3);
        assert_eq!(notes.validation.rule("price").unwrap().field_type, FieldType::Decimal);
        assert_eq!(notes.validation.rule("due").unwrap().format.as_deref(), Some("%d/%m/%Y %H:%M"));
        // declared fields plus id, extension, created_at
        assert_eq!(notes.storage.len(), 6);
        assert_eq!(notes.storage.attribute("created_at").unwrap().attr_type, AttributeType::UtcDateTime);
        assert!(model.resource_by_path("other").is_none());
    }

    #[test]
    fn test_unsupported_type_fails_load() {
        let json = r#"{"resources": [{"path_segment": "n", "table_name": "t", "hash_key": "id",
            "fields": [{"name": "x", "type": "money"}]}]}"#;
        let err = load_from_str(json).unwrap_err();
        assert!(err.to_string().contains("money"));
    }

    #[test]
    fn test_page_size_defaults_and_clamps() {
        let mut config = load_from_str(CONFIG).unwrap();
        config.resources[0].max_limit = Some(50);
        let model = resolve(&config).unwrap();
        let notes = model.resource_by_path("notes").unwrap();
        assert_eq!(notes.page_size(None), 25);
        assert_eq!(notes.page_size(Some(10)), 10);
        assert_eq!(notes.page_size(Some(500)), 50);
    }

    #[tokio::test]
    async fn test_load_from_missing_path() {
        let err = load_from_path("/nonexistent/dyno.json").await.unwrap_err();
        assert!(matches!(err, SchemaError::Load(_)));
    }
}
