//! Collection endpoint: paginated list and create.

use crate::config::ResolvedResource;
use crate::error::AppError;
use crate::schema::{AttributeValue, FieldValue, Record};
use crate::service::cursor::CursorCodec;
use crate::service::hooks::{EndpointHooks, RequestContext};
use crate::service::validation::ValidationMode;
use crate::store::{QueryRequest, RecordStore, ScanRequest};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

/// List response body.
#[derive(Debug, Serialize)]
pub struct ListPage {
    pub total_count: usize,
    pub items_per_page: usize,
    pub results: Vec<Map<String, Value>>,
    pub next_key: Option<String>,
}

pub struct CollectionEndpoint<'a> {
    resource: &'a ResolvedResource,
    store: &'a dyn RecordStore,
    hooks: &'a EndpointHooks,
}

/// Parse the `limit` query parameter. Absent means the resource default.
pub fn parse_limit(raw: Option<&str>) -> Result<Option<usize>, AppError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(Some(n)),
        _ => Err(AppError::BadRequest(format!("limit must be a positive integer, got '{}'", raw))),
    }
}

pub(crate) fn object_payload(payload: Value) -> Result<Map<String, Value>, AppError> {
    match payload {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

impl<'a> CollectionEndpoint<'a> {
    pub fn new(resource: &'a ResolvedResource, store: &'a dyn RecordStore, hooks: &'a EndpointHooks) -> Self {
        CollectionEndpoint { resource, store, hooks }
    }

    /// Partition value: hook, then static config value, then tenant header.
    fn index_value(&self, ctx: &RequestContext) -> Option<String> {
        if let Some(hook) = &self.hooks.index_value {
            if let Some(v) = hook(ctx) {
                return Some(v);
            }
        }
        self.resource.index_value.clone().or_else(|| ctx.tenant.clone())
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        next_key: Option<&str>,
        limit: Option<usize>,
    ) -> Result<ListPage, AppError> {
        let cursor = CursorCodec::decode(next_key).map_err(|e| {
            tracing::warn!(resource = %self.resource.path_segment, error = %e, "rejected next_key");
            e
        })?;
        let limit = self.resource.page_size(limit);
        let identity = self.resource.storage.identity();
        let page = match &identity.index {
            Some(index) => {
                let value = self.index_value(ctx).ok_or_else(|| {
                    AppError::BadRequest(format!("{} is required to list {}", index.hash_key, self.resource.path_segment))
                })?;
                let request = QueryRequest {
                    hash_value: AttributeValue::S(value),
                    index_name: Some(index.name.clone()),
                    cursor,
                    limit: Some(limit),
                    descending: true,
                };
                self.store.query(identity, request).await
            }
            None => {
                let request = ScanRequest {
                    cursor,
                    limit: Some(limit),
                };
                self.store.scan(identity, request).await
            }
        }
        .map_err(|e| {
            tracing::warn!(resource = %self.resource.path_segment, error = %e, "list failed");
            e
        })?;

        let results: Vec<Map<String, Value>> = page
            .items
            .iter()
            .map(|item| self.resource.validation.represent(&self.resource.storage.deserialize(item)))
            .collect();
        let next_key = CursorCodec::encode(page.last_evaluated_key.as_ref())?;
        Ok(ListPage {
            total_count: results.len(),
            items_per_page: limit,
            results,
            next_key,
        })
    }

    /// Key attributes that are not declared fields are taken from the raw payload as-is.
    fn undeclared_keys(&self, raw: &Map<String, Value>, record: &mut Record) {
        let identity = self.resource.storage.identity();
        for name in identity.key_names() {
            if self.resource.validation.rule(name).is_some() || record.contains(name) {
                continue;
            }
            let value = match raw.get(name) {
                Some(Value::String(s)) if !s.trim().is_empty() => FieldValue::Text(s.trim().to_string()),
                Some(Value::Number(n)) => match n.as_i64() {
                    Some(i) => FieldValue::Integer(i),
                    None => continue,
                },
                _ => continue,
            };
            record.set(name, value);
        }
    }

    fn stamp(&self, ctx: &RequestContext, record: &mut Record) -> Result<(), AppError> {
        let identity = self.resource.storage.identity();
        if self.resource.generate_id && !record.contains(&identity.hash_key) {
            record.set(identity.hash_key.clone(), FieldValue::Text(uuid::Uuid::new_v4().to_string()));
        }
        if let Some(index) = &identity.index {
            if !record.contains(&index.hash_key) {
                let value = self.index_value(ctx).ok_or_else(|| {
                    AppError::BadRequest(format!("{} is required to create {}", index.hash_key, self.resource.path_segment))
                })?;
                record.set(index.hash_key.clone(), FieldValue::Text(value));
            }
            if let Some(range) = &index.range_key {
                if !record.contains(range) && self.resource.validation.rule(range).is_none() {
                    record.set(range.clone(), FieldValue::DateTime(Utc::now()));
                }
            }
        }
        Ok(())
    }

    /// Full validation, stamping, pre-save hook, save, post-save hook.
    pub async fn create(&self, ctx: &RequestContext, payload: Value) -> Result<Map<String, Value>, AppError> {
        let raw = object_payload(payload)?;
        let mut record = self
            .resource
            .validation
            .validate(&raw, ValidationMode::Full)
            .map_err(AppError::Validation)?;
        self.undeclared_keys(&raw, &mut record);
        self.stamp(ctx, &mut record)?;
        if let Some(hook) = &self.hooks.pre_save {
            record = hook(&raw, record)?;
        }
        let item = self.resource.storage.serialize(&record)?;
        let identity = self.resource.storage.identity();
        self.store.save(identity, item.clone()).await.map_err(|e| {
            tracing::warn!(resource = %self.resource.path_segment, error = %e, "create failed");
            e
        })?;
        let mut saved = self.resource.storage.deserialize(&item);
        if let Some(hook) = &self.hooks.post_save {
            saved = hook(saved)?;
        }
        tracing::debug!(resource = %self.resource.path_segment, "created");
        Ok(self.resource.validation.represent(&saved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{resolve_resource, FieldSpec, FieldType, IndexConfig, KeyType, ResourceConfig};
    use crate::error::StoreError;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn config(index: bool) -> ResourceConfig {
        ResourceConfig {
            path_segment: "notes".into(),
            table_name: "user_data".into(),
            hash_key: "id".into(),
            hash_key_type: KeyType::String,
            range_key: None,
            lookup: None,
            generate_id: true,
            index: index.then(|| IndexConfig {
                name: "extension-index".into(),
                hash_key: "extension".into(),
                range_key: Some("created_at".into()),
                value: None,
            }),
            hard_delete: false,
            default_limit: 25,
            max_limit: None,
            fields: vec![
                FieldSpec::new("title", FieldType::String).required(),
                FieldSpec::new("done", FieldType::Boolean),
            ],
        }
    }

    fn tenant(t: &str) -> RequestContext {
        RequestContext::with_tenant(Some(t.into()))
    }

    async fn seed(endpoint: &CollectionEndpoint<'_>, ctx: &RequestContext, n: usize) {
        for i in 0..n {
            endpoint.create(ctx, json!({"title": format!("note {}", i)})).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_pagination_two_two_one() {
        let resource = resolve_resource(&config(false)).unwrap();
        let store = MemoryStore::new();
        let hooks = EndpointHooks::new();
        let endpoint = CollectionEndpoint::new(&resource, &store, &hooks);
        let ctx = RequestContext::default();
        seed(&endpoint, &ctx, 5).await;

        let first = endpoint.list(&ctx, None, Some(2)).await.unwrap();
        assert_eq!(first.results.len(), 2);
        assert_eq!(first.items_per_page, 2);
        let second = endpoint.list(&ctx, first.next_key.as_deref(), Some(2)).await.unwrap();
        assert_eq!(second.results.len(), 2);
        let third = endpoint.list(&ctx, second.next_key.as_deref(), Some(2)).await.unwrap();
        assert_eq!(third.total_count, 1);
        assert!(third.next_key.is_none());

        let seen: std::collections::HashSet<String> = [first, second, third]
            .iter()
            .flat_map(|p| p.results.iter().map(|r| r["id"].to_string()))
            .collect();
        assert_eq!(seen.len(), 5);
    }

    #[tokio::test]
    async fn test_missing_required_field_persists_nothing() {
        let resource = resolve_resource(&config(false)).unwrap();
        let store = MemoryStore::new();
        let hooks = EndpointHooks::new();
        let endpoint = CollectionEndpoint::new(&resource, &store, &hooks);
        let err = endpoint.create(&RequestContext::default(), json!({"done": true})).await.unwrap_err();
        match err {
            AppError::Validation(errors) => assert!(errors.contains("title")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(store.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_create_stamps_id_and_partition() {
        let resource = resolve_resource(&config(true)).unwrap();
        let store = MemoryStore::new();
        let hooks = EndpointHooks::new();
        let endpoint = CollectionEndpoint::new(&resource, &store, &hooks);
        let out = endpoint.create(&tenant("acme"), json!({"title": " hello ", "done": "yes"})).await.unwrap();
        assert_eq!(out["title"], json!("hello"));
        assert_eq!(out["done"], json!(true));
        assert_eq!(out["extension"], json!("acme"));
        assert!(uuid::Uuid::parse_str(out["id"].as_str().unwrap()).is_ok());
        assert!(out["created_at"].is_string());
    }

    #[tokio::test]
    async fn test_indexed_create_without_partition_value_persists_nothing() {
        let resource = resolve_resource(&config(true)).unwrap();
        let store = MemoryStore::new();
        let hooks = EndpointHooks::new();
        let endpoint = CollectionEndpoint::new(&resource, &store, &hooks);
        let err = endpoint
            .create(&RequestContext::default(), json!({"title": "orphan"}))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m.starts_with("extension is required")));
        assert_eq!(store.mutation_count(), 0);
        assert_eq!(store.item_count("user_data"), 0);
    }

    #[tokio::test]
    async fn test_index_list_is_partitioned_and_newest_first() {
        let resource = resolve_resource(&config(true)).unwrap();
        let store = MemoryStore::new();
        let hooks = EndpointHooks::new();
        let endpoint = CollectionEndpoint::new(&resource, &store, &hooks);
        seed(&endpoint, &tenant("acme"), 3).await;
        seed(&endpoint, &tenant("other"), 2).await;

        let page = endpoint.list(&tenant("acme"), None, None).await.unwrap();
        assert_eq!(page.total_count, 3);
        assert!(page.results.iter().all(|r| r["extension"] == json!("acme")));
        let stamps: Vec<chrono::DateTime<chrono::FixedOffset>> = page
            .results
            .iter()
            .map(|r| chrono::DateTime::parse_from_rfc3339(r["created_at"].as_str().unwrap()).unwrap())
            .collect();
        let mut sorted = stamps.clone();
        sorted.sort_by(|a, b| b.cmp(a));
        assert_eq!(stamps, sorted);

        let err = endpoint.list(&RequestContext::default(), None, None).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_bad_cursor_is_client_error() {
        let resource = resolve_resource(&config(false)).unwrap();
        let store = MemoryStore::new();
        let hooks = EndpointHooks::new();
        let endpoint = CollectionEndpoint::new(&resource, &store, &hooks);
        let err = endpoint.list(&RequestContext::default(), Some("%%%"), None).await.unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert!(matches!(err, AppError::Cursor(_)));
    }

    #[tokio::test]
    async fn test_save_hooks() {
        let resource = resolve_resource(&config(false)).unwrap();
        let store = MemoryStore::new();
        let hooks = EndpointHooks::new()
            .pre_save(|raw, mut record| {
                if raw.contains_key("stray") {
                    record.set("done", FieldValue::Boolean(true));
                }
                Ok(record)
            })
            .post_save(|mut record| {
                record.remove("done");
                Ok(record)
            });
        let endpoint = CollectionEndpoint::new(&resource, &store, &hooks);
        let out = endpoint
            .create(&RequestContext::default(), json!({"title": "x", "stray": 1}))
            .await
            .unwrap();
        assert!(out.get("done").is_none());
        assert!(out.get("stray").is_none());
        let page = endpoint.list(&RequestContext::default(), None, None).await.unwrap();
        assert_eq!(page.results[0]["done"], json!(true));

        let failing = EndpointHooks::new().pre_save(|_, _| Err(StoreError::Hook("quota exceeded".into())));
        let endpoint = CollectionEndpoint::new(&resource, &store, &failing);
        let err = endpoint.create(&RequestContext::default(), json!({"title": "y"})).await.unwrap_err();
        assert!(matches!(err, AppError::Store(StoreError::Hook(_))));
        assert_eq!(store.item_count("user_data"), 1);
    }

    #[test]
    fn test_parse_limit() {
        assert_eq!(parse_limit(None).unwrap(), None);
        assert_eq!(parse_limit(Some("10")).unwrap(), Some(10));
        assert!(parse_limit(Some("0")).is_err());
        assert!(parse_limit(Some("ten")).is_err());
    }
}
