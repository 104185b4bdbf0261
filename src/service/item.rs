//! Item endpoint: retrieve, partial update and destroy of one record by lookup value.

use crate::config::ResolvedResource;
use crate::error::{AppError, FieldErrors};
use crate::schema::Item;
use crate::service::collection::object_payload;
use crate::service::hooks::{EndpointHooks, RequestContext};
use crate::service::validation::ValidationMode;
use crate::store::{QueryRequest, RecordStore, SetAction};
use serde_json::{Map, Value};

const MSG_KEY_IMMUTABLE: &str = "This field cannot be changed.";

pub struct ItemEndpoint<'a> {
    resource: &'a ResolvedResource,
    store: &'a dyn RecordStore,
    hooks: &'a EndpointHooks,
}

impl<'a> ItemEndpoint<'a> {
    pub fn new(resource: &'a ResolvedResource, store: &'a dyn RecordStore, hooks: &'a EndpointHooks) -> Self {
        ItemEndpoint { resource, store, hooks }
    }

    fn lookup_value<'l>(&self, lookup: Option<&'l str>) -> Result<&'l str, AppError> {
        match lookup.map(str::trim) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(AppError::BadRequest(format!("{} is required", self.resource.lookup))),
        }
    }

    /// First item under the hash key. Any fetch failure reads as a miss.
    async fn fetch(&self, lookup: &str) -> Result<Item, AppError> {
        let not_found = || AppError::NotFound("Item Not Found".into());
        let hash_value = self.resource.storage.hash_key_value(lookup).map_err(|_| not_found())?;
        let request = QueryRequest {
            hash_value,
            index_name: None,
            cursor: None,
            limit: Some(1),
            descending: false,
        };
        let identity = self.resource.storage.identity();
        match self.store.query(identity, request).await {
            Ok(page) => page.items.into_iter().next().ok_or_else(not_found),
            Err(e) => {
                tracing::warn!(resource = %self.resource.path_segment, error = %e, "fetch failed");
                Err(not_found())
            }
        }
    }

    fn authorize(&self, ctx: &RequestContext, item: &Item) -> Result<(), AppError> {
        if let Some(hook) = &self.hooks.authorize {
            hook(ctx, &self.resource.storage.deserialize(item)).map_err(AppError::Forbidden)?;
        }
        Ok(())
    }

    async fn fetch_authorized(&self, ctx: &RequestContext, lookup: Option<&str>) -> Result<Item, AppError> {
        let lookup = self.lookup_value(lookup)?;
        let item = self.fetch(lookup).await?;
        self.authorize(ctx, &item)?;
        Ok(item)
    }

    pub async fn retrieve(&self, ctx: &RequestContext, lookup: Option<&str>) -> Result<Map<String, Value>, AppError> {
        let item = self.fetch_authorized(ctx, lookup).await?;
        Ok(self.resource.validation.represent(&self.resource.storage.deserialize(&item)))
    }

    /// Partial update: one SET per changed field. Nothing to set returns the current record untouched.
    pub async fn update(
        &self,
        ctx: &RequestContext,
        lookup: Option<&str>,
        payload: Value,
    ) -> Result<Map<String, Value>, AppError> {
        let item = self.fetch_authorized(ctx, lookup).await?;
        let raw = object_payload(payload)?;
        let validated = self
            .resource
            .validation
            .validate(&raw, ValidationMode::Partial)
            .map_err(AppError::Validation)?;
        let current = self.resource.storage.deserialize(&item);
        if validated.is_empty() {
            return Ok(self.resource.validation.represent(&current));
        }

        let storage = &self.resource.storage;
        let key_names = storage.identity().key_names();
        let mut errors = FieldErrors::new();
        let mut actions = Vec::with_capacity(validated.len());
        for (name, value) in validated.iter() {
            let unchanged = current.get(name) == Some(value);
            if key_names.contains(&name.as_str()) {
                if !unchanged {
                    errors.push(name, MSG_KEY_IMMUTABLE);
                }
                continue;
            }
            if unchanged {
                continue;
            }
            actions.push(SetAction::new(name.clone(), storage.encode_attribute(name, value)?));
        }
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        if actions.is_empty() {
            return Ok(self.resource.validation.represent(&current));
        }

        let key = storage.key_of(&item)?;
        let updated = self
            .store
            .update(storage.identity(), key, actions)
            .await
            .map_err(|e| {
                tracing::warn!(resource = %self.resource.path_segment, error = %e, "update failed");
                e
            })?;
        let mut record = storage.deserialize(&updated);
        if let Some(hook) = &self.hooks.post_save {
            record = hook(record)?;
        }
        Ok(self.resource.validation.represent(&record))
    }

    /// Hard delete; refused before any lookup unless the resource allows it.
    pub async fn destroy(&self, ctx: &RequestContext, lookup: Option<&str>) -> Result<(), AppError> {
        if !self.resource.hard_delete {
            return Err(AppError::Forbidden("delete is not allowed".into()));
        }
        let item = self.fetch_authorized(ctx, lookup).await?;
        let key = self.resource.storage.key_of(&item)?;
        self.store
            .delete(self.resource.storage.identity(), key)
            .await
            .map_err(|e| {
                tracing::warn!(resource = %self.resource.path_segment, error = %e, "delete failed");
                e
            })?;
        tracing::debug!(resource = %self.resource.path_segment, "destroyed");
        Ok(())
    }
}
