//! Optional per-resource hooks around the collection and item endpoints.

use crate::error::StoreError;
use crate::schema::Record;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Request facts a hook may need. Built by the HTTP layer.
#[derive(Clone, Debug, Default)]
pub struct RequestContext {
    /// `X-Tenant-ID`, trimmed; `None` when absent or blank.
    pub tenant: Option<String>,
}

impl RequestContext {
    pub fn with_tenant(tenant: Option<String>) -> Self {
        RequestContext { tenant }
    }
}

/// `(raw payload, validated record) -> record to persist`.
pub type PreSaveHook = Arc<dyn Fn(&Map<String, Value>, Record) -> Result<Record, StoreError> + Send + Sync>;
/// `saved record -> record to return`.
pub type PostSaveHook = Arc<dyn Fn(Record) -> Result<Record, StoreError> + Send + Sync>;
/// `Err(message)` vetoes with Forbidden.
pub type AuthorizeHook = Arc<dyn Fn(&RequestContext, &Record) -> Result<(), String> + Send + Sync>;
/// Partition value for indexed list/create.
pub type IndexValueHook = Arc<dyn Fn(&RequestContext) -> Option<String> + Send + Sync>;

#[derive(Clone, Default)]
pub struct EndpointHooks {
    pub pre_save: Option<PreSaveHook>,
    pub post_save: Option<PostSaveHook>,
    pub authorize: Option<AuthorizeHook>,
    pub index_value: Option<IndexValueHook>,
}

impl EndpointHooks {
    pub fn new() -> Self {
        EndpointHooks::default()
    }

    pub fn pre_save<F>(mut self, f: F) -> Self
    where
        F: Fn(&Map<String, Value>, Record) -> Result<Record, StoreError> + Send + Sync + 'static,
    {
        self.pre_save = Some(Arc::new(f));
        self
    }

    pub fn post_save<F>(mut self, f: F) -> Self
    where
        F: Fn(Record) -> Result<Record, StoreError> + Send + Sync + 'static,
    {
        self.post_save = Some(Arc::new(f));
        self
    }

    pub fn authorize<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext, &Record) -> Result<(), String> + Send + Sync + 'static,
    {
        self.authorize = Some(Arc::new(f));
        self
    }

    pub fn index_value<F>(mut self, f: F) -> Self
    where
        F: Fn(&RequestContext) -> Option<String> + Send + Sync + 'static,
    {
        self.index_value = Some(Arc::new(f));
        self
    }
}

impl std::fmt::Debug for EndpointHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointHooks")
            .field("pre_save", &self.pre_save.is_some())
            .field("post_save", &self.post_save.is_some())
            .field("authorize", &self.authorize.is_some())
            .field("index_value", &self.index_value.is_some())
            .finish()
    }
}

/// Hooks keyed by resource path segment.
#[derive(Clone, Debug, Default)]
pub struct HookRegistry {
    by_path: HashMap<String, EndpointHooks>,
}

impl HookRegistry {
    pub fn new() -> Self {
        HookRegistry::default()
    }

    pub fn register(mut self, path_segment: impl Into<String>, hooks: EndpointHooks) -> Self {
        self.by_path.insert(path_segment.into(), hooks);
        self
    }

    /// Hooks for a resource; none registered means no hooks.
    pub fn for_path(&self, path_segment: &str) -> EndpointHooks {
        self.by_path.get(path_segment).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldValue;

    #[test]
    fn test_registry_defaults_to_no_hooks() {
        let registry = HookRegistry::new().register("notes", EndpointHooks::new().authorize(|_, _| Ok(())));
        assert!(registry.for_path("notes").authorize.is_some());
        let none = registry.for_path("other");
        assert!(none.authorize.is_none() && none.pre_save.is_none());
    }

    #[test]
    fn test_hooks_are_callable() {
        let hooks = EndpointHooks::new()
            .post_save(|mut r| {
                r.set("seen", FieldValue::Boolean(true));
                Ok(r)
            })
            .index_value(|ctx| ctx.tenant.clone());
        let out = (hooks.post_save.as_ref().unwrap())(Record::new()).unwrap();
        assert_eq!(out.get_bool("seen"), Some(true));
        let ctx = RequestContext::with_tenant(Some("acme".into()));
        assert_eq!((hooks.index_value.as_ref().unwrap())(&ctx).as_deref(), Some("acme"));
    }
}
