//! Shared application state. Models are resolved once at startup and never change.

use crate::config::{ResolvedModel, ResolvedResource};
use crate::service::{EndpointHooks, HookRegistry};
use crate::store::RecordStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub model: Arc<ResolvedModel>,
    pub hooks: Arc<HookRegistry>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, model: ResolvedModel) -> Self {
        AppState {
            store,
            model: Arc::new(model),
            hooks: Arc::new(HookRegistry::new()),
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    /// State for one resource's routes.
    pub fn resource_state(&self, path_segment: &str) -> Option<ResourceState> {
        let resource = self.model.resource_by_path(path_segment)?;
        Some(ResourceState {
            store: self.store.clone(),
            resource: Arc::new(resource.clone()),
            hooks: Arc::new(self.hooks.for_path(path_segment)),
        })
    }
}

/// Per-resource handler state.
#[derive(Clone)]
pub struct ResourceState {
    pub store: Arc<dyn RecordStore>,
    pub resource: Arc<ResolvedResource>,
    pub hooks: Arc<EndpointHooks>,
}
