//! Resolved resource model: config validated and built into runtime models.

use crate::schema::StorageModel;
use crate::service::ValidationModel;
use std::collections::HashMap;

/// One resource ready to serve: both models come from the same field list.
#[derive(Clone, Debug)]
pub struct ResolvedResource {
    pub path_segment: String,
    /// Path parameter name of item routes.
    pub lookup: String,
    pub generate_id: bool,
    pub hard_delete: bool,
    pub default_limit: usize,
    pub max_limit: Option<usize>,
    /// Static index partition value, if configured.
    pub index_value: Option<String>,
    pub storage: StorageModel,
    pub validation: ValidationModel,
}

impl ResolvedResource {
    /// Requested page size, defaulted and clamped.
    pub fn page_size(&self, requested: Option<usize>) -> usize {
        let limit = requested.unwrap_or(self.default_limit);
        match self.max_limit {
            Some(max) => limit.min(max),
            None => limit,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub resources: Vec<ResolvedResource>,
    pub by_path: HashMap<String, usize>,
}

impl ResolvedModel {
    pub fn resource_by_path(&self, path: &str) -> Option<&ResolvedResource> {
        self.by_path.get(path).map(|&i| &self.resources[i])
    }
}
