//! Router assembly: common routes plus one route pair per configured resource.

pub mod common;
pub mod resource;

pub use common::{common_routes, common_routes_with_ready};
pub use resource::resource_routes;

use crate::state::AppState;
use axum::Router;

/// Default request body limit for resource routes (1 MiB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Paths reserved by the common routes.
pub const RESERVED_SEGMENTS: [&str; 4] = ["health", "ready", "version", "info"];

/// Full application router.
pub fn app_router(state: AppState, body_limit: usize) -> Router {
    common_routes_with_ready(state.clone()).merge(resource_routes(&state, body_limit))
}
