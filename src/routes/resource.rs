//! Resource routes built from the resolved model: `/{segment}` and `/{segment}/:{lookup}`.

use crate::handlers::resource::{create, destroy, list, retrieve, update};
use crate::state::AppState;
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

pub fn resource_routes(state: &AppState, body_limit: usize) -> Router {
    let mut router = Router::new();
    for resource in &state.model.resources {
        let Some(resource_state) = state.resource_state(&resource.path_segment) else {
            continue;
        };
        let collection_path = format!("/{}", resource.path_segment);
        let item_path = format!("/{}/:{}", resource.path_segment, resource.lookup);
        tracing::info!(collection = %collection_path, item = %item_path, "resource routes");
        let routes = Router::new()
            .route(&collection_path, get(list).post(create))
            .route(&item_path, get(retrieve).put(update).patch(update).delete(destroy))
            .with_state(resource_state);
        router = router.merge(routes);
    }
    router.layer(ServiceBuilder::new().layer(RequestBodyLimitLayer::new(body_limit)))
}
