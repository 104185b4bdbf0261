//! Service routes outside any resource: liveness, store readiness, build and resource listing.

use crate::config::ResolvedResource;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
}

#[derive(Serialize)]
struct Readiness {
    status: &'static str,
    store: &'static str,
    resources: usize,
}

#[derive(Serialize)]
struct BuildInfo {
    name: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct FieldInfo {
    name: String,
    #[serde(rename = "type")]
    field_type: &'static str,
    required: bool,
}

/// Public shape of one configured resource.
#[derive(Serialize)]
struct ResourceInfo {
    path: String,
    lookup: String,
    table: String,
    index: Option<String>,
    hard_delete: bool,
    default_limit: usize,
    fields: Vec<FieldInfo>,
}

impl From<&ResolvedResource> for ResourceInfo {
    fn from(r: &ResolvedResource) -> Self {
        let identity = r.storage.identity();
        ResourceInfo {
            path: format!("/{}", r.path_segment),
            lookup: r.lookup.clone(),
            table: identity.table_name.clone(),
            index: identity.index.as_ref().map(|i| i.name.clone()),
            hard_delete: r.hard_delete,
            default_limit: r.default_limit,
            fields: r
                .validation
                .rules()
                .iter()
                .map(|rule| FieldInfo {
                    name: rule.name.clone(),
                    field_type: rule.field_type.as_str(),
                    required: rule.required,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct ServiceInfo {
    #[serde(flatten)]
    build: BuildInfo,
    resources: Vec<ResourceInfo>,
}

fn build_info() -> BuildInfo {
    BuildInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    }
}

async fn health() -> Json<Liveness> {
    Json(Liveness { status: "ok" })
}

async fn version() -> Json<BuildInfo> {
    Json(build_info())
}

async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let resources = state.model.resources.len();
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Readiness {
                status: "ok",
                store: "ok",
                resources,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "store not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Readiness {
                    status: "degraded",
                    store: "unavailable",
                    resources,
                }),
            )
        }
    }
}

async fn info(State(state): State<AppState>) -> Json<ServiceInfo> {
    Json(ServiceInfo {
        build: build_info(),
        resources: state.model.resources.iter().map(ResourceInfo::from).collect(),
    })
}

/// Stateless subset: GET /health, GET /version.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

/// Full service routes: adds GET /ready (store ping) and GET /info (configured resources).
pub fn common_routes_with_ready(state: AppState) -> Router {
    common_routes().merge(
        Router::new()
            .route("/ready", get(ready))
            .route("/info", get(info))
            .with_state(state),
    )
}
