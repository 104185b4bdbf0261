//! Resource handlers: list, create, retrieve, update, destroy.

use crate::error::AppError;
use crate::response::{created, empty_ok, ok};
use crate::service::{parse_limit, CollectionEndpoint, ItemEndpoint, RequestContext};
use crate::state::ResourceState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

fn collection(state: &ResourceState) -> CollectionEndpoint<'_> {
    CollectionEndpoint::new(&state.resource, state.store.as_ref(), &state.hooks)
}

fn item(state: &ResourceState) -> ItemEndpoint<'_> {
    ItemEndpoint::new(&state.resource, state.store.as_ref(), &state.hooks)
}

fn lookup<'p>(state: &ResourceState, params: &'p HashMap<String, String>) -> Option<&'p str> {
    params.get(&state.resource.lookup).map(String::as_str)
}

pub async fn list(
    State(state): State<ResourceState>,
    ctx: RequestContext,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let limit = parse_limit(params.get("limit").map(String::as_str))?;
    let next_key = params.get("next_key").map(String::as_str);
    let page = collection(&state).list(&ctx, next_key, limit).await?;
    Ok(ok(page))
}

pub async fn create(
    State(state): State<ResourceState>,
    ctx: RequestContext,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let record = collection(&state).create(&ctx, body).await?;
    Ok(created(record))
}

pub async fn retrieve(
    State(state): State<ResourceState>,
    ctx: RequestContext,
    Path(params): Path<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let record = item(&state).retrieve(&ctx, lookup(&state, &params)).await?;
    Ok(ok(record))
}

/// PUT and PATCH: both partial.
pub async fn update(
    State(state): State<ResourceState>,
    ctx: RequestContext,
    Path(params): Path<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let record = item(&state).update(&ctx, lookup(&state, &params), body).await?;
    Ok(ok(record))
}

pub async fn destroy(
    State(state): State<ResourceState>,
    ctx: RequestContext,
    Path(params): Path<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    item(&state).destroy(&ctx, lookup(&state, &params)).await?;
    Ok(empty_ok())
}
