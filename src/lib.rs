//! Dyno SDK: schema-configurable REST CRUD layer over a partitioned key-value store.

pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod logging;
pub mod response;
pub mod routes;
pub mod schema;
pub mod service;
pub mod state;
pub mod store;

pub use config::{
    load_from_path, load_from_str, resolve, FieldSpec, FieldType, FullConfig, ResolvedModel, ResolvedResource,
    ResourceConfig, Settings, StoreKind,
};
pub use error::{AppError, CursorError, FieldErrors, SchemaError, SettingsError, StoreError};
pub use logging::init_tracing;
pub use routes::{app_router, common_routes, common_routes_with_ready, resource_routes, DEFAULT_BODY_LIMIT};
pub use schema::{Record, StorageModel};
pub use service::{
    CollectionEndpoint, CursorCodec, EndpointHooks, HookRegistry, ItemEndpoint, PaginationCursor, RequestContext,
    ValidationMode, ValidationModel,
};
pub use state::{AppState, ResourceState};
pub use store::{DynamoStore, MemoryStore, RecordStore};
