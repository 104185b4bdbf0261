//! Example consumer: serves the resources in `DYNO_CONFIG_PATH` over the configured store.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Or from this directory: `DYNO_CONFIG_PATH=dyno.json cargo run`

use dyno_sdk::{
    app_router, init_tracing, load_from_path, resolve, AppState, DynamoStore, EndpointHooks, HookRegistry,
    MemoryStore, RecordStore, Settings, StoreKind,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("dyno_sdk=info,example_consumer=info");

    let settings = Settings::from_env()?;
    let config = load_from_path(&settings.config_path).await?;
    let model = resolve(&config)?;

    let store: Arc<dyn RecordStore> = match settings.store {
        StoreKind::Memory => Arc::new(MemoryStore::new()),
        StoreKind::DynamoDb => Arc::new(DynamoStore::from_env(settings.dynamodb_endpoint.clone()).await),
    };

    // Notes are private to the tenant that created them.
    let hooks = HookRegistry::new().register(
        "notes",
        EndpointHooks::new().authorize(|ctx, record| match (ctx.tenant.as_deref(), record.get_str("extension")) {
            (Some(tenant), Some(owner)) if tenant == owner => Ok(()),
            _ => Err("note belongs to another tenant".into()),
        }),
    );

    let state = AppState::new(store, model).with_hooks(hooks);
    let app = app_router(state, settings.body_limit);
    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
