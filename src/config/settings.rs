//! Process settings from the environment (`.env` honoured).

use crate::error::SettingsError;
use std::net::SocketAddr;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_CONFIG_PATH: &str = "dyno.json";

/// Which record store backs the server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Memory,
    DynamoDb,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub config_path: String,
    pub store: StoreKind,
    pub bind_addr: SocketAddr,
    /// Overrides the DynamoDB endpoint (e.g. DynamoDB Local).
    pub dynamodb_endpoint: Option<String>,
    /// Request body limit in bytes for resource routes.
    pub body_limit: usize,
}

impl Settings {
    /// Reads `DYNO_CONFIG_PATH`, `DYNO_STORE` (`memory` | `dynamodb`), `BIND_ADDR`,
    /// `DYNAMODB_ENDPOINT` and `DYNO_BODY_LIMIT`.
    pub fn from_env() -> Result<Self, SettingsError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let store = match get("DYNO_STORE").as_deref().map(str::trim) {
            None | Some("") | Some("memory") => StoreKind::Memory,
            Some("dynamodb") => StoreKind::DynamoDb,
            Some(other) => return Err(SettingsError::UnknownStore(other.to_string())),
        };
        let bind = get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind.parse().map_err(|source| SettingsError::BindAddr {
            value: bind.clone(),
            source,
        })?;
        let body_limit = match get("DYNO_BODY_LIMIT") {
            Some(v) => v.trim().parse().map_err(|source| SettingsError::BodyLimit { value: v.clone(), source })?,
            None => crate::routes::DEFAULT_BODY_LIMIT,
        };
        Ok(Settings {
            config_path: get("DYNO_CONFIG_PATH").unwrap_or_else(|| DEFAULT_CONFIG_PATH.into()),
            store,
            bind_addr,
            dynamodb_endpoint: get("DYNAMODB_ENDPOINT").filter(|s| !s.trim().is_empty()),
            body_limit,
        })
    }
}
