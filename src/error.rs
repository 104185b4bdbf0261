//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Bad or empty field/resource configuration. Fatal at startup.
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("fields should not be empty (model '{0}')")]
    EmptyFields(String),
    #[error("field name must not be empty (model '{0}')")]
    MissingName(String),
    #[error("duplicate field '{field}' in model '{model}'")]
    DuplicateField { model: String, field: String },
    #[error("invalid type '{type_name}' for field '{field}'")]
    UnsupportedType { field: String, type_name: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Bad process setting. Fatal at startup.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("DYNO_STORE must be memory or dynamodb, got '{0}'")]
    UnknownStore(String),
    #[error("BIND_ADDR '{value}': {source}")]
    BindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("DYNO_BODY_LIMIT '{value}': {source}")]
    BodyLimit {
        value: String,
        source: std::num::ParseIntError,
    },
}

/// Malformed or tampered pagination token.
#[derive(Error, Debug)]
pub enum CursorError {
    #[error("next_key is not valid base64")]
    Encoding(#[from] base64::DecodeError),
    #[error("next_key is not valid utf-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("next_key is not a valid cursor: {0}")]
    Json(#[from] serde_json::Error),
    #[error("next_key must not be empty")]
    Empty,
}

/// Failure reported by the record store (or by a hook running around it).
#[derive(Error, Debug, Clone)]
pub enum StoreError {
    #[error("missing key attribute '{0}'")]
    MissingKey(String),
    #[error("{0}")]
    Backend(String),
    #[error("{0}")]
    Hook(String),
}

/// Field-keyed validation messages, e.g. `{"title": ["This field is required."]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(pub BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        FieldErrors(BTreeMap::new())
    }

    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields: Vec<&str> = self.0.keys().map(String::as_str).collect();
        write!(f, "invalid fields: {}", fields.join(", "))
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("validation: {0}")]
    Validation(FieldErrors),
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Schema(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Cursor(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Store(_) => StatusCode::BAD_REQUEST,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            AppError::Schema(_) => "schema_error",
            AppError::Validation(_) => "validation_error",
            AppError::Cursor(_) => "invalid_cursor",
            AppError::NotFound(_) => "not_found",
            AppError::Forbidden(_) => "forbidden",
            AppError::Store(_) => "store_error",
            AppError::BadRequest(_) => "bad_request",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Validation(errors) = self {
            return (status, Json(errors)).into_response();
        }
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code().to_string(),
                message: self.to_string(),
                details: None,
            },
        };
        (status, Json(body)).into_response()
    }
}
