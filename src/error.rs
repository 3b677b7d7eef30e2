//! Typed errors for every call path: transport, envelope decoding, API failures, encoding
//! and state.

use crate::response::AppError;
use reqwest::Method;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing setting: {0}")]
    Missing(&'static str),
    #[error("invalid url for {name}: '{value}'")]
    InvalidUrl { name: &'static str, value: String },
    #[error("invalid region: {0} (expected us, eu or internal)")]
    InvalidRegion(String),
    #[error("invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// A record field that could not be projected into an attribute value.
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("{record}.{field}: {reason}")]
    Field {
        record: &'static str,
        field: &'static str,
        reason: String,
    },
    #[error("{record}.{field}: {source}")]
    Nested {
        record: &'static str,
        field: &'static str,
        #[source]
        source: Box<EncodingError>,
    },
    #[error("value cannot be encoded: {0}")]
    Value(String),
    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<EncodingError>,
    },
}

impl EncodingError {
    /// Attach record and field context to a bare value error.
    pub fn in_field(self, record: &'static str, field: &'static str) -> Self {
        match self {
            EncodingError::Value(reason) => EncodingError::Field {
                record,
                field,
                reason,
            },
            other => EncodingError::Nested {
                record,
                field,
                source: Box::new(other),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("invalid id attribute: {0}")]
    InvalidId(String),
    #[error("failed to set '{key}' to {value}: {reason}")]
    Set {
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{method} {url}: {source}")]
    Transport {
        method: Method,
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{method} {url}: failed to decode response (status {status}): {source}")]
    Decode {
        method: Method,
        url: String,
        status: u16,
        #[source]
        source: serde_json::Error,
    },
    #[error("{method} {url} returned an unexpected error with no body")]
    EmptyBody {
        method: Method,
        url: String,
        status: u16,
    },
    #[error("{method} {url} returned an error:\n{error}")]
    Api {
        method: Method,
        url: String,
        error: AppError,
    },
    #[error("{method} {url} returned an unexpected error: status {status}, envelope {envelope}")]
    Unparseable {
        method: Method,
        url: String,
        status: u16,
        envelope: String,
    },
    #[error("{method} {url}: failed to serialize payload: {source}")]
    Serialize {
        method: Method,
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{method} {url}: request cancelled")]
    Cancelled { method: Method, url: String },
    #[error("{method} {url} returned no data")]
    MissingData { method: Method, url: String },
    #[error("graphql {operation} failed (status {status}): {}", .messages.join("; "))]
    GraphQL {
        operation: String,
        status: u16,
        messages: Vec<String>,
    },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    State(#[from] StateError),
}

impl ApiError {
    /// HTTP status carried by the error, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Decode { status, .. }
            | ApiError::EmptyBody { status, .. }
            | ApiError::Unparseable { status, .. }
            | ApiError::GraphQL { status, .. } => Some(*status),
            ApiError::Api { error, .. } => Some(error.status),
            _ => None,
        }
    }

    /// Structured not-found check. Only API failures with a 404 status qualify.
    pub fn is_not_found(&self) -> bool {
        match self {
            ApiError::Api { error, .. } => error.status == 404,
            ApiError::Unparseable { status, .. } => *status == 404,
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled { .. })
    }
}
