//! Typed domain operations built on the executors and the encoder.

pub mod escalation_policies;
pub mod schedules;
pub mod services;
pub mod teams;
pub mod users;

use crate::encode::{Encode, Field, Projectable, ToAttribute};
use crate::error::ApiError;
use reqwest::{Method, Url};
use serde::{Deserialize, Serialize};

/// Reference to an owning or targeted entity. Projects to exactly `{id, type}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntityRef {
    pub fn new(id: impl Into<String>, kind: impl Into<String>) -> Self {
        EntityRef {
            id: id.into(),
            kind: kind.into(),
            name: None,
        }
    }
}

impl Projectable for EntityRef {
    const RECORD: &'static str = "EntityRef";
    const FIELDS: &'static [Field<Self>] = &[
        Field::attr("id", "id", |r| r.id.to_attribute()),
        Field::attr("kind", "type", |r| r.kind.to_attribute()),
        Field::internal("name"),
    ];
}

impl Encode for EntityRef {}

/// Unwrap a create/update result that must carry data.
fn required<T>(value: Option<T>, method: Method, url: &str) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::MissingData {
        method,
        url: url.to_string(),
    })
}

/// Append query parameters, percent-encoding values.
fn with_query(url: &str, params: &[(&str, &str)]) -> String {
    match Url::parse_with_params(url, params) {
        Ok(u) => u.to_string(),
        Err(_) => url.to_string(),
    }
}
