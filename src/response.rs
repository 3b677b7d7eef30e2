//! Response envelope and the structured error carried in a failing envelope's meta.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Wire shape of every REST response: `{"data": T, "meta": {"meta": AppError}}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Decode a response body. Only a JSON object is an envelope; the derived struct
    /// deserializer would also take a sequence positionally.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        let object: Map<String, Value> = serde_json::from_slice(body)?;
        serde_json::from_value(Value::Object(object))
    }
}

impl<T> Envelope<T> {
    /// Structured error from `meta.meta`, or None when it is absent or malformed.
    pub fn app_error(&self) -> Option<AppError> {
        let meta = self.meta.as_ref()?;
        serde_json::from_value::<Meta>(meta.clone())
            .ok()
            .map(|m| m.meta)
    }
}

#[derive(Debug, Deserialize)]
struct Meta {
    meta: AppError,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppError {
    #[serde(default)]
    pub status: u16,
    #[serde(rename = "error_message")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conflict_data: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status, self.message)?;
        if let Some(details) = &self.error_details {
            write!(f, "\n{details}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "code: {}", self.code)?;
        if let Some(description) = &self.description {
            write!(f, "\ndescription: {description}")?;
        }
        if let Some(link) = &self.link {
            write!(f, "\nlink: {link}")?;
        }
        if let Some(errors) = &self.errors {
            write!(f, "\nerrors: {errors}")?;
        }
        Ok(())
    }
}
