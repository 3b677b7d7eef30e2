//! GraphQL request execution against the single GraphQL endpoint.
//!
//! A result shape names its operation through a field-path annotation such as
//! `createRotation(scheduleID: $scheduleID, input: $input)`. The query document is synthesized
//! from that annotation, the declared variables and the output type's selection set.

use crate::cancel::CancelToken;
use crate::config::ClientConfig;
use crate::error::ApiError;
use regex::Regex;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutate,
}

impl OperationKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutate => "mutation",
        }
    }
}

impl std::str::FromStr for OperationKind {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "query" => Ok(OperationKind::Query),
            "mutate" | "mutation" => Ok(OperationKind::Mutate),
            other => Err(ApiError::GraphQL {
                operation: other.to_string(),
                status: 0,
                messages: vec![format!("unknown operation kind: {other}")],
            }),
        }
    }
}

/// Requested field set of a GraphQL object.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selection {
    fields: Vec<(&'static str, Option<Selection>)>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fields(names: &[&'static str]) -> Self {
        Selection {
            fields: names.iter().map(|n| (*n, None)).collect(),
        }
    }

    pub fn field(mut self, name: &'static str) -> Self {
        self.fields.push((name, None));
        self
    }

    pub fn nested(mut self, name: &'static str, selection: Selection) -> Self {
        self.fields.push((name, Some(selection)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (name, nested) in &self.fields {
            write!(f, " {name}")?;
            if let Some(nested) = nested {
                if !nested.is_empty() {
                    write!(f, " {nested}")?;
                }
            }
        }
        f.write_str(" }")
    }
}

pub trait GraphQLObject {
    fn selection() -> Selection;
}

impl<T: GraphQLObject> GraphQLObject for Option<T> {
    fn selection() -> Selection {
        T::selection()
    }
}

impl<T: GraphQLObject> GraphQLObject for Vec<T> {
    fn selection() -> Selection {
        T::selection()
    }
}

impl GraphQLObject for bool {
    fn selection() -> Selection {
        Selection::new()
    }
}

/// Result shape: one top-level field carrying the operation annotation.
pub trait GraphQLOperation {
    type Output: DeserializeOwned + GraphQLObject;
    const FIELD: &'static str;
}

/// Named, typed variables in declaration order.
#[derive(Clone, Debug, Default)]
pub struct Variables {
    entries: Vec<(String, String, Value)>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `$name: graphql_type` with `value`.
    pub fn with(mut self, name: &str, graphql_type: &str, value: impl Into<Value>) -> Self {
        self.entries
            .push((name.to_string(), graphql_type.to_string(), value.into()));
        self
    }

    pub fn with_input<S: Serialize>(
        self,
        name: &str,
        graphql_type: &str,
        input: &S,
    ) -> Result<Self, serde_json::Error> {
        let value = serde_json::to_value(input)?;
        Ok(self.with(name, graphql_type, value))
    }

    fn definitions(&self) -> String {
        if self.entries.is_empty() {
            return String::new();
        }
        let defs: Vec<String> = self
            .entries
            .iter()
            .map(|(name, ty, _)| format!("${name}: {ty}"))
            .collect();
        format!(" ({})", defs.join(", "))
    }

    fn declares(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _, _)| n == name)
    }

    fn to_map(&self) -> Map<String, Value> {
        self.entries
            .iter()
            .map(|(name, _, value)| (name.clone(), value.clone()))
            .collect()
    }
}

/// Request body: `{"query": ..., "variables": {...}}`.
#[derive(Debug, Serialize)]
pub struct GraphQLRequest {
    pub query: String,
    pub variables: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Vec<GraphQLErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQLErrorEntry {
    message: String,
}

fn field_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*(?:(?P<alias>\w+)\s*:\s*)?(?P<name>\w+)\s*(?:\((?P<args>.*)\))?\s*$")
            .expect("static pattern")
    })
}

fn variable_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\$(\w+)").expect("static pattern"))
}

/// Parsed field annotation: response key, operation name and referenced variables.
#[derive(Debug, PartialEq)]
pub struct FieldPath {
    pub key: String,
    pub name: String,
    pub variables: Vec<String>,
}

pub fn parse_field(field: &str) -> Result<FieldPath, ApiError> {
    let caps = field_pattern()
        .captures(field)
        .ok_or_else(|| ApiError::GraphQL {
            operation: field.to_string(),
            status: 0,
            messages: vec![format!("invalid field annotation: {field}")],
        })?;
    let name = caps["name"].to_string();
    let key = caps
        .name("alias")
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| name.clone());
    let variables = caps
        .name("args")
        .map(|args| {
            variable_pattern()
                .captures_iter(args.as_str())
                .map(|c| c[1].to_string())
                .collect()
        })
        .unwrap_or_default();
    Ok(FieldPath {
        key,
        name,
        variables,
    })
}

/// Synthesize the request body for `O`. Every `$var` in the annotation must be declared.
pub fn build_request<O: GraphQLOperation>(
    kind: OperationKind,
    variables: &Variables,
) -> Result<GraphQLRequest, ApiError> {
    let path = parse_field(O::FIELD)?;
    let undeclared: Vec<String> = path
        .variables
        .iter()
        .filter(|v| !variables.declares(v))
        .map(|v| format!("undeclared variable ${v}"))
        .collect();
    if !undeclared.is_empty() {
        return Err(ApiError::GraphQL {
            operation: path.name,
            status: 0,
            messages: undeclared,
        });
    }

    let selection = O::Output::selection();
    let body = if selection.is_empty() {
        O::FIELD.trim().to_string()
    } else {
        format!("{} {selection}", O::FIELD.trim())
    };
    Ok(GraphQLRequest {
        query: format!("{}{} {{ {body} }}", kind.keyword(), variables.definitions()),
        variables: variables.to_map(),
    })
}

/// Run one query or mutation. On any reported error no result is returned.
pub async fn execute<O: GraphQLOperation>(
    http: &reqwest::Client,
    config: &ClientConfig,
    kind: OperationKind,
    variables: &Variables,
    cancel: &CancelToken,
) -> Result<O::Output, ApiError> {
    let path = parse_field(O::FIELD)?;
    let request = build_request::<O>(kind, variables)?;
    let url = config.graphql_url.clone();
    let body = serde_json::to_vec(&request).map_err(|source| ApiError::Serialize {
        method: Method::POST,
        url: url.clone(),
        source,
    })?;

    let builder = http
        .post(&url)
        .header(AUTHORIZATION, format!("Bearer {}", config.access_token))
        .header(USER_AGENT, config.user_agent.as_str())
        .header(CONTENT_TYPE, "application/json")
        .body(body);

    tracing::debug!(operation = %path.name, kind = kind.keyword(), "graphql request");
    let send = async {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok::<_, reqwest::Error>((status, body))
    };
    let (status, body) = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(ApiError::Cancelled { method: Method::POST, url });
        }
        result = send => result.map_err(|source| ApiError::Transport {
            method: Method::POST,
            url: url.clone(),
            source,
        })?,
    };

    let parsed = serde_json::from_slice::<Map<String, Value>>(&body)
        .and_then(|object| serde_json::from_value::<GraphQLResponse>(Value::Object(object)));
    if !status.is_success() {
        let messages = match parsed {
            Ok(r) if !r.errors.is_empty() => r.errors.into_iter().map(|e| e.message).collect(),
            _ => vec![format!(
                "unexpected status {}: {}",
                status.as_u16(),
                String::from_utf8_lossy(&body)
            )],
        };
        tracing::warn!(operation = %path.name, status = status.as_u16(), "graphql call failed");
        return Err(ApiError::GraphQL {
            operation: path.name,
            status: status.as_u16(),
            messages,
        });
    }

    let response = parsed.map_err(|source| ApiError::Decode {
        method: Method::POST,
        url: url.clone(),
        status: status.as_u16(),
        source,
    })?;
    if !response.errors.is_empty() {
        tracing::warn!(operation = %path.name, errors = response.errors.len(), "graphql errors");
        return Err(ApiError::GraphQL {
            operation: path.name,
            status: status.as_u16(),
            messages: response.errors.into_iter().map(|e| e.message).collect(),
        });
    }

    let mut data = match response.data {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };
    let value = data.remove(&path.key).ok_or_else(|| ApiError::GraphQL {
        operation: path.name.clone(),
        status: status.as_u16(),
        messages: vec![format!("response has no field '{}'", path.key)],
    })?;
    serde_json::from_value(value).map_err(|source| ApiError::Decode {
        method: Method::POST,
        url,
        status: status.as_u16(),
        source,
    })
}
