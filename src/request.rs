//! REST request execution: one HTTP call, envelope decoding and error classification.

use crate::cancel::CancelToken;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::response::Envelope;
use reqwest::header::{HeaderName, AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// One outbound call. Built per call and dropped once the response is resolved.
pub struct CallDescriptor<'a, P = ()> {
    pub method: Method,
    pub url: String,
    pub payload: Option<&'a P>,
    /// Sent in addition to the authorization and user-agent headers.
    pub headers: Vec<(HeaderName, String)>,
    pub cancel: &'a CancelToken,
}

impl<'a> CallDescriptor<'a, ()> {
    pub fn new(method: Method, url: impl Into<String>, cancel: &'a CancelToken) -> Self {
        CallDescriptor {
            method,
            url: url.into(),
            payload: None,
            headers: Vec::new(),
            cancel,
        }
    }

    pub fn get(url: impl Into<String>, cancel: &'a CancelToken) -> Self {
        Self::new(Method::GET, url, cancel)
    }

    pub fn delete(url: impl Into<String>, cancel: &'a CancelToken) -> Self {
        Self::new(Method::DELETE, url, cancel)
    }
}

impl<'a, P> CallDescriptor<'a, P> {
    pub fn with_payload<Q>(self, payload: &'a Q) -> CallDescriptor<'a, Q> {
        CallDescriptor {
            method: self.method,
            url: self.url,
            payload: Some(payload),
            headers: self.headers,
            cancel: self.cancel,
        }
    }

    pub fn with_header(mut self, name: HeaderName, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// Perform the call and decode `data` as `T`.
///
/// `Ok(None)` is the no-content outcome: an empty body with a success status, or an envelope
/// whose `data` is absent. Any status above 299 is an error regardless of body shape.
pub async fn execute<P, T>(
    http: &reqwest::Client,
    config: &ClientConfig,
    call: CallDescriptor<'_, P>,
) -> Result<Option<T>, ApiError>
where
    P: Serialize,
    T: DeserializeOwned,
{
    let CallDescriptor {
        method,
        url,
        payload,
        headers,
        cancel,
    } = call;

    let mut builder = http
        .request(method.clone(), &url)
        .header(AUTHORIZATION, format!("Bearer {}", config.access_token))
        .header(USER_AGENT, config.user_agent.as_str());
    for (name, value) in headers {
        builder = builder.header(name, value);
    }
    if method != Method::GET {
        if let Some(payload) = payload {
            let body = serde_json::to_vec(payload).map_err(|source| ApiError::Serialize {
                method: method.clone(),
                url: url.clone(),
                source,
            })?;
            builder = builder.header(CONTENT_TYPE, "application/json").body(body);
        }
    }

    tracing::debug!(method = %method, url = %url, "request");
    let send = async {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        Ok::<_, reqwest::Error>((status, body))
    };
    let (status, body) = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::debug!(method = %method, url = %url, "request cancelled");
            return Err(ApiError::Cancelled { method, url });
        }
        result = send => result.map_err(|source| ApiError::Transport {
            method: method.clone(),
            url: url.clone(),
            source,
        })?,
    };
    tracing::debug!(
        method = %method,
        url = %url,
        status = status.as_u16(),
        bytes = body.len(),
        "response"
    );

    decode(method, url, status, &body)
}

/// Like [`execute`] for list endpoints. Absent `data` and no-content both yield an empty list.
pub async fn execute_slice<P, T>(
    http: &reqwest::Client,
    config: &ClientConfig,
    call: CallDescriptor<'_, P>,
) -> Result<Vec<T>, ApiError>
where
    P: Serialize,
    T: DeserializeOwned,
{
    Ok(execute::<P, Vec<T>>(http, config, call).await?.unwrap_or_default())
}

fn is_failure(status: StatusCode) -> bool {
    status.as_u16() > 299
}

/// Classify a complete response. Split from the transport so it can be exercised directly.
pub fn decode<T: DeserializeOwned>(
    method: Method,
    url: String,
    status: StatusCode,
    body: &[u8],
) -> Result<Option<T>, ApiError> {
    if body.is_empty() {
        if is_failure(status) {
            tracing::warn!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                "error response with no body"
            );
            return Err(ApiError::EmptyBody {
                method,
                url,
                status: status.as_u16(),
            });
        }
        return Ok(None);
    }

    let envelope: Envelope<Value> =
        Envelope::from_slice(body).map_err(|source| ApiError::Decode {
            method: method.clone(),
            url: url.clone(),
            status: status.as_u16(),
            source,
        })?;

    if is_failure(status) {
        tracing::warn!(method = %method, url = %url, status = status.as_u16(), "error response");
        return Err(match envelope.app_error() {
            Some(mut error) => {
                error.status = status.as_u16();
                ApiError::Api { method, url, error }
            }
            None => ApiError::Unparseable {
                method,
                url,
                status: status.as_u16(),
                envelope: String::from_utf8_lossy(body).into_owned(),
            },
        });
    }

    match envelope.data {
        None | Some(Value::Null) => Ok(None),
        Some(data) => serde_json::from_value(data)
            .map(Some)
            .map_err(|source| ApiError::Decode {
                method,
                url,
                status: status.as_u16(),
                source,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Team {
        id: String,
        name: String,
    }

    fn run<T: DeserializeOwned>(status: u16, body: &str) -> Result<Option<T>, ApiError> {
        decode(
            Method::GET,
            "https://api.oncall.io/v3/teams/t1".into(),
            StatusCode::from_u16(status).unwrap(),
            body.as_bytes(),
        )
    }

    #[test]
    fn empty_body_success_is_no_content() {
        assert!(run::<Team>(201, "").unwrap().is_none());
    }

    #[test]
    fn empty_body_failure_is_opaque() {
        let err = run::<Team>(404, "").unwrap_err();
        assert!(matches!(err, ApiError::EmptyBody { status: 404, .. }));
        assert_eq!(
            err.to_string(),
            "GET https://api.oncall.io/v3/teams/t1 returned an unexpected error with no body"
        );
    }

    #[test]
    fn data_is_decoded() {
        let team = run::<Team>(200, r#"{"data":{"id":"t1","name":"ops"}}"#).unwrap();
        assert_eq!(
            team,
            Some(Team {
                id: "t1".into(),
                name: "ops".into()
            })
        );
    }

    #[test]
    fn missing_data_is_absent() {
        assert!(run::<Team>(200, r#"{"meta":{}}"#).unwrap().is_none());
    }

    #[test]
    fn failing_status_with_meta_is_api_error() {
        let err = run::<Team>(
            404,
            r#"{"meta":{"meta":{"status":404,"error_message":"team not found"}}}"#,
        )
        .unwrap_err();
        assert!(err.is_not_found());
        let rendered = err.to_string();
        assert!(rendered.contains("GET https://api.oncall.io/v3/teams/t1"));
        assert!(rendered.contains("404 team not found"));
    }

    #[test]
    fn app_error_status_follows_transport() {
        let err = run::<Team>(
            403,
            r#"{"meta":{"meta":{"status":200,"error_message":"forbidden"}}}"#,
        )
        .unwrap_err();
        assert_eq!(err.status(), Some(403));
        assert!(!err.is_not_found());
    }

    #[test]
    fn failing_status_without_meta_keeps_raw_envelope() {
        let err = run::<Team>(500, r#"{"data":null}"#).unwrap_err();
        match err {
            ApiError::Unparseable {
                status, envelope, ..
            } => {
                assert_eq!(status, 500);
                assert_eq!(envelope, r#"{"data":null}"#);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn failing_status_with_data_is_still_an_error() {
        let err = run::<Team>(409, r#"{"data":{"id":"t1","name":"ops"}}"#).unwrap_err();
        assert!(matches!(err, ApiError::Unparseable { status: 409, .. }));
    }

    #[test]
    fn undecodable_body_is_decode_error() {
        let err = run::<Team>(200, "<html>").unwrap_err();
        assert!(matches!(err, ApiError::Decode { status: 200, .. }));
        let err = run::<Team>(200, r#"{"data":{"id":7}}"#).unwrap_err();
        assert!(matches!(err, ApiError::Decode { .. }));
    }

    #[test]
    fn array_body_is_not_an_envelope() {
        let body = r#"[{"id":"t1","name":"a"},{"id":"t2","name":"b"}]"#;
        let err = run::<Team>(200, body).unwrap_err();
        assert!(matches!(err, ApiError::Decode { status: 200, .. }));
        let body = r#"[null, {"meta": {"status": 500, "error_message": "x"}}]"#;
        let err = run::<Vec<Team>>(500, body).unwrap_err();
        assert!(matches!(err, ApiError::Decode { status: 500, .. }));
    }
}
