//! Shared client handle. Config is swappable between calls (token refresh) and read once per call.

use crate::cancel::CancelToken;
use crate::config::{validate, AccessToken, ClientConfig, ENV_REFRESH_TOKEN};
use crate::error::{ApiError, ConfigError};
use crate::graphql::{self, GraphQLOperation, OperationKind, Variables};
use crate::request::{self, CallDescriptor};
use reqwest::header::HeaderName;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const X_REFRESH_TOKEN: HeaderName = HeaderName::from_static("x-refresh-token");

const REFRESH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    /// Replaced wholesale or token-patched by the refresh collaborator; calls take a snapshot.
    config: Arc<RwLock<ClientConfig>>,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        validate(&config)?;
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::InvalidValue {
                name: "http client",
                value: e.to_string(),
            })?;
        Ok(ApiClient {
            http,
            config: Arc::new(RwLock::new(config)),
        })
    }

    /// Snapshot of the current config.
    pub fn config(&self) -> ClientConfig {
        match self.config.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_access_token(&self, token: AccessToken) {
        let mut guard = match self.config.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.access_token = token.token;
        tracing::info!(expires_at = %token.expires_at, "access token replaced");
    }

    /// Exchange the configured refresh token for a new access token and swap it in.
    /// Bounded by `REFRESH_TIMEOUT` on top of the caller's own token.
    pub async fn refresh_access_token(
        &self,
        cancel: &CancelToken,
    ) -> Result<AccessToken, ApiError> {
        let config = self.config();
        let refresh = config
            .refresh_token
            .clone()
            .ok_or(ConfigError::Missing(ENV_REFRESH_TOKEN))?;
        let url = join(&config.auth_base_url, "oauth/access-token");
        let cancel = cancel.child_with_timeout(REFRESH_TIMEOUT);
        let call = CallDescriptor::new(Method::POST, url.clone(), &cancel)
            .with_header(X_REFRESH_TOKEN, refresh);
        let token: AccessToken = request::execute::<(), _>(&self.http, &config, call)
            .await?
            .ok_or(ApiError::MissingData {
                method: Method::POST,
                url,
            })?;
        self.set_access_token(token.clone());
        Ok(token)
    }

    pub fn v2(&self, path: &str) -> String {
        join(&self.config().base_url_v2, path)
    }

    pub fn v3(&self, path: &str) -> String {
        join(&self.config().base_url_v3, path)
    }

    pub fn v4(&self, path: &str) -> String {
        join(&self.config().base_url_v4, path)
    }

    pub async fn execute<P, T>(&self, call: CallDescriptor<'_, P>) -> Result<Option<T>, ApiError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let config = self.config();
        request::execute(&self.http, &config, call).await
    }

    pub async fn execute_slice<P, T>(&self, call: CallDescriptor<'_, P>) -> Result<Vec<T>, ApiError>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let config = self.config();
        request::execute_slice(&self.http, &config, call).await
    }

    pub async fn graphql<O: GraphQLOperation>(
        &self,
        kind: OperationKind,
        variables: &Variables,
        cancel: &CancelToken,
    ) -> Result<O::Output, ApiError> {
        let config = self.config();
        graphql::execute::<O>(&self.http, &config, kind, variables, cancel).await
    }
}

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}
