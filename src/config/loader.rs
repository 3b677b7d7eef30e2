//! Load client config from the process environment (and a `.env` file when present).

use crate::config::types::{ClientConfig, Region};
use crate::config::validate;
use crate::error::ConfigError;
use std::time::Duration;

pub const ENV_HOST: &str = "ONCALL_HOST";
pub const ENV_REGION: &str = "ONCALL_REGION";
pub const ENV_ACCESS_TOKEN: &str = "ONCALL_ACCESS_TOKEN";
pub const ENV_REFRESH_TOKEN: &str = "ONCALL_REFRESH_TOKEN";
pub const ENV_USER_AGENT: &str = "ONCALL_USER_AGENT";
pub const ENV_TIMEOUT_SECS: &str = "ONCALL_TIMEOUT_SECS";
pub const ENV_BASE_URL_V2: &str = "ONCALL_BASE_URL_V2";
pub const ENV_BASE_URL_V3: &str = "ONCALL_BASE_URL_V3";
pub const ENV_BASE_URL_V4: &str = "ONCALL_BASE_URL_V4";
pub const ENV_GRAPHQL_URL: &str = "ONCALL_GRAPHQL_URL";

impl ClientConfig {
    /// Build from `ONCALL_*` variables. A `.env` file in the working directory is loaded first.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        load_with(|key| std::env::var(key).ok())
    }
}

/// Build config from an arbitrary key lookup. `ONCALL_HOST` wins over `ONCALL_REGION`;
/// with neither set the US region is used. Empty values count as unset.
pub fn load_with<F>(lookup: F) -> Result<ClientConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    let access_token = get(ENV_ACCESS_TOKEN).ok_or(ConfigError::Missing(ENV_ACCESS_TOKEN))?;
    let mut config = match (get(ENV_HOST), get(ENV_REGION)) {
        (Some(host), _) => ClientConfig::for_host(host, access_token),
        (None, Some(region)) => ClientConfig::for_region(region.parse::<Region>()?, access_token),
        (None, None) => ClientConfig::for_region(Region::Us, access_token),
    };

    if let Some(refresh) = get(ENV_REFRESH_TOKEN) {
        config.refresh_token = Some(refresh);
    }
    if let Some(user_agent) = get(ENV_USER_AGENT) {
        config.user_agent = user_agent;
    }
    if let Some(secs) = get(ENV_TIMEOUT_SECS) {
        let n: u64 = secs.parse().map_err(|_| ConfigError::InvalidValue {
            name: ENV_TIMEOUT_SECS,
            value: secs.clone(),
        })?;
        config.timeout = Duration::from_secs(n);
    }
    if let Some(url) = get(ENV_BASE_URL_V2) {
        config.base_url_v2 = url;
    }
    if let Some(url) = get(ENV_BASE_URL_V3) {
        config.base_url_v3 = url;
    }
    if let Some(url) = get(ENV_BASE_URL_V4) {
        config.base_url_v4 = url;
    }
    if let Some(url) = get(ENV_GRAPHQL_URL) {
        config.graphql_url = url;
    }

    validate(&config)?;
    tracing::debug!(host = %config.host, region = ?config.region, "client config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn token_is_required() {
        let err = load_with(lookup(&[(ENV_HOST, "oncall.io")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(ENV_ACCESS_TOKEN)));
    }

    #[test]
    fn host_wins_over_region() {
        let config = load_with(lookup(&[
            (ENV_ACCESS_TOKEN, "tok"),
            (ENV_HOST, "staging.oncall.io"),
            (ENV_REGION, "eu"),
        ]))
        .unwrap();
        assert_eq!(config.host, "staging.oncall.io");
        assert_eq!(config.region, None);
    }

    #[test]
    fn region_default_and_overrides() {
        let config = load_with(lookup(&[
            (ENV_ACCESS_TOKEN, "tok"),
            (ENV_TIMEOUT_SECS, "5"),
            (ENV_GRAPHQL_URL, "http://127.0.0.1:9000/graphql"),
            (ENV_USER_AGENT, ""),
        ]))
        .unwrap();
        assert_eq!(config.region, Some(Region::Us));
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.graphql_url, "http://127.0.0.1:9000/graphql");
        assert_eq!(config.user_agent, crate::config::DEFAULT_USER_AGENT);
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = load_with(lookup(&[(ENV_ACCESS_TOKEN, "tok"), (ENV_TIMEOUT_SECS, "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: ENV_TIMEOUT_SECS, .. }));
    }
}
