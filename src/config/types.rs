//! Client configuration: host, bearer token, user agent and the base URL of each API generation.

use crate::error::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("oncall-sdk/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Us,
    Eu,
    Internal,
}

impl Region {
    pub fn host(&self) -> &'static str {
        match self {
            Region::Us => "oncall.io",
            Region::Eu => "eu.oncall.io",
            Region::Internal => "oncall.local",
        }
    }
}

impl std::str::FromStr for Region {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "us" => Ok(Region::Us),
            "eu" => Ok(Region::Eu),
            "internal" => Ok(Region::Internal),
            _ => Err(ConfigError::InvalidRegion(s.to_string())),
        }
    }
}

/// Bearer token issued by the token-refresh service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    #[serde(rename = "access_token")]
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Long-lived client configuration. Read (never mutated) by the executors; the token is
/// replaced between calls by whoever refreshes it.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub host: String,
    pub region: Option<Region>,
    pub user_agent: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub base_url_v2: String,
    pub base_url_v3: String,
    pub base_url_v4: String,
    pub graphql_url: String,
    pub auth_base_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    /// Derive every base URL from the API host.
    pub fn for_host(host: impl Into<String>, access_token: impl Into<String>) -> Self {
        let host = host.into();
        ClientConfig {
            base_url_v2: format!("https://api.{host}/v2"),
            base_url_v3: format!("https://api.{host}/v3"),
            base_url_v4: format!("https://api.{host}/v4"),
            graphql_url: format!("https://api.{host}/v3/graphql"),
            auth_base_url: format!("https://auth.{host}"),
            host,
            region: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            access_token: access_token.into(),
            refresh_token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn for_region(region: Region, access_token: impl Into<String>) -> Self {
        let mut config = Self::for_host(region.host(), access_token);
        config.region = Some(region);
        config
    }

    /// Point every API generation at one base URL (e.g. a local mock server).
    pub fn with_base_url(mut self, base: &str) -> Self {
        let base = base.trim_end_matches('/');
        self.base_url_v2 = format!("{base}/v2");
        self.base_url_v3 = format!("{base}/v3");
        self.base_url_v4 = format!("{base}/v4");
        self.graphql_url = format!("{base}/v3/graphql");
        self.auth_base_url = format!("{base}/auth");
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn base_urls_follow_host() {
        let config = ClientConfig::for_host("oncall.io", "tok");
        assert_eq!(config.base_url_v3, "https://api.oncall.io/v3");
        assert_eq!(config.graphql_url, "https://api.oncall.io/v3/graphql");
        assert_eq!(config.auth_base_url, "https://auth.oncall.io");
    }

    #[test]
    fn region_parsing() {
        assert_eq!("EU".parse::<Region>().unwrap(), Region::Eu);
        assert!(matches!(
            "mars".parse::<Region>(),
            Err(ConfigError::InvalidRegion(r)) if r == "mars"
        ));
        let config = ClientConfig::for_region(Region::Eu, "tok");
        assert_eq!(config.host, "eu.oncall.io");
    }

    #[test]
    fn token_expiry() {
        let token = AccessToken {
            token: "tok".into(),
            issued_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            expires_at: Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap(),
        };
        assert!(!token.is_expired(Utc.with_ymd_and_hms(2024, 1, 1, 0, 30, 0).unwrap()));
        assert!(token.is_expired(Utc.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap()));
    }
}
