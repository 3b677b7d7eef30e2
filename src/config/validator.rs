//! Config validation: required settings present and every base URL usable.

use crate::config::ClientConfig;
use crate::error::ConfigError;
use reqwest::Url;

pub fn validate(config: &ClientConfig) -> Result<(), ConfigError> {
    if config.host.trim().is_empty() {
        return Err(ConfigError::Missing("host"));
    }
    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Missing("user_agent"));
    }

    let urls = [
        ("base_url_v2", &config.base_url_v2),
        ("base_url_v3", &config.base_url_v3),
        ("base_url_v4", &config.base_url_v4),
        ("graphql_url", &config.graphql_url),
        ("auth_base_url", &config.auth_base_url),
    ];
    for (name, value) in urls {
        let ok = Url::parse(value)
            .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
            .unwrap_or(false);
        if !ok {
            return Err(ConfigError::InvalidUrl {
                name,
                value: value.clone(),
            });
        }
    }

    Ok(())
}
