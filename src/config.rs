//! Gateway configuration from the environment

use crate::error::{Error, Result};
use std::time::Duration;

/// Runtime configuration for the gateway process
#[derive(Debug, Clone)]
pub struct Config {
    pub hostname: String,
    pub port: u16,
    /// Base path the per-event routes are mounted under, always with a
    /// trailing slash
    pub base_path: String,
    /// Space holding the event entries
    pub space_id: String,
    /// Delivery token for the event space
    pub access_token: String,
    /// Management token, reserved for content migrations
    pub management_token: Option<String>,
    /// Lifetime of cached per-event artifacts
    pub cache_lifetime: Duration,
    /// Couple the namespace's artifact lifetimes (see `CacheOptions`)
    pub couple_artifact_lifetimes: bool,
}

impl Config {
    /// Read configuration from `CONTENTFUL_*` and `CACHE_*` environment
    /// variables
    ///
    /// Missing required values fail here, at startup, rather than on the
    /// first request.
    pub fn from_env() -> Result<Self> {
        let hostname = env_var("CONTENTFUL_HOSTNAME").unwrap_or_else(|| "localhost".to_string());
        let port = match env_var("CONTENTFUL_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| Error::Config(format!("CONTENTFUL_PORT is not a port: {}", raw)))?,
            None => 4000,
        };
        let base_path = normalize_base_path(
            env_var("CONTENTFUL_BASE_PATH").unwrap_or_else(|| "/".to_string()),
        );
        let space_id = env_var("CONTENTFUL_SPACE_ID")
            .ok_or_else(|| Error::Config("CONTENTFUL_SPACE_ID must be set".into()))?;
        let access_token = env_var("CONTENTFUL_CONTENT_TOKEN")
            .ok_or_else(|| Error::Config("CONTENTFUL_CONTENT_TOKEN must be set".into()))?;
        let management_token = env_var("CONTENTFUL_MANAGEMENT_TOKEN");

        let cache_lifetime = match env_var("CACHE_LIFETIME_MS") {
            Some(raw) => Duration::from_millis(raw.parse().map_err(|_| {
                Error::Config(format!("CACHE_LIFETIME_MS is not a duration: {}", raw))
            })?),
            None => Duration::from_millis(120_000),
        };
        let couple_artifact_lifetimes = env_var("CACHE_COUPLE_LIFETIMES")
            .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Ok(Self {
            hostname,
            port,
            base_path,
            space_id,
            access_token,
            management_token,
            cache_lifetime,
            couple_artifact_lifetimes,
        })
    }

    /// Socket address string for the listener
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.hostname, self.port)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Ensure the base path starts and ends with a slash
pub(crate) fn normalize_base_path(raw: String) -> String {
    let mut path = raw;
    if !path.starts_with('/') {
        path.insert(0, '/');
    }
    if !path.ends_with('/') {
        path.push('/');
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for name in [
            "CONTENTFUL_HOSTNAME",
            "CONTENTFUL_PORT",
            "CONTENTFUL_BASE_PATH",
            "CONTENTFUL_SPACE_ID",
            "CONTENTFUL_CONTENT_TOKEN",
            "CONTENTFUL_MANAGEMENT_TOKEN",
            "CACHE_LIFETIME_MS",
            "CACHE_COUPLE_LIFETIMES",
        ] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn defaults_apply_when_only_required_vars_are_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("CONTENTFUL_SPACE_ID", "space-1");
        std::env::set_var("CONTENTFUL_CONTENT_TOKEN", "token-1");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr(), "localhost:4000");
        assert_eq!(config.base_path, "/");
        assert_eq!(config.cache_lifetime, Duration::from_millis(120_000));
        assert!(!config.couple_artifact_lifetimes);
        assert!(config.management_token.is_none());

        clear_env();
    }

    #[test]
    fn missing_space_id_fails_at_startup() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("CONTENTFUL_CONTENT_TOKEN", "token-1");

        let err = Config::from_env().unwrap_err();
        assert!(err.to_string().contains("CONTENTFUL_SPACE_ID"));

        clear_env();
    }

    #[test]
    fn overrides_are_honored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("CONTENTFUL_SPACE_ID", "space-1");
        std::env::set_var("CONTENTFUL_CONTENT_TOKEN", "token-1");
        std::env::set_var("CONTENTFUL_HOSTNAME", "0.0.0.0");
        std::env::set_var("CONTENTFUL_PORT", "8080");
        std::env::set_var("CONTENTFUL_BASE_PATH", "content");
        std::env::set_var("CACHE_LIFETIME_MS", "5000");
        std::env::set_var("CACHE_COUPLE_LIFETIMES", "true");

        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.base_path, "/content/");
        assert_eq!(config.cache_lifetime, Duration::from_millis(5000));
        assert!(config.couple_artifact_lifetimes);

        clear_env();
    }

    #[test]
    fn bad_port_is_a_config_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        std::env::set_var("CONTENTFUL_SPACE_ID", "space-1");
        std::env::set_var("CONTENTFUL_CONTENT_TOKEN", "token-1");
        std::env::set_var("CONTENTFUL_PORT", "not-a-port");

        assert!(matches!(Config::from_env(), Err(Error::Config(_))));

        clear_env();
    }

    #[test]
    fn base_path_normalization() {
        assert_eq!(normalize_base_path("/".into()), "/");
        assert_eq!(normalize_base_path("content".into()), "/content/");
        assert_eq!(normalize_base_path("/content/".into()), "/content/");
    }
}
