//! Client configuration loaded from environment variables.
//!
//! Everything except the credentials has a default, so a local development
//! server only needs `PARLEY_EMAIL` and `PARLEY_API_KEY`.

use std::time::Duration;

use tracing::warn;

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL of the chat server.
    /// Env: `PARLEY_SITE`
    /// Default: `http://localhost:9991`
    pub site: String,

    /// Login email of the account.
    /// Env: `PARLEY_EMAIL`
    pub email: String,

    /// API key of the account.
    /// Env: `PARLEY_API_KEY`
    pub api_key: String,

    /// How long a single long-poll may stay open.
    /// Env: `PARLEY_POLL_TIMEOUT_SECS`
    /// Default: 90 seconds.
    pub poll_timeout: Duration,

    /// Default timeout for every other request.
    /// Env: `PARLEY_REQUEST_TIMEOUT_SECS`
    /// Default: 30 seconds.
    pub request_timeout: Duration,

    /// Event types to subscribe to; empty means all.
    /// Env: `PARLEY_EVENT_TYPES` (comma-separated)
    pub event_types: Vec<String>,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("site", &self.site)
            .field("email", &self.email)
            .field("api_key", &"<redacted>")
            .field("poll_timeout", &self.poll_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("event_types", &self.event_types)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            site: "http://localhost:9991".to_string(),
            email: String::new(),
            api_key: String::new(),
            poll_timeout: Duration::from_secs(90),
            request_timeout: Duration::from_secs(30),
            event_types: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(site) = lookup("PARLEY_SITE") {
            config.site = site.trim_end_matches('/').to_string();
        }

        if let Some(email) = lookup("PARLEY_EMAIL") {
            config.email = email;
        }

        if let Some(key) = lookup("PARLEY_API_KEY") {
            config.api_key = key;
        }

        if let Some(val) = lookup("PARLEY_POLL_TIMEOUT_SECS") {
            match parse_secs(&val) {
                Some(d) => config.poll_timeout = d,
                None => warn!(value = %val, "Invalid PARLEY_POLL_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = lookup("PARLEY_REQUEST_TIMEOUT_SECS") {
            match parse_secs(&val) {
                Some(d) => config.request_timeout = d,
                None => warn!(value = %val, "Invalid PARLEY_REQUEST_TIMEOUT_SECS, using default"),
            }
        }

        if let Some(val) = lookup("PARLEY_EVENT_TYPES") {
            config.event_types = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }

        config
    }

    /// Whether credentials were provided.
    pub fn has_credentials(&self) -> bool {
        !self.email.is_empty() && !self.api_key.is_empty()
    }
}

fn parse_secs(val: &str) -> Option<Duration> {
    match val.trim().parse::<u64>() {
        Ok(0) | Err(_) => None,
        Ok(n) => Some(Duration::from_secs(n)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.poll_timeout, Duration::from_secs(90));
        assert!(config.event_types.is_empty());
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("PARLEY_SITE", "https://chat.example.com/"),
            ("PARLEY_EMAIL", "iago@example.com"),
            ("PARLEY_API_KEY", "abc"),
            ("PARLEY_REQUEST_TIMEOUT_SECS", "5"),
            ("PARLEY_EVENT_TYPES", "message, realm_user,,typing"),
        ]);
        assert_eq!(config.site, "https://chat.example.com");
        assert!(config.has_credentials());
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(config.event_types, vec!["message", "realm_user", "typing"]);
    }

    #[test]
    fn test_invalid_timeouts_fall_back() {
        let config = load(&[
            ("PARLEY_POLL_TIMEOUT_SECS", "soon"),
            ("PARLEY_REQUEST_TIMEOUT_SECS", "0"),
        ]);
        assert_eq!(config.poll_timeout, Duration::from_secs(90));
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = load(&[("PARLEY_API_KEY", "secret-key")]);
        assert!(!format!("{config:?}").contains("secret-key"));
    }
}
