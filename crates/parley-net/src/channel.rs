//! REST transport.
//!
//! Everything above this layer talks to the server through the [`Channel`]
//! trait, so tests and embedding hosts can substitute their own transport.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

/// Request parameters, form- or query-encoded. Structured values (arrays,
/// narrows) are passed as JSON strings.
pub type Params = Vec<(&'static str, String)>;

#[async_trait]
pub trait Channel: Send + Sync {
    /// Issue a request; success yields the parsed JSON body, failure exposes
    /// the status and error body.
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: Params,
        timeout: Option<Duration>,
    ) -> Result<Value, TransportError>;

    async fn get(&self, path: &str, params: Params) -> Result<Value, TransportError> {
        self.request(Method::Get, path, params, None).await
    }

    async fn post(&self, path: &str, params: Params) -> Result<Value, TransportError> {
        self.request(Method::Post, path, params, None).await
    }

    async fn patch(&self, path: &str, params: Params) -> Result<Value, TransportError> {
        self.request(Method::Patch, path, params, None).await
    }

    async fn del(&self, path: &str, params: Params) -> Result<Value, TransportError> {
        self.request(Method::Delete, path, params, None).await
    }
}

/// Credentials for API-key authentication.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub api_key: String,
}

/// [`Channel`] backed by `reqwest`.
///
/// Paths are written in the `/json/...` form; they are sent to the
/// `/api/v1/...` endpoints with HTTP basic auth.
#[derive(Debug, Clone)]
pub struct HttpChannel {
    client: reqwest::Client,
    site: String,
    credentials: Credentials,
}

impl HttpChannel {
    pub fn new(
        site: &str,
        credentials: Credentials,
        default_timeout: Duration,
    ) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(default_timeout)
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            site: site.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    fn url(&self, path: &str) -> String {
        match path.strip_prefix("/json/") {
            Some(rest) => format!("{}/api/v1/{}", self.site, rest),
            None => format!("{}{}", self.site, path),
        }
    }
}

#[async_trait]
impl Channel for HttpChannel {
    async fn request(
        &self,
        method: Method,
        path: &str,
        params: Params,
        timeout: Option<Duration>,
    ) -> Result<Value, TransportError> {
        let url = self.url(path);
        debug!(?method, %url, "Sending request");

        let builder = match method {
            Method::Get => self.client.get(&url).query(&params),
            Method::Delete => self.client.delete(&url).query(&params),
            Method::Post => self.client.post(&url).form(&params),
            Method::Patch => self.client.patch(&url).form(&params),
        };
        let mut builder = builder.basic_auth(&self.credentials.email, Some(&self.credentials.api_key));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.json::<Value>().await.ok();
            return Err(TransportError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(resp.json::<Value>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_paths_map_to_api() {
        let channel = HttpChannel::new(
            "https://chat.example.com/",
            Credentials {
                email: "bot@example.com".into(),
                api_key: "key".into(),
            },
            Duration::from_secs(10),
        )
        .unwrap();

        assert_eq!(
            channel.url("/json/messages/matches_narrow"),
            "https://chat.example.com/api/v1/messages/matches_narrow"
        );
        assert_eq!(channel.url("/static/x"), "https://chat.example.com/static/x");
    }
}
