//! Blocking HTTP client shared by every endpoint and worker.
//!
//! # Design
//! `HttpClient` wraps a single `ureq::Agent`. The agent is cheap to clone,
//! `Send + Sync`, and owns a connection pool guarded internally, so one client
//! is shared through `Arc` across all dispatcher workers. Status codes are
//! returned as data (`http_status_as_error(false)`); only a failure to obtain
//! a response becomes an `Error::Transport`.

use std::time::Duration;

use crate::error::Error;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 10002;
pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Where and how the client connects.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a whole request, connect through body read.
    pub timeout: Option<Duration>,
    /// Sent with every request that carries a body.
    pub content_type: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            timeout: None,
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    base_url: String,
    content_type: String,
    agent: ureq::Agent,
}

impl HttpClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self::build(&config.base_url(), config.timeout, &config.content_type)
    }

    /// Client for an explicit base URL with default settings otherwise.
    pub fn from_base_url(base_url: &str) -> Self {
        Self::build(base_url, None, DEFAULT_CONTENT_TYPE)
    }

    fn build(base_url: &str, timeout: Option<Duration>, content_type: &str) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(timeout)
            .build()
            .new_agent();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            content_type: content_type.to_string(),
            agent,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Perform the round-trip for `req` on the calling thread.
    pub fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, Error> {
        let transport = |e: ureq::Error| Error::Transport {
            url: req.url.clone(),
            message: e.to_string(),
        };

        tracing::trace!(method = ?req.method, url = %req.url, "sending request");

        let result = match req.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&req.url);
                for (name, value) in &req.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&req.url);
                for (name, value) in &req.headers {
                    builder = builder.header(name.as_str(), value.as_str());
                }
                match &req.body {
                    Some(body) => builder.send(body.as_bytes()),
                    None => builder.send_empty(),
                }
            }
        };
        let mut response = result.map_err(transport)?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string().map_err(transport)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn client_is_shareable_across_threads() {
        assert_send_sync::<HttpClient>();
    }

    #[test]
    fn default_config_targets_local_test_server() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url(), "http://127.0.0.1:10002");
        assert_eq!(config.content_type, "application/json");
        assert!(config.timeout.is_none());
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let client = HttpClient::from_base_url("http://localhost:3000/");
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn config_content_type_is_kept() {
        let client = HttpClient::new(&ClientConfig {
            content_type: "text/plain".to_string(),
            ..ClientConfig::default()
        });
        assert_eq!(client.content_type(), "text/plain");
    }

    #[test]
    fn closed_port_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = HttpClient::from_base_url(&format!("http://{addr}"));
        let req = HttpRequest {
            method: HttpMethod::Get,
            url: format!("http://{addr}/v1/ping/test"),
            headers: Vec::new(),
            body: None,
        };
        let err = client.execute(&req).unwrap_err();
        match err {
            Error::Transport { url, .. } => assert_eq!(url, req.url),
            other => panic!("expected transport error, got {other:?}"),
        }
    }
}
