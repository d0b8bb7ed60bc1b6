//! HTTP request and response types described as plain data.
//!
//! # Design
//! Endpoints build `HttpRequest` values without touching the network, and
//! `HttpClient::execute` turns one into an `HttpResponse`. Keeping the request
//! as owned data lets it move into a worker thread without borrowing from
//! the endpoint that built it.

use crate::error::Error;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data. `url` is absolute.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    /// Look up a header value, ignoring ASCII case in the name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing value under the same name
    /// (ASCII case-insensitive).
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }
}

/// An HTTP response described as plain data.
///
/// Any status code ends up here, including 4xx and 5xx. Use
/// `error_for_status` to treat anything but 200 as a failure.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Pass a 200 response through, map anything else to `Error::Status`.
    pub fn error_for_status(self, url: &str) -> Result<HttpResponse, Error> {
        if self.is_ok() {
            return Ok(self);
        }
        Err(Error::Status {
            status: self.status,
            reason: self.reason,
            url: url.to_string(),
        })
    }

    /// Deserialize the body as JSON.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_str(&self.body).map_err(|e| Error::Deserialization(e.to_string()))
    }
}
