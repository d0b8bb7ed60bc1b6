//! Composable URL path nodes and the deferred calls they produce.
//!
//! # Design
//! An `Endpoint` is a list of declared path segments plus a shared
//! `Arc<HttpClient>`. Children are built by `join`, so `/v1/ping/test` is
//! `root.join("v1").join("ping").join("test")`. Every call an endpoint builds
//! owns a clone of the client handle and its resolved URL, so the endpoint
//! can be dropped while the call is still in flight.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::client::HttpClient;
use crate::error::Error;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// What a callback receives: a response with any status, or the reason
/// no response exists.
pub type Outcome = Result<HttpResponse, Error>;

type Callback = Box<dyn FnOnce(Outcome) + Send + 'static>;

#[derive(Debug, Clone)]
pub struct Endpoint {
    segments: Vec<String>,
    client: Arc<HttpClient>,
}

impl Endpoint {
    /// The `/` node every chain starts from.
    pub fn root(client: Arc<HttpClient>) -> Self {
        Self {
            segments: Vec::new(),
            client,
        }
    }

    /// Child node one or more levels below `self`.
    ///
    /// `segment` may itself contain `/`; empty pieces are dropped, so
    /// `join("ping/test")` and `join("ping").join("test")` are the same node.
    pub fn join(&self, segment: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(
            segment
                .split('/')
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        );
        Self {
            segments,
            client: Arc::clone(&self.client),
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn client(&self) -> &Arc<HttpClient> {
        &self.client
    }

    /// `/`-delimited path. The root is `/`.
    pub fn path(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        self.segments
            .iter()
            .fold(String::new(), |acc, s| acc + "/" + s)
    }

    /// Absolute URL: the client's base URL followed by `path()`.
    pub fn url(&self) -> String {
        format!("{}{}", self.client.base_url(), self.path())
    }

    pub fn build_get(&self) -> HttpRequest {
        HttpRequest {
            method: HttpMethod::Get,
            url: self.url(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn build_post(&self, body: Option<String>) -> HttpRequest {
        let headers = match body {
            Some(_) => vec![(
                "content-type".to_string(),
                self.client.content_type().to_string(),
            )],
            None => Vec::new(),
        };
        HttpRequest {
            method: HttpMethod::Post,
            url: self.url(),
            headers,
            body,
        }
    }

    /// Deferred GET of this endpoint.
    pub fn get<F>(&self, callback: F) -> Deferred
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        Deferred::new(Arc::clone(&self.client), self.build_get(), callback)
    }

    /// Deferred POST of this endpoint. A body goes out with the client's
    /// content type.
    pub fn post<F>(&self, body: Option<String>, callback: F) -> Deferred
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        Deferred::new(Arc::clone(&self.client), self.build_post(body), callback)
    }

    /// Deferred POST of `value` serialized as JSON.
    pub fn post_json<T, F>(&self, value: &T, callback: F) -> Result<Deferred, Error>
    where
        T: Serialize,
        F: FnOnce(Outcome) + Send + 'static,
    {
        let body = serde_json::to_string(value).map_err(|e| Error::Serialization(e.to_string()))?;
        Ok(self.post(Some(body), callback))
    }
}

/// A built request paired with the callback that consumes its outcome.
///
/// Runs exactly once: `run` takes `self`.
pub struct Deferred {
    client: Arc<HttpClient>,
    request: HttpRequest,
    callback: Callback,
}

impl Deferred {
    pub fn new<F>(client: Arc<HttpClient>, request: HttpRequest, callback: F) -> Self
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        Self {
            client,
            request,
            callback: Box::new(callback),
        }
    }

    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    /// Add a call-specific header. A `content-type` given here replaces the
    /// client's default.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.request.set_header(name, value);
        self
    }

    /// Add several call-specific headers, in order.
    pub fn headers<I, K, V>(self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        headers
            .into_iter()
            .fold(self, |d, (k, v)| d.header(k.as_ref(), v.as_ref()))
    }

    /// Execute the call on the current thread, then hand the outcome to the
    /// callback.
    pub fn run(self) {
        let outcome = self.client.execute(&self.request);
        (self.callback)(outcome);
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("request", &self.request)
            .finish_non_exhaustive()
    }
}

/// The `/v1/ping/*` tree served by the test server.
#[derive(Debug, Clone)]
pub struct PingApi {
    root: Endpoint,
}

impl PingApi {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            root: Endpoint::root(client),
        }
    }

    pub fn root(&self) -> &Endpoint {
        &self.root
    }

    pub fn v1(&self) -> Endpoint {
        self.root.join("v1")
    }

    pub fn ping(&self) -> Endpoint {
        self.v1().join("ping")
    }

    /// `GET /v1/ping/test`
    pub fn test(&self) -> Endpoint {
        self.ping().join("test")
    }

    /// `POST /v1/ping/post`
    pub fn post(&self) -> Endpoint {
        self.ping().join("post")
    }

    /// `POST /v1/ping/json`
    pub fn json(&self) -> Endpoint {
        self.ping().join("json")
    }
}
