//! Request-burst client core for the ping test server.
//!
//! # Overview
//! Builds requests from a chain of declared path segments, executes them on a
//! bounded worker pool and hands each outcome to a caller-supplied callback.
//!
//! # Design
//! - `Endpoint` is one composable path node; `PingApi` names the
//!   `/v1/ping/{test,post,json}` tree served by the test server.
//! - `Endpoint::get` / `post` / `post_json` return a `Deferred`: a request
//!   plus its callback, runnable inline or on the `Dispatcher`.
//! - `HttpClient` is shared by `Arc` across every worker; it is
//!   `Send + Sync` and pools connections internally.
//! - A missing response (`Error::Transport`) is distinct from a non-200 one
//!   (`Error::Status`).

pub mod burst;
pub mod client;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod types;

pub use burst::{run_burst, BurstConfig, BurstReport};
pub use client::{ClientConfig, HttpClient};
pub use dispatch::{DispatchConfig, Dispatcher, Ticket};
pub use endpoint::{Deferred, Endpoint, Outcome, PingApi};
pub use error::Error;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::NumPayload;
