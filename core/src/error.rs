//! Error types for the ping client and dispatcher.
//!
//! # Design
//! A transport failure and a non-200 status are separate variants. A
//! connection that never produced a response has no status, reason or body,
//! so it never masquerades as one.

/// Errors produced while building, executing or dispatching ping requests.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a status other than 200.
    #[error("http : {status} - {reason}, URL = {url}")]
    Status {
        status: u16,
        reason: String,
        url: String,
    },

    /// No response was received: connection refused, reset, timed out.
    #[error("transport failure, URL = {url}: {message}")]
    Transport { url: String, message: String },

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The dispatcher queue is closed; no worker will pick up the job.
    #[error("dispatcher is closed")]
    Closed,

    /// A tracked job finished without signalling completion.
    #[error("job abandoned before its callback completed")]
    Abandoned,

    /// The OS refused to start a worker thread.
    #[error("failed to start worker: {0}")]
    Spawn(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_error_names_status_reason_and_url() {
        let err = Error::Status {
            status: 404,
            reason: "Not Found".to_string(),
            url: "http://127.0.0.1:10002/v1/ping/missing".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "http : 404 - Not Found, URL = http://127.0.0.1:10002/v1/ping/missing"
        );
    }

    #[test]
    fn transport_error_names_url() {
        let err = Error::Transport {
            url: "http://127.0.0.1:1/v1".to_string(),
            message: "connection refused".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("http://127.0.0.1:1/v1"));
        assert!(text.contains("connection refused"));
    }
}
