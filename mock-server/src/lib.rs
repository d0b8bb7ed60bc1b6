use axum::{
    http::HeaderMap,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

/// Body sent to and echoed back by `/v1/ping/json`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumPayload {
    pub num: i64,
}

pub fn app() -> Router {
    Router::new()
        .route("/v1/ping/test", get(ping_test))
        .route("/v1/ping/post", post(ping_post))
        .route("/v1/ping/json", post(ping_json))
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

/// Request header that `/v1/ping/test` copies onto its response.
pub const TAG_HEADER: &str = "x-ping-tag";

async fn ping_test(headers: HeaderMap) -> (HeaderMap, &'static str) {
    let mut echoed = HeaderMap::new();
    if let Some(tag) = headers.get(TAG_HEADER) {
        echoed.insert(TAG_HEADER, tag.clone());
    }
    (echoed, "pong")
}

async fn ping_post(body: String) -> String {
    if body.is_empty() {
        "ok".to_string()
    } else {
        body
    }
}

async fn ping_json(Json(input): Json<NumPayload>) -> Json<NumPayload> {
    tracing::debug!(num = input.num, "echoing json payload");
    Json(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_serializes_to_json() {
        let json = serde_json::to_value(NumPayload { num: 7 }).unwrap();
        assert_eq!(json, serde_json::json!({ "num": 7 }));
    }

    #[test]
    fn payload_accepts_negative_numbers() {
        let input: NumPayload = serde_json::from_str(r#"{"num":-12}"#).unwrap();
        assert_eq!(input.num, -12);
    }

    #[test]
    fn payload_rejects_missing_num() {
        let result: Result<NumPayload, _> = serde_json::from_str(r#"{"value":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn payload_rejects_fractional_num() {
        let result: Result<NumPayload, _> = serde_json::from_str(r#"{"num":1.5}"#);
        assert!(result.is_err());
    }
}
