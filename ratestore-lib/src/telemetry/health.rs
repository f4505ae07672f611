use http_body_util::{combinators::BoxBody, BodyExt, Full};
use hyper::body::Bytes;
use hyper::Response;
use hyper::StatusCode;
use serde_json::json;

use crate::error::{RateStoreError, Result};
use crate::ratestore::{RateStore, ServiceState};

pub type RespBody = BoxBody<Bytes, hyper::Error>;

fn json_response(status: StatusCode, body: &serde_json::Value) -> Result<Response<RespBody>> {
    let body_bytes = serde_json::to_vec(body)
        .map_err(|e| RateStoreError::Http(format!("Failed to serialize response: {e}")))?;

    let body = Full::new(Bytes::from(body_bytes))
        .map_err(|never| match never {})
        .boxed();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(body)
        .map_err(|e| RateStoreError::Http(format!("Failed to build response: {e}")))
}

/// Health check response - always returns 200 if process is running
pub fn health_check_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::OK, &json!({"status": "healthy"}))
}

/// Readiness check - 200 while the refresh loop is running, 503 otherwise
pub fn ready_check_response(store: &RateStore) -> Result<Response<RespBody>> {
    match store.state() {
        ServiceState::Running => json_response(StatusCode::OK, &json!({"status": "ready"})),
        state => json_response(
            StatusCode::SERVICE_UNAVAILABLE,
            &json!({"status": "not_ready", "state": state.as_str()}),
        ),
    }
}

/// Rate lookup for a single stream, `stream` is the unsharded stream hash
pub fn rate_response(store: &RateStore, stream: &str) -> Result<Response<RespBody>> {
    match stream.parse::<u64>() {
        Ok(hash) => json_response(
            StatusCode::OK,
            &json!({"stream_hash_no_shard": hash, "rate": store.rate_for(hash)}),
        ),
        Err(_) => json_response(
            StatusCode::BAD_REQUEST,
            &json!({"error": "stream must be an unsigned integer"}),
        ),
    }
}

pub fn not_found_response() -> Result<Response<RespBody>> {
    json_response(StatusCode::NOT_FOUND, &json!({"error": "not found"}))
}
