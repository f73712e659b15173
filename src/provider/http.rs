//! Shared HTTP client and auth helpers.

use std::sync::OnceLock;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::EngineError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Shared reqwest client. Per-request deadlines are set by the caller.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new())
    })
}

/// Default headers for a Bearer-token API.
pub fn bearer_headers(api_key: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(val) = HeaderValue::from_str(&format!("Bearer {api_key}")) {
        headers.insert(AUTHORIZATION, val);
    }
    headers
}

/// Map a non-success HTTP status to an engine error.
pub fn status_to_error(status: u16, body: &str) -> EngineError {
    match status {
        401 | 403 => EngineError::Configuration(format!(
            "generator backend rejected credentials ({status}): {}",
            error_message(body)
        )),
        429 => EngineError::RateLimited {
            retry_after_ms: extract_retry_after(body),
        },
        _ => EngineError::api(status, error_message(body)),
    }
}

/// Map a transport failure, keeping deadline expiry distinct.
pub fn transport_error(err: reqwest::Error, timeout: Duration) -> EngineError {
    if err.is_timeout() {
        EngineError::GenerationTimeout(timeout.as_millis() as u64)
    } else {
        EngineError::Network(err)
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.to_string())
}

fn extract_retry_after(body: &str) -> Option<u64> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|r| r.as_f64())
                .map(|s| (s * 1000.0) as u64)
        })
}
