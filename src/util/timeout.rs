//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::EngineError;

/// Wrap a generate call with a timeout, mapping expiry to `GenerationTimeout`.
pub async fn with_generation_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, EngineError>>,
) -> Result<T, EngineError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::GenerationTimeout(duration.as_millis() as u64)),
    }
}
