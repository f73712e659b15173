//! Generator decorator adding a per-call deadline and bounded retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::Message;
use crate::util::retry::RetryPolicy;
use crate::util::timeout::with_generation_timeout;

use super::{Generator, ToolDefinition};

/// Wraps another [`Generator`]; each attempt is bounded by `timeout` and
/// transient failures are retried per `policy`.
///
/// Retries only ever repeat a single generate step on the working transcript,
/// so nothing has been saved when they happen.
pub struct RetryingGenerator {
    inner: Arc<dyn Generator>,
    policy: RetryPolicy,
    timeout: Duration,
}

impl RetryingGenerator {
    pub fn new(inner: Arc<dyn Generator>, policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            inner,
            policy,
            timeout,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

#[async_trait]
impl Generator for RetryingGenerator {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn generate(&self, transcript: &[Message], tools: &[ToolDefinition]) -> Result<Message> {
        self.policy
            .execute(|| {
                with_generation_timeout(self.timeout, self.inner.generate(transcript, tools))
            })
            .await
    }
}

impl std::fmt::Debug for RetryingGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingGenerator")
            .field("inner", &self.inner.name())
            .field("policy", &self.policy)
            .field("timeout", &self.timeout)
            .finish()
    }
}
