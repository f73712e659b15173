//! Generator contract and backends.

pub mod http;
pub mod openai;
pub mod retrying;

pub use openai::OpenAiGenerator;
pub use retrying::RetryingGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::types::{Message, Role};

/// Tool definition sent to the generator backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Produces the next assistant message for a transcript.
///
/// Implementations must not retry on their own; retry policy is applied by
/// [`RetryingGenerator`]. The returned message is either a final answer or a
/// tool-call request.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Backend name used in logs.
    fn name(&self) -> &str;

    async fn generate(&self, transcript: &[Message], tools: &[ToolDefinition]) -> Result<Message>;
}

/// Reject replies the graph cannot act on.
pub fn check_reply(reply: &Message) -> Result<()> {
    if reply.role != Role::Assistant {
        return Err(EngineError::ProtocolViolation(format!(
            "generator replied with role '{}'",
            reply.role
        )));
    }
    if reply.content.is_empty() && reply.tool_calls.is_empty() {
        return Err(EngineError::GenerationRefused(
            "reply has neither content nor tool calls".to_string(),
        ));
    }
    for (idx, call) in reply.tool_calls.iter().enumerate() {
        if call.id.is_empty() {
            return Err(EngineError::malformed_call(&call.name, "tool call without id"));
        }
        if reply.tool_calls[..idx].iter().any(|c| c.id == call.id) {
            return Err(EngineError::ProtocolViolation(format!(
                "tool_call_id '{}' requested twice",
                call.id
            )));
        }
    }
    Ok(())
}

/// Non-empty transcript check shared by backends.
pub(crate) fn ensure_non_empty(transcript: &[Message]) -> Result<()> {
    if transcript.is_empty() {
        return Err(EngineError::InvalidInput(
            "transcript must contain at least one message".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToolCall;
    use serde_json::json;

    #[test]
    fn empty_reply_is_refusal() {
        let err = check_reply(&Message::assistant("")).unwrap_err();
        assert!(matches!(err, EngineError::GenerationRefused(_)));
    }

    #[test]
    fn non_assistant_reply_is_protocol_violation() {
        let err = check_reply(&Message::user("hi")).unwrap_err();
        assert!(matches!(err, EngineError::ProtocolViolation(_)));
    }

    #[test]
    fn duplicate_call_ids_are_rejected() {
        let call = ToolCall::new("c1", "lookup", json!({}));
        let reply = Message::assistant_tool_calls("", vec![call.clone(), call]);
        assert!(check_reply(&reply).is_err());
    }

    #[test]
    fn tool_request_without_text_is_accepted() {
        let reply =
            Message::assistant_tool_calls("", vec![ToolCall::new("c1", "lookup", json!({}))]);
        assert!(check_reply(&reply).is_ok());
    }
}
