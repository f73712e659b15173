//! Message types for conversation transcripts.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::{EngineError, Result};

/// A single turn in a conversation.
///
/// Assistant messages that only request tools may carry empty `content`.
/// Tool-result messages always carry the `tool_call_id` they answer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    /// Create a system message.
    pub fn system(text: impl Into<String>) -> Self {
        Self::plain(Role::System, text)
    }

    /// Create a user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self::plain(Role::User, text)
    }

    /// Create an assistant message with text only.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, text)
    }

    /// Create an assistant message requesting tool calls.
    pub fn assistant_tool_calls(text: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
            tool_calls,
            tool_call_id: None,
        }
    }

    /// Create a tool result message answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            content: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    /// Assistant message with non-empty content and no pending tool calls.
    pub fn is_final_answer(&self) -> bool {
        self.role == Role::Assistant && !self.content.is_empty() && self.tool_calls.is_empty()
    }

    /// Assistant message with at least one tool call.
    pub fn requests_tools(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// Conversation role.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Ordered history of messages for one thread.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Transcript(Vec<Message>);

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.0.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.0.extend(messages);
    }

    pub fn messages(&self) -> &[Message] {
        &self.0
    }

    pub fn last(&self) -> Option<&Message> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.0.iter()
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.0
    }

    /// Check the tool-call pairing invariant.
    ///
    /// Every tool-result message must belong to a run of tool results that
    /// directly follows an assistant message requesting that exact id, and
    /// each requested id may be answered at most once.
    pub fn validate(&self) -> Result<()> {
        let mut pending: Vec<&str> = Vec::new();
        let mut answered: Vec<&str> = Vec::new();

        for message in &self.0 {
            match message.role {
                Role::Tool => {
                    let id = message.tool_call_id.as_deref().ok_or_else(|| {
                        EngineError::ProtocolViolation(
                            "tool result without tool_call_id".to_string(),
                        )
                    })?;
                    if !pending.contains(&id) {
                        return Err(EngineError::ProtocolViolation(format!(
                            "tool result references unknown tool_call_id '{id}'"
                        )));
                    }
                    if answered.contains(&id) {
                        return Err(EngineError::ProtocolViolation(format!(
                            "tool_call_id '{id}' answered more than once"
                        )));
                    }
                    answered.push(id);
                }
                Role::Assistant => {
                    pending = message.tool_calls.iter().map(|c| c.id.as_str()).collect();
                    answered.clear();
                }
                Role::System | Role::User => {
                    pending.clear();
                    answered.clear();
                }
            }
        }
        Ok(())
    }

    /// User-visible dialogue: user turns and assistant turns with text.
    pub fn dialogue(&self) -> Vec<DialogueEntry> {
        self.0
            .iter()
            .filter_map(|m| match m.role {
                Role::User => Some(DialogueEntry {
                    speaker: Speaker::User,
                    text: m.content.clone(),
                }),
                Role::Assistant if !m.content.is_empty() => Some(DialogueEntry {
                    speaker: Speaker::Assistant,
                    text: m.content.clone(),
                }),
                Role::Assistant | Role::System | Role::Tool => None,
            })
            .collect()
    }
}

impl From<Vec<Message>> for Transcript {
    fn from(messages: Vec<Message>) -> Self {
        Self(messages)
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Who said a line in the dialogue view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One line of the dialogue view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DialogueEntry {
    pub speaker: Speaker,
    pub text: String,
}
