//! OpenAI-compatible Chat Completions generator.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::tools::validation::validate_arguments;
use crate::types::{FinishReason, GenerationSettings, Message, Role, ToolCall, Usage};

use super::http::{bearer_headers, shared_client, status_to_error, transport_error};
use super::{check_reply, ensure_non_empty, Generator, ToolDefinition};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Generator backed by a `/chat/completions` endpoint.
pub struct OpenAiGenerator {
    model: String,
    api_key: String,
    base_url: String,
    settings: GenerationSettings,
    timeout: Duration,
    usage: Mutex<Usage>,
}

impl OpenAiGenerator {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            settings: GenerationSettings::default(),
            timeout: Duration::from_secs(60),
            usage: Mutex::new(Usage::default()),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Deadline for one HTTP round trip.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Token usage accumulated over every successful call.
    pub fn usage(&self) -> Usage {
        *self.usage.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn build_request_body(
        &self,
        transcript: &[Message],
        tools: &[ToolDefinition],
    ) -> serde_json::Value {
        let messages: Vec<serde_json::Value> = transcript.iter().map(message_to_openai).collect();

        let mut body = serde_json::Map::new();
        body.insert("model".into(), self.model.clone().into());
        body.insert("messages".into(), messages.into());

        if let Some(max) = self.settings.max_tokens {
            body.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = self.settings.temperature {
            body.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = self.settings.top_p {
            body.insert("top_p".into(), top_p.into());
        }
        if let Some(seed) = self.settings.seed {
            body.insert("seed".into(), seed.into());
        }
        if let Some(ref user) = self.settings.user {
            body.insert("user".into(), user.clone().into());
        }

        if !tools.is_empty() {
            let tool_defs: Vec<serde_json::Value> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body.insert("tools".into(), tool_defs.into());
        }

        serde_json::Value::Object(body)
    }

    fn record_usage(&self, usage: Option<OpenAiUsage>) {
        if let Some(u) = usage {
            let mut total = self.usage.lock().unwrap_or_else(|e| e.into_inner());
            total.merge(&Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            });
        }
    }
}

#[async_trait]
impl Generator for OpenAiGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, transcript: &[Message], tools: &[ToolDefinition]) -> Result<Message> {
        ensure_non_empty(transcript)?;

        let body = self.build_request_body(transcript, tools);
        let url = format!("{}/chat/completions", self.base_url);

        debug!(
            model = %self.model,
            messages = transcript.len(),
            tools = tools.len(),
            "chat completion request"
        );

        let resp = shared_client()
            .post(&url)
            .headers(bearer_headers(&self.api_key))
            .timeout(self.timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(status_to_error(status, &body_text));
        }

        let data: OpenAiChatResponse = resp
            .json()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;
        self.record_usage(data.usage);

        let choice = data
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EngineError::api(status, "no choices in response"))?;

        if let Some(refusal) = choice.message.refusal.filter(|r| !r.is_empty()) {
            return Err(EngineError::GenerationRefused(refusal));
        }
        let finish_reason = choice
            .finish_reason
            .as_deref()
            .and_then(|s| s.parse::<FinishReason>().ok());
        if finish_reason == Some(FinishReason::ContentFilter) {
            return Err(EngineError::GenerationRefused(
                "response blocked by content filter".to_string(),
            ));
        }

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|tc| parse_tool_call(tc, tools))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            model = %self.model,
            finish_reason = ?finish_reason,
            tool_calls = tool_calls.len(),
            "chat completion response"
        );

        let reply = Message::assistant_tool_calls(
            choice.message.content.unwrap_or_default(),
            tool_calls,
        );
        check_reply(&reply)?;
        Ok(reply)
    }
}

impl std::fmt::Debug for OpenAiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiGenerator")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Decode one requested call and check it against the advertised tools.
fn parse_tool_call(tc: OpenAiToolCall, tools: &[ToolDefinition]) -> Result<ToolCall> {
    let name = tc.function.name;
    let definition = tools
        .iter()
        .find(|t| t.name == name)
        .ok_or_else(|| EngineError::malformed_call(&name, "tool is not registered"))?;

    let raw = if tc.function.arguments.trim().is_empty() {
        "{}"
    } else {
        tc.function.arguments.as_str()
    };
    let arguments: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| EngineError::malformed_call(&name, format!("arguments are not JSON: {e}")))?;
    validate_arguments(&arguments, &definition.parameters)
        .map_err(|message| EngineError::malformed_call(&name, message))?;

    Ok(ToolCall::new(tc.id, name, arguments))
}

fn message_to_openai(msg: &Message) -> serde_json::Value {
    match msg.role {
        Role::Tool => serde_json::json!({
            "role": "tool",
            "tool_call_id": msg.tool_call_id,
            "content": msg.content,
        }),
        Role::Assistant if !msg.tool_calls.is_empty() => {
            let tool_calls: Vec<serde_json::Value> = msg
                .tool_calls
                .iter()
                .map(|tc| {
                    serde_json::json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string(),
                        }
                    })
                })
                .collect();
            serde_json::json!({
                "role": "assistant",
                "content": if msg.content.is_empty() {
                    serde_json::Value::Null
                } else {
                    serde_json::Value::String(msg.content.clone())
                },
                "tool_calls": tool_calls,
            })
        }
        Role::System | Role::User | Role::Assistant => serde_json::json!({
            "role": msg.role.to_string(),
            "content": msg.content,
        }),
    }
}

// Chat Completions response types (internal)

#[derive(Deserialize)]
struct OpenAiChatResponse {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
    refusal: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Deserialize)]
struct OpenAiToolCall {
    id: String,
    function: OpenAiFunction,
}

#[derive(Deserialize)]
struct OpenAiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_results_and_requests_use_wire_shape() {
        let call = ToolCall::new("c1", "retrieve_documents", json!({ "query": "website" }));
        let request = message_to_openai(&Message::assistant_tool_calls("", vec![call]));
        assert_eq!(request["content"], serde_json::Value::Null);
        assert_eq!(
            request["tool_calls"][0]["function"]["arguments"],
            r#"{"query":"website"}"#
        );

        let result = message_to_openai(&Message::tool_result("c1", "passage"));
        assert_eq!(
            result,
            json!({ "role": "tool", "tool_call_id": "c1", "content": "passage" })
        );
    }

    #[test]
    fn request_body_forwards_settings() {
        let generator = OpenAiGenerator::new("gpt-4o-mini", "key").with_settings(
            GenerationSettings::builder()
                .temperature(0.2)
                .seed(7)
                .build(),
        );
        let body = generator.build_request_body(&[Message::user("hi")], &[]);
        assert_eq!(body["temperature"], 0.2);
        assert_eq!(body["seed"], 7);
        assert!(body.get("tools").is_none());
        assert!(body.get("max_tokens").is_none());
    }

    #[test]
    fn parse_tool_call_rejects_unadvertised_tool() {
        let tc = OpenAiToolCall {
            id: "c1".into(),
            function: OpenAiFunction {
                name: "delete_everything".into(),
                arguments: "{}".into(),
            },
        };
        let err = parse_tool_call(tc, &[]).unwrap_err();
        assert!(matches!(err, EngineError::MalformedToolCall { .. }));
    }
}
