//! Shared test helpers: scripted generators, tools and search backends.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use threadwise::error::EngineError;
use threadwise::memory::{InMemoryThreadStore, ThreadStore};
use threadwise::provider::{Generator, ToolDefinition};
use threadwise::tools::{SearchBackend, Tool, ToolParameters, ToolSpec};
use threadwise::types::{Message, ToolCall, Transcript};

pub const WEBSITE_PASSAGE: &str = "WISE Bacolod's website is https://wise-bacolod.example.org";

/// Final-answer reply.
pub fn answer(text: &str) -> Message {
    Message::assistant(text)
}

/// Tool-request reply from `(id, tool, arguments)` triples.
pub fn tool_request(calls: &[(&str, &str, serde_json::Value)]) -> Message {
    Message::assistant_tool_calls(
        "",
        calls
            .iter()
            .map(|(id, name, args)| ToolCall::new(*id, *name, args.clone()))
            .collect(),
    )
}

/// Generator that replays queued replies and records every request.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<Message, EngineError>>>,
    fallback: Option<Message>,
    delay: Option<Duration>,
    requests: Mutex<Vec<Vec<Message>>>,
    offered_tools: Mutex<Vec<Vec<String>>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: None,
            delay: None,
            requests: Mutex::new(Vec::new()),
            offered_tools: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(replies: impl IntoIterator<Item = Message>) -> Self {
        let generator = Self::new();
        for reply in replies {
            generator.push_reply(reply);
        }
        generator
    }

    /// Reply used once the queue is empty.
    pub fn with_fallback(mut self, reply: Message) -> Self {
        self.fallback = Some(reply);
        self
    }

    /// Sleep before every reply.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn push_reply(&self, reply: Message) {
        self.replies.lock().unwrap().push_back(Ok(reply));
    }

    pub fn push_error(&self, error: EngineError) {
        self.replies.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn offered_tools(&self) -> Vec<Vec<String>> {
        self.offered_tools.lock().unwrap().clone()
    }
}

#[async_trait]
impl Generator for ScriptedGenerator {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(
        &self,
        transcript: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<Message, EngineError> {
        self.requests.lock().unwrap().push(transcript.to_vec());
        self.offered_tools
            .lock()
            .unwrap()
            .push(tools.iter().map(|t| t.name.clone()).collect());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => self.fallback.clone().ok_or_else(|| {
                EngineError::ProtocolViolation("scripted generator exhausted".to_string())
            }),
        }
    }
}

/// Generator that requests `tool` on every step and never answers.
pub struct AlwaysToolGenerator {
    tool: String,
    calls: AtomicUsize,
}

impl AlwaysToolGenerator {
    pub fn new(tool: &str) -> Self {
        Self {
            tool: tool.to_string(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Generator for AlwaysToolGenerator {
    fn name(&self) -> &str {
        "always-tool"
    }

    async fn generate(
        &self,
        _transcript: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<Message, EngineError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let id = format!("call-{n}");
        Ok(tool_request(&[(
            id.as_str(),
            self.tool.as_str(),
            json!({ "query": "again" }),
        )]))
    }
}

/// Search backend returning fixed passages, or failing as unavailable.
pub struct StaticSearch {
    passages: Vec<String>,
    available: bool,
    queries: Mutex<Vec<String>>,
}

impl StaticSearch {
    pub fn new(passages: &[&str]) -> Self {
        Self {
            passages: passages.iter().map(|p| p.to_string()).collect(),
            available: true,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable() -> Self {
        Self {
            passages: Vec::new(),
            available: false,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchBackend for StaticSearch {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, EngineError> {
        self.queries.lock().unwrap().push(query.to_string());
        if !self.available {
            return Err(EngineError::IndexUnavailable("vector index offline".to_string()));
        }
        Ok(self.passages.iter().take(top_k).cloned().collect())
    }
}

/// Tool that sleeps `delay_ms` and echoes `label`; counts invocations.
pub fn sleepy_tool(invocations: Arc<AtomicUsize>) -> Arc<dyn Tool> {
    Arc::new(ToolSpec::new(
        "sleepy",
        "Wait, then echo the label",
        ToolParameters::object()
            .string("label", "Text to echo", true)
            .integer("delay_ms", "How long to wait", true)
            .build(),
        move |args| {
            let invocations = invocations.clone();
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                let delay = args.get_u64_opt("delay_ms").unwrap_or(0);
                tokio::time::sleep(Duration::from_millis(delay)).await;
                Ok(args.get_str("label")?.to_string())
            }
        },
    ))
}

/// Tool taking `query` that counts invocations and echoes the query.
pub fn echo_tool(name: &str, invocations: Arc<AtomicUsize>) -> Arc<dyn Tool> {
    Arc::new(ToolSpec::new(
        name,
        "Echo the query",
        ToolParameters::object()
            .string("query", "Text to echo", true)
            .build(),
        move |args| {
            let invocations = invocations.clone();
            async move {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok(args.get_str("query")?.to_string())
            }
        },
    ))
}

/// Tool that always fails.
pub fn broken_tool(name: &str) -> Arc<dyn Tool> {
    let tool_name = name.to_string();
    Arc::new(ToolSpec::new(
        name,
        "Always fails",
        ToolParameters::object()
            .string("query", "Ignored", true)
            .build(),
        move |_args| {
            let tool_name = tool_name.clone();
            async move { Err(EngineError::tool(tool_name, "backend exploded")) }
        },
    ))
}

/// In-memory store whose `save` takes `delay` to complete.
pub struct SlowSaveStore {
    inner: InMemoryThreadStore,
    delay: Duration,
}

impl SlowSaveStore {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: InMemoryThreadStore::new(),
            delay,
        }
    }
}

#[async_trait]
impl ThreadStore for SlowSaveStore {
    async fn load(&self, thread_id: &str) -> threadwise::error::Result<Transcript> {
        self.inner.load(thread_id).await
    }

    async fn save(&self, thread_id: &str, transcript: &Transcript) -> threadwise::error::Result<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.save(thread_id, transcript).await
    }

    async fn clear(&self, thread_id: &str) -> threadwise::error::Result<()> {
        self.inner.clear(thread_id).await
    }

    async fn clear_all(&self) -> threadwise::error::Result<()> {
        self.inner.clear_all().await
    }
}
