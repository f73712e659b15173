//! Generate / invoke-tools state machine.
//!
//! A run always enters at [`Node::Generate`]. A generated reply carrying tool
//! calls moves the run to [`Node::InvokeTools`], which answers every call and
//! unconditionally returns to `Generate`. A reply without tool calls ends the
//! run. The number of generate steps is bounded by `max_iterations`.

use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use strum::Display;
use tracing::{debug, info, warn};

use crate::error::{EngineError, Result};
use crate::provider::{check_reply, Generator, ToolDefinition};
use crate::tools::validation::validate_call;
use crate::tools::{Tool, ToolArguments, ToolRegistry};
use crate::types::{Message, ToolCall, Transcript};

pub const DEFAULT_MAX_ITERATIONS: usize = 10;

/// Graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Node {
    Generate,
    InvokeTools,
}

/// Step outcome: jump to a node or stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Next {
    Node(Node),
    End,
}

/// Outcome of a run that reached a final answer.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRunResult {
    /// Assistant message that ended the run.
    pub final_message: Message,
    /// Messages appended before the final answer (tool requests and results).
    pub trace: Vec<Message>,
}

impl GraphRunResult {
    pub fn answer(&self) -> &str {
        &self.final_message.content
    }

    /// Number of generate steps the run took.
    pub fn generate_steps(&self) -> usize {
        1 + self.trace.iter().filter(|m| m.requests_tools()).count()
    }
}

/// Compiled agent graph: a generator, the tools it may call, and a step bound.
pub struct AgentGraph {
    generator: Arc<dyn Generator>,
    tools: ToolRegistry,
    definitions: Vec<ToolDefinition>,
    max_iterations: usize,
}

impl AgentGraph {
    pub fn new(generator: Arc<dyn Generator>, tools: ToolRegistry, max_iterations: usize) -> Self {
        let definitions = tools.definitions();
        Self {
            generator,
            tools,
            definitions,
            max_iterations: max_iterations.max(1),
        }
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run from `Generate` until a final answer, extending `transcript` in place.
    ///
    /// On error the transcript may hold a partial turn; callers working on a
    /// checkpoint must discard it.
    pub async fn run(&self, transcript: &mut Transcript) -> Result<GraphRunResult> {
        transcript.validate()?;
        let start = transcript.len();
        let mut node = Node::Generate;
        let mut iteration = 0usize;

        loop {
            debug!(node = %node, iteration, "graph step");
            let next = match node {
                Node::Generate => {
                    iteration += 1;
                    self.generate(transcript, iteration).await?
                }
                Node::InvokeTools => self.invoke_tools(transcript).await?,
            };
            match next {
                Next::Node(n) => node = n,
                Next::End => break,
            }
        }

        let mut appended = transcript.messages()[start..].to_vec();
        let final_message = appended.pop().ok_or_else(|| {
            EngineError::ProtocolViolation("run ended without a reply".to_string())
        })?;
        info!(
            generate_steps = iteration,
            appended = appended.len() + 1,
            "graph run complete"
        );
        Ok(GraphRunResult {
            final_message,
            trace: appended,
        })
    }

    async fn generate(&self, transcript: &mut Transcript, iteration: usize) -> Result<Next> {
        let reply = self
            .generator
            .generate(transcript.messages(), &self.definitions)
            .await?;
        check_reply(&reply)?;

        if !reply.requests_tools() {
            transcript.push(reply);
            return Ok(Next::End);
        }
        if iteration >= self.max_iterations {
            warn!(
                max_iterations = self.max_iterations,
                "generator still requesting tools at iteration bound"
            );
            return Err(EngineError::MaxIterationsExceeded(self.max_iterations));
        }
        debug!(iteration, tool_calls = reply.tool_calls.len(), "generator requested tools");
        transcript.push(reply);
        Ok(Next::Node(Node::InvokeTools))
    }

    async fn invoke_tools(&self, transcript: &mut Transcript) -> Result<Next> {
        let calls: Vec<ToolCall> = transcript
            .last()
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();

        // Resolve every call before any tool runs.
        let mut resolved: Vec<(&ToolCall, &Arc<dyn Tool>)> = Vec::with_capacity(calls.len());
        for call in &calls {
            let tool = self
                .tools
                .get(&call.name)
                .ok_or_else(|| EngineError::UnknownTool(call.name.clone()))?;
            validate_call(call, &tool.parameters().schema)?;
            resolved.push((call, tool));
        }

        let results = join_all(
            resolved
                .into_iter()
                .map(|(call, tool)| execute_tool_call(call, tool.as_ref())),
        )
        .await;

        // join_all keeps input order, so results line up with the requests.
        transcript.extend(results);
        Ok(Next::Node(Node::Generate))
    }
}

impl std::fmt::Debug for AgentGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentGraph")
            .field("generator", &self.generator.name())
            .field("tools", &self.tools)
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

/// Invoke one tool; failures become an error payload in the result content.
async fn execute_tool_call(call: &ToolCall, tool: &dyn Tool) -> Message {
    let started = Instant::now();
    let args = ToolArguments::new(call.arguments.clone());
    let outcome = tool.invoke(&args).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(content) => {
            debug!(tool = %call.name, tool_call_id = %call.id, duration_ms, "tool call succeeded");
            Message::tool_result(&call.id, content)
        }
        Err(e) => {
            warn!(
                tool = %call.name,
                tool_call_id = %call.id,
                duration_ms,
                error = %e,
                "tool call failed"
            );
            let payload = serde_json::json!({ "error": e.to_string() });
            Message::tool_result(&call.id, payload.to_string())
        }
    }
}
