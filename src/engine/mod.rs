//! Engine façade: load a thread, run the graph, checkpoint the result.

mod gate;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::graph::{AgentGraph, GraphRunResult, DEFAULT_MAX_ITERATIONS};
use crate::memory::{open_store, InMemoryThreadStore, ThreadStore};
use crate::provider::{Generator, OpenAiGenerator, RetryingGenerator};
use crate::tools::{KeywordIndex, RetrievalTool, Tool, ToolRegistry};
use crate::types::{DialogueEntry, Message, Transcript};
use crate::util::retry::RetryPolicy;

use gate::ThreadGates;

/// Entry point for conversations.
///
/// Calls on the same thread are serialized; different threads run
/// independently. A turn is checkpointed only when the graph reaches a final
/// answer, so a failed or timed-out call leaves the stored thread untouched.
pub struct Engine {
    graph: AgentGraph,
    store: Arc<dyn ThreadStore>,
    system_prompt: String,
    respond_timeout: Option<Duration>,
    gates: ThreadGates,
}

impl Engine {
    pub fn builder(generator: Arc<dyn Generator>) -> EngineBuilder {
        EngineBuilder::new(generator)
    }

    /// Build an OpenAI-backed engine from configuration.
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let api_key = config.api_key.clone().ok_or_else(|| {
            EngineError::Configuration("missing API_KEY or OPENAI_API_KEY".to_string())
        })?;

        let mut generator = OpenAiGenerator::new(&config.model, api_key)
            .with_settings(config.settings.clone())
            .with_timeout(config.generation_timeout());
        if let Some(ref base_url) = config.base_url {
            generator = generator.with_base_url(base_url);
        }

        Engine::builder(Arc::new(generator))
            .apply_config(config)
            .await?
            .build()
    }

    /// Answer `user_text` on `thread_id` and return the final answer text.
    pub async fn respond(&self, thread_id: &str, user_text: &str) -> Result<String> {
        let result = self.run_turn(thread_id, user_text).await?;
        Ok(result.final_message.content)
    }

    /// Like [`Engine::respond`], returning the full run result.
    pub async fn run_turn(&self, thread_id: &str, user_text: &str) -> Result<GraphRunResult> {
        validate_thread_id(thread_id)?;
        if user_text.trim().is_empty() {
            return Err(EngineError::InvalidInput(
                "user text cannot be empty".to_string(),
            ));
        }

        let span = info_span!("respond", thread_id);
        async {
            let _guard = self.gates.acquire(thread_id).await;
            let outcome = self.run_locked(thread_id, user_text).await;
            if let Err(ref e) = outcome {
                warn!(error = %e, category = ?e.category(), "turn failed; thread left unchanged");
            }
            outcome
        }
        .instrument(span)
        .await
    }

    async fn run_locked(&self, thread_id: &str, user_text: &str) -> Result<GraphRunResult> {
        let mut working = self.store.load(thread_id).await?;
        let prior = working.len();
        if working.is_empty() {
            working.push(Message::system(&self.system_prompt));
        }
        working.push(Message::user(user_text));

        // The deadline covers the run only; a started checkpoint write is
        // never abandoned.
        let run = self.graph.run(&mut working);
        let result = match self.respond_timeout {
            Some(limit) => tokio::time::timeout(limit, run)
                .await
                .map_err(|_| EngineError::Timeout(limit.as_millis() as u64))??,
            None => run.await?,
        };
        self.store.save(thread_id, &working).await?;

        info!(
            prior_messages = prior,
            messages = working.len(),
            generate_steps = result.generate_steps(),
            "turn checkpointed"
        );
        Ok(result)
    }

    /// Drop a thread's history. The next turn starts from the system message.
    pub async fn clear(&self, thread_id: &str) -> Result<()> {
        validate_thread_id(thread_id)?;
        let _guard = self.gates.acquire(thread_id).await;
        self.store.clear(thread_id).await?;
        debug!(thread_id, "thread cleared");
        Ok(())
    }

    pub async fn clear_all(&self) -> Result<()> {
        self.store.clear_all().await?;
        info!("all threads cleared");
        Ok(())
    }

    /// Stored transcript, including system and tool messages.
    pub async fn transcript(&self, thread_id: &str) -> Result<Transcript> {
        validate_thread_id(thread_id)?;
        self.store.load(thread_id).await
    }

    /// User-visible dialogue of a thread.
    pub async fn history(&self, thread_id: &str) -> Result<Vec<DialogueEntry>> {
        Ok(self.transcript(thread_id).await?.dialogue())
    }

    pub fn graph(&self) -> &AgentGraph {
        &self.graph
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("graph", &self.graph)
            .field("respond_timeout", &self.respond_timeout)
            .finish()
    }
}

fn validate_thread_id(thread_id: &str) -> Result<()> {
    if thread_id.trim().is_empty() {
        return Err(EngineError::InvalidInput(
            "thread id cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Assembles an [`Engine`]. Tools are fixed once `build` returns.
pub struct EngineBuilder {
    generator: Arc<dyn Generator>,
    tools: Vec<Arc<dyn Tool>>,
    store: Option<Arc<dyn ThreadStore>>,
    system_prompt: String,
    max_iterations: usize,
    retry_policy: RetryPolicy,
    generation_timeout: Duration,
    respond_timeout: Option<Duration>,
}

impl EngineBuilder {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            tools: Vec::new(),
            store: None,
            system_prompt: crate::config::DEFAULT_SYSTEM_PROMPT.to_string(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            retry_policy: RetryPolicy::default(),
            generation_timeout: Duration::from_secs(60),
            respond_timeout: None,
        }
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ThreadStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    /// Deadline for one generate attempt.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Deadline for the agent run of a `respond` call. Loading and the
    /// checkpoint write are not covered.
    pub fn with_respond_timeout(mut self, timeout: Duration) -> Self {
        self.respond_timeout = Some(timeout);
        self
    }

    /// Apply everything in `config` except the generator backend.
    ///
    /// Loads the retrieval passages when `retrieval.passages_path` is set.
    pub async fn apply_config(mut self, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        self.system_prompt = config.system_prompt.clone();
        self.max_iterations = config.max_iterations;
        self.retry_policy = RetryPolicy::from(&config.retry);
        self.generation_timeout = config.generation_timeout();
        self.respond_timeout = config.respond_timeout();

        self.store = Some(open_store(&config.store)?);

        if let Some(ref path) = config.retrieval.passages_path {
            let index = KeywordIndex::load(path).await?;
            info!(passages = index.len(), path = %path.display(), "retrieval index loaded");
            self.tools.push(Arc::new(RetrievalTool::new(
                &config.retrieval.tool_name,
                &config.retrieval.description,
                Arc::new(index),
                config.retrieval.top_k,
            )));
        }
        Ok(self)
    }

    pub fn build(self) -> Result<Engine> {
        if self.max_iterations == 0 {
            return Err(EngineError::Configuration(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        self.retry_policy.validate()?;
        let mut registry = ToolRegistry::new();
        for tool in self.tools {
            registry.register(tool)?;
        }

        let generator: Arc<dyn Generator> = Arc::new(RetryingGenerator::new(
            self.generator,
            self.retry_policy,
            self.generation_timeout,
        ));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryThreadStore::new()));

        Ok(Engine {
            graph: AgentGraph::new(generator, registry, self.max_iterations),
            store,
            system_prompt: self.system_prompt,
            respond_timeout: self.respond_timeout,
            gates: ThreadGates::default(),
        })
    }
}
