//! Convenience re-exports for common use.

pub use crate::config::EngineConfig;
pub use crate::engine::{Engine, EngineBuilder};
pub use crate::error::{EngineError, Result};
pub use crate::graph::{AgentGraph, GraphRunResult};
pub use crate::memory::{FileThreadStore, InMemoryThreadStore, ThreadStore};
pub use crate::provider::{Generator, OpenAiGenerator, ToolDefinition};
pub use crate::tools::{
    KeywordIndex, RetrievalTool, SearchBackend, Tool, ToolArguments, ToolParameters, ToolSpec,
};
pub use crate::types::{
    DialogueEntry, GenerationSettings, Message, Role, Speaker, ToolCall, Transcript, Usage,
};
