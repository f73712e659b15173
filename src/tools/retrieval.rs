//! Retrieval tool backed by a ready-made search index.

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;

use super::arguments::ToolArguments;
use super::tool::Tool;
use super::types::ToolParameters;
use crate::error::EngineError;

/// Tool result text when the index has nothing relevant.
pub const NO_PASSAGES: &str = "No relevant passages found.";

/// Similarity search over an externally built index.
///
/// Implementations are read-only and shared across concurrent runs.
/// An unreachable index must fail with [`EngineError::IndexUnavailable`]
/// rather than return an empty hit list.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, EngineError>;
}

/// Exposes a [`SearchBackend`] to the generator as a named tool taking `query`.
pub struct RetrievalTool {
    name: String,
    description: String,
    parameters: ToolParameters,
    backend: Arc<dyn SearchBackend>,
    top_k: usize,
}

impl RetrievalTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        backend: Arc<dyn SearchBackend>,
        top_k: usize,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ToolParameters::object()
                .string("query", "Search query", true)
                .build(),
            backend,
            top_k: top_k.max(1),
        }
    }

    /// Passages relevant to `query`, best first.
    pub async fn retrieve(&self, query: &str) -> Result<Vec<String>, EngineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EngineError::tool(&self.name, "query cannot be empty"));
        }
        let passages = self.backend.search(query, self.top_k).await?;
        debug!(tool = %self.name, hits = passages.len(), "retrieval complete");
        Ok(passages)
    }
}

#[async_trait]
impl Tool for RetrievalTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters(&self) -> &ToolParameters {
        &self.parameters
    }

    async fn invoke(&self, args: &ToolArguments) -> Result<String, EngineError> {
        let passages = self.retrieve(args.get_str("query")?).await?;
        if passages.is_empty() {
            return Ok(NO_PASSAGES.to_string());
        }
        Ok(passages.join("\n\n"))
    }
}

impl std::fmt::Debug for RetrievalTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalTool")
            .field("name", &self.name)
            .field("top_k", &self.top_k)
            .finish()
    }
}

/// Keyword-overlap search over a fixed list of passages.
///
/// Passages are prepared elsewhere; this only ranks them.
#[derive(Debug, Clone, Default)]
pub struct KeywordIndex {
    passages: Vec<String>,
    terms: Vec<HashSet<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PassageRecord {
    Text(String),
    Object { text: String },
}

impl KeywordIndex {
    pub fn new(passages: Vec<String>) -> Self {
        let terms = passages.iter().map(|p| tokenize(p)).collect();
        Self { passages, terms }
    }

    /// Load passages from a JSON array of strings or `{ "text": ... }` objects.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            EngineError::IndexUnavailable(format!("{}: {e}", path.display()))
        })?;
        let records: Vec<PassageRecord> = serde_json::from_str(&content).map_err(|e| {
            EngineError::IndexUnavailable(format!("{}: {e}", path.display()))
        })?;
        let passages = records
            .into_iter()
            .map(|r| match r {
                PassageRecord::Text(text) | PassageRecord::Object { text } => text,
            })
            .collect();
        Ok(Self::new(passages))
    }

    pub fn len(&self) -> usize {
        self.passages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.passages.is_empty()
    }

    /// Top `top_k` passages sharing at least one term with `query`.
    /// Higher overlap first; ties keep corpus order.
    pub fn rank(&self, query: &str, top_k: usize) -> Vec<String> {
        let query_terms = tokenize(query);
        let mut scored: Vec<(usize, usize)> = self
            .terms
            .iter()
            .enumerate()
            .map(|(idx, terms)| (terms.intersection(&query_terms).count(), idx))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        scored
            .into_iter()
            .take(top_k)
            .map(|(_, idx)| self.passages[idx].clone())
            .collect()
    }
}

#[async_trait]
impl SearchBackend for KeywordIndex {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<String>, EngineError> {
        Ok(self.rank(query, top_k))
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    static WORD: OnceLock<Regex> = OnceLock::new();
    let word = WORD.get_or_init(|| Regex::new(r"\w+").expect("static regex"));
    word.find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|t| t.chars().count() > 1)
        .collect()
}
