//! Error types for threadwise.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Generation timed out after {0}ms")]
    GenerationTimeout(u64),

    #[error("Generation refused: {0}")]
    GenerationRefused(String),

    #[error("Malformed tool call for '{tool_name}': {message}")]
    MalformedToolCall { tool_name: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("Run exceeded {0} generate steps without a final answer")]
    MaxIterationsExceeded(usize),

    #[error("Retrieval index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Respond timed out after {0}ms")]
    Timeout(u64),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl EngineError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Create a malformed tool call error.
    pub fn malformed_call(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedToolCall {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) => ErrorCategory::Input,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::GenerationRefused(_) => ErrorCategory::Generation,
            Self::GenerationTimeout(_) | Self::Timeout(_) => ErrorCategory::Timeout,
            Self::MalformedToolCall { .. } | Self::UnknownTool(_) | Self::ProtocolViolation(_) => {
                ErrorCategory::Protocol
            }
            Self::MaxIterationsExceeded(_) => ErrorCategory::LoopGuard,
            Self::IndexUnavailable(_) | Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Configuration,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Generation,
            },
            Self::Io(_) | Self::Storage(_) => ErrorCategory::Storage,
            Self::Serialization(_) => ErrorCategory::Serialization,
        }
    }

    /// Whether a failed generate step may be attempted again.
    ///
    /// The whole-respond `Timeout` is excluded: it is a deadline, not a
    /// transient backend failure.
    pub fn is_retryable(&self) -> bool {
        if matches!(self, Self::Timeout(_)) {
            return false;
        }
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Whether this error aborts a run.
    ///
    /// Tool execution failures are folded into tool-result content by the
    /// graph and never abort a run on their own.
    pub fn is_fatal(&self) -> bool {
        self.category() != ErrorCategory::ToolExecution
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Input => RecoverySuggestion::FixInput,
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server => {
                RecoverySuggestion::RetryWithBackoff
            }
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::ToolExecution => RecoverySuggestion::CheckToolImplementation,
            ErrorCategory::LoopGuard => RecoverySuggestion::RaiseIterationLimit,
            ErrorCategory::Protocol | ErrorCategory::Generation => RecoverySuggestion::StartOver,
            ErrorCategory::Storage | ErrorCategory::Serialization => {
                RecoverySuggestion::ContactSupport
            }
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, EngineError>;
