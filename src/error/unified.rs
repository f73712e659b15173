//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Generation,
    Protocol,
    LoopGuard,
    ToolExecution,
    Network,
    RateLimit,
    Timeout,
    Server,
    Storage,
    Configuration,
    Serialization,
}

/// Suggested recovery action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    FixInput,
    RetryWithBackoff,
    IncreaseTimeout,
    CheckConfiguration,
    CheckToolImplementation,
    RaiseIterationLimit,
    StartOver,
    ContactSupport,
}
