//! Tool system for generator-invoked capabilities.

pub mod arguments;
pub mod registry;
pub mod retrieval;
pub mod tool;
pub mod types;
pub mod validation;

pub use arguments::ToolArguments;
pub use registry::ToolRegistry;
pub use retrieval::{KeywordIndex, RetrievalTool, SearchBackend};
pub use tool::{Tool, ToolSpec};
pub use types::ToolParameters;
