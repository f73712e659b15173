//! Registry of tools available to a graph.

use std::sync::Arc;

use super::tool::Tool;
use crate::error::EngineError;
use crate::provider::ToolDefinition;

/// Tools keyed by unique name, kept in registration order.
///
/// Filled once while an engine is being built and shared read-only afterward.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Names must be unique and non-empty.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), EngineError> {
        let name = tool.name();
        if name.trim().is_empty() {
            return Err(EngineError::Configuration(
                "tool name cannot be empty".to_string(),
            ));
        }
        if self.get(name).is_some() {
            return Err(EngineError::Configuration(format!(
                "tool '{name}' registered twice"
            )));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions advertised to the generator, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolParameters, ToolSpec};

    fn echo(name: &str) -> Arc<dyn Tool> {
        Arc::new(ToolSpec::new(
            name,
            "Echo the query",
            ToolParameters::object().string("query", "Text", true).build(),
            |args| async move { Ok(args.get_str("query")?.to_string()) },
        ))
    }

    #[test]
    fn rejects_duplicate_names() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("echo")).unwrap();

        let err = registry.register(echo("echo")).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn rejects_blank_names() {
        let mut registry = ToolRegistry::new();
        assert!(registry.register(echo("  ")).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn definitions_follow_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(echo("second")).unwrap();
        registry.register(echo("first")).unwrap();

        let names: Vec<String> = registry.definitions().into_iter().map(|d| d.name).collect();
        assert_eq!(names, vec!["second", "first"]);
        assert_eq!(registry.definitions()[0].parameters["required"][0], "query");
    }
}
