//! Typed access to tool call arguments.

use serde::de::DeserializeOwned;

use crate::error::EngineError;

/// Arguments supplied by the generator for one tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolArguments {
    raw: serde_json::Value,
}

impl ToolArguments {
    pub fn new(raw: serde_json::Value) -> Self {
        Self { raw }
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.raw
    }

    /// Required string argument.
    pub fn get_str(&self, key: &str) -> Result<&str, EngineError> {
        self.raw
            .get(key)
            .and_then(|v| v.as_str())
            .ok_or_else(|| EngineError::InvalidInput(format!("missing string argument '{key}'")))
    }

    pub fn get_str_opt(&self, key: &str) -> Option<&str> {
        self.raw.get(key).and_then(|v| v.as_str())
    }

    pub fn get_u64_opt(&self, key: &str) -> Option<u64> {
        self.raw.get(key).and_then(|v| v.as_u64())
    }

    /// Deserialize the whole argument object into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, EngineError> {
        Ok(serde_json::from_value(self.raw.clone())?)
    }
}
