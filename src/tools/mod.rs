//! Tools the research agent can invoke
//!
//! The orchestration core never calls these directly; they are handed to the
//! agent invocation service as descriptors and executed inside its tool loop.
//! Result quality is out of scope; the interfaces are the contract.

mod content;
mod report;
mod save;
mod search;

pub use content::WebsiteContentTool;
pub use report::FinalReportTool;
pub use save::SaveFileTool;
pub use search::WebSearchTool;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("missing or invalid argument '{0}'")]
    BadArgument(&'static str),

    #[error("request to {url} failed: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Declaration of a tool as presented to the model: name, description, and a
/// JSON schema for its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// One callable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> ToolDescriptor;

    /// Execute with the model-supplied arguments, returning the result text
    /// fed back into the conversation.
    async fn call(&self, args: serde_json::Value) -> Result<String, ToolError>;
}

/// Ordered collection of tools, with name lookup for dispatch.
pub struct ToolRegistry {
    ordered: Vec<Arc<dyn Tool>>,
    by_name: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            ordered: Vec::new(),
            by_name: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name;
        if self.by_name.insert(name.clone(), tool.clone()).is_some() {
            log::warn!("tool '{}' registered twice, replacing", name);
            self.ordered.retain(|t| t.descriptor().name != name);
        }
        self.ordered.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.by_name.get(name).cloned()
    }

    /// Descriptors in registration order, as handed to the agent service.
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.ordered.iter().map(|t| t.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract a required string argument from a tool-call payload.
pub(crate) fn string_arg(
    args: &serde_json::Value,
    key: &'static str,
) -> Result<String, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .ok_or(ToolError::BadArgument(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn descriptor(&self) -> ToolDescriptor {
            ToolDescriptor {
                name: "echo".to_string(),
                description: "Echo the input".to_string(),
                parameters: json!({"type": "object", "properties": {}}),
            }
        }

        async fn call(&self, args: serde_json::Value) -> Result<String, ToolError> {
            string_arg(&args, "text")
        }
    }

    #[test]
    fn test_registry_preserves_registration_order() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let descriptors = registry.descriptors();
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].name, "echo");
        assert!(registry.get("echo").is_some());
        assert!(registry.get("missing").is_none());
    }

    #[tokio::test]
    async fn test_string_arg_validation() {
        let tool = EchoTool;
        assert_eq!(
            tool.call(json!({"text": "hello"})).await.unwrap(),
            "hello"
        );
        assert!(matches!(
            tool.call(json!({})).await,
            Err(ToolError::BadArgument("text"))
        ));
        assert!(matches!(
            tool.call(json!({"text": ""})).await,
            Err(ToolError::BadArgument("text"))
        ));
    }
}
