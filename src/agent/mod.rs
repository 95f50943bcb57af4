//! Agent invocation service
//!
//! The orchestrator hands the service a prompt, an ordered list of tool
//! descriptors and a set of callback hooks, and consumes nothing else: the
//! service performs the whole multi-turn, tool-using inference loop
//! internally. The hooks are the only window the core gets into it.

mod lmstudio;
mod loader;

pub use lmstudio::{research_prompt, LmStudioAgent};
pub use loader::ModelLoader;

use async_trait::async_trait;
use thiserror::Error;

use crate::tools::ToolDescriptor;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("request to model backend failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("model backend returned {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("model backend returned no choices")]
    EmptyResponse,

    #[error("agent did not finish within {0} turns")]
    TurnLimit(usize),
}

/// Callbacks fired while an invocation is in flight.
///
/// `on_tool_call_start` / `on_tool_call_end` receive the invoked tool's name
/// when the runtime knows it; a runtime that only observes "some call began"
/// passes `None` and the phase classifier falls back to its alternation
/// heuristic.
pub struct AgentHooks {
    pub on_first_token: Box<dyn Fn() + Send + Sync>,
    pub on_message: Box<dyn Fn(&str) + Send + Sync>,
    pub on_tool_call_start: Box<dyn Fn(Option<&str>) + Send + Sync>,
    pub on_tool_call_end: Box<dyn Fn(Option<&str>) + Send + Sync>,
}

impl AgentHooks {
    /// Hooks that do nothing, for tests and probes.
    pub fn noop() -> Self {
        Self {
            on_first_token: Box::new(|| {}),
            on_message: Box::new(|_| {}),
            on_tool_call_start: Box::new(|_| {}),
            on_tool_call_end: Box::new(|_| {}),
        }
    }
}

/// The external inference collaborator, behind a narrow seam so tests can
/// script it.
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Perform exactly one multi-turn research invocation.
    async fn invoke(
        &self,
        prompt: &str,
        tools: &[ToolDescriptor],
        hooks: &AgentHooks,
    ) -> Result<(), AgentError>;
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_research_prompt_reachable_at_module_root() {
        // The orchestrator imports the prompt builder through this module,
        // not through the backend submodule.
        let prompt = crate::agent::research_prompt("ferrite cores");
        assert!(prompt.contains("ferrite cores"));
    }
}
