//! LM Studio agent backend
//!
//! Drives the research loop against LM Studio's OpenAI-compatible
//! chat-completions endpoint: declare the tools, send the conversation, and
//! when the model responds with tool calls, execute them through the tool
//! registry and feed the results back until the model stops calling tools.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{AgentError, AgentHooks, AgentService};
use crate::tools::{ToolDescriptor, ToolRegistry};

/// Upper bound on request/response turns in one invocation. A research run
/// that has not converged by then is runaway.
const MAX_TURNS: usize = 24;

pub struct LmStudioAgent {
    client: reqwest::Client,
    base_url: String,
    model: String,
    tools: Arc<ToolRegistry>,
}

impl LmStudioAgent {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            tools,
        }
    }

    fn completions_url(&self) -> String {
        format!("{}/v1/chat/completions", self.base_url)
    }

    fn tool_declaration(descriptor: &ToolDescriptor) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": descriptor.name,
                "description": descriptor.description,
                "parameters": descriptor.parameters,
            }
        })
    }

    async fn request_turn(
        &self,
        messages: &[Value],
        tools: &[ToolDescriptor],
    ) -> Result<ChatMessage, AgentError> {
        let declarations: Vec<Value> = tools.iter().map(Self::tool_declaration).collect();
        let body = json!({
            "model": self.model,
            "messages": messages,
            "tools": declarations,
        });

        let response = self
            .client
            .post(self.completions_url())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or(AgentError::EmptyResponse)
    }

    /// Execute one tool call and return the result text fed back to the
    /// model. Tool failures are reported to the model as text rather than
    /// aborting the run; the model can retry or route around them.
    async fn execute_tool(&self, name: &str, raw_args: &str) -> String {
        let args: Value = serde_json::from_str(raw_args).unwrap_or(Value::Null);
        match self.tools.get(name) {
            Some(tool) => match tool.call(args).await {
                Ok(result) => result,
                Err(e) => {
                    log::warn!("tool '{}' failed: {}", name, e);
                    format!("Tool '{}' failed: {}", name, e)
                }
            },
            None => {
                log::warn!("model requested unknown tool '{}'", name);
                format!("Unknown tool: {}", name)
            }
        }
    }
}

#[async_trait]
impl AgentService for LmStudioAgent {
    async fn invoke(
        &self,
        prompt: &str,
        tools: &[ToolDescriptor],
        hooks: &AgentHooks,
    ) -> Result<(), AgentError> {
        let mut messages = vec![json!({"role": "user", "content": prompt})];
        let mut first_response = true;

        for _ in 0..MAX_TURNS {
            let message = self.request_turn(&messages, tools).await?;

            if first_response {
                (hooks.on_first_token)();
                first_response = false;
            }

            if let Some(content) = message.content.as_deref() {
                if !content.is_empty() {
                    (hooks.on_message)(content);
                }
            }

            let tool_calls = message.tool_calls.unwrap_or_default();
            if tool_calls.is_empty() {
                return Ok(());
            }

            // Echo the assistant turn back, tool calls included, so the
            // follow-up request carries the full conversation.
            let call_values: Vec<Value> = tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.function.name,
                            "arguments": tc.function.arguments,
                        }
                    })
                })
                .collect();
            messages.push(json!({
                "role": "assistant",
                "content": message.content,
                "tool_calls": call_values,
            }));

            for call in &tool_calls {
                let name = call.function.name.as_str();
                (hooks.on_tool_call_start)(Some(name));
                let result = self.execute_tool(name, &call.function.arguments).await;
                (hooks.on_tool_call_end)(Some(name));

                // Tool results travel the message stream like every other
                // chunk; the final-report envelope reaches the client this
                // way.
                (hooks.on_message)(&result);

                messages.push(json!({
                    "role": "tool",
                    "tool_call_id": call.id,
                    "content": result,
                }));
            }
        }

        Err(AgentError::TurnLimit(MAX_TURNS))
    }
}

/// Chat-completions response shapes, narrowed to the fields we read.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ToolCall {
    id: String,
    function: FunctionCall,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

/// Build the research prompt for one query, mirroring the instructions the
/// model needs to finish with the final-report tool.
pub fn research_prompt(query: &str) -> String {
    format!(
        "The user wants to research the following topic: {query}\n\
         Search the web with the most effective queries for this topic.\n\
         First collect the information you need, then organize what you found \
         into a comprehensive report in markdown format, using headings, bullet \
         lists, links and quotes where appropriate. Always cite the source URLs. \
         If a page looks important, fetch its content and verify the details.\n\
         Base the report only on what you found, not on prior knowledge.\n\
         Most important: when the report is complete, you must call the \
         generate_final_report tool and pass the full markdown report as its \
         content parameter. Without that call the report cannot be displayed."
    )
}
