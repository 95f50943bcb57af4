//! Final report tool
//!
//! Returns the report wrapped in the `final_report` control envelope. The
//! agent loop surfaces every tool result on the message stream, so the
//! envelope travels to the client as an ordinary text frame and the client's
//! try-parse routing promotes it to a control frame. This is the one place
//! the text/control ambiguity is exploited on purpose.

use async_trait::async_trait;
use serde_json::json;

use super::{string_arg, Tool, ToolDescriptor, ToolError};
use crate::protocol::ControlFrame;

pub struct FinalReportTool;

impl FinalReportTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FinalReportTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FinalReportTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "generate_final_report".to_string(),
            description: "Deliver the finished research report. Pass the complete report in \
                          markdown as the content parameter. This must be called once the \
                          report is ready, or it will not be displayed to the user."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "content": {
                        "type": "string",
                        "description": "The full report in markdown format"
                    }
                },
                "required": ["content"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let content = string_arg(&args, "content")?;
        let frame = ControlFrame::FinalReport { content };
        serde_json::to_string(&frame).map_err(|e| {
            ToolError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}
