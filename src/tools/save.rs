//! Report persistence tool
//!
//! Writes finished reports to the reports directory. The orchestration core
//! never touches the filesystem itself; persistence happens only through
//! this tool when the model asks for it.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Local;
use serde_json::json;

use super::{string_arg, Tool, ToolDescriptor, ToolError};

pub struct SaveFileTool {
    reports_dir: PathBuf,
}

impl SaveFileTool {
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }

    /// Strip path components so the model cannot write outside the reports
    /// directory, and force a .md extension.
    fn sanitize_filename(filename: &str) -> String {
        let base = Path::new(filename)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "report".to_string());
        if base.ends_with(".md") {
            base
        } else {
            format!("{}.md", base.trim_end_matches('.'))
        }
    }
}

#[async_trait]
impl Tool for SaveFileTool {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor {
            name: "save_file".to_string(),
            description: "Save a markdown file with the given name and content into the \
                          reports directory, creating it if needed."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "filename": {
                        "type": "string",
                        "description": "Name for the saved file, e.g. topic_report.md"
                    },
                    "content": {
                        "type": "string",
                        "description": "The file content to write"
                    }
                },
                "required": ["filename", "content"]
            }),
        }
    }

    async fn call(&self, args: serde_json::Value) -> Result<String, ToolError> {
        let filename = Self::sanitize_filename(&string_arg(&args, "filename")?);
        let content = string_arg(&args, "content")?;

        tokio::fs::create_dir_all(&self.reports_dir).await?;

        let mut path = self.reports_dir.join(&filename);
        if path.exists() {
            // Keep the existing file; disambiguate with a timestamp.
            let stamped = format!(
                "{}_{}.md",
                filename.trim_end_matches(".md"),
                Local::now().format("%Y%m%d_%H%M%S")
            );
            log::info!("report '{}' already exists, saving as '{}'", filename, stamped);
            path = self.reports_dir.join(stamped);
        }

        tokio::fs::write(&path, content).await?;
        log::info!("report saved: {}", path.display());
        Ok(format!("File saved successfully: {}", path.display()))
    }
}
