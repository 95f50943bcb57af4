//! Model readiness check
//!
//! The model handle is loaded by the backend asynchronously at process
//! start; sessions await readiness before their first run. Successful
//! readiness is cached for the process lifetime, failures are retried on
//! the next run attempt.

use serde::Deserialize;
use tokio::sync::OnceCell;

use super::AgentError;

pub struct ModelLoader {
    client: reqwest::Client,
    base_url: String,
    model: String,
    ready: OnceCell<()>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

impl ModelLoader {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            ready: OnceCell::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Wait until the backend is reachable and reports its loaded models.
    pub async fn ready(&self) -> Result<(), AgentError> {
        self.ready
            .get_or_try_init(|| self.probe())
            .await
            .map(|_| ())
    }

    async fn probe(&self) -> Result<(), AgentError> {
        let url = format!("{}/v1/models", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let models: ModelList = response.json().await?;
        if models.data.iter().any(|m| m.id == self.model) {
            log::info!("model '{}' is loaded and ready", self.model);
        } else {
            // LM Studio loads models on demand; a missing entry is worth a
            // warning but not a hard failure.
            log::warn!(
                "model '{}' not in backend model list ({} available)",
                self.model,
                models.data.len()
            );
        }
        Ok(())
    }
}
