use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

use deep_research::agent::{LmStudioAgent, ModelLoader};
use deep_research::config::{Cli, Config};
use deep_research::orchestrator::Orchestrator;
use deep_research::registry::SessionRegistry;
use deep_research::server::{run_server, AppState};
use deep_research::shutdown::{register_signal_handlers, ShutdownState};
use deep_research::tools::{
    FinalReportTool, SaveFileTool, ToolRegistry, WebSearchTool, WebsiteContentTool,
};

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let config = Config::resolve(Cli::parse())?;
    log::info!(
        "starting with model '{}' at {} (pace {:?})",
        config.model,
        config.base_url,
        config.pace
    );

    let shutdown = ShutdownState::new();
    if let Err(e) = register_signal_handlers(shutdown.clone()) {
        log::warn!("Failed to register signal handlers: {}", e);
    }

    let client = reqwest::Client::new();

    let mut tools = ToolRegistry::new();
    tools.register(Arc::new(WebSearchTool::new(client.clone())));
    tools.register(Arc::new(WebsiteContentTool::new(client.clone())));
    tools.register(Arc::new(FinalReportTool::new()));
    tools.register(Arc::new(SaveFileTool::new(config.reports_dir.clone())));
    let tools = Arc::new(tools);
    let descriptors = tools.descriptors();

    let agent = Arc::new(LmStudioAgent::new(
        client.clone(),
        config.base_url.clone(),
        config.model.clone(),
        tools,
    ));
    let loader = Arc::new(ModelLoader::new(
        client,
        config.base_url.clone(),
        config.model.clone(),
    ));

    // Kick off the readiness probe so the model is warming while the first
    // client connects; runs still gate on it individually.
    let warmup = loader.clone();
    tokio::spawn(async move {
        if let Err(e) = warmup.ready().await {
            log::warn!("model backend not ready yet: {}", e);
        }
    });

    let registry = Arc::new(SessionRegistry::new());
    SessionRegistry::start_sweep_task(registry.clone());

    let orchestrator = Arc::new(Orchestrator::new(agent, descriptors, config.pace));
    let state = AppState::new(registry, orchestrator, loader, shutdown);

    run_server(config.port, &config.bind, state).await
}
