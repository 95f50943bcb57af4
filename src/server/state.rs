//! Server application state shared across handlers

use std::sync::Arc;

use crate::agent::ModelLoader;
use crate::orchestrator::Orchestrator;
use crate::registry::SessionRegistry;
use crate::shutdown::ShutdownState;

/// Shared state for the server. Everything here is either immutable or
/// internally synchronized; handlers clone the struct freely.
#[derive(Clone)]
pub struct AppState {
    /// Live session registry, one entry per open WebSocket.
    pub registry: Arc<SessionRegistry>,

    /// Drives research runs for sessions.
    pub orchestrator: Arc<Orchestrator>,

    /// Model readiness gate, awaited before the first run on a channel.
    pub loader: Arc<ModelLoader>,

    /// Shutdown state
    pub shutdown: ShutdownState,
}

impl AppState {
    pub fn new(
        registry: Arc<SessionRegistry>,
        orchestrator: Arc<Orchestrator>,
        loader: Arc<ModelLoader>,
        shutdown: ShutdownState,
    ) -> Self {
        Self {
            registry,
            orchestrator,
            loader,
            shutdown,
        }
    }
}
