//! Per-connection session state and the session registry
//!
//! One session exists per live WebSocket connection, created on open and
//! evicted on close. The registry also runs a periodic sweep that evicts
//! sessions whose outbound channel has gone away, as a safety net for close
//! events that never arrive.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::phase::{Phase, ToolCallClassifier};
use crate::protocol::{ControlFrame, FrameSender};

/// How often the sweep task scans for dead sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Mutable per-session state. Kept behind a mutex with short critical
/// sections; the agent callbacks and the connection handler both touch it.
#[derive(Debug)]
struct SessionState {
    phase: Phase,
    classifier: ToolCallClassifier,
    running: bool,
    run_task: Option<JoinHandle<()>>,
}

/// Server-side state for one connected client.
pub struct Session {
    /// Opaque unique id, generated at connection open. Never transmitted to
    /// the client; the channel itself is the externally observable handle.
    pub id: Uuid,
    /// Outbound frame multiplexer for this session's channel.
    pub sender: FrameSender,
    state: Mutex<SessionState>,
}

impl Session {
    fn new(sender: FrameSender) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            state: Mutex::new(SessionState {
                phase: Phase::Analysis,
                classifier: ToolCallClassifier::new(),
                running: false,
                run_task: None,
            }),
        }
    }

    /// Set the current phase and emit a `phase_update` frame.
    ///
    /// No transition legality is checked: any phase may follow any phase,
    /// and phases repeat as tool calls come in.
    pub fn advance(&self, phase: Phase) {
        {
            let mut state = self.state.lock().unwrap();
            state.phase = phase;
        }
        self.sender.control(&ControlFrame::PhaseUpdate { phase });
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().unwrap().phase
    }

    /// Classify a tool-call-start event against this session's classifier.
    pub fn classify_tool_start(&self, tool_name: Option<&str>) -> Phase {
        self.state.lock().unwrap().classifier.classify_start(tool_name)
    }

    /// Classify a tool-call-end event.
    pub fn classify_tool_end(&self) -> Phase {
        self.state.lock().unwrap().classifier.classify_end()
    }

    /// Try to move Idle -> Running, resetting transient run state.
    ///
    /// Returns `false` if a run is already in flight on this channel, in
    /// which case the start request is ignored.
    pub fn begin_run(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.running {
            return false;
        }
        state.running = true;
        state.phase = Phase::Analysis;
        state.classifier.reset();
        true
    }

    /// Move Running -> Idle after a run completes.
    pub fn finish_run(&self) {
        let mut state = self.state.lock().unwrap();
        state.running = false;
        state.run_task = None;
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().unwrap().running
    }

    /// Attach the spawned run task so teardown can cancel it.
    pub fn set_run_task(&self, handle: JoinHandle<()>) {
        self.state.lock().unwrap().run_task = Some(handle);
    }

    /// Abort any in-flight run. Called on channel close so a disconnected
    /// client does not keep burning inference and search work.
    fn cancel_run(&self) {
        let handle = {
            let mut state = self.state.lock().unwrap();
            state.running = false;
            state.run_task.take()
        };
        if let Some(handle) = handle {
            handle.abort();
            log::debug!("aborted in-flight run for session {}", self.id);
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

/// Tracks every live session, keyed by session id.
///
/// Invariant: at most one session per live channel; the registry's size
/// equals the number of open channels (modulo the sweep window when a close
/// event is lost).
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, Arc<Session>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Create and track a session for a freshly opened channel. O(1).
    pub fn register(&self, sender: FrameSender) -> Arc<Session> {
        let session = Arc::new(Session::new(sender));
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        log::info!("session registered: {}", session.id);
        session
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Session>> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }

    /// Remove a session and cancel its in-flight run, if any.
    ///
    /// Idempotent: unregistering an unknown id is a no-op, so duplicate
    /// close events are harmless.
    pub fn unregister(&self, id: Uuid) {
        let removed = self.sessions.lock().unwrap().remove(&id);
        match removed {
            Some(session) => {
                session.cancel_run();
                log::info!("session unregistered: {}", id);
            }
            None => log::debug!("unregister for unknown session {}, ignoring", id),
        }
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict sessions whose outbound channel is closed. Returns how many
    /// were removed.
    pub fn sweep(&self) -> usize {
        let stale: Vec<Arc<Session>> = {
            let mut sessions = self.sessions.lock().unwrap();
            let ids: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, s)| s.sender.is_closed())
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };
        for session in &stale {
            session.cancel_run();
            log::warn!("swept stale session {} (missed close event)", session.id);
        }
        stale.len()
    }

    /// Spawn the periodic sweep task.
    pub fn start_sweep_task(registry: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                interval.tick().await;
                let swept = registry.sweep();
                if swept > 0 {
                    log::info!("sweep evicted {} stale sessions", swept);
                }
            }
        });
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
