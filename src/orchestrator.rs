//! Session orchestrator
//!
//! Drives one research run end to end for a session: the fixed pre-search
//! steps, exactly one agent invocation wired to the four callback hooks, and
//! the closing sequence. A channel runs at most one run at a time but may
//! run many sequentially; concurrent channels are fully independent.

use std::sync::Arc;
use std::time::Duration;

use crate::agent::{research_prompt, AgentHooks, AgentService};
use crate::phase::Phase;
use crate::protocol::ControlFrame;
use crate::registry::Session;
use crate::tools::ToolDescriptor;

const BANNER: &str = "========== Starting deep research ==========\n\n";

pub struct Orchestrator {
    agent: Arc<dyn AgentService>,
    tools: Vec<ToolDescriptor>,
    /// Cosmetic delay between the fixed steps, purely for perceived
    /// progress. Zero in tests.
    pace: Duration,
}

impl Orchestrator {
    pub fn new(agent: Arc<dyn AgentService>, tools: Vec<ToolDescriptor>, pace: Duration) -> Self {
        Self { agent, tools, pace }
    }

    /// Start a run for `query` on `session`, if the session is idle.
    ///
    /// Returns `false` when a run is already in flight, in which case the
    /// request is silently ignored (no rejection frame is sent). The run
    /// executes on its own task whose handle is attached to the session, so
    /// channel teardown cancels it.
    pub fn spawn_run(self: &Arc<Self>, session: Arc<Session>, query: String) -> bool {
        if !session.begin_run() {
            log::debug!(
                "session {} already has a run in flight, ignoring start request",
                session.id
            );
            return false;
        }

        log::info!("session {} starting run for query: {}", session.id, query);
        let orchestrator = self.clone();
        let run_session = session.clone();
        let handle = tokio::spawn(async move {
            orchestrator.run(run_session, query).await;
        });
        session.set_run_task(handle);
        true
    }

    async fn run(&self, session: Arc<Session>, query: String) {
        let sender = session.sender.clone();

        sender.text(BANNER);

        session.advance(Phase::Analysis);
        sender.text("Analyzing the query...\n");
        self.pace_delay().await;

        session.advance(Phase::QueryFormulation);
        sender.text("Formulating optimal search queries...\n");
        self.pace_delay().await;

        session.advance(Phase::WebSearch);

        let hooks = self.wire_hooks(&session);
        let prompt = research_prompt(&query);
        let result = self.agent.invoke(&prompt, &self.tools, &hooks).await;

        if let Err(e) = result {
            // The run still completes: the client must never be left
            // waiting on a failed invocation.
            log::error!("session {} agent invocation failed: {}", session.id, e);
            sender.text(format!("An error occurred: {}\n", e));
        }

        session.advance(Phase::SummaryGeneration);
        sender.text("\n\nGenerating the final report...\n");
        self.pace_delay().await;

        sender.control(&ControlFrame::SearchComplete);
        session.finish_run();
        log::info!("session {} run complete", session.id);
    }

    /// Bridge the agent callbacks to phase updates and text frames for this
    /// session. Each phase-update frame is followed back-to-back by its
    /// explanatory text frame; the pairing is by construction, not
    /// transactional.
    fn wire_hooks(&self, session: &Arc<Session>) -> AgentHooks {
        let on_first = session.clone();
        let on_message = session.clone();
        let on_start = session.clone();
        let on_end = session.clone();

        AgentHooks {
            on_first_token: Box::new(move || {
                on_first.advance(Phase::DataOrganization);
                on_first.sender.text("\nOrganizing collected data...\n\n");
            }),
            on_message: Box::new(move |text| {
                on_message.sender.text(text);
            }),
            on_tool_call_start: Box::new(move |tool_name| {
                let phase = on_start.classify_tool_start(tool_name);
                on_start.advance(phase);
                on_start.sender.text(tool_start_notice(phase));
            }),
            on_tool_call_end: Box::new(move |_| {
                let phase = on_end.classify_tool_end();
                on_end.advance(phase);
                on_end.sender.text("[Source evaluation complete]\n\n");
            }),
        }
    }

    async fn pace_delay(&self) {
        if !self.pace.is_zero() {
            tokio::time::sleep(self.pace).await;
        }
    }
}

fn tool_start_notice(phase: Phase) -> &'static str {
    match phase {
        Phase::WebSearch => "\n[Searching the web...]\n",
        Phase::ContentGathering => "\n[Gathering page content...]\n",
        Phase::SummaryGeneration => "\n[Composing the final report...]\n",
        Phase::DataOrganization => "\n[Saving the report...]\n",
        _ => "\n[Running a tool...]\n",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentError;
    use crate::protocol::{FrameSender, ServerPayload};
    use crate::registry::SessionRegistry;
    use crate::report::ClientView;
    use async_trait::async_trait;

    /// Scripted agent: two unnamed tool calls, a message, then success or
    /// failure depending on the prompt.
    struct ScriptedAgent;

    #[async_trait]
    impl AgentService for ScriptedAgent {
        async fn invoke(
            &self,
            prompt: &str,
            _tools: &[ToolDescriptor],
            hooks: &AgentHooks,
        ) -> Result<(), AgentError> {
            (hooks.on_first_token)();
            (hooks.on_tool_call_start)(None);
            (hooks.on_tool_call_end)(None);
            (hooks.on_tool_call_start)(None);
            (hooks.on_tool_call_end)(None);
            (hooks.on_message)("streamed text\n");
            if prompt.contains("explode") {
                Err(AgentError::EmptyResponse)
            } else {
                Ok(())
            }
        }
    }

    async fn drain(
        rx: &mut tokio::sync::mpsc::UnboundedReceiver<String>,
        session: &Arc<Session>,
    ) -> Vec<String> {
        // The run task signals completion by flipping the running flag.
        while session.is_running() {
            tokio::task::yield_now().await;
        }
        let mut payloads = Vec::new();
        while let Ok(payload) = rx.try_recv() {
            payloads.push(payload);
        }
        payloads
    }

    fn orchestrator() -> Arc<Orchestrator> {
        Arc::new(Orchestrator::new(
            Arc::new(ScriptedAgent),
            Vec::new(),
            Duration::ZERO,
        ))
    }

    #[tokio::test]
    async fn test_run_emits_expected_frame_sequence() {
        let registry = SessionRegistry::new();
        let (sender, mut rx) = FrameSender::channel();
        let session = registry.register(sender);

        assert!(orchestrator().spawn_run(session.clone(), "rust".to_string()));
        let payloads = drain(&mut rx, &session).await;

        let mut view = ClientView::new();
        let mut phases = Vec::new();
        for payload in &payloads {
            if let ServerPayload::Control(ControlFrame::PhaseUpdate { phase }) = view.apply(payload)
            {
                phases.push(phase);
            }
        }

        // Banner first.
        assert_eq!(payloads[0], BANNER);
        // Fixed opening, heuristic alternation for the two unnamed calls,
        // first-token data organization, fixed close.
        assert_eq!(
            phases,
            vec![
                Phase::Analysis,
                Phase::QueryFormulation,
                Phase::WebSearch,
                Phase::DataOrganization,
                Phase::WebSearch,
                Phase::SourceEvaluation,
                Phase::ContentGathering,
                Phase::SourceEvaluation,
                Phase::SummaryGeneration,
            ]
        );
        assert!(view.is_complete());
        assert!(view.raw_log().contains("streamed text"));
        // search_complete is the last frame of the run.
        assert_eq!(payloads.last().unwrap(), r#"{"type":"search_complete"}"#);
    }

    #[tokio::test]
    async fn test_failed_invocation_still_completes() {
        let registry = SessionRegistry::new();
        let (sender, mut rx) = FrameSender::channel();
        let session = registry.register(sender);

        assert!(orchestrator().spawn_run(session.clone(), "please explode".to_string()));
        let payloads = drain(&mut rx, &session).await;

        let error_pos = payloads
            .iter()
            .position(|p| p.contains("An error occurred"))
            .expect("error text frame");
        let complete_pos = payloads
            .iter()
            .position(|p| p == r#"{"type":"search_complete"}"#)
            .expect("search_complete frame");
        assert!(error_pos < complete_pos);
    }

    #[tokio::test]
    async fn test_second_start_request_is_ignored_while_running() {
        struct StallUntilDropped;

        #[async_trait]
        impl AgentService for StallUntilDropped {
            async fn invoke(
                &self,
                _prompt: &str,
                _tools: &[ToolDescriptor],
                _hooks: &AgentHooks,
            ) -> Result<(), AgentError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }

        let registry = SessionRegistry::new();
        let (sender, _rx) = FrameSender::channel();
        let session = registry.register(sender);

        let orchestrator = Arc::new(Orchestrator::new(
            Arc::new(StallUntilDropped),
            Vec::new(),
            Duration::ZERO,
        ));
        assert!(orchestrator.spawn_run(session.clone(), "one".to_string()));
        assert!(!orchestrator.spawn_run(session.clone(), "two".to_string()));

        registry.unregister(session.id);
    }

    #[tokio::test]
    async fn test_sequential_runs_on_one_session() {
        let registry = SessionRegistry::new();
        let (sender, mut rx) = FrameSender::channel();
        let session = registry.register(sender);
        let orchestrator = orchestrator();

        assert!(orchestrator.spawn_run(session.clone(), "first".to_string()));
        let first = drain(&mut rx, &session).await;
        assert!(orchestrator.spawn_run(session.clone(), "second".to_string()));
        let second = drain(&mut rx, &session).await;

        // Both runs produce a complete, banner-to-completion sequence.
        for payloads in [first, second] {
            assert_eq!(payloads[0], BANNER);
            assert_eq!(payloads.last().unwrap(), r#"{"type":"search_complete"}"#);
        }
    }
}
