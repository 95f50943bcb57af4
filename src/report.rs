//! Final-report accumulation and the receiving-side frame router
//!
//! The report artifact is assembled on the receiving side from one or more
//! `final_report` frames; the server never stores it. [`ClientView`] mirrors
//! the browser shell's demultiplexing logic natively so tests and embedders
//! can consume the stream without a browser.

use crate::phase::Phase;
use crate::protocol::{classify_payload, ControlFrame, ServerPayload};

/// Append-only buffer for the final markdown report.
///
/// "Not yet set" and "empty string" are the same initial state; the first
/// append initializes the buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportAccumulator {
    content: Option<String>,
}

impl ReportAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a report chunk. Chunks concatenate in arrival order with no
    /// separator.
    pub fn append(&mut self, chunk: &str) {
        match &mut self.content {
            Some(existing) => existing.push_str(chunk),
            None => self.content = Some(chunk.to_string()),
        }
    }

    /// The assembled report so far, empty if nothing has arrived.
    pub fn assembled(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Whether any report content has arrived yet.
    pub fn is_empty(&self) -> bool {
        self.content.as_deref().unwrap_or("").is_empty()
    }

    pub fn reset(&mut self) {
        self.content = None;
    }
}

/// Which pane the client is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Rendered markdown report.
    Report,
    /// Verbatim streamed log text.
    RawLog,
}

/// Native mirror of the browser client's per-connection state.
///
/// Feed every incoming WebSocket text payload to [`ClientView::apply`]; it
/// routes control frames, appends text to the raw log, and accumulates the
/// report. The first report chunk forces the view to the report pane, the
/// same way the browser auto-switches tabs.
#[derive(Debug, Clone)]
pub struct ClientView {
    phase: Option<Phase>,
    report: ReportAccumulator,
    raw_log: String,
    view: ViewMode,
    complete: bool,
}

impl ClientView {
    pub fn new() -> Self {
        Self {
            phase: None,
            report: ReportAccumulator::new(),
            raw_log: String::new(),
            view: ViewMode::Report,
            complete: false,
        }
    }

    /// Route one payload and return how it was classified.
    pub fn apply(&mut self, raw: &str) -> ServerPayload {
        let payload = classify_payload(raw);
        match &payload {
            ServerPayload::Control(ControlFrame::PhaseUpdate { phase }) => {
                self.phase = Some(*phase);
            }
            ServerPayload::Control(ControlFrame::SearchComplete) => {
                self.complete = true;
            }
            ServerPayload::Control(ControlFrame::FinalReport { content }) => {
                self.report.append(content);
                self.view = ViewMode::Report;
            }
            ServerPayload::Text(text) => {
                self.raw_log.push_str(text);
            }
        }
        payload
    }

    /// Clear transient run state before a new run on the same connection.
    pub fn reset_for_run(&mut self) {
        self.report.reset();
        self.raw_log.clear();
        self.complete = false;
    }

    pub fn phase(&self) -> Option<Phase> {
        self.phase
    }

    pub fn report(&self) -> &str {
        self.report.assembled()
    }

    pub fn raw_log(&self) -> &str {
        &self.raw_log
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn set_view(&mut self, view: ViewMode) {
        self.view = view;
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

impl Default for ClientView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_chunks_concatenate_without_separator() {
        let mut report = ReportAccumulator::new();
        report.append("A");
        report.append("B");
        assert_eq!(report.assembled(), "AB");
    }

    #[test]
    fn test_first_append_initializes_buffer() {
        let mut report = ReportAccumulator::new();
        assert!(report.is_empty());
        report.append("# Heading\n");
        assert_eq!(report.assembled(), "# Heading\n");
    }

    #[test]
    fn test_reset_clears_content() {
        let mut report = ReportAccumulator::new();
        report.append("stale");
        report.reset();
        assert!(report.is_empty());
        assert_eq!(report.assembled(), "");
    }

    #[test]
    fn test_view_routes_phase_updates() {
        let mut view = ClientView::new();
        view.apply(r#"{"type":"phase_update","phase":2}"#);
        assert_eq!(view.phase(), Some(Phase::WebSearch));
        assert!(view.raw_log().is_empty());
    }

    #[test]
    fn test_view_appends_text_exactly_once() {
        let mut view = ClientView::new();
        view.apply("line one\n");
        view.apply("line two\n");
        assert_eq!(view.raw_log(), "line one\nline two\n");
    }

    #[test]
    fn test_first_report_chunk_forces_report_view() {
        let mut view = ClientView::new();
        view.set_view(ViewMode::RawLog);
        view.apply(r##"{"type":"final_report","content":"# Findings"}"##);
        assert_eq!(view.view(), ViewMode::Report);
        assert_eq!(view.report(), "# Findings");
        // Report content never leaks into the raw log.
        assert!(view.raw_log().is_empty());
    }

    #[test]
    fn test_search_complete_marks_run_done() {
        let mut view = ClientView::new();
        assert!(!view.is_complete());
        view.apply(r#"{"type":"search_complete"}"#);
        assert!(view.is_complete());
    }

    #[test]
    fn test_unrecognized_json_lands_in_raw_log() {
        let mut view = ClientView::new();
        let raw = r#"{"title":"result","url":"https://example.org"}"#;
        view.apply(raw);
        assert_eq!(view.raw_log(), raw);
    }

    #[test]
    fn test_reset_for_run_clears_buffers_but_keeps_view() {
        let mut view = ClientView::new();
        view.apply("old log\n");
        view.apply(r#"{"type":"final_report","content":"old"}"#);
        view.apply(r#"{"type":"search_complete"}"#);

        view.reset_for_run();
        assert!(view.raw_log().is_empty());
        assert_eq!(view.report(), "");
        assert!(!view.is_complete());
        assert_eq!(view.view(), ViewMode::Report);
    }
}
