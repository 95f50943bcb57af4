//! Wire protocol frames and the outbound frame multiplexer
//!
//! One WebSocket carries two kinds of traffic: typed JSON control frames and
//! free-form streamed text. There is no envelope; the receiver classifies a
//! payload by whether it parses as a recognized control shape. A text payload
//! that happens to look like a control frame will be misrouted; that hazard
//! is inherited from the wire format and deliberately not guarded against,
//! because the browser client depends on exactly this discrimination.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::phase::Phase;

/// Control frames sent from the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlFrame {
    /// The workflow entered a (possibly repeated) phase.
    PhaseUpdate { phase: Phase },
    /// The run finished, successfully or not. Always the last control frame
    /// of a run.
    SearchComplete,
    /// One chunk of the final markdown report. The client concatenates
    /// chunks in arrival order with no separator.
    FinalReport { content: String },
}

/// Control frames the server accepts from the client.
///
/// Anything that does not decode to this shape is ignored, not rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Start one research run for `query`.
    Search { query: String },
}

/// Decode an inbound message. Returns `None` for anything unrecognized.
pub fn decode_inbound(raw: &str) -> Option<ClientFrame> {
    serde_json::from_str(raw).ok()
}

/// A server payload as seen by the receiving side.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPayload {
    Control(ControlFrame),
    Text(String),
}

/// Classify an outbound payload the way the client does: try to parse it as
/// a control frame, and treat everything else as literal streamed text.
pub fn classify_payload(raw: &str) -> ServerPayload {
    match serde_json::from_str::<ControlFrame>(raw) {
        Ok(frame) => ServerPayload::Control(frame),
        Err(_) => ServerPayload::Text(raw.to_string()),
    }
}

/// Handle for writing frames to one session's channel.
///
/// Sends are fire-and-forget onto an unbounded queue drained by the
/// connection's writer task; once the channel is gone they become no-ops.
/// No buffering, batching, or backpressure beyond what the queue provides.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::UnboundedSender<String>,
}

impl FrameSender {
    pub fn new(tx: mpsc::UnboundedSender<String>) -> Self {
        Self { tx }
    }

    /// Create a sender plus the receiving end of its queue.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    /// Transmit `text` verbatim as a text frame. No escaping is applied.
    pub fn text(&self, text: impl Into<String>) {
        if self.tx.send(text.into()).is_err() {
            log::trace!("dropping text frame for closed channel");
        }
    }

    /// Serialize and transmit a control frame.
    pub fn control(&self, frame: &ControlFrame) {
        match serde_json::to_string(frame) {
            Ok(json) => {
                if self.tx.send(json).is_err() {
                    log::trace!("dropping control frame for closed channel");
                }
            }
            Err(e) => log::warn!("failed to serialize control frame: {}", e),
        }
    }

    /// Whether the receiving end of the channel has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_update_wire_shape() {
        let frame = ControlFrame::PhaseUpdate {
            phase: Phase::Analysis,
        };
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r#"{"type":"phase_update","phase":0}"#
        );
    }

    #[test]
    fn test_search_complete_wire_shape() {
        assert_eq!(
            serde_json::to_string(&ControlFrame::SearchComplete).unwrap(),
            r#"{"type":"search_complete"}"#
        );
    }

    #[test]
    fn test_final_report_wire_shape() {
        let frame = ControlFrame::FinalReport {
            content: "# Title".to_string(),
        };
        assert_eq!(
            serde_json::to_string(&frame).unwrap(),
            r##"{"type":"final_report","content":"# Title"}"##
        );
    }

    #[test]
    fn test_decode_inbound_search() {
        let frame = decode_inbound(r#"{"type":"search","query":"rust async"}"#).unwrap();
        assert_eq!(
            frame,
            ClientFrame::Search {
                query: "rust async".to_string()
            }
        );
    }

    #[test]
    fn test_decode_inbound_ignores_garbage() {
        assert!(decode_inbound("not json at all").is_none());
        assert!(decode_inbound(r#"{"type":"unknown"}"#).is_none());
        assert!(decode_inbound(r#"{"query":"missing type"}"#).is_none());
    }

    #[test]
    fn test_classify_control_payload() {
        let payload = classify_payload(r#"{"type":"phase_update","phase":3}"#);
        assert_eq!(
            payload,
            ServerPayload::Control(ControlFrame::PhaseUpdate {
                phase: Phase::SourceEvaluation
            })
        );
    }

    #[test]
    fn test_classify_plain_text_payload() {
        let payload = classify_payload("Searching the web...\n");
        assert_eq!(
            payload,
            ServerPayload::Text("Searching the web...\n".to_string())
        );
    }

    #[test]
    fn test_classify_json_without_recognized_type_is_text() {
        // Valid JSON, but not a control shape: stays text.
        let raw = r#"{"title":"A result","url":"https://example.com"}"#;
        assert_eq!(classify_payload(raw), ServerPayload::Text(raw.to_string()));
    }

    #[test]
    fn test_classify_json_looking_text_is_misrouted() {
        // Documented hazard: streamed text that happens to match a control
        // shape gets routed as a control frame.
        let raw = r#"{"type":"final_report","content":"looks real"}"#;
        assert!(matches!(classify_payload(raw), ServerPayload::Control(_)));
    }

    #[tokio::test]
    async fn test_frame_sender_preserves_order() {
        let (sender, mut rx) = FrameSender::channel();
        sender.text("first");
        sender.control(&ControlFrame::SearchComplete);
        sender.text("last");

        assert_eq!(rx.recv().await.unwrap(), "first");
        assert_eq!(rx.recv().await.unwrap(), r#"{"type":"search_complete"}"#);
        assert_eq!(rx.recv().await.unwrap(), "last");
    }

    #[tokio::test]
    async fn test_frame_sender_closed_channel_is_noop() {
        let (sender, rx) = FrameSender::channel();
        drop(rx);
        assert!(sender.is_closed());
        // Must not panic.
        sender.text("into the void");
        sender.control(&ControlFrame::SearchComplete);
    }
}
