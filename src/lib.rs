//! Deep Research server library
//!
//! Streams the progress of multi-step AI research runs (query, web search,
//! content extraction, synthesis, report) from a local model backend to
//! browser clients over WebSocket.

pub mod agent;
pub mod config;
pub mod orchestrator;
pub mod phase;
pub mod protocol;
pub mod registry;
pub mod report;
pub mod server;
pub mod shutdown;
pub mod tools;

pub use phase::Phase;
pub use protocol::{ClientFrame, ControlFrame, FrameSender};
pub use registry::{Session, SessionRegistry};
pub use report::{ClientView, ReportAccumulator};
