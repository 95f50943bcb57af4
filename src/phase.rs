//! Research workflow phases and tool-call classification
//!
//! The browser displays the run as a strip of eight named stages. The server
//! reports the current stage over the wire as a bare index (see
//! [`crate::protocol`]), so the enum is fixed and ordered.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A named stage of the research workflow.
///
/// Phases are not monotonic: web search and content gathering repeat for every
/// tool call the model makes. The only guarantee is that the current phase is
/// always one of these eight values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Phase {
    Analysis = 0,
    QueryFormulation = 1,
    WebSearch = 2,
    SourceEvaluation = 3,
    ContentGathering = 4,
    InformationExtraction = 5,
    DataOrganization = 6,
    SummaryGeneration = 7,
}

impl Phase {
    /// All phases in display order.
    pub const ALL: [Phase; 8] = [
        Phase::Analysis,
        Phase::QueryFormulation,
        Phase::WebSearch,
        Phase::SourceEvaluation,
        Phase::ContentGathering,
        Phase::InformationExtraction,
        Phase::DataOrganization,
        Phase::SummaryGeneration,
    ];

    /// Wire index of this phase (0..=7).
    pub fn index(self) -> u8 {
        self as u8
    }

    /// Human-readable label shown in the status strip.
    pub fn label(self) -> &'static str {
        match self {
            Phase::Analysis => "Analyzing requirements",
            Phase::QueryFormulation => "Formulating search queries",
            Phase::WebSearch => "Searching the web",
            Phase::SourceEvaluation => "Evaluating sources",
            Phase::ContentGathering => "Gathering content",
            Phase::InformationExtraction => "Extracting key information",
            Phase::DataOrganization => "Organizing data",
            Phase::SummaryGeneration => "Generating summary",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
#[error("phase index out of range: {0} (expected 0..=7)")]
pub struct PhaseIndexError(pub u8);

impl From<Phase> for u8 {
    fn from(phase: Phase) -> u8 {
        phase.index()
    }
}

impl TryFrom<u8> for Phase {
    type Error = PhaseIndexError;

    fn try_from(index: u8) -> Result<Self, Self::Error> {
        Phase::ALL
            .into_iter()
            .find(|p| p.index() == index)
            .ok_or(PhaseIndexError(index))
    }
}

/// Which kind of tool call the alternation heuristic expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolGuess {
    Search,
    Content,
}

/// Maps opaque tool-call notifications to workflow phases.
///
/// When the agent runtime reports which tool was invoked, the mapping is
/// explicit. When it does not, the classifier falls back to guessing: tool
/// calls are assumed to strictly alternate search, content, search, content,
/// starting with search. The fallback misclassifies any run that calls the
/// same tool twice in a row, which is why the explicit path is preferred.
#[derive(Debug, Clone)]
pub struct ToolCallClassifier {
    next_guess: ToolGuess,
}

impl ToolCallClassifier {
    pub fn new() -> Self {
        Self {
            next_guess: ToolGuess::Search,
        }
    }

    /// Reset to the initial state at the start of a run.
    pub fn reset(&mut self) {
        self.next_guess = ToolGuess::Search;
    }

    /// Classify a tool-call-start event.
    ///
    /// `tool_name` is the invoked tool's identifier when the runtime exposes
    /// it; `None` engages the alternation heuristic. Only the heuristic path
    /// advances the alternation flag, so a run where every call is named
    /// never consults a stale guess.
    pub fn classify_start(&mut self, tool_name: Option<&str>) -> Phase {
        if let Some(name) = tool_name {
            if let Some(phase) = Self::phase_for_tool(name) {
                return phase;
            }
            log::debug!("no phase mapping for tool '{}', falling back to alternation", name);
        }

        let phase = match self.next_guess {
            ToolGuess::Search => Phase::WebSearch,
            ToolGuess::Content => Phase::ContentGathering,
        };
        self.next_guess = match self.next_guess {
            ToolGuess::Search => ToolGuess::Content,
            ToolGuess::Content => ToolGuess::Search,
        };
        phase
    }

    /// Classify a tool-call-end event. Always source evaluation.
    pub fn classify_end(&self) -> Phase {
        Phase::SourceEvaluation
    }

    /// Explicit mapping from tool identifier to phase.
    fn phase_for_tool(name: &str) -> Option<Phase> {
        match name {
            "web_search" => Some(Phase::WebSearch),
            "website_content" => Some(Phase::ContentGathering),
            "generate_final_report" => Some(Phase::SummaryGeneration),
            "save_file" => Some(Phase::DataOrganization),
            _ => None,
        }
    }
}

impl Default for ToolCallClassifier {
    fn default() -> Self {
        Self::new()
    }
}
