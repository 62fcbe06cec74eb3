//! Stage outputs and failure sentinels

use serde::{Deserialize, Serialize};
use std::fmt;

/// Substrings that mark an output as a failure
pub const FAILURE_MARKERS: [&str; 2] = ["Error", "Blocked"];

/// Fixed strings returned in place of model text when a call fails in a known way
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentinel {
    RateLimited,
    PermissionDenied,
    Blocked,
}

impl Sentinel {
    pub fn message(&self) -> &'static str {
        match self {
            Sentinel::RateLimited => "Error: Rate limit exceeded, please try again later",
            Sentinel::PermissionDenied => "Error: Invalid API key or insufficient permissions",
            Sentinel::Blocked => "Blocked: Response filtered due to content restrictions",
        }
    }
}

impl fmt::Display for Sentinel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// What one agent run produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StageOutput {
    /// Model completion, unmodified
    Text(String),
    /// Known failure
    Sentinel(Sentinel),
    /// Missing input or unrecognised failure
    Nothing,
}

impl StageOutput {
    /// Displayable text: the completion or the sentinel string
    pub fn text(&self) -> Option<&str> {
        match self {
            StageOutput::Text(text) => Some(text),
            StageOutput::Sentinel(sentinel) => Some(sentinel.message()),
            StageOutput::Nothing => None,
        }
    }

    /// True when the workflow must stop after this output.
    ///
    /// Model text is matched against [`FAILURE_MARKERS`] too, so a completion
    /// that mentions "Error" halts the chain just like a sentinel does.
    pub fn halts_workflow(&self) -> bool {
        match self.text() {
            None => true,
            Some(text) => text.is_empty() || contains_failure_marker(text),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, StageOutput::Text(_))
    }
}

/// Whether `text` contains any failure marker
pub fn contains_failure_marker(text: &str) -> bool {
    FAILURE_MARKERS.iter().any(|marker| text.contains(marker))
}
