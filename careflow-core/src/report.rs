//! Workflow report

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Role, StageOutput, NO_OUTPUT};

/// One executed stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageRecord {
    pub role: Role,
    pub output: StageOutput,
}

/// Result of a full workflow run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    /// Unique run ID
    pub run_id: Uuid,
    /// Symptoms the run started from
    pub symptoms: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    /// Stages that actually ran, in order
    pub stages: Vec<StageRecord>,
    /// Stage whose output stopped the chain
    pub halted_at: Option<Role>,
}

impl WorkflowReport {
    pub fn new(symptoms: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            symptoms: symptoms.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            stages: Vec::new(),
            halted_at: None,
        }
    }

    /// Record a stage output
    pub fn record(&mut self, role: Role, output: StageOutput) {
        self.stages.push(StageRecord { role, output });
    }

    /// Mark the chain as stopped at `role`
    pub fn halt(&mut self, role: Role) {
        self.halted_at = Some(role);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Output of `role`, if that stage ran
    pub fn output(&self, role: Role) -> Option<&StageOutput> {
        self.stages
            .iter()
            .find(|record| record.role == role)
            .map(|record| &record.output)
    }

    /// Displayable text of `role`, if it ran and produced any
    pub fn text(&self, role: Role) -> Option<&str> {
        self.output(role).and_then(StageOutput::text)
    }

    /// Whether `role` was invoked at all
    pub fn ran(&self, role: Role) -> bool {
        self.output(role).is_some()
    }

    /// True when all four stages ran without halting
    pub fn is_complete(&self) -> bool {
        self.halted_at.is_none() && self.stages.len() == Role::ALL.len()
    }

    /// Whether the follow-up stage ran and its output would have halted a
    /// later stage
    pub fn follow_up_failed(&self) -> bool {
        self.output(Role::FollowUp).is_some_and(StageOutput::halts_workflow)
    }

    /// Heading/output pairs for every role, with a placeholder for stages
    /// that never ran or produced nothing
    pub fn sections(&self) -> Vec<(&'static str, &str)> {
        Role::ALL
            .iter()
            .map(|role| (role.heading(), self.text(*role).unwrap_or(NO_OUTPUT)))
            .collect()
    }

    /// Render as a Markdown document
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();
        md.push_str("# Medical Workflow Report\n\n");
        md.push_str(&format!("- Run: `{}`\n", self.run_id));
        md.push_str(&format!("- Started: {}\n", self.started_at.to_rfc3339()));
        if let Some(finished) = self.finished_at {
            md.push_str(&format!("- Finished: {}\n", finished.to_rfc3339()));
        }
        match self.halted_at {
            Some(role) => md.push_str(&format!("- Status: halted at {}\n", role.label())),
            None if self.is_complete() && self.follow_up_failed() => {
                md.push_str("- Status: completed with follow-up failure\n")
            }
            None if self.is_complete() => md.push_str("- Status: completed\n"),
            None => md.push_str("- Status: incomplete\n"),
        }

        md.push_str("\n## Symptoms\n\n");
        md.push_str(self.symptoms.trim());
        md.push('\n');

        for (heading, text) in self.sections() {
            md.push_str(&format!("\n## {}\n\n{}\n", heading, text.trim()));
        }

        md
    }
}
