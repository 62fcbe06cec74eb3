//! Workflow Driver
//!
//! Runs the four agents strictly in order:
//! - GeneralDoctor(symptoms)
//! - Diagnosis(preliminary assessment)
//! - Medication(diagnosis)
//! - FollowUp(symptoms + every earlier output)
//!
//! The chain stops at the first stage whose output halts the workflow.
//! Later agents are never built and never call the model.

use tracing::{error, info, info_span, warn, Instrument};

use careflow_agents::{Agent, AgentError, AgentFactory, PersonaRegistry, SharedBackend};
use careflow_core::{AgentInput, Role, StageOutput, WorkflowReport};

/// Workflow configuration
pub struct WorkflowConfig {
    /// LLM backend (pre-constructed)
    pub backend: SharedBackend,
    /// Role prompts
    pub personas: PersonaRegistry,
}

/// The sequential workflow driver
pub struct Workflow {
    agents: AgentFactory,
}

impl Workflow {
    /// Create a new workflow with configuration
    pub fn new(config: WorkflowConfig) -> Self {
        Self {
            agents: AgentFactory::new(config.backend, config.personas),
        }
    }

    /// Workflow over the embedded personas
    pub fn with_backend(backend: SharedBackend) -> Self {
        Self::new(WorkflowConfig {
            backend,
            personas: PersonaRegistry::load_embedded(),
        })
    }

    pub fn agents(&self) -> &AgentFactory {
        &self.agents
    }

    /// Run a single agent on its own
    pub async fn run_stage(&self, role: Role, input: AgentInput) -> StageOutput {
        self.build_and_run(role, |a| a.for_role(role, input)).await
    }

    /// Run the full chain from patient symptoms
    pub async fn run(&self, symptoms: &str) -> WorkflowReport {
        let mut report = WorkflowReport::new(symptoms);
        let span = info_span!("workflow", run_id = %report.run_id);

        async {
            info!("Starting workflow");
            self.drive(symptoms, &mut report).await;
            report.finish();
        }
        .instrument(span)
        .await;

        report
    }

    async fn drive(&self, symptoms: &str, report: &mut WorkflowReport) {
        let Some(assessment) = self
            .stage(report, Role::GeneralDoctor, |a| a.general_doctor(symptoms))
            .await
        else {
            return;
        };

        let Some(diagnosis) = self
            .stage(report, Role::Diagnosis, |a| a.diagnosis(&assessment))
            .await
        else {
            return;
        };

        let Some(medications) = self
            .stage(report, Role::Medication, |a| a.medication(&diagnosis))
            .await
        else {
            return;
        };

        // Last stage: its output is reported as-is, nothing follows it
        let output = self
            .build_and_run(Role::FollowUp, |a| {
                a.follow_up(symptoms, &assessment, &diagnosis, &medications)
            })
            .await;
        report.record(Role::FollowUp, output);

        info!("Workflow completed");
    }

    /// Run one stage, record it, and hand back its text when the chain may continue
    async fn stage<F>(&self, report: &mut WorkflowReport, role: Role, build: F) -> Option<String>
    where
        F: FnOnce(&AgentFactory) -> Result<Agent, AgentError>,
    {
        let output = self.build_and_run(role, build).await;
        let halts = output.halts_workflow();
        let text = output.text().map(str::to_string);
        report.record(role, output);

        if halts {
            warn!("{} Agent failed. Stopping workflow.", role.label());
            report.halt(role);
            return None;
        }

        text
    }

    async fn build_and_run<F>(&self, role: Role, build: F) -> StageOutput
    where
        F: FnOnce(&AgentFactory) -> Result<Agent, AgentError>,
    {
        match build(&self.agents) {
            Ok(agent) => agent.run().await,
            Err(e) => {
                error!("{} Agent could not be built: {}", role, e);
                StageOutput::Nothing
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use careflow_agents::{LlmBackend, LlmError};
    use careflow_core::{Sentinel, NO_OUTPUT, SYMPTOMS};
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Replays scripted replies in order and records every prompt
    struct ScriptedBackend {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedBackend {
        fn new(replies: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedBackend {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Api("script exhausted".to_string())))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn ok(text: &str) -> Result<String, LlmError> {
        Ok(text.to_string())
    }

    #[tokio::test]
    async fn test_full_chain_threads_outputs() {
        let backend = ScriptedBackend::new(vec![
            ok("- Condition 1: Strep throat - fever and sore throat"),
            ok("- Diagnosis: Strep throat - bacterial"),
            ok("- Medication 1: Amoxicillin - Role: antibiotic"),
            ok("- Follow-Up Action 1: Recheck - 10 days"),
        ]);
        let workflow = Workflow::with_backend(backend.clone());

        let report = workflow.run("sore throat, fever").await;

        assert!(report.is_complete());
        assert!(report.finished_at.is_some());
        assert_eq!(
            report.text(Role::FollowUp),
            Some("- Follow-Up Action 1: Recheck - 10 days")
        );

        let prompts = backend.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].ends_with("Input: sore throat, fever"));
        assert!(prompts[1].ends_with("Input: - Condition 1: Strep throat - fever and sore throat"));
        assert!(prompts[2].ends_with("Input: - Diagnosis: Strep throat - bacterial"));
        assert!(prompts[3].contains("- Symptoms: sore throat, fever"));
        assert!(prompts[3].contains("- Medications: - Medication 1: Amoxicillin - Role: antibiotic"));
    }

    #[tokio::test]
    async fn test_halts_after_sentinel() {
        let backend = ScriptedBackend::new(vec![
            ok("- Condition 1: Migraine"),
            Err(LlmError::RateLimited),
            ok("never used"),
        ]);
        let workflow = Workflow::with_backend(backend.clone());

        let report = workflow.run("headache").await;

        assert_eq!(report.halted_at, Some(Role::Diagnosis));
        assert_eq!(
            report.output(Role::Diagnosis),
            Some(&StageOutput::Sentinel(Sentinel::RateLimited))
        );
        assert!(!report.ran(Role::Medication));
        assert!(!report.ran(Role::FollowUp));
        assert_eq!(backend.prompts().len(), 2);
    }

    #[tokio::test]
    async fn test_halts_on_empty_symptoms_without_calling_model() {
        let backend = ScriptedBackend::new(vec![ok("unused")]);
        let workflow = Workflow::with_backend(backend.clone());

        let report = workflow.run("").await;

        assert_eq!(report.halted_at, Some(Role::GeneralDoctor));
        assert_eq!(report.output(Role::GeneralDoctor), Some(&StageOutput::Nothing));
        assert!(backend.prompts().is_empty());
        assert_eq!(report.sections()[1].1, NO_OUTPUT);
    }

    #[tokio::test]
    async fn test_halts_on_blocked_medication() {
        let backend = ScriptedBackend::new(vec![
            ok("- Condition 1: Flu"),
            ok("- Diagnosis: Influenza"),
            ok("   "),
        ]);
        let workflow = Workflow::with_backend(backend.clone());

        let report = workflow.run("fever").await;

        assert_eq!(report.halted_at, Some(Role::Medication));
        assert_eq!(
            report.text(Role::Medication),
            Some(Sentinel::Blocked.message())
        );
        assert!(!report.ran(Role::FollowUp));
        assert_eq!(backend.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_halts_when_model_text_contains_marker() {
        let backend = ScriptedBackend::new(vec![ok("Error: could not assess"), ok("unused")]);
        let workflow = Workflow::with_backend(backend.clone());

        let report = workflow.run("dizziness").await;

        assert_eq!(report.halted_at, Some(Role::GeneralDoctor));
        assert_eq!(backend.prompts().len(), 1);
    }

    #[tokio::test]
    async fn test_follow_up_failure_is_reported_not_halted() {
        let backend = ScriptedBackend::new(vec![
            ok("a"),
            ok("b"),
            ok("c"),
            Err(LlmError::PermissionDenied),
        ]);
        let workflow = Workflow::with_backend(backend);

        let report = workflow.run("fatigue").await;

        assert_eq!(report.halted_at, None);
        assert_eq!(
            report.output(Role::FollowUp),
            Some(&StageOutput::Sentinel(Sentinel::PermissionDenied))
        );
        assert!(report
            .to_markdown()
            .contains("- Status: completed with follow-up failure"));
    }

    #[tokio::test]
    async fn test_missing_persona_stops_chain() {
        let backend = ScriptedBackend::new(vec![ok("unused")]);
        let workflow = Workflow::new(WorkflowConfig {
            backend: backend.clone(),
            personas: PersonaRegistry::new(),
        });

        let report = workflow.run("cough").await;

        assert_eq!(report.halted_at, Some(Role::GeneralDoctor));
        assert!(backend.prompts().is_empty());
    }

    #[tokio::test]
    async fn test_run_stage_single_agent() {
        let backend = ScriptedBackend::new(vec![ok("- Condition 1: Cold")]);
        let workflow = Workflow::with_backend(backend);

        let output = workflow
            .run_stage(Role::GeneralDoctor, AgentInput::new().with(SYMPTOMS, "runny nose"))
            .await;

        assert_eq!(output, StageOutput::Text("- Condition 1: Cold".to_string()));
    }
}
