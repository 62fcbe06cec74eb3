//! Role agent
//!
//! One prompt template bound to one workflow role, plus the model call.
//! - Checks the role's required input fields
//! - Renders the persona template
//! - Maps known provider failures to sentinels

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use careflow_core::{
    AgentInput, PromptTemplate, Role, Sentinel, StageOutput, DIAGNOSIS, MEDICATIONS,
    PRELIMINARY_ASSESSMENT, SYMPTOMS,
};

use crate::{AgentError, LlmError, PersonaRegistry, SharedBackend};

/// A single workflow agent
pub struct Agent {
    /// Persona id this agent was built from
    id: String,
    role: Role,
    input: AgentInput,
    template: PromptTemplate,
    backend: SharedBackend,
}

impl Agent {
    pub fn new(
        id: &str,
        role: Role,
        input: AgentInput,
        template: PromptTemplate,
        backend: SharedBackend,
    ) -> Self {
        Self {
            id: id.to_string(),
            role,
            input,
            template,
            backend,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn input(&self) -> &AgentInput {
        &self.input
    }

    /// Render the prompt, refusing when a required field is absent or empty
    pub fn prompt(&self) -> Result<String, AgentError> {
        let missing = self.input.missing_for(self.role);
        if !missing.is_empty() {
            return Err(AgentError::MissingInput(missing));
        }
        Ok(self.template.render(&self.input)?)
    }

    /// Render and call the model, surfacing every failure
    pub async fn try_run(&self) -> Result<String, AgentError> {
        let prompt = self.prompt()?;
        debug!("{} prompt:\n{}", self.role, prompt);

        let response = self.backend.generate(&prompt).await?;
        debug!("{} raw response:\n{}", self.role, response);

        Ok(response)
    }

    /// Run the agent, folding failures into a [`StageOutput`]
    pub async fn run(&self) -> StageOutput {
        info!(agent = %self.id, "{} Agent is processing", self.role);

        match self.try_run().await {
            Ok(text) if text.trim().is_empty() => {
                warn!(
                    "{} Agent: Empty response, possibly blocked by safety filters",
                    self.role
                );
                StageOutput::Sentinel(Sentinel::Blocked)
            }
            Ok(text) => StageOutput::Text(text),
            Err(AgentError::MissingInput(fields)) => {
                error!("{} Agent: Missing {}", self.role, fields.join(", "));
                StageOutput::Nothing
            }
            Err(AgentError::Llm(LlmError::EmptyResponse)) => {
                warn!(
                    "{} Agent: Empty response, possibly blocked by safety filters",
                    self.role
                );
                StageOutput::Sentinel(Sentinel::Blocked)
            }
            Err(AgentError::Llm(LlmError::RateLimited)) => {
                error!("{} Agent: Rate limit exceeded", self.role);
                StageOutput::Sentinel(Sentinel::RateLimited)
            }
            Err(AgentError::Llm(LlmError::PermissionDenied)) => {
                error!("{} Agent: API key permission error", self.role);
                StageOutput::Sentinel(Sentinel::PermissionDenied)
            }
            Err(e) => {
                error!("Error in {} Agent: {}", self.role, e);
                StageOutput::Nothing
            }
        }
    }
}

/// Builds role agents from a shared backend and persona registry
#[derive(Clone)]
pub struct AgentFactory {
    backend: SharedBackend,
    registry: Arc<PersonaRegistry>,
}

impl AgentFactory {
    pub fn new(backend: SharedBackend, registry: PersonaRegistry) -> Self {
        Self {
            backend,
            registry: Arc::new(registry),
        }
    }

    /// Factory with the embedded personas
    pub fn with_embedded(backend: SharedBackend) -> Self {
        Self::new(backend, PersonaRegistry::load_embedded())
    }

    pub fn registry(&self) -> &PersonaRegistry {
        &self.registry
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Build the agent for `role` over an arbitrary input
    pub fn for_role(&self, role: Role, input: AgentInput) -> Result<Agent, AgentError> {
        let persona = self.registry.get(role).ok_or(AgentError::NoPersona(role))?;

        Ok(Agent::new(
            &persona.id,
            role,
            input,
            persona.template.clone(),
            self.backend.clone(),
        ))
    }

    pub fn general_doctor(&self, symptoms: &str) -> Result<Agent, AgentError> {
        self.for_role(Role::GeneralDoctor, AgentInput::new().with(SYMPTOMS, symptoms))
    }

    pub fn diagnosis(&self, preliminary_assessment: &str) -> Result<Agent, AgentError> {
        self.for_role(
            Role::Diagnosis,
            AgentInput::new().with(PRELIMINARY_ASSESSMENT, preliminary_assessment),
        )
    }

    pub fn medication(&self, diagnosis: &str) -> Result<Agent, AgentError> {
        self.for_role(Role::Medication, AgentInput::new().with(DIAGNOSIS, diagnosis))
    }

    pub fn follow_up(
        &self,
        symptoms: &str,
        preliminary_assessment: &str,
        diagnosis: &str,
        medications: &str,
    ) -> Result<Agent, AgentError> {
        self.for_role(
            Role::FollowUp,
            AgentInput::new()
                .with(SYMPTOMS, symptoms)
                .with(PRELIMINARY_ASSESSMENT, preliminary_assessment)
                .with(DIAGNOSIS, diagnosis)
                .with(MEDICATIONS, medications),
        )
    }
}
