//! Numbered text menu
//!
//! Reads one trimmed line per field and prints each stage under its heading.
//! Generic over reader and writer so it runs against stdin/stdout or memory.

use std::io::{BufRead, Write};

use anyhow::Result;

use careflow_core::{
    AgentInput, Role, StageOutput, DIAGNOSIS, MEDICATIONS, NO_OUTPUT, PRELIMINARY_ASSESSMENT,
    SYMPTOMS,
};
use careflow_runtime::Workflow;

const SYMPTOMS_PROMPT: &str = "Enter patient symptoms: ";
const ASSESSMENT_PROMPT: &str = "Enter preliminary assessment: ";
const DIAGNOSIS_PROMPT: &str = "Enter diagnosis: ";
const MEDICATIONS_PROMPT: &str = "Enter medications: ";

/// Print one result block: blank line, heading, then the text or a placeholder
pub fn print_section<W: Write>(out: &mut W, heading: &str, text: Option<&str>) -> Result<()> {
    writeln!(out, "\n{}:", heading)?;
    writeln!(out, "{}", text.unwrap_or(NO_OUTPUT))?;
    Ok(())
}

/// Print a single agent's output
pub fn print_stage<W: Write>(out: &mut W, role: Role, output: &StageOutput) -> Result<()> {
    print_section(out, role.heading(), output.text())
}

pub struct Menu<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// Hand back the writer (for inspecting captured output)
    pub fn into_output(self) -> W {
        self.output
    }

    /// Show the menu, read one choice and run it
    pub async fn run(&mut self, workflow: &Workflow) -> Result<()> {
        writeln!(self.output, "=== Medical Workflow Interface ===")?;
        writeln!(self.output, "Choose an option:")?;
        writeln!(self.output, "1. Run full workflow")?;
        for (n, role) in Role::ALL.iter().enumerate() {
            writeln!(self.output, "{}. Run {} Agent", n + 2, role.label())?;
        }

        let choice = self.read_field("Enter your choice (1-5): ")?;

        match choice.as_str() {
            "1" => self.full_workflow(workflow).await,
            "2" => self.single(workflow, Role::GeneralDoctor).await,
            "3" => self.single(workflow, Role::Diagnosis).await,
            "4" => self.single(workflow, Role::Medication).await,
            "5" => self.single(workflow, Role::FollowUp).await,
            _ => {
                writeln!(
                    self.output,
                    "Invalid choice. Please select a number between 1 and 5."
                )?;
                Ok(())
            }
        }
    }

    async fn full_workflow(&mut self, workflow: &Workflow) -> Result<()> {
        writeln!(self.output, "\n=== Running Full Workflow ===")?;
        let symptoms = self.read_field(SYMPTOMS_PROMPT)?;

        let report = workflow.run(&symptoms).await;

        for (heading, text) in report.sections() {
            print_section(&mut self.output, heading, Some(text))?;
        }
        Ok(())
    }

    async fn single(&mut self, workflow: &Workflow, role: Role) -> Result<()> {
        writeln!(self.output, "\n=== Running {} Agent ===", role.label())?;

        let mut input = AgentInput::new();
        for field in role.required_fields() {
            let value = self.read_field(field_prompt(field))?;
            input.insert(field, value);
        }

        let output = workflow.run_stage(role, input).await;
        print_stage(&mut self.output, role, &output)
    }

    /// Prompt and read one trimmed line; end of input reads as empty
    fn read_field(&mut self, prompt: &str) -> Result<String> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

fn field_prompt(field: &str) -> &'static str {
    match field {
        SYMPTOMS => SYMPTOMS_PROMPT,
        PRELIMINARY_ASSESSMENT => ASSESSMENT_PROMPT,
        DIAGNOSIS => DIAGNOSIS_PROMPT,
        MEDICATIONS => MEDICATIONS_PROMPT,
        _ => "Enter value: ",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use careflow_agents::{LlmBackend, LlmError};
    use std::sync::{Arc, Mutex};

    /// Echoes the last prompt line back, prefixed with a call counter
    struct EchoBackend {
        prompts: Mutex<Vec<String>>,
    }

    impl EchoBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LlmBackend for EchoBackend {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            let last = prompt.lines().last().unwrap_or_default().trim();
            Ok(format!("reply {} to {}", prompts.len(), last))
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    struct DenyBackend;

    #[async_trait]
    impl LlmBackend for DenyBackend {
        async fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::PermissionDenied)
        }

        fn model_name(&self) -> &str {
            "deny"
        }
    }

    async fn run_menu(workflow: &Workflow, stdin: &str) -> String {
        let mut menu = Menu::new(stdin.as_bytes(), Vec::new());
        menu.run(workflow).await.unwrap();
        String::from_utf8(menu.into_output()).unwrap()
    }

    #[tokio::test]
    async fn test_menu_lists_options() {
        let workflow = Workflow::with_backend(EchoBackend::new());
        let out = run_menu(&workflow, "9\n").await;

        assert!(out.starts_with("=== Medical Workflow Interface ===\nChoose an option:\n"));
        assert!(out.contains("1. Run full workflow\n"));
        assert!(out.contains("2. Run General Doctor Agent\n"));
        assert!(out.contains("5. Run Follow-Up Agent\n"));
        assert!(out.contains("Invalid choice. Please select a number between 1 and 5."));
    }

    #[tokio::test]
    async fn test_full_workflow_prints_every_section() {
        let backend = EchoBackend::new();
        let workflow = Workflow::with_backend(backend.clone());
        let out = run_menu(&workflow, " 1 \n  fever and chills  \n").await;

        assert!(out.contains("=== Running Full Workflow ==="));
        assert!(out.contains("Enter patient symptoms: "));
        assert!(out.contains("\nGeneral Doctor Assessment:\nreply 1 to Input: fever and chills\n"));
        assert!(out.contains("\nDiagnosis:\nreply 2 to Input: reply 1 to Input: fever and chills\n"));
        assert!(out.contains("\nMedication Recommendations:\nreply 3"));
        assert!(out.contains("\nFollow-Up Recommendations:\nreply 4"));
        assert_eq!(backend.prompts.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_halted_workflow_prints_placeholders() {
        let workflow = Workflow::with_backend(Arc::new(DenyBackend));
        let out = run_menu(&workflow, "1\ncough\n").await;

        assert!(out.contains(
            "\nGeneral Doctor Assessment:\nError: Invalid API key or insufficient permissions\n"
        ));
        assert!(out.contains("\nDiagnosis:\nNo output available\n"));
        assert!(out.contains("\nFollow-Up Recommendations:\nNo output available\n"));
    }

    #[tokio::test]
    async fn test_follow_up_reads_four_fields() {
        let backend = EchoBackend::new();
        let workflow = Workflow::with_backend(backend.clone());
        let out = run_menu(&workflow, "5\ncough\nbronchitis likely\nbronchitis\nrest\n").await;

        assert!(out.contains("=== Running Follow-Up Agent ==="));
        assert!(out.contains(
            "Enter patient symptoms: Enter preliminary assessment: Enter diagnosis: Enter medications: "
        ));
        assert!(out.contains("\nFollow-Up Recommendations:\nreply 1 to - Medications: rest\n"));

        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("- Preliminary Assessment: bronchitis likely"));
    }

    #[tokio::test]
    async fn test_empty_field_skips_model() {
        let backend = EchoBackend::new();
        let workflow = Workflow::with_backend(backend.clone());
        let out = run_menu(&workflow, "4\n\n").await;

        assert!(out.contains("\nMedication Recommendations:\nNo output available\n"));
        assert!(backend.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_eof_is_invalid_choice() {
        let workflow = Workflow::with_backend(EchoBackend::new());
        let out = run_menu(&workflow, "").await;
        assert!(out.contains("Invalid choice."));
    }
}
