//! careflow CLI
//!
//! Sequential LLM medical workflow: triage, diagnosis, medication, follow-up.

mod config;
mod menu;

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;

use careflow_core::{
    AgentInput, Role, WorkflowReport, DIAGNOSIS, MEDICATIONS, PRELIMINARY_ASSESSMENT, SYMPTOMS,
};
use careflow_runtime::{Workflow, WorkflowConfig};

use config::BackendArgs;
use menu::{print_section, print_stage, Menu};

#[derive(Parser)]
#[command(name = "careflow")]
#[command(author, version, about = "careflow: triage → diagnosis → medication → follow-up", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    backend: BackendArgs,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive numbered menu (the default)
    Menu,

    /// Run the full four-stage workflow
    Workflow {
        /// Patient-reported symptoms
        #[arg(short, long)]
        symptoms: String,

        /// Save the report (Markdown, or JSON for a .json path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Save the report as workflow_<timestamp>.md when no --output is given
        #[arg(long)]
        save: bool,

        /// Print the report as JSON instead of sections
        #[arg(long)]
        json: bool,
    },

    /// Run the General Doctor agent
    Triage {
        #[arg(short, long)]
        symptoms: String,
    },

    /// Run the Diagnosis agent
    Diagnose {
        /// Preliminary assessment text
        #[arg(short, long)]
        assessment: String,
    },

    /// Run the Medication agent
    Medicate {
        #[arg(short, long)]
        diagnosis: String,
    },

    /// Run the Follow-Up agent
    FollowUp {
        #[arg(long)]
        symptoms: String,
        #[arg(long)]
        assessment: String,
        #[arg(long)]
        diagnosis: String,
        #[arg(long)]
        medications: String,
    },

    /// List the loaded role personas
    Personas,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    config::init_tracing(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Menu);

    if let Commands::Personas = command {
        return list_personas(&cli.backend);
    }

    let workflow = Workflow::new(WorkflowConfig {
        backend: cli.backend.build_backend()?,
        personas: cli.backend.load_personas()?,
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match command {
        Commands::Menu | Commands::Personas => {
            let stdin = io::stdin();
            let mut menu = Menu::new(stdin.lock(), out);
            menu.run(&workflow).await?;
        }
        Commands::Workflow {
            symptoms,
            output,
            save,
            json,
        } => {
            let report = workflow.run(&symptoms).await;

            if json {
                writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
            } else {
                for (heading, text) in report.sections() {
                    print_section(&mut out, heading, Some(text))?;
                }
            }

            let output = output.or_else(|| save.then(default_report_path));
            if let Some(path) = output {
                save_report(&report, &path)?;
                info!("Report saved to {}", path.display());
            }
        }
        Commands::Triage { symptoms } => {
            let input = AgentInput::new().with(SYMPTOMS, symptoms);
            run_single(&workflow, Role::GeneralDoctor, input, &mut out).await?;
        }
        Commands::Diagnose { assessment } => {
            let input = AgentInput::new().with(PRELIMINARY_ASSESSMENT, assessment);
            run_single(&workflow, Role::Diagnosis, input, &mut out).await?;
        }
        Commands::Medicate { diagnosis } => {
            let input = AgentInput::new().with(DIAGNOSIS, diagnosis);
            run_single(&workflow, Role::Medication, input, &mut out).await?;
        }
        Commands::FollowUp {
            symptoms,
            assessment,
            diagnosis,
            medications,
        } => {
            let input = AgentInput::new()
                .with(SYMPTOMS, symptoms)
                .with(PRELIMINARY_ASSESSMENT, assessment)
                .with(DIAGNOSIS, diagnosis)
                .with(MEDICATIONS, medications);
            run_single(&workflow, Role::FollowUp, input, &mut out).await?;
        }
    }

    Ok(())
}

async fn run_single<W: Write>(
    workflow: &Workflow,
    role: Role,
    input: AgentInput,
    out: &mut W,
) -> Result<()> {
    let output = workflow.run_stage(role, input).await;
    print_stage(out, role, &output)
}

fn default_report_path() -> PathBuf {
    let timestamp = chrono::Utc::now().format("%Y-%m-%d_%H-%M-%S");
    PathBuf::from(format!("workflow_{}.md", timestamp))
}

fn save_report(report: &WorkflowReport, path: &Path) -> Result<()> {
    let body = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::to_string_pretty(report)?,
        _ => report.to_markdown(),
    };
    fs::write(path, body)?;
    Ok(())
}

fn list_personas(args: &BackendArgs) -> Result<()> {
    let registry = args.load_personas()?;

    println!("Loaded {} personas:\n", registry.len());
    for persona in registry.iter() {
        println!(
            "- {} ({}) for {}: fields [{}]",
            persona.name,
            persona.id,
            persona.role,
            persona.template.placeholders().join(", ")
        );
    }

    let missing: Vec<_> = Role::ALL
        .into_iter()
        .filter(|role| registry.get(*role).is_none())
        .collect();
    if !missing.is_empty() {
        println!("\nNo persona for: {:?}", missing);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Provider;

    #[test]
    fn test_no_subcommand_means_menu() {
        let cli = Cli::try_parse_from(["careflow"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.verbose, 1);
        assert_eq!(cli.backend.provider, Provider::Gemini);
    }

    #[test]
    fn test_parse_workflow_with_global_flags() {
        let cli = Cli::try_parse_from([
            "careflow", "workflow", "-s", "fever", "--save", "--provider", "openai", "-v", "2",
        ])
        .unwrap();

        assert_eq!(cli.backend.provider, Provider::Openai);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Some(Commands::Workflow { symptoms, output, save, json }) => {
                assert_eq!(symptoms, "fever");
                assert!(output.is_none());
                assert!(save);
                assert!(!json);
            }
            _ => panic!("expected workflow command"),
        }
    }

    #[test]
    fn test_follow_up_requires_every_field() {
        assert!(Cli::try_parse_from(["careflow", "follow-up", "--symptoms", "cough"]).is_err());
    }

    #[test]
    fn test_save_report_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let mut report = WorkflowReport::new("cough");
        report.record(Role::GeneralDoctor, careflow_core::StageOutput::Nothing);
        report.halt(Role::GeneralDoctor);

        let md = dir.path().join("report.md");
        save_report(&report, &md).unwrap();
        assert!(fs::read_to_string(&md).unwrap().starts_with("# Medical Workflow Report"));

        let json = dir.path().join("report.json");
        save_report(&report, &json).unwrap();
        let parsed: WorkflowReport =
            serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed.halted_at, Some(Role::GeneralDoctor));
    }
}
