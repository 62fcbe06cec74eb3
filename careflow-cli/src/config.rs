//! Backend, persona and logging configuration for the binary.
//!
//! Values come from flags first, then the environment. `main` loads `.env`
//! with `dotenvy` before parsing so both sources see it.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Args, ValueEnum};
use tracing::{info, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use careflow_agents::{
    create_gemini_backend, create_openai_backend, GeminiConfig, GenerationConfig,
    OpenAIBackendConfig, PersonaRegistry, SharedBackend,
};
use careflow_core::{DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TOP_P};

/// Default model for the OpenAI-compatible provider
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";

/// Hosted model provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// Google Gemini (generateContent)
    Gemini,
    /// Any OpenAI-compatible chat completions endpoint
    Openai,
}

#[derive(Debug, Clone, Args)]
pub struct BackendArgs {
    /// Model provider
    #[arg(long, value_enum, default_value = "gemini", global = true)]
    pub provider: Provider,

    /// Model name (defaults to gemini-1.5-flash or gpt-4o-mini)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Google API key (or set GOOGLE_API_KEY env var)
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, global = true)]
    pub openai_key: Option<String>,

    /// Override the provider's API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Sampling temperature
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE, global = true)]
    pub temperature: f32,

    /// Maximum tokens per completion
    #[arg(long, default_value_t = DEFAULT_MAX_TOKENS, global = true)]
    pub max_tokens: u32,

    /// Nucleus sampling threshold
    #[arg(long, default_value_t = DEFAULT_TOP_P, global = true)]
    pub top_p: f32,

    /// Request timeout in seconds
    #[arg(long, default_value = "120", global = true)]
    pub timeout: u64,

    /// Directory of persona TOML files overriding the built-in prompts
    #[arg(long, global = true)]
    pub prompts_dir: Option<PathBuf>,
}

impl BackendArgs {
    pub fn model(&self) -> &str {
        match (&self.model, self.provider) {
            (Some(model), _) => model,
            (None, Provider::Gemini) => DEFAULT_MODEL,
            (None, Provider::Openai) => DEFAULT_OPENAI_MODEL,
        }
    }

    fn generation(&self) -> GenerationConfig {
        GenerationConfig {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: self.top_p,
        }
    }

    /// Build the configured backend, failing when its key is missing
    pub fn build_backend(&self) -> Result<SharedBackend> {
        match self.provider {
            Provider::Gemini => {
                let key = required_key(self.api_key.as_deref(), "GOOGLE_API_KEY", "--api-key")?;
                info!("API Key loaded: {}", mask_key(key));

                let mut config = GeminiConfig::new(key, self.model())
                    .with_generation(self.generation())
                    .with_timeout(Duration::from_secs(self.timeout));
                if let Some(base_url) = &self.base_url {
                    config = config.with_base_url(base_url);
                }

                let backend = create_gemini_backend(config)?;
                info!("{} model initialized successfully", backend.model_name());
                Ok(backend)
            }
            Provider::Openai => {
                let key =
                    required_key(self.openai_key.as_deref(), "OPENAI_API_KEY", "--openai-key")?;
                info!("API Key loaded: {}", mask_key(key));

                let mut config =
                    OpenAIBackendConfig::openai(key, self.model()).with_generation(self.generation());
                if let Some(base_url) = &self.base_url {
                    config = config.with_base_url(base_url);
                }

                let backend = create_openai_backend(config)?;
                info!("{} model initialized successfully", backend.model_name());
                Ok(backend)
            }
        }
    }

    /// Embedded personas, overridden by `--prompts-dir` when given
    pub fn load_personas(&self) -> Result<PersonaRegistry> {
        match &self.prompts_dir {
            Some(dir) => PersonaRegistry::load_with_overrides(dir)
                .with_context(|| format!("failed to load personas from {}", dir.display())),
            None => Ok(PersonaRegistry::load_embedded()),
        }
    }
}

fn required_key<'a>(key: Option<&'a str>, env: &str, flag: &str) -> Result<&'a str> {
    match key.map(str::trim) {
        Some(key) if !key.is_empty() => Ok(key),
        _ => Err(anyhow!(
            "{} is required. Set it in the environment or .env, or use {}",
            env,
            flag
        )),
    }
}

/// Show only the first and last four characters of a secret
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Map `-v` count to a level: 0=error, 1=info, 2=debug, 3+=trace
pub fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::ERROR,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// Logs go to stderr so the menu on stdout stays readable.
pub fn init_tracing(verbose: u8) {
    let level = log_level(verbose);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()
        .ok();
}
