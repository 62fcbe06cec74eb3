//! Persona management for workflow agents
//!
//! Each role's prompt is defined in a TOML persona file under `prompts/`.
//! The four defaults are embedded in the binary; a directory of persona
//! files can override them role by role.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use careflow_core::{PromptTemplate, Role, TemplateError};

/// Persona loading errors
#[derive(Debug, Error)]
pub enum PersonaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid persona TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("persona '{id}' has an invalid template: {source}")]
    Template {
        id: String,
        #[source]
        source: TemplateError,
    },

    #[error("persona '{id}' for {role} must use placeholders {expected:?}, found {found:?}")]
    FieldMismatch {
        id: String,
        role: Role,
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// A persona definition loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct PersonaFile {
    pub persona: PersonaMetadata,
    pub prompt: PromptConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PersonaMetadata {
    pub id: String,
    pub name: String,
    pub role: Role,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    pub template: String,
}

fn default_enabled() -> bool {
    true
}

/// A validated persona: metadata plus its parsed template
#[derive(Debug, Clone)]
pub struct Persona {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub template: PromptTemplate,
}

impl Persona {
    /// Parse and validate a persona from TOML source.
    ///
    /// Returns `Ok(None)` for a disabled persona.
    pub fn from_toml(source: &str) -> Result<Option<Self>, PersonaError> {
        let file: PersonaFile = toml::from_str(source)?;
        if !file.persona.enabled {
            return Ok(None);
        }

        let PersonaFile { persona, prompt } = file;

        let template =
            PromptTemplate::new(prompt.template.trim()).map_err(|source| PersonaError::Template {
                id: persona.id.clone(),
                source,
            })?;

        let mut expected: Vec<String> = persona
            .role
            .required_fields()
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut found: Vec<String> = template.placeholders().into_iter().map(String::from).collect();
        expected.sort();
        found.sort();

        if expected != found {
            return Err(PersonaError::FieldMismatch {
                id: persona.id,
                role: persona.role,
                expected,
                found,
            });
        }

        Ok(Some(Self {
            id: persona.id,
            name: persona.name,
            role: persona.role,
            template,
        }))
    }
}

/// Registry of loaded personas, one per role
#[derive(Debug, Default, Clone)]
pub struct PersonaRegistry {
    personas: BTreeMap<Role, Persona>,
}

impl PersonaRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the personas embedded in the binary
    pub fn load_embedded() -> Self {
        let mut registry = Self::new();

        let embedded = [
            include_str!("../prompts/general_doctor.toml"),
            include_str!("../prompts/diagnosis.toml"),
            include_str!("../prompts/medication.toml"),
            include_str!("../prompts/follow_up.toml"),
        ];

        for toml_str in embedded {
            registry.register_source(toml_str, "embedded");
        }

        registry
    }

    /// Load personas from a directory of `.toml` files.
    ///
    /// Invalid files are logged and skipped.
    pub fn load_from_dir<P: AsRef<Path>>(dir: P) -> Result<Self, PersonaError> {
        let mut registry = Self::new();

        let mut paths: Vec<_> = std::fs::read_dir(dir)?
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    debug!("Skipping unreadable persona directory entry: {}", e);
                    None
                }
            })
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .collect();
        paths.sort();

        for path in paths {
            let content = std::fs::read_to_string(&path)?;
            registry.register_source(&content, &path.display().to_string());
        }

        Ok(registry)
    }

    /// Embedded defaults, overridden by whatever `dir` defines
    pub fn load_with_overrides<P: AsRef<Path>>(dir: P) -> Result<Self, PersonaError> {
        let mut registry = Self::load_embedded();
        registry.merge(Self::load_from_dir(dir)?);
        Ok(registry)
    }

    fn register_source(&mut self, source: &str, origin: &str) {
        match Persona::from_toml(source) {
            Ok(Some(persona)) => {
                debug!("Loaded persona '{}' from {}", persona.id, origin);
                self.register(persona);
            }
            Ok(None) => debug!("Skipping disabled persona from {}", origin),
            Err(e) => warn!("Ignoring persona from {}: {}", origin, e),
        }
    }

    /// Register a persona, replacing any previous one for the same role
    pub fn register(&mut self, persona: Persona) {
        self.personas.insert(persona.role, persona);
    }

    /// Take every persona from `other`, replacing ours for the same role
    pub fn merge(&mut self, other: PersonaRegistry) {
        self.personas.extend(other.personas);
    }

    /// Get the persona for a role
    pub fn get(&self, role: Role) -> Option<&Persona> {
        self.personas.get(&role)
    }

    /// Roles that have a persona, in workflow order
    pub fn roles(&self) -> Vec<Role> {
        self.personas.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Persona> {
        self.personas.values()
    }

    /// Count of loaded personas
    pub fn len(&self) -> usize {
        self.personas.len()
    }

    /// Check if registry is empty
    pub fn is_empty(&self) -> bool {
        self.personas.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use careflow_core::{AgentInput, DIAGNOSIS, MEDICATIONS, PRELIMINARY_ASSESSMENT, SYMPTOMS};

    #[test]
    fn test_load_embedded_personas() {
        let registry = PersonaRegistry::load_embedded();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.roles(), Role::ALL.to_vec());
    }

    #[test]
    fn test_embedded_templates_substitute_fields_verbatim() {
        let registry = PersonaRegistry::load_embedded();
        let input = AgentInput::new()
            .with(SYMPTOMS, "fever {x} 39°C")
            .with(PRELIMINARY_ASSESSMENT, "- Condition 1: Flu - fever")
            .with(DIAGNOSIS, "- Diagnosis: Influenza - viral")
            .with(MEDICATIONS, "- Medication 1: Oseltamivir");

        for role in Role::ALL {
            let persona = registry.get(role).unwrap();
            let rendered = persona.template.render(&input).unwrap();
            for field in role.required_fields() {
                assert!(
                    rendered.contains(input.get(field).unwrap()),
                    "{} prompt should contain {}",
                    role,
                    field
                );
            }
        }

        let triage = registry.get(Role::GeneralDoctor).unwrap();
        let rendered = triage.template.render(&input).unwrap();
        assert!(rendered.ends_with("Input: fever {x} 39°C"));
    }

    #[test]
    fn test_rejects_wrong_placeholders() {
        let source = r#"
            [persona]
            id = "bad"
            name = "Bad"
            role = "Diagnosis"

            [prompt]
            template = "Input: {symptoms}"
        "#;

        match Persona::from_toml(source) {
            Err(PersonaError::FieldMismatch { role, found, .. }) => {
                assert_eq!(role, Role::Diagnosis);
                assert_eq!(found, vec!["symptoms".to_string()]);
            }
            other => panic!("expected field mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_persona_skipped() {
        let source = r#"
            [persona]
            id = "off"
            name = "Off"
            role = "Medication"
            enabled = false

            [prompt]
            template = "{diagnosis}"
        "#;

        assert!(Persona::from_toml(source).unwrap().is_none());
    }

    #[test]
    fn test_load_with_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("medication.toml"),
            r#"
                [persona]
                id = "terse_medication"
                name = "Terse Medication"
                role = "Medication"

                [prompt]
                template = "List drugs for: {diagnosis}"
            "#,
        )
        .unwrap();
        std::fs::write(dir.path().join("broken.toml"), "not = [valid").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let overrides = PersonaRegistry::load_from_dir(dir.path()).unwrap();
        assert_eq!(overrides.len(), 1);

        let registry = PersonaRegistry::load_with_overrides(dir.path()).unwrap();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.get(Role::Medication).unwrap().id, "terse_medication");
        assert_eq!(registry.get(Role::Diagnosis).unwrap().id, "diagnosis");
    }

    #[test]
    fn test_missing_dir_is_error() {
        assert!(PersonaRegistry::load_from_dir("/nonexistent/careflow/prompts").is_err());
    }
}
