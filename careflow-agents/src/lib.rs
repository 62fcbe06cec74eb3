//! careflow Agents
//!
//! Role agents for the medical workflow:
//! - **GeneralDoctor**: triages patient-reported symptoms
//! - **Diagnosis**: turns the preliminary assessment into a likely condition
//! - **Medication**: suggests treatment for the diagnosis
//! - **FollowUp**: plans follow-up care from everything above
//!
//! ## Personas
//!
//! Role prompts are defined via TOML persona files in `prompts/`.
//! See [`persona::PersonaRegistry`] for loading and overriding them.

pub mod agent;
pub mod backend;
pub mod persona;
pub mod traits;

pub use agent::*;
pub use backend::*;
pub use persona::*;
pub use traits::*;
