//! careflow Core - domain model for the sequential medical workflow
//!
//! This crate provides the foundational primitives:
//! - Workflow roles and the input fields each one requires
//! - Prompt templates with verbatim `{field}` substitution
//! - Stage outputs, failure sentinels and the halting rule
//! - The workflow report produced by a full run

pub mod input;
pub mod outcome;
pub mod prompt;
pub mod report;
pub mod role;

pub use input::*;
pub use outcome::*;
pub use prompt::*;
pub use report::*;
pub use role::*;

/// Default hosted model
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default sampling temperature
pub const DEFAULT_TEMPERATURE: f32 = 0.1;

/// Default cap on generated tokens
pub const DEFAULT_MAX_TOKENS: u32 = 512;

/// Default nucleus sampling threshold
pub const DEFAULT_TOP_P: f32 = 0.9;

/// Printed in place of a stage that produced nothing
pub const NO_OUTPUT: &str = "No output available";
