//! careflow Runtime
//!
//! Drives the four role agents as one sequential chain, stopping at the
//! first stage that fails.

pub mod workflow;

pub use workflow::*;
