//! Workflow roles and their required input fields

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Patient-reported symptoms
pub const SYMPTOMS: &str = "symptoms";

/// Output of the general doctor stage
pub const PRELIMINARY_ASSESSMENT: &str = "preliminary_assessment";

/// Output of the diagnosis stage
pub const DIAGNOSIS: &str = "diagnosis";

/// Output of the medication stage
pub const MEDICATIONS: &str = "medications";

/// The four roles of the workflow, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    GeneralDoctor,
    Diagnosis,
    Medication,
    FollowUp,
}

impl Role {
    /// All roles in workflow order
    pub const ALL: [Role; 4] = [
        Role::GeneralDoctor,
        Role::Diagnosis,
        Role::Medication,
        Role::FollowUp,
    ];

    /// Canonical role name (as used in persona files)
    pub fn name(&self) -> &'static str {
        match self {
            Role::GeneralDoctor => "GeneralDoctor",
            Role::Diagnosis => "Diagnosis",
            Role::Medication => "Medication",
            Role::FollowUp => "FollowUp",
        }
    }

    /// Input fields that must be present and non-empty before the model is called
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            Role::GeneralDoctor => &[SYMPTOMS],
            Role::Diagnosis => &[PRELIMINARY_ASSESSMENT],
            Role::Medication => &[DIAGNOSIS],
            Role::FollowUp => &[SYMPTOMS, PRELIMINARY_ASSESSMENT, DIAGNOSIS, MEDICATIONS],
        }
    }

    /// Key under which this stage's output is reported
    pub fn report_key(&self) -> &'static str {
        match self {
            Role::GeneralDoctor => "general_doctor",
            Role::Diagnosis => "diagnosis",
            Role::Medication => "medication",
            Role::FollowUp => "follow_up",
        }
    }

    /// Heading printed above this stage's output
    pub fn heading(&self) -> &'static str {
        match self {
            Role::GeneralDoctor => "General Doctor Assessment",
            Role::Diagnosis => "Diagnosis",
            Role::Medication => "Medication Recommendations",
            Role::FollowUp => "Follow-Up Recommendations",
        }
    }

    /// Human-readable agent label used in logs and menus
    pub fn label(&self) -> &'static str {
        match self {
            Role::GeneralDoctor => "General Doctor",
            Role::Diagnosis => "Diagnosis",
            Role::Medication => "Medication",
            Role::FollowUp => "Follow-Up",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    /// Accepts the canonical name or the report key, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Role::ALL
            .into_iter()
            .find(|role| {
                role.name().eq_ignore_ascii_case(wanted)
                    || role.report_key().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}
