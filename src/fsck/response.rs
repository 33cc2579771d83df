//! Streamed fsck messages
//!
//! The admin surface sends one message per violation and one per applied fix.

use crate::fsck::{RepairOutcome, Violation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsckResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl FsckResponse {
    pub fn error(violation: &Violation) -> Self {
        Self {
            error: Some(violation.to_string()),
            fix: None,
        }
    }

    pub fn fix(description: impl Into<String>) -> Self {
        Self {
            error: None,
            fix: Some(description.into()),
        }
    }

    /// Messages for every fix in `outcome`
    pub fn fixes(outcome: &RepairOutcome) -> Vec<Self> {
        outcome.descriptions().into_iter().map(Self::fix).collect()
    }
}
