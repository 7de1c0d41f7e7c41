use serde::{Deserialize, Serialize};

use crate::error::GateError;

/// Configuration for the submission gate pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Reject every submission.
    pub read_only: bool,
    /// Require an identified contributor holding `report:loo`.
    pub require_contributor: bool,
    /// Maximum length of `name`, in characters.
    pub max_name_len: usize,
    /// Maximum length of `notes` and removal reasons, in characters.
    pub max_notes_len: usize,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            read_only: false,
            require_contributor: true,
            max_name_len: 200,
            max_notes_len: 2000,
        }
    }
}

impl GateConfig {
    /// Accept anonymous submissions; useful for local tooling and tests.
    pub fn open() -> Self {
        Self {
            require_contributor: false,
            ..Default::default()
        }
    }

    /// Check that the limits are usable.
    pub fn validate(&self) -> Result<(), GateError> {
        if self.max_name_len == 0 {
            return Err(GateError::Config("max_name_len must be positive".into()));
        }
        if self.max_notes_len == 0 {
            return Err(GateError::Config("max_notes_len must be positive".into()));
        }
        Ok(())
    }
}
