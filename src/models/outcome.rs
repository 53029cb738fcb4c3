use serde::{Deserialize, Serialize};

use super::enums::OutcomeStatus;

/// Per-document result of a batch. Every input document gets exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentOutcome {
    pub file_name: String,
    pub path: String,
    pub status: OutcomeStatus,
    pub message: String,
    pub manifest_number: Option<String>,
}

impl DocumentOutcome {
    pub fn new(
        file_name: impl Into<String>,
        path: impl Into<String>,
        status: OutcomeStatus,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            path: path.into(),
            status,
            message: message.into(),
            manifest_number: None,
        }
    }

    pub fn with_manifest(mut self, manifest_number: impl Into<String>) -> Self {
        self.manifest_number = Some(manifest_number.into());
        self
    }
}
