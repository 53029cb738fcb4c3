use serde::{Deserialize, Serialize};

use super::file::FileDescriptor;
use super::record::ExtractedRecord;

/// User-supplied search terms. Empty terms are vacuously satisfied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchCriteria {
    pub producer_name: String,
    pub wastes_location: String,
}

impl SearchCriteria {
    pub fn new(producer_name: impl Into<String>, wastes_location: impl Into<String>) -> Self {
        Self {
            producer_name: producer_name.into(),
            wastes_location: wastes_location.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.producer_name.trim().is_empty() && self.wastes_location.trim().is_empty()
    }

    /// Human-readable summary used in notifications.
    pub fn describe(&self) -> String {
        format!(
            "Producer: {}, Location: {}",
            self.producer_name.trim(),
            self.wastes_location.trim()
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchLevel {
    Full,
    Partial,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub file: FileDescriptor,
    pub record: ExtractedRecord,
    pub matches_producer: bool,
    pub matches_location: bool,
    /// One entry per unmet criterion, in criterion order.
    pub missing_reasons: Vec<String>,
    pub level: MatchLevel,
}

impl MatchResult {
    pub fn is_match(&self) -> bool {
        self.matches_producer && self.matches_location
    }
}
