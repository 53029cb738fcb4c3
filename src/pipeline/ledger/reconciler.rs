//! Duplicate-safe append of extracted records into the ledger.
//!
//! The manifest number (key column) is the only identity. A record whose key
//! already appears anywhere in the populated key column is skipped; otherwise
//! a row is inserted right after the last data row, shifting anything below
//! it down. Running the same records twice appends nothing the second time.

use serde::Serialize;

use super::table::{Cell, Ledger, LedgerLayout};
use crate::models::{ExtractedRecord, FieldValue, LedgerRow, OutcomeStatus};
use crate::pipeline::extraction::collapse_whitespace;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Row index (0-based) the record was written to.
    Appended { row: usize, manifest_number: String },
    SkippedDuplicate {
        existing_row: usize,
        manifest_number: String,
    },
    MissingKey,
    /// Key too short (or not numeric) to be recognized as a data row later.
    InvalidKey { manifest_number: String },
    WriteFailed { row: usize, manifest_number: String },
}

impl ReconcileOutcome {
    pub fn status(&self) -> OutcomeStatus {
        match self {
            Self::Appended { .. } => OutcomeStatus::Success,
            Self::SkippedDuplicate { .. } => OutcomeStatus::Skipped,
            Self::MissingKey | Self::InvalidKey { .. } => OutcomeStatus::Warning,
            Self::WriteFailed { .. } => OutcomeStatus::Error,
        }
    }

    /// User-facing message; row numbers are 1-based as shown in a spreadsheet.
    pub fn message(&self) -> String {
        match self {
            Self::Appended { row, .. } => format!("Added as row {}", row + 1),
            Self::SkippedDuplicate { existing_row, .. } => {
                format!("Duplicate manifest number (already in row {})", existing_row + 1)
            }
            Self::MissingKey => "No valid data found".to_string(),
            Self::InvalidKey { manifest_number } => {
                format!("Manifest number '{manifest_number}' is not a valid ledger key")
            }
            Self::WriteFailed { row, .. } => format!("Failed to write ledger row {}", row + 1),
        }
    }

    pub fn manifest_number(&self) -> Option<&str> {
        match self {
            Self::Appended { manifest_number, .. }
            | Self::SkippedDuplicate { manifest_number, .. }
            | Self::InvalidKey { manifest_number }
            | Self::WriteFailed { manifest_number, .. } => Some(manifest_number),
            Self::MissingKey => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub appended_count: usize,
    /// One outcome per input record, in input order.
    pub outcomes: Vec<ReconcileOutcome>,
}

/// Text written to the ledger for a field; the sentinel is written as-is.
fn ledger_text(value: &FieldValue) -> String {
    let text = value.to_string();
    let cleaned: String = text.chars().filter(|c| !c.is_control()).collect();
    collapse_whitespace(&cleaned)
}

impl LedgerRow {
    /// Row for `record`, or `None` when it has no manifest number.
    pub fn from_record(record: &ExtractedRecord) -> Option<Self> {
        let manifest_number = record.business_key()?;
        Some(Self {
            manifest_number,
            manifest_date: ledger_text(&record.manifest_date),
            waste_description: ledger_text(&record.waste_description),
            quantity: record.quantity_value(),
            materials: record.materials(),
            wastes_location: ledger_text(&record.wastes_location),
        })
    }
}

/// Row holding `key` in the key column, searching every populated row.
pub fn find_key(ledger: &Ledger, layout: &LedgerLayout, key: &str) -> Option<usize> {
    let key = key.trim();
    (0..ledger.row_count()).find(|&r| ledger.get(r, layout.key_col).key_text() == key)
}

/// Where the next row goes: after the last data row, else after the last populated row.
pub fn insertion_point(ledger: &Ledger, layout: &LedgerLayout) -> usize {
    ledger
        .data_row_indices(layout)
        .last()
        .copied()
        .or_else(|| ledger.last_populated_row())
        .map_or(0, |r| r + 1)
}

fn write_row(ledger: &mut Ledger, layout: &LedgerLayout, at: usize, row: &LedgerRow) {
    if at < ledger.row_count() {
        ledger.insert_row(at);
    }
    let quantity = |n: u64| Cell::Int(i64::try_from(n).unwrap_or(i64::MAX));

    ledger.set(at, layout.key_col, Cell::text(row.manifest_number.clone()));
    ledger.set(at, layout.date_col, Cell::text(row.manifest_date.clone()));
    ledger.set(at, layout.description_col, Cell::text(row.waste_description.clone()));
    ledger.set(at, layout.quantity_col, quantity(row.quantity));
    ledger.set(at, layout.steel_col, quantity(row.materials.steel));
    ledger.set(at, layout.concrete_col, quantity(row.materials.concrete));
    ledger.set(at, layout.wood_col, quantity(row.materials.wood));
    ledger.set(at, layout.paper_col, quantity(row.materials.paper));
    ledger.set(at, layout.plastic_col, quantity(row.materials.plastic));
    ledger.set(at, layout.location_col, Cell::text(row.wastes_location.clone()));
}

/// Reconcile a single record into `ledger`.
pub fn reconcile_one(
    ledger: &mut Ledger,
    layout: &LedgerLayout,
    record: &ExtractedRecord,
) -> ReconcileOutcome {
    let Some(row) = LedgerRow::from_record(record) else {
        tracing::warn!("Record has no manifest number, not reconciled");
        return ReconcileOutcome::MissingKey;
    };

    if !layout.is_data_key(&row.manifest_number) {
        tracing::warn!(
            manifest = %row.manifest_number,
            min_digits = layout.min_key_digits,
            "Manifest number is not a ledger key, not reconciled"
        );
        return ReconcileOutcome::InvalidKey {
            manifest_number: row.manifest_number,
        };
    }

    if let Some(existing_row) = find_key(ledger, layout, &row.manifest_number) {
        tracing::warn!(
            manifest = %row.manifest_number,
            existing_row = existing_row + 1,
            "Manifest already in ledger, skipping"
        );
        return ReconcileOutcome::SkippedDuplicate {
            existing_row,
            manifest_number: row.manifest_number,
        };
    }

    let at = insertion_point(ledger, layout);
    write_row(ledger, layout, at, &row);

    if ledger.get(at, layout.key_col).is_empty() {
        tracing::error!(manifest = %row.manifest_number, row = at + 1, "Ledger write did not stick");
        return ReconcileOutcome::WriteFailed {
            row: at,
            manifest_number: row.manifest_number,
        };
    }

    tracing::info!(
        manifest = %row.manifest_number,
        row = at + 1,
        sheet = ledger.sheet_name(),
        "Ledger row added"
    );
    ReconcileOutcome::Appended {
        row: at,
        manifest_number: row.manifest_number,
    }
}

/// Reconcile `records` in order. Later records see rows added by earlier ones,
/// so duplicates within one batch are skipped too.
pub fn reconcile(
    ledger: &mut Ledger,
    layout: &LedgerLayout,
    records: &[ExtractedRecord],
) -> ReconcileReport {
    let mut report = ReconcileReport::default();
    for record in records {
        let outcome = reconcile_one(ledger, layout, record);
        if matches!(outcome, ReconcileOutcome::Appended { .. }) {
            report.appended_count += 1;
        }
        report.outcomes.push(outcome);
    }
    report
}
