use serde::{Deserialize, Serialize};

use super::record::MaterialQuantities;

/// One ledger row in column order A..J, keyed by `manifest_number`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    pub manifest_number: String,
    pub manifest_date: String,
    pub waste_description: String,
    /// General waste quantity (column D).
    pub quantity: u64,
    pub materials: MaterialQuantities,
    pub wastes_location: String,
}
