//! Recycled-material columns derived from the waste description.

use crate::models::{ExtractedRecord, MaterialQuantities};

const PLASTIC: &[&str] = &["plastic"];
const PAPER: &[&str] = &["paper", "cb"];
const WOOD: &[&str] = &["wood"];
const STEEL: &[&str] = &["steel", "metal", "inert"];

fn mentions(description: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| description.contains(k))
}

/// Route `quantity` to every material the description mentions.
///
/// Each material is gated independently (case-insensitive substring), so a
/// mixed load counts the full quantity in several columns. Concrete is never
/// derived.
pub fn derive_materials(description: &str, quantity: u64) -> MaterialQuantities {
    let description = description.to_lowercase();
    let gate = |keywords: &[&str]| if mentions(&description, keywords) { quantity } else { 0 };

    MaterialQuantities {
        plastic: gate(PLASTIC),
        paper: gate(PAPER),
        wood: gate(WOOD),
        steel: gate(STEEL),
        concrete: 0,
    }
}

impl ExtractedRecord {
    /// Derived material columns; all zero when the description was not found.
    pub fn materials(&self) -> MaterialQuantities {
        match self.waste_description.text() {
            Some(description) => derive_materials(&description, self.quantity_value()),
            None => MaterialQuantities::default(),
        }
    }
}
