//! Field extraction: per-field cascades of independent pattern rules.
//!
//! Extraction never fails. A field no rule can read comes back as
//! [`FieldValue::NotFound`](crate::models::FieldValue::NotFound).

pub mod rules;
pub mod cascade;
pub mod materials;

pub use rules::*;
pub use cascade::*;
pub use materials::*;
