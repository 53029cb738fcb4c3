use serde::{Deserialize, Serialize};

use super::enums::FieldName;

/// Text shown for a field the cascade could not find.
pub const NOT_FOUND: &str = "Not Found";

/// A single extracted value, or the not-found sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(u64),
    NotFound,
}

impl FieldValue {
    pub fn is_found(&self) -> bool {
        !matches!(self, Self::NotFound)
    }

    /// The textual value, `None` for the sentinel.
    pub fn text(&self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s.clone()),
            Self::Integer(n) => Some(n.to_string()),
            Self::NotFound => None,
        }
    }

    /// Integer reading; text is parsed when it is all digits, otherwise 0.
    pub fn as_quantity(&self) -> u64 {
        match self {
            Self::Integer(n) => *n,
            Self::Text(s) => s.trim().parse().unwrap_or(0),
            Self::NotFound => 0,
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(n) => write!(f, "{n}"),
            Self::NotFound => f.write_str(NOT_FOUND),
        }
    }
}

/// Fields pulled from one manifest. Created once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub manifest_number: FieldValue,
    pub manifest_date: FieldValue,
    pub producer_name: FieldValue,
    pub wastes_location: FieldValue,
    pub waste_description: FieldValue,
    pub quantity: FieldValue,
}

impl ExtractedRecord {
    pub fn empty() -> Self {
        Self {
            manifest_number: FieldValue::NotFound,
            manifest_date: FieldValue::NotFound,
            producer_name: FieldValue::NotFound,
            wastes_location: FieldValue::NotFound,
            waste_description: FieldValue::NotFound,
            quantity: FieldValue::NotFound,
        }
    }

    pub fn get(&self, field: FieldName) -> &FieldValue {
        match field {
            FieldName::ManifestNumber => &self.manifest_number,
            FieldName::ManifestDate => &self.manifest_date,
            FieldName::ProducerName => &self.producer_name,
            FieldName::WastesLocation => &self.wastes_location,
            FieldName::WasteDescription => &self.waste_description,
            FieldName::Quantity => &self.quantity,
        }
    }

    /// Business key for the ledger, if the manifest number was found.
    pub fn business_key(&self) -> Option<String> {
        self.manifest_number
            .text()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
    }

    pub fn quantity_value(&self) -> u64 {
        self.quantity.as_quantity()
    }
}

/// Quantity routed to each recycled-material column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialQuantities {
    pub plastic: u64,
    pub paper: u64,
    pub wood: u64,
    pub steel: u64,
    /// Always zero: manifests carry no concrete keyword, but the ledger keeps the column.
    pub concrete: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_displays_as_not_found() {
        assert_eq!(FieldValue::NotFound.to_string(), "Not Found");
        assert_eq!(FieldValue::NotFound.as_quantity(), 0);
        assert!(FieldValue::NotFound.text().is_none());
    }

    #[test]
    fn business_key_requires_manifest_number() {
        let mut record = ExtractedRecord::empty();
        assert!(record.business_key().is_none());
        record.manifest_number = FieldValue::Text("1234567".into());
        assert_eq!(record.business_key().as_deref(), Some("1234567"));
    }

    #[test]
    fn get_maps_every_field() {
        let mut record = ExtractedRecord::empty();
        record.quantity = FieldValue::Integer(250);
        assert_eq!(record.get(FieldName::Quantity), &FieldValue::Integer(250));
        assert_eq!(record.quantity_value(), 250);
        assert_eq!(record.get(FieldName::ProducerName), &FieldValue::NotFound);
    }
}
