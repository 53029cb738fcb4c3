use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field} value: '{value}'")]
pub struct InvalidEnum {
    pub field: String,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

str_enum!(FileKind {
    Pdf => "pdf",
    Spreadsheet => "spreadsheet",
    Text => "text",
    Other => "other",
});

str_enum!(OutcomeStatus {
    Success => "success",
    Warning => "warning",
    Skipped => "skipped",
    Error => "error",
});

str_enum!(FieldName {
    ManifestNumber => "manifest_number",
    ManifestDate => "manifest_date",
    ProducerName => "producer_name",
    WastesLocation => "wastes_location",
    WasteDescription => "waste_description",
    Quantity => "quantity",
});

impl FieldName {
    /// Label as printed on the manifest form.
    pub fn label(&self) -> &'static str {
        match self {
            Self::ManifestNumber => "Manifest Number",
            Self::ManifestDate => "Manifest Date",
            Self::ProducerName => "Producer Name",
            Self::WastesLocation => "Wastes Location",
            Self::WasteDescription => "Waste Description",
            Self::Quantity => "Quantity",
        }
    }

    pub fn all() -> &'static [FieldName] {
        &[
            Self::ManifestNumber,
            Self::ManifestDate,
            Self::ProducerName,
            Self::WastesLocation,
            Self::WasteDescription,
            Self::Quantity,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn outcome_status_round_trips_through_str() {
        for status in [
            OutcomeStatus::Success,
            OutcomeStatus::Warning,
            OutcomeStatus::Skipped,
            OutcomeStatus::Error,
        ] {
            assert_eq!(OutcomeStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn unknown_value_is_rejected() {
        let err = FileKind::from_str("spreadsheets").unwrap_err();
        assert_eq!(err.field, "FileKind");
        assert_eq!(err.value, "spreadsheets");
    }

    #[test]
    fn serde_uses_snake_case_names() {
        let json = serde_json::to_string(&FieldName::WastesLocation).unwrap();
        assert_eq!(json, "\"wastes_location\"");
    }

    #[test]
    fn labels_match_form_text() {
        assert_eq!(FieldName::ProducerName.label(), "Producer Name");
        assert_eq!(FieldName::all().len(), 6);
    }
}
