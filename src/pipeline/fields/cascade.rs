use std::sync::LazyLock;

use super::rules::{
    FieldRule, LabeledBlockRule, LabeledDateRule, LabeledDigitsRule, LabeledLineRule,
    TableQuantityRule, TableRowRule,
};
use crate::models::{ExtractedRecord, FieldName, FieldValue};
use crate::pipeline::extraction::{collapse_whitespace, normalize_text};

/// Ordered rules for one field. The first rule yielding a non-empty value wins.
pub struct FieldCascade {
    field: FieldName,
    rules: Vec<Box<dyn FieldRule>>,
}

impl FieldCascade {
    pub fn new(field: FieldName) -> Self {
        Self {
            field,
            rules: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: impl FieldRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn field(&self) -> FieldName {
        self.field
    }

    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    pub fn extract(&self, text: &str) -> FieldValue {
        for rule in &self.rules {
            let Some(raw) = rule.apply(text) else {
                continue;
            };
            let value = collapse_whitespace(&raw);
            if value.is_empty() {
                continue;
            }

            if self.field == FieldName::Quantity {
                match value.parse::<u64>() {
                    Ok(n) => return FieldValue::Integer(n),
                    Err(_) => {
                        tracing::debug!(rule = rule.name(), value = %value, "Quantity not an integer");
                        continue;
                    }
                }
            }

            tracing::trace!(field = self.field.as_str(), rule = rule.name(), "Field matched");
            return FieldValue::Text(value);
        }
        FieldValue::NotFound
    }
}

/// One cascade per field of the manifest form.
pub struct FieldExtractor {
    cascades: Vec<FieldCascade>,
}

impl FieldExtractor {
    pub fn new(cascades: Vec<FieldCascade>) -> Self {
        Self { cascades }
    }

    /// Cascades for the manifest template in use.
    pub fn standard() -> Self {
        Self::new(vec![
            FieldCascade::new(FieldName::ManifestNumber)
                .rule(LabeledDigitsRule::new("manifest_number_label", r"manifest\s+number"))
                .rule(LabeledDigitsRule::new("manifest_no_label", r"manifest\s+no\.?")),
            FieldCascade::new(FieldName::ManifestDate)
                .rule(LabeledDateRule::strict("manifest_date_strict", r"manifest\s+date"))
                .rule(LabeledDateRule::loose("manifest_date_loose", r"manifest\s+date")),
            FieldCascade::new(FieldName::ProducerName)
                .rule(LabeledBlockRule::new("producer_name_block", r"producer\s+name"))
                .rule(LabeledLineRule::new("producer_line", r"producer")),
            FieldCascade::new(FieldName::WastesLocation)
                .rule(LabeledBlockRule::new("wastes_location_block", r"wastes?\s+location"))
                .rule(LabeledLineRule::new("wastes_location_line", r"wastes?\s+location"))
                .rule(LabeledLineRule::new("location_line", r"location")),
            FieldCascade::new(FieldName::WasteDescription)
                .rule(TableRowRule::in_section("part3_table_row"))
                .rule(TableRowRule::anywhere("table_row")),
            FieldCascade::new(FieldName::Quantity)
                .rule(TableQuantityRule::in_section("part3_table_quantity"))
                .rule(TableQuantityRule::anywhere("table_quantity")),
        ])
    }

    pub fn cascade(&self, field: FieldName) -> Option<&FieldCascade> {
        self.cascades.iter().find(|c| c.field == field)
    }

    pub fn extract(&self, text: &str, field: FieldName) -> FieldValue {
        self.extract_normalized(&normalize_text(text), field)
    }

    fn extract_normalized(&self, text: &str, field: FieldName) -> FieldValue {
        self.cascade(field)
            .map(|c| c.extract(text))
            .unwrap_or(FieldValue::NotFound)
    }

    pub fn extract_record(&self, text: &str) -> ExtractedRecord {
        let text = normalize_text(text);
        let record = ExtractedRecord {
            manifest_number: self.extract_normalized(&text, FieldName::ManifestNumber),
            manifest_date: self.extract_normalized(&text, FieldName::ManifestDate),
            producer_name: self.extract_normalized(&text, FieldName::ProducerName),
            wastes_location: self.extract_normalized(&text, FieldName::WastesLocation),
            waste_description: self.extract_normalized(&text, FieldName::WasteDescription),
            quantity: self.extract_normalized(&text, FieldName::Quantity),
        };

        let found = FieldName::all()
            .iter()
            .filter(|f| record.get(**f).is_found())
            .count();
        tracing::debug!(found, total = FieldName::all().len(), "Extracted manifest fields");

        record
    }
}

static STANDARD: LazyLock<FieldExtractor> = LazyLock::new(FieldExtractor::standard);

/// Extract one field with the standard cascades.
pub fn extract(text: &str, field: FieldName) -> FieldValue {
    STANDARD.extract(text, field)
}

/// Extract every field with the standard cascades.
pub fn extract_record(text: &str) -> ExtractedRecord {
    STANDARD.extract_record(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = "\u{FEFF}WASTE MANIFEST\r\n\
Manifest Number: 1234567\r\n\
Manifest Date: 12/03/2025\r\n\
Part 1 Producer\r\n\
Producer Name:\r\n\
  Acme Construction\r\n\
  Contracting LLC\r\n\
Trade License: 556677\r\n\
Wastes Location: Al Quoz Industrial 3\r\n\
Mobile: 0501112222\r\n\
Part 3 Waste\r\n\
Waste Description Physical State Quantity\r\n\
Mixed Wood and Plastic Solid 180\r\n";

    #[test]
    fn producer_and_location_on_same_lines() {
        let text = "Producer Name : Acme Corp\nWastes Location: Dubai";
        assert_eq!(extract(text, FieldName::ProducerName), FieldValue::Text("Acme Corp".into()));
        assert_eq!(extract(text, FieldName::WastesLocation), FieldValue::Text("Dubai".into()));
    }

    #[test]
    fn wrapped_location_is_read_up_to_next_label() {
        let text = "Wastes Location: Al Quoz\nIndustrial Area 3\nMobile: 0501112222";
        assert_eq!(
            extract(text, FieldName::WastesLocation),
            FieldValue::Text("Al Quoz Industrial Area 3".into())
        );

        let text = "Wastes Location: Jebel Ali\nPart 3\nWaste Description Physical State Quantity";
        assert_eq!(
            extract(text, FieldName::WastesLocation),
            FieldValue::Text("Jebel Ali".into())
        );
    }

    #[test]
    fn full_manifest_record() {
        let record = extract_record(MANIFEST);
        assert_eq!(record.manifest_number, FieldValue::Text("1234567".into()));
        assert_eq!(record.manifest_date, FieldValue::Text("12/03/2025".into()));
        assert_eq!(
            record.producer_name,
            FieldValue::Text("Acme Construction Contracting LLC".into())
        );
        assert_eq!(record.wastes_location, FieldValue::Text("Al Quoz Industrial 3".into()));
        assert_eq!(
            record.waste_description,
            FieldValue::Text("Mixed Wood and Plastic Solid 180".into())
        );
        assert_eq!(record.quantity, FieldValue::Integer(180));
    }

    #[test]
    fn part3_table_quantity() {
        let text = "Part 3 ... Waste Description Physical State Quantity\nPlastic Solid 250";
        let record = extract_record(text);
        assert_eq!(record.quantity, FieldValue::Integer(250));
        assert_eq!(
            record.waste_description,
            FieldValue::Text("Plastic Solid 250".into())
        );
    }

    #[test]
    fn missing_header_leaves_description_not_found() {
        let record = extract_record("Manifest Number: 42\nQuantity: 99");
        assert_eq!(record.waste_description, FieldValue::NotFound);
        assert_eq!(record.quantity_value(), 0);
        assert_eq!(record.manifest_number, FieldValue::Text("42".into()));
    }

    #[test]
    fn fallback_rule_is_used_when_first_misses() {
        let text = "Manifest No. 778899\nManifest Date: 2025-03-12T10:00";
        assert_eq!(
            extract(text, FieldName::ManifestNumber),
            FieldValue::NotFound,
            "label without colon is not read"
        );

        let text = "Manifest No: 778899\nManifest Date: 2025-03-12";
        assert_eq!(extract(text, FieldName::ManifestNumber), FieldValue::Text("778899".into()));
        assert_eq!(extract(text, FieldName::ManifestDate), FieldValue::Text("2025-03-12".into()));
    }

    #[test]
    fn empty_text_yields_all_not_found() {
        let record = extract_record("");
        for field in FieldName::all() {
            assert_eq!(record.get(*field), &FieldValue::NotFound, "{field}");
        }
    }

    #[test]
    fn never_panics_on_odd_input() {
        let inputs = [
            "Producer Name:",
            "Producer Name:\n",
            ":\n:\n:",
            "Part 3",
            "Part 3 Waste Description Physical State Quantity",
            "Part 3 Waste Description Physical State Quantity\n\n\n",
            "Quantity 99999999999999999999999999 Waste Description Physical State Quantity\n99999999999999999999999999",
            "Producer Name: 株式会社 東京\nWastes Location: Zürich Süd",
            "\u{FEFF}\u{FEFF}\r\r\n\0",
        ];
        for input in inputs {
            for field in FieldName::all() {
                match extract(input, *field) {
                    FieldValue::Text(v) => {
                        assert!(!v.is_empty());
                        assert_eq!(v, v.trim());
                    }
                    FieldValue::Integer(_) | FieldValue::NotFound => {}
                }
            }
        }
    }

    #[test]
    fn quantity_overflow_is_not_found() {
        let text = "Waste Description Physical State Quantity\nSteel 99999999999999999999999";
        assert_eq!(extract(text, FieldName::Quantity), FieldValue::NotFound);
    }

    #[test]
    fn unicode_values_survive() {
        let text = "Producer Name: Société Générale\nWastes Location: Zürich";
        assert_eq!(
            extract(text, FieldName::ProducerName),
            FieldValue::Text("Société Générale".into())
        );
    }

    #[test]
    fn standard_cascades_cover_every_field() {
        let extractor = FieldExtractor::standard();
        for field in FieldName::all() {
            let cascade = extractor.cascade(*field).unwrap();
            assert!(!cascade.rule_names().is_empty());
        }
    }
}
