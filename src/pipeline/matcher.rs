//! Case-insensitive substring matching of extracted fields against search terms.

use crate::models::{
    ExtractedRecord, FieldName, FieldValue, FileDescriptor, MatchLevel, MatchResult, SearchCriteria,
};

/// Whether `value` satisfies `query`. An empty query is vacuously satisfied;
/// the not-found sentinel never satisfies a non-empty one.
pub fn field_matches(value: &FieldValue, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    match value.text() {
        Some(text) => text.trim().to_lowercase().contains(&query),
        None => false,
    }
}

fn mismatch_reason(field: FieldName, query: &str, value: &FieldValue) -> String {
    format!("{}: Expected '{}', Found '{}'", field.label(), query.trim(), value)
}

pub fn classify(file: &FileDescriptor, record: &ExtractedRecord, criteria: &SearchCriteria) -> MatchResult {
    let checks = [
        (FieldName::ProducerName, criteria.producer_name.as_str()),
        (FieldName::WastesLocation, criteria.wastes_location.as_str()),
    ];

    let mut outcomes = [true; 2];
    let mut missing_reasons = Vec::new();
    let mut queried = 0usize;
    let mut satisfied = 0usize;

    for (i, (field, query)) in checks.iter().enumerate() {
        let value = record.get(*field);
        let ok = field_matches(value, query);
        outcomes[i] = ok;

        if !query.trim().is_empty() {
            queried += 1;
            if ok {
                satisfied += 1;
            }
        }
        if !ok {
            missing_reasons.push(mismatch_reason(*field, query, value));
        }
    }

    let level = if satisfied == queried {
        MatchLevel::Full
    } else if satisfied > 0 {
        MatchLevel::Partial
    } else {
        MatchLevel::None
    };

    MatchResult {
        file: file.clone(),
        record: record.clone(),
        matches_producer: outcomes[0],
        matches_location: outcomes[1],
        missing_reasons,
        level,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::fields::extract_record;

    fn file() -> FileDescriptor {
        FileDescriptor::file("m1.pdf", "/m1.pdf", 100)
    }

    fn record(producer: FieldValue, location: FieldValue) -> ExtractedRecord {
        ExtractedRecord {
            producer_name: producer,
            wastes_location: location,
            ..ExtractedRecord::empty()
        }
    }

    #[test]
    fn producer_substring_matches_case_insensitively() {
        let record = extract_record("Producer Name : Acme Corp\nWastes Location: Dubai");
        let result = classify(&file(), &record, &SearchCriteria::new("acme", ""));
        assert!(result.is_match());
        assert_eq!(result.level, MatchLevel::Full);
        assert!(result.missing_reasons.is_empty());
    }

    #[test]
    fn empty_criteria_always_match() {
        let result = classify(&file(), &ExtractedRecord::empty(), &SearchCriteria::default());
        assert!(result.is_match());
        assert_eq!(result.level, MatchLevel::Full);
    }

    #[test]
    fn not_found_never_satisfies_a_query() {
        let result = classify(
            &file(),
            &ExtractedRecord::empty(),
            &SearchCriteria::new("", "dubai"),
        );
        assert!(!result.is_match());
        assert!(result.matches_producer);
        assert!(!result.matches_location);
        assert_eq!(
            result.missing_reasons,
            vec!["Wastes Location: Expected 'dubai', Found 'Not Found'".to_string()]
        );
        assert_eq!(result.level, MatchLevel::None);
    }

    #[test]
    fn one_of_two_is_partial() {
        let result = classify(
            &file(),
            &record(FieldValue::Text("Acme Corp".into()), FieldValue::Text("Sharjah".into())),
            &SearchCriteria::new("  ACME ", "Dubai"),
        );
        assert!(!result.is_match());
        assert_eq!(result.level, MatchLevel::Partial);
        assert_eq!(
            result.missing_reasons,
            vec!["Wastes Location: Expected 'Dubai', Found 'Sharjah'".to_string()]
        );
    }

    #[test]
    fn reasons_follow_criterion_order() {
        let result = classify(
            &file(),
            &record(FieldValue::Text("Beta".into()), FieldValue::NotFound),
            &SearchCriteria::new("acme", "dubai"),
        );
        assert_eq!(result.missing_reasons.len(), 2);
        assert!(result.missing_reasons[0].starts_with("Producer Name: Expected 'acme', Found 'Beta'"));
        assert!(result.missing_reasons[1].starts_with("Wastes Location:"));
    }
}
