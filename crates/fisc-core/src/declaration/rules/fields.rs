//! Field code scanning.
//!
//! Each line is tokenized into `(code, value)` pairs: a 3 or 4 digit code,
//! whitespace, then an amount in any locale. Only the first non-zero value
//! per code is kept for a document.

use rust_decimal::Decimal;

use super::amounts::normalize_amount;
use super::patterns::FIELD_VALUE;
use super::{ExtractionMatch, FieldExtractor};
use crate::models::record::FieldMap;

/// A code/value pair found on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldToken {
    pub code: String,
    pub value: Decimal,
}

/// Line tokenizer for field code/value pairs.
pub struct FieldScanner;

impl FieldScanner {
    pub fn new() -> Self {
        Self
    }

    /// Tokens of a single line, left to right, zero values included.
    pub fn scan_line(&self, line: &str) -> Vec<ExtractionMatch<FieldToken>> {
        FIELD_VALUE
            .captures_iter(line)
            .filter_map(|caps| {
                let full_match = caps.get(0)?;
                let token = FieldToken {
                    code: caps[1].to_string(),
                    value: normalize_amount(&caps[2]),
                };
                Some(
                    ExtractionMatch::new(token, full_match.as_str())
                        .with_position(full_match.start(), full_match.end()),
                )
            })
            .collect()
    }

    /// Build the sparse field map of a document.
    pub fn scan(&self, text: &str) -> FieldMap {
        let mut fields = FieldMap::new();

        for token in self.extract_all(text) {
            let FieldToken { code, value } = token.value;
            if value.is_zero() {
                continue;
            }
            fields.entry(code).or_insert(value);
        }

        fields
    }
}

impl Default for FieldScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for FieldScanner {
    type Output = ExtractionMatch<FieldToken>;

    // Positions are relative to the line the token was found on.
    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        text.split('\n').flat_map(|line| self.scan_line(line)).collect()
    }
}

/// Extract the field code map from declaration text.
pub fn extract_fields(text: &str) -> FieldMap {
    FieldScanner::new().scan(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_scan_line_tokens() {
        let scanner = FieldScanner::new();
        let tokens = scanner.scan_line("401 1.500,00 411 1.500,00 421 180,00");

        let pairs: Vec<(String, Decimal)> = tokens
            .into_iter()
            .map(|t| (t.value.code, t.value.value))
            .collect();

        assert_eq!(
            pairs,
            vec![
                ("401".to_string(), dec("1500.00")),
                ("411".to_string(), dec("1500.00")),
                ("421".to_string(), dec("180.00")),
            ]
        );
    }

    #[test]
    fn test_four_digit_codes() {
        let fields = extract_fields("3120 250.00 3620 2.50\n3030 1,000.00");

        assert_eq!(fields.get("3120"), Some(&dec("250.00")));
        assert_eq!(fields.get("3620"), Some(&dec("2.50")));
        assert_eq!(fields.get("3030"), Some(&dec("1000.00")));
    }

    #[test]
    fn test_first_nonzero_occurrence_wins() {
        let text = "\
            401 0,00\n\
            401 100,00\n\
            401 999,00\n";

        let fields = extract_fields(text);
        assert_eq!(fields.get("401"), Some(&dec("100.00")));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_zero_values_are_not_stored() {
        let fields = extract_fields("499 0.00\n529 0");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_negative_values() {
        let fields = extract_fields("527 -45,10");
        assert_eq!(fields.get("527"), Some(&dec("-45.10")));
    }

    #[test]
    fn test_non_matching_text_is_empty() {
        assert!(extract_fields("DECLARACIÓN DEL IMPUESTO AL VALOR AGREGADO").is_empty());
        assert!(extract_fields("").is_empty());
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "FORMULARIO 104\n401 1.500,00 411 1.500,00\n500 320,40 510 320,40\n";
        assert_eq!(extract_fields(text), extract_fields(text));
    }
}
