//! Rule-based declaration parser: field scanning plus metadata.

use tracing::{debug, warn};

use crate::error::ExtractionError;
use crate::models::record::{Declaration, PeriodRecord};

use super::rules::{extract_metadata, FieldScanner};
use super::{DeclarationExtractor, Result};

/// Combines the field scanner and the metadata extractors into declarations
/// and period records.
pub struct RuleBasedParser {
    scanner: FieldScanner,
}

impl RuleBasedParser {
    pub fn new() -> Self {
        Self {
            scanner: FieldScanner::new(),
        }
    }

    /// Parse a declaration on its own, outside of any batch.
    ///
    /// Fails with [`ExtractionError::NoData`] when neither field values nor a
    /// taxpayer id could be found.
    pub fn parse_single(&self, text: &str) -> Result<Declaration> {
        let declaration = self.extract(text);
        if declaration.is_empty() {
            return Err(ExtractionError::NoData);
        }
        Ok(declaration)
    }
}

impl Default for RuleBasedParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DeclarationExtractor for RuleBasedParser {
    fn extract(&self, text: &str) -> Declaration {
        let fields = self.scanner.scan(text);
        let meta = extract_metadata(text);

        debug!(
            "Extracted {} fields, period '{}'",
            fields.len(),
            meta.period_label
        );

        Declaration {
            fields,
            period: meta.period,
            period_label: meta.period_label,
            kind: meta.kind,
            taxpayer_id: meta.taxpayer_id,
            legal_name: meta.legal_name,
        }
    }

    fn build_record(&self, source_name: &str, text: &str) -> Result<PeriodRecord> {
        let declaration = self.extract(text);

        match declaration.period {
            Some(period) => Ok(PeriodRecord::new(period, source_name, declaration)),
            None => {
                warn!("Could not determine period for document: {}", source_name);
                Err(ExtractionError::MissingPeriod)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::period::{DeclarationKind, PeriodKey};
    use chrono::Month;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    const DECLARATION: &str = r#"
        DECLARACIÓN DEL IMPUESTO AL VALOR AGREGADO
        ORIGINAL    FEBRERO 2024
        RUC 1790012345001
        RAZÓN SOCIAL IMPORTADORA DEL PACÍFICO
        401 2.000,00 411 2.000,00 421 240,00
        500 800,00 510 800,00 520 96,00
        499 144,00
    "#;

    #[test]
    fn test_build_record() {
        let parser = RuleBasedParser::new();
        let record = parser.build_record("febrero.txt", DECLARATION).unwrap();

        assert_eq!(record.period(), PeriodKey::month(2024, Month::February));
        assert_eq!(record.kind(), DeclarationKind::Original);
        assert_eq!(record.taxpayer_id(), Some("1790012345001"));
        assert_eq!(record.legal_name(), Some("IMPORTADORA DEL PACÍFICO"));
        assert_eq!(record.value("421"), Decimal::from_str("240.00").unwrap());
        assert_eq!(record.fields().len(), 7);
    }

    #[test]
    fn test_missing_period_is_reported() {
        let parser = RuleBasedParser::new();
        let result = parser.build_record("sin_periodo.txt", "401 2.000,00");
        assert_eq!(result, Err(ExtractionError::MissingPeriod));
    }

    #[test]
    fn test_parse_single_requires_data() {
        let parser = RuleBasedParser::new();

        assert_eq!(
            parser.parse_single("página en blanco"),
            Err(ExtractionError::NoData)
        );

        let only_id = parser.parse_single("RUC 1790012345001").unwrap();
        assert!(only_id.fields.is_empty());
        assert_eq!(only_id.taxpayer_id.as_deref(), Some("1790012345001"));
    }
}
