//! Declaration metadata: period, variant, taxpayer id and legal name.
//!
//! Every piece is searched independently over the whole text. A missing
//! match leaves the default in place; metadata never blocks field extraction.

use serde::{Deserialize, Serialize};

use super::patterns::{DECLARATION_KIND, LEGAL_NAME, PERIOD, TAXPAYER_ID};
use super::{ExtractionMatch, FieldExtractor};
use crate::models::period::{DeclarationKind, PeriodKey};

/// Fiscal period extractor ("ENERO 2024", "PRIMER SEMESTRE 2024").
pub struct PeriodExtractor;

impl FieldExtractor for PeriodExtractor {
    type Output = ExtractionMatch<PeriodKey>;

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        PERIOD
            .captures_iter(text)
            .filter_map(|caps| {
                let full_match = caps.get(0)?;
                let key = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
                    (Some(month), Some(year), _, _) => {
                        PeriodKey::from_label_parts(month.as_str(), year.as_str())
                    }
                    (_, _, Some(half), Some(year)) => {
                        PeriodKey::from_label_parts(half.as_str(), year.as_str())
                    }
                    _ => None,
                }?;
                Some(
                    ExtractionMatch::new(key, full_match.as_str().to_uppercase())
                        .with_position(full_match.start(), full_match.end()),
                )
            })
            .collect()
    }
}

/// Declaration variant keyword extractor.
pub struct DeclarationKindExtractor;

impl FieldExtractor for DeclarationKindExtractor {
    type Output = ExtractionMatch<DeclarationKind>;

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        DECLARATION_KIND
            .find_iter(text)
            .filter_map(|m| {
                DeclarationKind::from_keyword(m.as_str())
                    .map(|kind| ExtractionMatch::new(kind, m.as_str()).with_position(m.start(), m.end()))
            })
            .collect()
    }
}

/// 13-digit taxpayer identifier extractor.
pub struct TaxpayerIdExtractor;

impl FieldExtractor for TaxpayerIdExtractor {
    type Output = ExtractionMatch<String>;

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        TAXPAYER_ID
            .captures_iter(text)
            .filter_map(|caps| {
                let id = caps.get(1)?;
                Some(
                    ExtractionMatch::new(id.as_str().to_string(), &caps[0])
                        .with_position(id.start(), id.end()),
                )
            })
            .collect()
    }
}

/// Legal name extractor.
pub struct LegalNameExtractor;

impl FieldExtractor for LegalNameExtractor {
    type Output = ExtractionMatch<String>;

    fn extract_all(&self, text: &str) -> Vec<Self::Output> {
        LEGAL_NAME
            .captures_iter(text)
            .filter_map(|caps| {
                let name = caps.get(1)?;
                let trimmed = name.as_str().trim();
                if trimmed.is_empty() {
                    return None;
                }
                Some(
                    ExtractionMatch::new(trimmed.to_string(), &caps[0])
                        .with_position(name.start(), name.end()),
                )
            })
            .collect()
    }
}

/// Metadata recovered from one declaration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeclarationMetadata {
    pub period: Option<PeriodKey>,
    /// Upper-cased period label as printed, empty when not found.
    pub period_label: String,
    pub kind: DeclarationKind,
    pub taxpayer_id: Option<String>,
    pub legal_name: Option<String>,
}

/// Extract all metadata from declaration text.
pub fn extract_metadata(text: &str) -> DeclarationMetadata {
    let period = PeriodExtractor.extract(text);

    DeclarationMetadata {
        period_label: period.as_ref().map(|m| m.source.clone()).unwrap_or_default(),
        period: period.map(|m| m.value),
        kind: DeclarationKindExtractor
            .extract(text)
            .map(|m| m.value)
            .unwrap_or_default(),
        taxpayer_id: TaxpayerIdExtractor.extract(text).map(|m| m.value),
        legal_name: LegalNameExtractor.extract(text).map(|m| m.value),
    }
}
