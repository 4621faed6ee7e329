//! Per-document extraction results.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::period::{DeclarationKind, PeriodKey};

/// Sparse mapping of field code to value. An absent code means zero.
pub type FieldMap = BTreeMap<String, Decimal>;

/// Everything recovered from one declaration text, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Field code to value, zero values never stored.
    pub fields: FieldMap,

    /// Parsed period, if a label was found.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<PeriodKey>,

    /// Upper-cased period label as matched, empty if absent.
    pub period_label: String,

    /// Declaration variant.
    pub kind: DeclarationKind,

    /// 13-digit taxpayer identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxpayer_id: Option<String>,

    /// Legal name of the taxpayer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legal_name: Option<String>,
}

impl Declaration {
    /// Value of a field, zero when absent.
    pub fn value(&self, code: &str) -> Decimal {
        self.fields.get(code).copied().unwrap_or(Decimal::ZERO)
    }

    /// True when nothing relevant was extracted.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.taxpayer_id.is_none()
    }
}

/// One successfully parsed declaration, tied to its reporting period.
///
/// Records are immutable once built; all access goes through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodRecord {
    period: PeriodKey,
    source_name: String,
    fields: FieldMap,
    kind: DeclarationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    taxpayer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    legal_name: Option<String>,
}

impl PeriodRecord {
    /// Build a record from a declaration whose period is known.
    pub fn new(period: PeriodKey, source_name: impl Into<String>, declaration: Declaration) -> Self {
        Self {
            period,
            source_name: source_name.into(),
            fields: declaration.fields,
            kind: declaration.kind,
            taxpayer_id: declaration.taxpayer_id,
            legal_name: declaration.legal_name,
        }
    }

    pub fn period(&self) -> PeriodKey {
        self.period
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn kind(&self) -> DeclarationKind {
        self.kind
    }

    pub fn taxpayer_id(&self) -> Option<&str> {
        self.taxpayer_id.as_deref()
    }

    pub fn legal_name(&self) -> Option<&str> {
        self.legal_name.as_deref()
    }

    /// Value of a field, zero when absent.
    pub fn value(&self, code: &str) -> Decimal {
        self.fields.get(code).copied().unwrap_or(Decimal::ZERO)
    }
}

/// Display ordering for field codes: numeric value first, then text.
pub fn compare_codes(a: &str, b: &str) -> Ordering {
    match (a.parse::<u32>(), b.parse::<u32>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Month;

    #[test]
    fn test_record_accessors() {
        let mut declaration = Declaration::default();
        declaration.fields.insert("401".to_string(), Decimal::new(150000, 2));
        declaration.taxpayer_id = Some("1790012345001".to_string());

        let record = PeriodRecord::new(PeriodKey::month(2024, Month::May), "mayo.txt", declaration);

        assert_eq!(record.value("401"), Decimal::new(150000, 2));
        assert_eq!(record.value("999"), Decimal::ZERO);
        assert_eq!(record.taxpayer_id(), Some("1790012345001"));
        assert_eq!(record.legal_name(), None);
        assert_eq!(record.source_name(), "mayo.txt");
    }

    #[test]
    fn test_code_ordering() {
        let mut codes = vec!["3030", "303", "302", "3530"];
        codes.sort_by(|a, b| compare_codes(a, b));
        assert_eq!(codes, vec!["302", "303", "3030", "3530"]);
    }

    #[test]
    fn test_empty_declaration() {
        let declaration = Declaration::default();
        assert!(declaration.is_empty());
    }
}
