//! Read-only tables describing which field codes exist and how they group.
//!
//! The engine never interprets what a code means; these tables only drive how
//! consolidated totals are laid out for renderers.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

const VAT_FORM: &str = include_str!("../../schemas/form104.json");
const WITHHOLDING_FORM: &str = include_str!("../../schemas/form103.json");

/// Role of a schema row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowKind {
    /// Ordinary value row.
    #[default]
    Line,
    /// Row carrying a printed total.
    Total,
    /// Column header row.
    Header,
    /// Section title.
    Title,
    /// Collapsible group heading.
    Group,
}

impl RowKind {
    /// Whether the row holds values rather than layout.
    pub fn holds_values(self) -> bool {
        matches!(self, Self::Line | Self::Total)
    }
}

/// One row of a declaration form section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRow {
    pub description: String,

    /// Field codes per column (gross, net, tax); `None` for an empty cell.
    #[serde(default)]
    pub fields: Vec<Option<String>>,

    #[serde(default)]
    pub kind: RowKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A block of rows sharing a code range, e.g. sales (400) or purchases (500).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormSection {
    pub title: String,
    pub range: String,
    pub rows: Vec<FormRow>,
}

/// Layout of a VAT declaration form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FormSchema {
    pub sections: Vec<FormSection>,
}

impl FormSchema {
    /// Parse and validate a schema from JSON.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: Self =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        check_unique(schema.sections.iter().flat_map(|section| {
            section.rows.iter().filter(|r| r.kind.holds_values()).flat_map(|row| {
                row.fields
                    .iter()
                    .flatten()
                    .map(move |code| (code.as_str(), row.description.as_str()))
            })
        }))?;
        Ok(schema)
    }

    /// Load a schema from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Built-in layout of the monthly VAT form (104).
    pub fn vat_form() -> Result<Self, SchemaError> {
        Self::from_json(VAT_FORM)
    }

    /// Section by its code range.
    pub fn section(&self, range: &str) -> Option<&FormSection> {
        self.sections.iter().find(|s| s.range == range)
    }
}

/// One row of the withholding form: a base code paired with a retained code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithholdingRow {
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retained_code: Option<String>,

    #[serde(default)]
    pub kind: RowKind,
}

/// Layout of the income-tax withholding form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WithholdingSchema {
    pub rows: Vec<WithholdingRow>,
}

impl WithholdingSchema {
    /// Parse and validate a schema from JSON.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let schema: Self =
            serde_json::from_str(json).map_err(|e| SchemaError::Parse(e.to_string()))?;
        check_unique(schema.rows.iter().filter(|r| r.kind.holds_values()).flat_map(|row| {
            row.base_code
                .iter()
                .chain(row.retained_code.iter())
                .map(move |code| (code.as_str(), row.description.as_str()))
        }))?;
        Ok(schema)
    }

    /// Load a schema from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json(&content)?)
    }

    /// Built-in layout of the income-tax withholding form (103).
    pub fn withholding_form() -> Result<Self, SchemaError> {
        Self::from_json(WITHHOLDING_FORM)
    }
}

fn check_unique<'a>(entries: impl Iterator<Item = (&'a str, &'a str)>) -> Result<(), SchemaError> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for (code, description) in entries {
        match seen.get(code) {
            Some(previous) if *previous != description => {
                return Err(SchemaError::DuplicateCode { code: code.to_string() });
            }
            _ => {
                seen.insert(code, description);
            }
        }
    }
    Ok(())
}

/// Display labels for structured-document category codes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Catalog {
    /// Document type code (tipoComprobante) to transaction name.
    pub document_types: BTreeMap<String, String>,

    /// Income-tax retention code to concept name.
    pub retention_codes: BTreeMap<String, String>,
}

impl Catalog {
    /// Load a catalog from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| SchemaError::Parse(e.to_string()).into())
    }

    pub fn document_type_label(&self, code: &str) -> String {
        self.document_types
            .get(code)
            .cloned()
            .unwrap_or_else(|| format!("TIPO {}", code))
    }

    pub fn retention_label(&self, code: &str) -> String {
        self.retention_codes
            .get(code)
            .cloned()
            .unwrap_or_else(|| format!("RETENCIÓN COD {}", code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_form_schema() {
        let json = r#"{
            "sections": [{
                "title": "Ventas",
                "range": "400",
                "rows": [
                    { "description": "RESUMEN", "kind": "group" },
                    { "description": "Ventas locales", "fields": ["401", "411", "421"] },
                    { "description": "Ajuste", "fields": [null, null, "423"] },
                    { "description": "TOTAL", "fields": ["409", "419", "429"], "kind": "total" }
                ]
            }]
        }"#;

        let schema = FormSchema::from_json(json).unwrap();
        let section = schema.section("400").unwrap();
        assert_eq!(section.rows.len(), 4);
        assert_eq!(section.rows[0].kind, RowKind::Group);
        assert_eq!(section.rows[2].fields[0], None);
        assert!(schema.section("500").is_none());
    }

    #[test]
    fn test_conflicting_code_rejected() {
        let json = r#"{
            "rows": [
                { "description": "Honorarios", "base_code": "303", "retained_code": "353" },
                { "description": "Otro", "base_code": "303" }
            ]
        }"#;

        match WithholdingSchema::from_json(json) {
            Err(SchemaError::DuplicateCode { code }) => assert_eq!(code, "303"),
            other => panic!("expected duplicate code error, got {:?}", other),
        }
    }

    #[test]
    fn test_builtin_layouts_load() {
        let vat = FormSchema::vat_form().unwrap();
        let ranges: Vec<&str> = vat.sections.iter().map(|s| s.range.as_str()).collect();
        assert_eq!(ranges, vec!["400", "500", "600", "700", "800"]);

        let sales = vat.section("400").unwrap();
        assert_eq!(sales.rows[1].kind, RowKind::Header);
        assert_eq!(
            sales.rows[2].fields,
            vec![Some("401".to_string()), Some("411".to_string()), Some("421".to_string())]
        );
        assert!(sales.rows.iter().any(|r| r.kind == RowKind::Total
            && r.fields.first() == Some(&Some("409".to_string()))));

        let withholding = WithholdingSchema::withholding_form().unwrap();
        let fees = withholding
            .rows
            .iter()
            .find(|r| r.base_code.as_deref() == Some("303"))
            .unwrap();
        assert_eq!(fees.retained_code.as_deref(), Some("353"));
        let total = withholding.rows.last().unwrap();
        assert_eq!(total.kind, RowKind::Total);
        assert_eq!(total.retained_code.as_deref(), Some("399"));
        assert!(withholding.rows.iter().any(|r| r.kind == RowKind::Title));
    }

    #[test]
    fn test_catalog_fallback_labels() {
        let mut catalog = Catalog::default();
        catalog.document_types.insert("01".to_string(), "FACTURA".to_string());

        assert_eq!(catalog.document_type_label("01"), "FACTURA");
        assert_eq!(catalog.document_type_label("99"), "TIPO 99");
        assert_eq!(catalog.retention_label("312"), "RETENCIÓN COD 312");
    }
}
