//! Projection of an annual report through the form layout tables.
//!
//! Renderers (print, spreadsheet, screen) consume these lines; the engine
//! only decides which codes go where and what their totals are.

use rust_decimal::Decimal;
use serde::Serialize;

use super::AnnualReport;
use crate::models::record::PeriodRecord;
use crate::models::schema::{FormSection, WithholdingSchema};

/// Column of a VAT form row that a report line comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Gross,
    Net,
}

/// One reported code with its value per period and its annual total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportLine {
    pub description: String,
    pub code: String,
    pub column: Column,
    /// Values aligned with [`AnnualReport::periods`], zero where not filed.
    pub values: Vec<Decimal>,
    pub total: Decimal,
}

/// A withholding concept with its base and retained totals.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WithholdingLine {
    pub description: String,
    pub base_code: Option<String>,
    pub retained_code: Option<String>,
    pub base_total: Decimal,
    pub retained_total: Decimal,
}

/// Gross and net lines of a form section with a positive annual total.
pub fn section_table(report: &AnnualReport, section: &FormSection) -> Vec<ReportLine> {
    let mut lines = Vec::new();

    for row in section.rows.iter().filter(|r| r.kind.holds_values()) {
        let columns = [(Column::Gross, row.fields.first()), (Column::Net, row.fields.get(1))];

        for (column, slot) in columns {
            let Some(Some(code)) = slot else { continue };
            let total = report.total(code);
            if total <= Decimal::ZERO {
                continue;
            }

            let values = report
                .periods()
                .iter()
                .map(|period| {
                    report
                        .period_values(*period)
                        .and_then(|fields| fields.get(code))
                        .copied()
                        .unwrap_or(Decimal::ZERO)
                })
                .collect();

            lines.push(ReportLine {
                description: row.description.clone(),
                code: code.clone(),
                column,
                values,
                total,
            });
        }
    }

    lines
}

/// Withholding rows that carry any non-zero total.
pub fn withholding_table(report: &AnnualReport, schema: &WithholdingSchema) -> Vec<WithholdingLine> {
    schema
        .rows
        .iter()
        .filter(|r| r.kind.holds_values())
        .map(|row| WithholdingLine {
            description: row.description.clone(),
            base_code: row.base_code.clone(),
            retained_code: row.retained_code.clone(),
            base_total: row.base_code.as_deref().map_or(Decimal::ZERO, |c| report.total(c)),
            retained_total: row.retained_code.as_deref().map_or(Decimal::ZERO, |c| report.total(c)),
        })
        .filter(|line| !line.base_total.is_zero() || !line.retained_total.is_zero())
        .collect()
}

/// How many of the schema's codes a record carries.
pub fn schema_coverage(record: &PeriodRecord, schema: &WithholdingSchema) -> usize {
    schema
        .rows
        .iter()
        .flat_map(|row| row.base_code.iter().chain(row.retained_code.iter()))
        .filter(|code| record.fields().contains_key(code.as_str()))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate_periods;
    use crate::batch::{extract_records, SourceDocument};
    use crate::declaration::RuleBasedParser;
    use crate::models::schema::FormSchema;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn report() -> AnnualReport {
        let documents = vec![
            SourceDocument::new("feb", "FEBRERO 2024\n401 200,00 411 180,00\n303 1.000,00 353 100,00"),
            SourceDocument::new("ene", "ENERO 2024\n401 100,00\n303 500,00 353 50,00\n332 20,00"),
        ];
        aggregate_periods(extract_records(&RuleBasedParser::new(), &documents)).unwrap()
    }

    #[test]
    fn test_section_table() {
        let schema = FormSchema::from_json(
            r#"{ "sections": [{ "title": "Ventas", "range": "400", "rows": [
                { "description": "", "kind": "header", "fields": ["valorBruto", "valorNeto"] },
                { "description": "Ventas locales", "fields": ["401", "411", "421"] },
                { "description": "Activos fijos", "fields": ["402", "412", "422"] }
            ]}]}"#,
        )
        .unwrap();

        let lines = section_table(&report(), schema.section("400").unwrap());

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].code, "401");
        assert_eq!(lines[0].column, Column::Gross);
        assert_eq!(lines[0].values, vec![dec("100.00"), dec("200.00")]);
        assert_eq!(lines[0].total, dec("300.00"));
        assert_eq!(lines[1].code, "411");
        assert_eq!(lines[1].column, Column::Net);
        assert_eq!(lines[1].values, vec![Decimal::ZERO, dec("180.00")]);
    }

    #[test]
    fn test_withholding_table() {
        let schema = WithholdingSchema::from_json(
            r#"{ "rows": [
                { "description": "POR BIENES", "kind": "title" },
                { "description": "Honorarios", "base_code": "303", "retained_code": "353" },
                { "description": "Bienes", "base_code": "312", "retained_code": "362" },
                { "description": "No sujetos", "base_code": "332" }
            ]}"#,
        )
        .unwrap();

        let report = report();
        let lines = withholding_table(&report, &schema);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].base_total, dec("1500.00"));
        assert_eq!(lines[0].retained_total, dec("150.00"));
        assert_eq!(lines[1].base_code.as_deref(), Some("332"));
        assert_eq!(lines[1].retained_total, Decimal::ZERO);

        assert_eq!(schema_coverage(&report.records()[0], &schema), 3);
    }
}
