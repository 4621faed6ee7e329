//! Multi-period aggregation of declaration records.
//!
//! Aggregation is a pure reduction over the current batch: nothing carries
//! over between calls, and the output does not depend on the order in which
//! records were extracted.

pub mod report;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::batch::{BatchOutcome, DocumentFailure};
use crate::declaration::rules::round_total;
use crate::error::ConsolidationError;
use crate::models::period::PeriodKey;
use crate::models::record::{FieldMap, PeriodRecord};

pub use report::{schema_coverage, section_table, withholding_table, Column, ReportLine, WithholdingLine};

/// Consolidated view of a batch of declarations.
#[derive(Debug, Clone, Serialize)]
pub struct AnnualReport {
    periods: Vec<PeriodKey>,
    records: Vec<PeriodRecord>,
    totals: FieldMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    taxpayer_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    legal_name: Option<String>,
    failures: Vec<DocumentFailure>,
}

impl AnnualReport {
    /// Distinct periods in canonical order.
    pub fn periods(&self) -> &[PeriodKey] {
        &self.periods
    }

    /// Records sorted by period; records sharing a period keep submission order.
    pub fn records(&self) -> &[PeriodRecord] {
        &self.records
    }

    /// Per-code totals, each rounded to two decimals.
    pub fn totals(&self) -> &FieldMap {
        &self.totals
    }

    /// Total of one code, zero when absent.
    pub fn total(&self, code: &str) -> Decimal {
        self.totals.get(code).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn taxpayer_id(&self) -> Option<&str> {
        self.taxpayer_id.as_deref()
    }

    pub fn legal_name(&self) -> Option<&str> {
        self.legal_name.as_deref()
    }

    /// Documents excluded from the batch.
    pub fn failures(&self) -> &[DocumentFailure] {
        &self.failures
    }

    /// Fiscal year of the earliest period.
    pub fn year(&self) -> Option<i32> {
        self.periods.first().map(PeriodKey::year)
    }

    /// Field values of the first record filed for a period.
    pub fn period_values(&self, period: PeriodKey) -> Option<&FieldMap> {
        self.records
            .iter()
            .find(|r| r.period() == period)
            .map(PeriodRecord::fields)
    }
}

/// Distinct periods of the records, in canonical period order.
pub fn sorted_periods(records: &[PeriodRecord]) -> Vec<PeriodKey> {
    let mut periods: Vec<PeriodKey> = records.iter().map(PeriodRecord::period).collect();
    periods.sort();
    periods.dedup();
    periods
}

/// Sum every field code across the records, rounding each final sum once.
///
/// Fails with [`ConsolidationError::Overflow`] when a sum leaves the decimal
/// range.
pub fn consolidate_totals(records: &[PeriodRecord]) -> Result<FieldMap, ConsolidationError> {
    let mut totals = FieldMap::new();

    for record in records {
        for (code, value) in record.fields() {
            let total = totals.entry(code.clone()).or_insert(Decimal::ZERO);
            *total = total
                .checked_add(*value)
                .ok_or_else(|| ConsolidationError::Overflow(format!("field {}", code)))?;
        }
    }

    for value in totals.values_mut() {
        *value = round_total(*value);
    }

    Ok(totals)
}

/// Build the annual report for a batch of extracted declarations.
///
/// Fails with [`ConsolidationError::NoDocuments`] for an empty batch and
/// [`ConsolidationError::NoUsableData`] when every document failed.
/// Totals that leave the decimal range fail the report instead of wrapping.
pub fn aggregate_periods(
    outcome: BatchOutcome<PeriodRecord>,
) -> Result<AnnualReport, ConsolidationError> {
    let BatchOutcome { items, failures, submitted } = outcome.into_usable()?;

    // Batch metadata comes from the first document that carries it.
    let taxpayer_id = items.iter().find_map(|r| r.taxpayer_id()).map(str::to_string);
    let legal_name = items.iter().find_map(|r| r.legal_name()).map(str::to_string);

    let mut records = items;
    records.sort_by_key(PeriodRecord::period);

    let periods = sorted_periods(&records);
    let totals = consolidate_totals(&records)?;

    debug!("Consolidated {} field codes", totals.len());
    info!(
        "Aggregated {} of {} documents over {} periods ({} failed)",
        records.len(),
        submitted,
        periods.len(),
        failures.len()
    );

    Ok(AnnualReport {
        periods,
        records,
        totals,
        taxpayer_id,
        legal_name,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{extract_records, FailureReason, SourceDocument};
    use crate::declaration::RuleBasedParser;
    use crate::error::ExtractionError;
    use crate::models::period::{month_from_number, MONTH_NAMES};
    use chrono::Month;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn aggregate(documents: &[SourceDocument]) -> AnnualReport {
        aggregate_periods(extract_records(&RuleBasedParser::new(), documents)).unwrap()
    }

    #[test]
    fn test_reverse_months_are_sorted() {
        let documents: Vec<SourceDocument> = MONTH_NAMES
            .iter()
            .rev()
            .map(|name| SourceDocument::new(format!("{}.txt", name), format!("{} 2024\n401 10,00", name)))
            .collect();

        let report = aggregate(&documents);

        let expected: Vec<PeriodKey> = (1..=12)
            .filter_map(month_from_number)
            .map(|m| PeriodKey::month(2024, m))
            .collect();
        assert_eq!(report.periods(), expected.as_slice());
        assert_eq!(report.records()[0].source_name(), "ENERO.txt");
        assert_eq!(report.records()[11].source_name(), "DICIEMBRE.txt");
        assert_eq!(report.total("401"), dec("120.00"));
    }

    #[test]
    fn test_totals_round_once() {
        let documents = vec![
            SourceDocument::new("a", "ENERO 2024\n401 0.0045"),
            SourceDocument::new("b", "FEBRERO 2024\n401 0.0045"),
        ];

        // 0.0045 + 0.0045 = 0.009 -> 0.01; rounding each first would give 0.00
        assert_eq!(aggregate(&documents).total("401"), dec("0.01"));
    }

    #[test]
    fn test_totals_are_order_independent() {
        let mut documents = vec![
            SourceDocument::new("a", "ENERO 2024\n401 1.234,56\n500 10,10"),
            SourceDocument::new("b", "FEBRERO 2024\n401 99,99\n510 7,00"),
            SourceDocument::new("c", "MARZO 2024\n500 0,33\n401 -34,55"),
        ];

        let forward = aggregate(&documents);
        documents.reverse();
        let backward = aggregate(&documents);

        assert_eq!(forward.totals(), backward.totals());
        assert_eq!(forward.total("401"), dec("1300.00"));
        assert_eq!(forward.total("500"), dec("10.43"));
        assert_eq!(forward.total("510"), dec("7.00"));
        assert_eq!(forward.total("999"), Decimal::ZERO);
    }

    #[test]
    fn test_missing_period_becomes_failure() {
        let documents = vec![
            SourceDocument::new("sin_periodo.txt", "401 500,00"),
            SourceDocument::new("abril.txt", "ABRIL 2024\n401 200,00"),
        ];

        let report = aggregate(&documents);

        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].document, "sin_periodo.txt");
        assert_eq!(
            report.failures()[0].reason,
            FailureReason::from(ExtractionError::MissingPeriod)
        );
        assert_eq!(report.records().len(), 1);
        assert_eq!(report.total("401"), dec("200.00"));
    }

    #[test]
    fn test_first_metadata_wins() {
        let documents = vec![
            SourceDocument::new("mayo", "MAYO 2024\n401 1,00"),
            SourceDocument::new("marzo", "MARZO 2024\nRUC 1790012345001\nRAZÓN SOCIAL PRIMERA SA\n"),
            SourceDocument::new("enero", "ENERO 2024\nRUC 0990011223001\nRAZÓN SOCIAL SEGUNDA SA\n"),
        ];

        let report = aggregate(&documents);

        assert_eq!(report.taxpayer_id(), Some("1790012345001"));
        assert_eq!(report.legal_name(), Some("PRIMERA SA"));
        assert_eq!(report.year(), Some(2024));
    }

    #[test]
    fn test_total_overflow_is_an_error() {
        let documents = vec![
            SourceDocument::new("enero", "ENERO 2024\n401 79228162514264337593543950335"),
            SourceDocument::new("febrero", "FEBRERO 2024\n401 79228162514264337593543950335"),
        ];

        let result = aggregate_periods(extract_records(&RuleBasedParser::new(), &documents));

        match result {
            Err(ConsolidationError::Overflow(what)) => assert_eq!(what, "field 401"),
            other => panic!("expected overflow, got {:?}", other.map(|r| r.totals().clone())),
        }
    }

    #[test]
    fn test_duplicate_periods_sum_but_view_first() {
        let documents = vec![
            SourceDocument::new("original", "JUNIO 2024 ORIGINAL\n401 100,00"),
            SourceDocument::new("sustitutiva", "JUNIO 2024 SUSTITUTIVA\n401 150,00"),
        ];

        let report = aggregate(&documents);
        let june = PeriodKey::month(2024, Month::June);

        assert_eq!(report.periods(), &[june]);
        assert_eq!(report.total("401"), dec("250.00"));
        assert_eq!(
            report.period_values(june).and_then(|f| f.get("401")).copied(),
            Some(dec("100.00"))
        );
    }
}
