//! Consolidation of period summaries into one multi-period summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::summary::{
    IncomeWithholdingSummary, PurchaseSummary, StructuredPeriodSummary, SummaryHeader,
    VatWithholdingBuckets,
};
use crate::error::ConsolidationError;
use crate::models::period::Semester;

/// Which period summaries a consolidation covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsolidationKey {
    All,
    Semester(Semester),
}

impl ConsolidationKey {
    fn selects(self, summary: &StructuredPeriodSummary) -> bool {
        match self {
            Self::All => true,
            Self::Semester(half) => summary.month_number().is_some_and(|m| half.contains(m)),
        }
    }
}

/// Merge the selected summaries into one, category by category.
///
/// Returns `Ok(None)` when no summary is selected. Credit-note reversal is
/// applied once, on the merged categories. Fails with
/// [`ConsolidationError::Overflow`] when a merged amount leaves the decimal
/// range.
pub fn consolidate(
    summaries: &[StructuredPeriodSummary],
    key: ConsolidationKey,
) -> Result<Option<StructuredPeriodSummary>, ConsolidationError> {
    let selected: Vec<&StructuredPeriodSummary> =
        summaries.iter().filter(|s| key.selects(s)).collect();
    let Some(first) = selected.first() else {
        return Ok(None);
    };
    let overflow = || ConsolidationError::Overflow("the consolidated summary".to_string());

    let mut purchases: BTreeMap<String, PurchaseSummary> = BTreeMap::new();
    let mut withholdings: BTreeMap<String, IncomeWithholdingSummary> = BTreeMap::new();
    let mut buckets = VatWithholdingBuckets::default();

    for summary in &selected {
        for category in &summary.purchases {
            match purchases.get_mut(&category.code) {
                Some(merged) => merged.checked_merge(category).ok_or_else(overflow)?,
                None => {
                    purchases.insert(category.code.clone(), category.clone());
                }
            }
        }
        for category in &summary.income_withholdings {
            match withholdings.get_mut(&category.code) {
                Some(merged) => merged.checked_merge(category).ok_or_else(overflow)?,
                None => {
                    withholdings.insert(category.code.clone(), category.clone());
                }
            }
        }
        buckets.checked_merge(&summary.vat_buckets).ok_or_else(overflow)?;
    }

    debug!("Consolidated {} of {} period summaries", selected.len(), summaries.len());

    let header = SummaryHeader {
        source_name: selected
            .iter()
            .map(|s| s.source_name.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        taxpayer_id: first.taxpayer_id.clone(),
        legal_name: first.legal_name.clone(),
        year: first.year.clone(),
        month: first.month.clone(),
        period_label: format!("CONSOLIDADO {} PERIODO(S) {}", selected.len(), first.year),
    };

    StructuredPeriodSummary::assemble(header, purchases, withholdings, buckets)
        .ok_or_else(overflow)
        .map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ats::{parse_document, VatBucket};
    use crate::models::period::PeriodMode;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn consolidated(summaries: &[StructuredPeriodSummary], key: ConsolidationKey) -> StructuredPeriodSummary {
        consolidate(summaries, key).unwrap().unwrap()
    }

    fn summary(month: &str, body: &str) -> StructuredPeriodSummary {
        let xml = format!("<iva><Anio>2024</Anio><Mes>{}</Mes>{}</iva>", month, body);
        parse_document(&format!("{}.xml", month), &xml, PeriodMode::Monthly).unwrap()
    }

    #[test]
    fn test_reversal_applied_once() {
        let summaries = vec![
            summary(
                "01",
                "<detalleCompras><tipoComprobante>04</tipoComprobante><baseImpGrav>100.00</baseImpGrav></detalleCompras>",
            ),
            summary(
                "02",
                "<detalleCompras><tipoComprobante>04</tipoComprobante><baseImpGrav>50.00</baseImpGrav></detalleCompras>\
                 <detalleCompras><tipoComprobante>01</tipoComprobante><baseImpGrav>500.00</baseImpGrav></detalleCompras>",
            ),
        ];

        let merged = consolidated(&summaries, ConsolidationKey::All);

        assert_eq!(merged.purchases.len(), 2);
        assert_eq!(merged.purchases[1].code, "04");
        assert_eq!(merged.purchases[1].count, 2);
        assert_eq!(merged.purchases[1].base_standard_rate, dec("150.00"));
        assert_eq!(merged.totals.purchases.base_standard_rate, dec("350.00"));
        assert_eq!(merged.period_label, "CONSOLIDADO 2 PERIODO(S) 2024");
    }

    #[test]
    fn test_buckets_and_withholdings_sum() {
        let item = "<detalleCompras><valRetServ20>2.00</valRetServ20>\
                    <detalleAir><codRetAir>303</codRetAir><baseImpAir>100.00</baseImpAir><valRetAir>10.00</valRetAir></detalleAir>\
                    </detalleCompras>";
        let summaries = vec![summary("03", item), summary("09", item)];

        let merged = consolidated(&summaries, ConsolidationKey::All);

        assert_eq!(merged.vat_buckets.get(VatBucket::Twenty), dec("4.00"));
        assert_eq!(merged.income_withholdings[0].count, 2);
        assert_eq!(merged.totals.income_withholdings.retained, dec("20.00"));

        let second = consolidated(&summaries, ConsolidationKey::Semester(Semester::Second));
        assert_eq!(second.totals.vat_withheld, dec("2.00"));
        assert_eq!(second.month, "09");
    }

    #[test]
    fn test_empty_selection() {
        let summaries = vec![summary("03", "")];

        assert!(consolidate(&summaries, ConsolidationKey::Semester(Semester::Second))
            .unwrap()
            .is_none());
        assert!(consolidate(&[], ConsolidationKey::All).unwrap().is_none());
    }

    #[test]
    fn test_merged_overflow_is_an_error() {
        let item = "<detalleCompras><tipoComprobante>01</tipoComprobante>\
                    <baseImpGrav>79228162514264337593543950335</baseImpGrav></detalleCompras>";
        let summaries = vec![summary("01", item), summary("02", item)];

        assert!(matches!(
            consolidate(&summaries, ConsolidationKey::All),
            Err(ConsolidationError::Overflow(_))
        ));
        assert!(consolidate(&summaries, ConsolidationKey::Semester(Semester::Second))
            .unwrap()
            .is_none());
    }
}
