//! Per-period summaries of a structured annex.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::declaration::rules::{checked_sum, round_total};
use crate::models::period::{month_from_number, month_name, PeriodMode};

/// Document type of credit notes; their amounts reduce purchase totals.
pub const CREDIT_NOTE_CODE: &str = "04";

/// VAT withholding rate buckets, in report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VatBucket {
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "20")]
    Twenty,
    #[serde(rename = "30")]
    Thirty,
    #[serde(rename = "50")]
    Fifty,
    #[serde(rename = "70")]
    Seventy,
    #[serde(rename = "100")]
    Hundred,
    /// Residual withholding on credit notes.
    #[serde(rename = "NC")]
    CreditNote,
}

impl VatBucket {
    pub const ALL: [VatBucket; 7] = [
        Self::Ten,
        Self::Twenty,
        Self::Thirty,
        Self::Fifty,
        Self::Seventy,
        Self::Hundred,
        Self::CreditNote,
    ];

    /// Element carrying the bucket's value inside a purchase item.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Ten => "valRetBien10",
            Self::Twenty => "valRetServ20",
            Self::Thirty => "valorRetBienes",
            Self::Fifty => "valRetServ50",
            Self::Seventy => "valorRetServicios",
            Self::Hundred => "valRetServ100",
            Self::CreditNote => "valorRetencionNc",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ten => "RETENCIÓN IVA 10%",
            Self::Twenty => "RETENCIÓN IVA 20%",
            Self::Thirty => "RETENCIÓN IVA 30%",
            Self::Fifty => "RETENCIÓN IVA 50%",
            Self::Seventy => "RETENCIÓN IVA 70%",
            Self::Hundred => "RETENCIÓN IVA 100%",
            Self::CreditNote => "RETENCIÓN IVA NC",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Accumulated VAT withholdings per bucket.
///
/// Every sum is checked; `None` means a bucket or the total left the
/// decimal range.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct VatWithholdingBuckets([Decimal; 7]);

impl VatWithholdingBuckets {
    pub fn checked_add(&mut self, bucket: VatBucket, value: Decimal) -> Option<()> {
        let slot = &mut self.0[bucket.index()];
        *slot = slot.checked_add(value)?;
        Some(())
    }

    pub fn get(&self, bucket: VatBucket) -> Decimal {
        self.0[bucket.index()]
    }

    pub fn checked_merge(&mut self, other: &Self) -> Option<()> {
        for bucket in VatBucket::ALL {
            self.checked_add(bucket, other.get(bucket))?;
        }
        Some(())
    }

    pub fn total(&self) -> Option<Decimal> {
        checked_sum(self.0)
    }

    /// Buckets holding a value, in report order.
    pub fn project(&self) -> Vec<VatWithholdingSummary> {
        VatBucket::ALL
            .iter()
            .filter(|b| !self.get(**b).is_zero())
            .map(|&bucket| VatWithholdingSummary {
                bucket,
                label: bucket.label(),
                retained: self.get(bucket),
            })
            .collect()
    }
}

impl Serialize for VatWithholdingBuckets {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.project().serialize(serializer)
    }
}

/// One reported VAT withholding bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VatWithholdingSummary {
    pub bucket: VatBucket,
    pub label: &'static str,
    pub retained: Decimal,
}

/// Purchases of one document type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PurchaseSummary {
    pub code: String,
    pub label: String,
    pub count: usize,
    pub base_zero_rate: Decimal,
    pub base_standard_rate: Decimal,
    pub base_non_subject: Decimal,
    pub vat_amount: Decimal,
}

impl PurchaseSummary {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            count: 0,
            base_zero_rate: Decimal::ZERO,
            base_standard_rate: Decimal::ZERO,
            base_non_subject: Decimal::ZERO,
            vat_amount: Decimal::ZERO,
        }
    }

    pub fn is_credit_note(&self) -> bool {
        self.code == CREDIT_NOTE_CODE
    }

    /// Fold another category of the same code into this one.
    pub fn checked_merge(&mut self, other: &Self) -> Option<()> {
        self.base_zero_rate = self.base_zero_rate.checked_add(other.base_zero_rate)?;
        self.base_standard_rate = self.base_standard_rate.checked_add(other.base_standard_rate)?;
        self.base_non_subject = self.base_non_subject.checked_add(other.base_non_subject)?;
        self.vat_amount = self.vat_amount.checked_add(other.vat_amount)?;
        self.count += other.count;
        Some(())
    }
}

/// Income-tax withholdings of one retention code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IncomeWithholdingSummary {
    pub code: String,
    pub label: String,
    pub count: usize,
    pub base: Decimal,
    pub retained: Decimal,
}

impl IncomeWithholdingSummary {
    pub fn new(code: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            label: label.into(),
            count: 0,
            base: Decimal::ZERO,
            retained: Decimal::ZERO,
        }
    }

    pub fn checked_merge(&mut self, other: &Self) -> Option<()> {
        self.base = self.base.checked_add(other.base)?;
        self.retained = self.retained.checked_add(other.retained)?;
        self.count += other.count;
        Some(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PurchaseTotals {
    pub base_zero_rate: Decimal,
    pub base_standard_rate: Decimal,
    pub base_non_subject: Decimal,
    pub vat_amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IncomeWithholdingTotals {
    pub base: Decimal,
    pub retained: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummaryTotals {
    pub purchases: PurchaseTotals,
    pub income_withholdings: IncomeWithholdingTotals,
    pub vat_withheld: Decimal,
}

impl SummaryTotals {
    /// Compute rounded totals; credit-note purchases count negatively.
    ///
    /// Returns `None` when a total leaves the decimal range.
    pub fn compute(
        purchases: &[PurchaseSummary],
        withholdings: &[IncomeWithholdingSummary],
        buckets: &VatWithholdingBuckets,
    ) -> Option<Self> {
        let signed = |category: &PurchaseSummary, value: Decimal| {
            if category.is_credit_note() { -value } else { value }
        };
        let purchase_total = |field: fn(&PurchaseSummary) -> Decimal| {
            checked_sum(purchases.iter().map(|c| signed(c, field(c)))).map(round_total)
        };

        let base = checked_sum(withholdings.iter().map(|w| w.base))?;
        let retained = checked_sum(withholdings.iter().map(|w| w.retained))?;
        let vat_withheld = buckets.total()?;

        Some(Self {
            purchases: PurchaseTotals {
                base_zero_rate: purchase_total(|c| c.base_zero_rate)?,
                base_standard_rate: purchase_total(|c| c.base_standard_rate)?,
                base_non_subject: purchase_total(|c| c.base_non_subject)?,
                vat_amount: purchase_total(|c| c.vat_amount)?,
            },
            income_withholdings: IncomeWithholdingTotals {
                base: round_total(base),
                retained: round_total(retained),
            },
            vat_withheld: round_total(vat_withheld),
        })
    }
}

/// Summary of one structured document (or a consolidation of several).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructuredPeriodSummary {
    pub source_name: String,
    pub taxpayer_id: String,
    pub legal_name: String,
    pub year: String,
    /// Two-digit month as written in the document.
    pub month: String,
    pub period_label: String,
    pub purchases: Vec<PurchaseSummary>,
    pub income_withholdings: Vec<IncomeWithholdingSummary>,
    #[serde(rename = "vat_withholdings")]
    pub vat_buckets: VatWithholdingBuckets,
    pub totals: SummaryTotals,
}

/// Metadata read from the head of a document.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct SummaryHeader {
    pub source_name: String,
    pub taxpayer_id: String,
    pub legal_name: String,
    pub year: String,
    pub month: String,
    pub period_label: String,
}

impl StructuredPeriodSummary {
    /// Assemble a summary, sorting categories by code and computing totals.
    pub(crate) fn assemble(
        header: SummaryHeader,
        purchases: BTreeMap<String, PurchaseSummary>,
        withholdings: BTreeMap<String, IncomeWithholdingSummary>,
        vat_buckets: VatWithholdingBuckets,
    ) -> Option<Self> {
        let purchases: Vec<PurchaseSummary> = purchases.into_values().collect();
        let income_withholdings: Vec<IncomeWithholdingSummary> = withholdings.into_values().collect();
        let totals = SummaryTotals::compute(&purchases, &income_withholdings, &vat_buckets)?;

        Some(Self {
            source_name: header.source_name,
            taxpayer_id: header.taxpayer_id,
            legal_name: header.legal_name,
            year: header.year,
            month: header.month,
            period_label: header.period_label,
            purchases,
            income_withholdings,
            vat_buckets,
            totals,
        })
    }

    /// Numeric month, when the document carries a valid one.
    pub fn month_number(&self) -> Option<u32> {
        self.month.trim().parse().ok().filter(|m| (1..=12).contains(m))
    }

    /// Ordering key: year then month, unparsable parts first.
    pub fn sort_key(&self) -> (i32, u32) {
        (
            self.year.trim().parse().unwrap_or(0),
            self.month.trim().parse().unwrap_or(0),
        )
    }
}

/// Display label for a document period.
pub fn period_label(month: &str, year: &str, mode: PeriodMode) -> String {
    if mode == PeriodMode::Semiannual {
        match month {
            "06" => return format!("1er SEMESTRE {}", year),
            "12" => return format!("2do SEMESTRE {}", year),
            _ => {}
        }
    }

    let name = month
        .trim()
        .parse()
        .ok()
        .and_then(month_from_number)
        .map_or("DESCONOCIDO", month_name);
    format!("{} {}", name, year)
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
    fn test_credit_notes_reduce_totals_only() {
        let mut invoice = PurchaseSummary::new("01", "FACTURA");
        invoice.count = 1;
        invoice.base_standard_rate = dec("500");
        let mut credit = PurchaseSummary::new("04", "NOTA DE CRÉDITO");
        credit.count = 1;
        credit.base_standard_rate = dec("100");

        let purchases = vec![invoice, credit];
        let totals = SummaryTotals::compute(&purchases, &[], &VatWithholdingBuckets::default()).unwrap();

        assert_eq!(totals.purchases.base_standard_rate, dec("400.00"));
        assert_eq!(purchases[1].base_standard_rate, dec("100"));
    }

    #[test]
    fn test_bucket_projection_skips_zero() {
        let mut buckets = VatWithholdingBuckets::default();
        buckets.checked_add(VatBucket::Thirty, dec("3.60")).unwrap();
        buckets.checked_add(VatBucket::Hundred, dec("12.00")).unwrap();
        buckets.checked_add(VatBucket::CreditNote, Decimal::ZERO).unwrap();

        let projected = buckets.project();
        let order: Vec<VatBucket> = projected.iter().map(|b| b.bucket).collect();

        assert_eq!(order, vec![VatBucket::Thirty, VatBucket::Hundred]);
        assert_eq!(buckets.total(), Some(dec("15.60")));
    }

    #[test]
    fn test_bucket_overflow_is_reported() {
        let mut buckets = VatWithholdingBuckets::default();
        buckets.checked_add(VatBucket::Ten, Decimal::MAX).unwrap();
        buckets.checked_add(VatBucket::Twenty, Decimal::MAX).unwrap();

        assert_eq!(buckets.checked_add(VatBucket::Ten, Decimal::ONE), None);
        assert_eq!(buckets.total(), None);
        assert!(SummaryTotals::compute(&[], &[], &buckets).is_none());
    }

    #[test]
    fn test_period_label() {
        assert_eq!(period_label("03", "2024", PeriodMode::Monthly), "MARZO 2024");
        assert_eq!(period_label("06", "2024", PeriodMode::Semiannual), "1er SEMESTRE 2024");
        assert_eq!(period_label("12", "2024", PeriodMode::Semiannual), "2do SEMESTRE 2024");
        assert_eq!(period_label("03", "2024", PeriodMode::Semiannual), "MARZO 2024");
        assert_eq!(period_label("00", "2024", PeriodMode::Monthly), "DESCONOCIDO 2024");
    }
}
