//! Structured annex (ATS) documents: per-period purchase and withholding
//! summaries, and their consolidation across periods.

mod consolidate;
mod parser;
mod summary;

pub use consolidate::{consolidate, ConsolidationKey};
pub use parser::{parse_document, parse_document_with};
pub use summary::{
    IncomeWithholdingSummary, IncomeWithholdingTotals, PurchaseSummary, PurchaseTotals,
    StructuredPeriodSummary, SummaryTotals, VatBucket, VatWithholdingBuckets,
    VatWithholdingSummary, CREDIT_NOTE_CODE,
};

pub use crate::models::schema::Catalog;

use tracing::info;

use crate::batch::{BatchOutcome, FailureReason, SourceDocument};
use crate::models::period::PeriodMode;

/// Summarize one document of a batch; a parse error becomes its failure reason.
pub fn summarize_document(
    document: &SourceDocument,
    mode: PeriodMode,
    catalog: &Catalog,
) -> Result<StructuredPeriodSummary, FailureReason> {
    parse_document_with(&document.name, &document.content, mode, catalog).map_err(FailureReason::from)
}

/// Parse every document of a batch, ordered by year, month and source name.
pub fn extract_batch(
    documents: &[SourceDocument],
    mode: PeriodMode,
    catalog: &Catalog,
) -> BatchOutcome<StructuredPeriodSummary> {
    let mut outcome = BatchOutcome::from_results(
        documents
            .iter()
            .map(|doc| (doc.name.clone(), summarize_document(doc, mode, catalog))),
    );

    sort_by_period(&mut outcome.items);

    info!(
        "Parsed {} of {} structured documents",
        outcome.items.len(),
        outcome.submitted
    );

    outcome
}

/// Order summaries by year, month and source name.
pub fn sort_by_period(summaries: &mut [StructuredPeriodSummary]) {
    summaries.sort_by(|a, b| {
        a.sort_key()
            .cmp(&b.sort_key())
            .then_with(|| a.source_name.cmp(&b.source_name))
    });
}
