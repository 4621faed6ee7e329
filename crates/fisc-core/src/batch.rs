//! Batch inputs, per-document failures and partial outcomes.
//!
//! A batch is every document submitted together. Each document is extracted
//! on its own; a failure is recorded next to the successes and never stops
//! the rest of the batch.

use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::warn;

use crate::declaration::DeclarationExtractor;
use crate::error::{ConsolidationError, ExtractionError, StructuredError};
use crate::models::record::PeriodRecord;

/// One named input document.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    /// Identifier reported back in failures (usually the file name).
    pub name: String,
    /// Linearized text or raw markup.
    pub content: String,
}

impl SourceDocument {
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }
}

/// Why a document was left out of the batch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Structured(#[from] StructuredError),

    /// The document could not be read from its source.
    #[error("unreadable document: {0}")]
    Unreadable(String),
}

/// A document that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentFailure {
    pub document: String,
    #[serde(serialize_with = "serialize_display")]
    pub reason: FailureReason,
}

impl DocumentFailure {
    pub fn new(document: impl Into<String>, reason: impl Into<FailureReason>) -> Self {
        Self {
            document: document.into(),
            reason: reason.into(),
        }
    }
}

fn serialize_display<S: Serializer>(reason: &FailureReason, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(reason)
}

/// Successes and failures of one batch, in submission order.
#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome<T> {
    pub items: Vec<T>,
    pub failures: Vec<DocumentFailure>,
    pub submitted: usize,
}

impl<T> BatchOutcome<T> {
    /// Split per-document results into successes and failures.
    pub fn from_results<I>(results: I) -> Self
    where
        I: IntoIterator<Item = (String, Result<T, FailureReason>)>,
    {
        let mut outcome = Self {
            items: Vec::new(),
            failures: Vec::new(),
            submitted: 0,
        };

        for (name, result) in results {
            outcome.submitted += 1;
            match result {
                Ok(item) => outcome.items.push(item),
                Err(reason) => {
                    warn!("Failed to process {}: {}", name, reason);
                    outcome.failures.push(DocumentFailure::new(name, reason));
                }
            }
        }

        outcome
    }

    /// Reject batches that produced nothing usable.
    pub fn into_usable(self) -> Result<Self, ConsolidationError> {
        if self.submitted == 0 {
            return Err(ConsolidationError::NoDocuments);
        }
        if self.items.is_empty() {
            return Err(ConsolidationError::NoUsableData {
                failures: self.failures,
            });
        }
        Ok(self)
    }
}

/// Extract the period record of one declaration of a batch.
pub fn extract_record<E: DeclarationExtractor>(
    extractor: &E,
    document: &SourceDocument,
) -> Result<PeriodRecord, FailureReason> {
    extractor
        .build_record(&document.name, &document.content)
        .map_err(FailureReason::from)
}

/// Extract period records from every declaration in the batch.
pub fn extract_records<E: DeclarationExtractor>(
    extractor: &E,
    documents: &[SourceDocument],
) -> BatchOutcome<PeriodRecord> {
    BatchOutcome::from_results(
        documents
            .iter()
            .map(|doc| (doc.name.clone(), extract_record(extractor, doc))),
    )
}
