//! Error types for the fisc-core library.

use thiserror::Error;

use crate::batch::DocumentFailure;

/// Main error type for the fisc library.
#[derive(Error, Debug)]
pub enum FiscError {
    /// Declaration text extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Structured (ATS) document error.
    #[error("structured document error: {0}")]
    Structured(#[from] StructuredError),

    /// Batch consolidation error.
    #[error("consolidation error: {0}")]
    Consolidation(#[from] ConsolidationError),

    /// Schema or catalog loading error.
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning declaration text into a period record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// No period label (month or semester plus year) was found.
    #[error("could not determine the declaration period")]
    MissingPeriod,

    /// Neither field values nor a taxpayer id could be extracted.
    #[error("no declaration data found")]
    NoData,
}

/// Errors raised while parsing a structured (ATS) document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StructuredError {
    /// The required `iva` root element is missing.
    #[error("missing root element '{0}'")]
    MissingRoot(&'static str),

    /// The markup itself is malformed.
    #[error("malformed XML: {0}")]
    Xml(String),

    /// A running total left the representable decimal range.
    #[error("amount totals exceed the supported decimal range")]
    Overflow,
}

/// Batch-level conditions where nothing can be consolidated.
#[derive(Error, Debug)]
pub enum ConsolidationError {
    /// The batch was empty.
    #[error("no documents were submitted")]
    NoDocuments,

    /// Documents were submitted but none produced a usable record.
    #[error("no usable data in {} submitted document(s)", failures.len())]
    NoUsableData { failures: Vec<DocumentFailure> },

    /// A consolidated total left the representable decimal range.
    #[error("total of {0} exceeds the supported decimal range")]
    Overflow(String),
}

/// Errors related to schema and catalog tables.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// The table could not be deserialized.
    #[error("failed to parse schema: {0}")]
    Parse(String),

    /// A field code is declared twice with different meanings.
    #[error("field code {code} is declared with conflicting descriptions")]
    DuplicateCode { code: String },
}

/// Result type for the fisc library.
pub type Result<T> = std::result::Result<T, FiscError>;
