//! Declaration text extraction module.

mod parser;
pub mod rules;

pub use parser::RuleBasedParser;

use crate::error::ExtractionError;
use crate::models::record::{Declaration, PeriodRecord};

/// Result type for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

/// Trait for declaration extractors.
pub trait DeclarationExtractor {
    /// Extract fields and metadata from linearized declaration text.
    fn extract(&self, text: &str) -> Declaration;

    /// Extract a declaration and bind it to its period.
    fn build_record(&self, source_name: &str, text: &str) -> Result<PeriodRecord>;
}
