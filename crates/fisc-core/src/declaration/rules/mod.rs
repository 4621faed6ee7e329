//! Rule-based extractors for declaration text.

pub mod amounts;
pub mod fields;
pub mod metadata;
pub mod patterns;

pub use amounts::{checked_sum, format_amount, normalize_amount, parse_plain_decimal, round_total, SeparatorStyle};
pub use fields::{extract_fields, FieldScanner, FieldToken};
pub use metadata::{
    extract_metadata, DeclarationKindExtractor, DeclarationMetadata, LegalNameExtractor,
    PeriodExtractor, TaxpayerIdExtractor,
};

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the first occurrence from text.
    fn extract(&self, text: &str) -> Option<Self::Output> {
        self.extract_all(text).into_iter().next()
    }

    /// Extract all occurrences.
    fn extract_all(&self, text: &str) -> Vec<Self::Output>;
}

/// A value located in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionMatch<T> {
    /// Extracted value.
    pub value: T,
    /// Byte range in source text.
    pub position: Option<(usize, usize)>,
    /// Source text that was matched.
    pub source: String,
}

impl<T> ExtractionMatch<T> {
    pub fn new(value: T, source: impl Into<String>) -> Self {
        Self {
            value,
            position: None,
            source: source.into(),
        }
    }

    pub fn with_position(mut self, start: usize, end: usize) -> Self {
        self.position = Some((start, end));
        self
    }
}
