//! Core library for fiscal declaration extraction.
//!
//! This crate provides:
//! - Field and metadata extraction from linearized declaration text
//! - Multi-period aggregation into an annual report
//! - Form layout projection of consolidated totals
//! - Structured annex (ATS) parsing and consolidation

pub mod aggregate;
pub mod ats;
pub mod batch;
pub mod declaration;
pub mod error;
pub mod models;

pub use aggregate::{aggregate_periods, AnnualReport};
pub use batch::{extract_record, extract_records, BatchOutcome, DocumentFailure, FailureReason, SourceDocument};
pub use declaration::{DeclarationExtractor, RuleBasedParser};
pub use error::{FiscError, Result};
pub use models::config::FiscConfig;
pub use models::period::{DeclarationKind, PeriodKey, PeriodMode, Semester};
pub use models::record::{Declaration, FieldMap, PeriodRecord};
pub use models::schema::{Catalog, FormSchema, WithholdingSchema};
