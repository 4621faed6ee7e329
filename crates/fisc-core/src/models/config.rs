//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::FiscError;

use super::period::PeriodMode;

/// Main configuration for the fisc pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FiscConfig {
    /// Declaration and structured-document extraction.
    pub extraction: ExtractionConfig,

    /// Schema and catalog tables.
    pub schema: SchemaConfig,

    /// Batch processing.
    pub batch: BatchConfig,
}

/// Extraction configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Label structured documents per month or per semester.
    pub period_mode: PeriodMode,

    /// Warn when a withholding declaration has fewer recognised codes than this.
    pub min_withholding_fields: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            period_mode: PeriodMode::Monthly,
            min_withholding_fields: 5,
        }
    }
}

/// Paths to the read-only layout tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// VAT declaration form layout (JSON).
    pub form_schema: Option<PathBuf>,

    /// Withholding declaration form layout (JSON).
    pub withholding_schema: Option<PathBuf>,

    /// Document type and retention code labels (JSON).
    pub catalog: Option<PathBuf>,
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Number of documents extracted concurrently.
    pub jobs: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { jobs: 4 }
    }
}

impl FiscConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| FiscError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> crate::Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| FiscError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
