//! ATS command - summarize and consolidate structured annex files.

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use console::style;
use serde::Serialize;

use fisc_core::ats::{
    consolidate, sort_by_period, summarize_document, ConsolidationKey, StructuredPeriodSummary,
};
use fisc_core::declaration::rules::format_amount;
use fisc_core::error::ConsolidationError;
use fisc_core::{Catalog, DocumentFailure, PeriodMode, Semester};

use super::loader::{expand_inputs, extract_parallel};
use super::{config, emit, OutputFormat};

/// Arguments for the ats command.
#[derive(Args)]
pub struct AtsArgs {
    /// ATS XML files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Label periods by semester instead of by month
    #[arg(long)]
    semiannual: bool,

    /// Document type and retention code labels (JSON)
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Which periods to consolidate
    #[arg(short, long, value_enum, default_value = "all")]
    group: Group,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format (json or text)
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Number of parallel workers
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Group {
    /// Every period
    All,
    /// January to June
    First,
    /// July to December
    Second,
}

impl From<Group> for ConsolidationKey {
    fn from(group: Group) -> Self {
        match group {
            Group::All => ConsolidationKey::All,
            Group::First => ConsolidationKey::Semester(Semester::First),
            Group::Second => ConsolidationKey::Semester(Semester::Second),
        }
    }
}

#[derive(Serialize)]
struct AtsOutput<'a> {
    summaries: &'a [StructuredPeriodSummary],
    consolidated: Option<StructuredPeriodSummary>,
    failures: &'a [DocumentFailure],
}

pub async fn run(args: AtsArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    if args.format == OutputFormat::Csv {
        anyhow::bail!("CSV output is not available for ATS summaries; use json or text");
    }

    let config = config::load(config_path)?;

    let mode = if args.semiannual {
        PeriodMode::Semiannual
    } else {
        config.extraction.period_mode
    };
    let catalog = match args.catalog.or(config.schema.catalog) {
        Some(path) => Catalog::from_file(&path)?,
        None => Catalog::default(),
    };

    let files = expand_inputs(&args.input, &["xml"])?;
    eprintln!(
        "{} Found {} ATS files to process",
        style("ℹ").blue(),
        files.len()
    );

    let mut outcome = extract_parallel(files, args.jobs.unwrap_or(config.batch.jobs), move |doc| {
        summarize_document(&doc, mode, &catalog)
    })
    .await?;

    sort_by_period(&mut outcome.items);

    let outcome = match outcome.into_usable() {
        Ok(outcome) => outcome,
        Err(ConsolidationError::NoUsableData { failures }) => {
            for failure in &failures {
                eprintln!("  - {}: {}", failure.document, failure.reason);
            }
            anyhow::bail!("No usable data in {} ATS file(s)", failures.len());
        }
        Err(e) => return Err(e.into()),
    };

    let consolidated = consolidate(&outcome.items, args.group.into())?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&AtsOutput {
            summaries: &outcome.items,
            consolidated,
            failures: &outcome.failures,
        })?,
        _ => format_ats_text(&outcome.items, consolidated.as_ref()),
    };

    emit(args.output.as_deref(), &output)?;

    eprintln!(
        "{} Summarized {} of {} ATS files",
        style("✓").green(),
        outcome.items.len(),
        outcome.submitted
    );
    if !outcome.failures.is_empty() {
        eprintln!("{}", style("Failed files:").red());
        for failure in &outcome.failures {
            eprintln!("  - {}: {}", failure.document, failure.reason);
        }
    }

    Ok(())
}

fn format_summary_text(output: &mut String, summary: &StructuredPeriodSummary) {
    output.push_str(&format!("\n== {} ==\n", summary.period_label));
    output.push_str(&format!("RUC: {}  {}\n", summary.taxpayer_id, summary.legal_name));

    if !summary.purchases.is_empty() {
        output.push_str("Compras:\n");
        for c in &summary.purchases {
            output.push_str(&format!(
                "  {:>3} {:<28} {:>5} {:>14} {:>14} {:>14} {:>14}\n",
                c.code,
                c.label,
                c.count,
                format_amount(c.base_zero_rate),
                format_amount(c.base_standard_rate),
                format_amount(c.base_non_subject),
                format_amount(c.vat_amount)
            ));
        }
        let t = &summary.totals.purchases;
        output.push_str(&format!(
            "  {:<38} {:>14} {:>14} {:>14} {:>14}\n",
            "TOTAL",
            format_amount(t.base_zero_rate),
            format_amount(t.base_standard_rate),
            format_amount(t.base_non_subject),
            format_amount(t.vat_amount)
        ));
    }

    if !summary.income_withholdings.is_empty() {
        output.push_str("Retenciones en la fuente:\n");
        for w in &summary.income_withholdings {
            output.push_str(&format!(
                "  {:>4} {:<27} {:>5} {:>14} {:>14}\n",
                w.code,
                w.label,
                w.count,
                format_amount(w.base),
                format_amount(w.retained)
            ));
        }
    }

    let buckets = summary.vat_buckets.project();
    if !buckets.is_empty() {
        output.push_str("Retenciones de IVA:\n");
        for b in &buckets {
            output.push_str(&format!("  {:<30} {:>14}\n", b.label, format_amount(b.retained)));
        }
        output.push_str(&format!(
            "  {:<30} {:>14}\n",
            "TOTAL",
            format_amount(summary.totals.vat_withheld)
        ));
    }
}

fn format_ats_text(
    summaries: &[StructuredPeriodSummary],
    consolidated: Option<&StructuredPeriodSummary>,
) -> String {
    let mut output = String::new();

    for summary in summaries {
        format_summary_text(&mut output, summary);
    }
    if let Some(summary) = consolidated {
        format_summary_text(&mut output, summary);
    }

    output
}
