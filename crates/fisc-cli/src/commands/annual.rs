//! Annual command - consolidate a batch of declarations.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, ValueEnum};
use console::style;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::warn;

use fisc_core::aggregate::{
    schema_coverage, section_table, withholding_table, ReportLine, WithholdingLine,
};
use fisc_core::declaration::rules::format_amount;
use fisc_core::error::ConsolidationError;
use fisc_core::models::record::compare_codes;
use fisc_core::{
    aggregate_periods, extract_record, AnnualReport, FormSchema, RuleBasedParser,
    WithholdingSchema,
};

use super::loader::{expand_inputs, extract_parallel};
use super::{config, emit, OutputFormat};

/// Arguments for the annual command.
#[derive(Args)]
pub struct AnnualArgs {
    /// Declaration text files or glob pattern
    #[arg(required = true)]
    input: String,

    /// Which declaration form the files are
    #[arg(long, value_enum, default_value = "vat")]
    form: FormKind,

    /// VAT form layout (JSON, default: built-in form 104)
    #[arg(long)]
    schema: Option<PathBuf>,

    /// Withholding form layout (JSON, default: built-in form 103)
    #[arg(long)]
    withholding_schema: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Number of parallel workers
    #[arg(short = 'j', long)]
    jobs: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum FormKind {
    /// Monthly VAT declarations (form 104)
    Vat,
    /// Income-tax withholding declarations (form 103)
    Withholding,
}

#[derive(Serialize)]
struct SectionOutput<'a> {
    title: &'a str,
    range: &'a str,
    lines: Vec<ReportLine>,
}

#[derive(Serialize)]
struct AnnualOutput<'a> {
    #[serde(flatten)]
    report: &'a AnnualReport,
    sections: Vec<SectionOutput<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    withholdings: Option<Vec<WithholdingLine>>,
}

pub async fn run(args: AnnualArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = config::load(config_path)?;

    // A configured layout always wins; otherwise the declared form gets its built-in one.
    let form_schema = match args.schema.or(config.schema.form_schema) {
        Some(path) => Some(FormSchema::from_file(&path)?),
        None if args.form == FormKind::Vat => Some(FormSchema::vat_form()?),
        None => None,
    };
    let withholding_schema = match args.withholding_schema.or(config.schema.withholding_schema) {
        Some(path) => Some(WithholdingSchema::from_file(&path)?),
        None if args.form == FormKind::Withholding => Some(WithholdingSchema::withholding_form()?),
        None => None,
    };

    let files = expand_inputs(&args.input, &["txt"])?;
    eprintln!(
        "{} Found {} declarations to process",
        style("ℹ").blue(),
        files.len()
    );

    let parser = RuleBasedParser::new();
    let outcome = extract_parallel(files, args.jobs.unwrap_or(config.batch.jobs), move |doc| {
        extract_record(&parser, &doc)
    })
    .await?;

    let report = match aggregate_periods(outcome) {
        Ok(report) => report,
        Err(ConsolidationError::NoUsableData { failures }) => {
            for failure in &failures {
                eprintln!("  - {}: {}", failure.document, failure.reason);
            }
            anyhow::bail!("No usable data in {} declaration(s)", failures.len());
        }
        Err(e) => return Err(e.into()),
    };

    if let Some(schema) = &withholding_schema {
        for record in report.records() {
            let found = schema_coverage(record, schema);
            if found < config.extraction.min_withholding_fields {
                warn!(
                    "{} has only {} withholding codes; it may not be a withholding declaration",
                    record.source_name(),
                    found
                );
            }
        }
    }

    let sections: Vec<SectionOutput> = form_schema
        .iter()
        .flat_map(|schema| schema.sections.iter())
        .map(|section| SectionOutput {
            title: &section.title,
            range: &section.range,
            lines: section_table(&report, section),
        })
        .collect();
    let withholdings = withholding_schema
        .as_ref()
        .map(|schema| withholding_table(&report, schema));

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&AnnualOutput {
            report: &report,
            sections,
            withholdings,
        })?,
        OutputFormat::Csv => format_report_csv(&report)?,
        OutputFormat::Text => format_report_text(&report, &sections, withholdings.as_deref()),
    };

    emit(args.output.as_deref(), &output)?;

    eprintln!(
        "{} Consolidated {} declarations over {} periods in {:?}",
        style("✓").green(),
        report.records().len(),
        report.periods().len(),
        start.elapsed()
    );
    if !report.failures().is_empty() {
        eprintln!("{}", style("Failed files:").red());
        for failure in report.failures() {
            eprintln!("  - {}: {}", failure.document, failure.reason);
        }
    }

    Ok(())
}

fn sorted_codes(report: &AnnualReport) -> Vec<&String> {
    let mut codes: Vec<&String> = report.totals().keys().collect();
    codes.sort_by(|a, b| compare_codes(a, b));
    codes
}

fn period_value(report: &AnnualReport, index: usize, code: &str) -> Decimal {
    report
        .period_values(report.periods()[index])
        .and_then(|fields| fields.get(code))
        .copied()
        .unwrap_or(Decimal::ZERO)
}

fn format_report_csv(report: &AnnualReport) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec!["code".to_string()];
    header.extend(report.periods().iter().map(|p| p.label()));
    header.push("total".to_string());
    wtr.write_record(&header)?;

    for code in sorted_codes(report) {
        let mut row = vec![code.clone()];
        row.extend((0..report.periods().len()).map(|i| period_value(report, i, code).to_string()));
        row.push(report.total(code).to_string());
        wtr.write_record(&row)?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut short: String = text.chars().take(width - 1).collect();
    short.push('…');
    short
}

fn format_report_text(
    report: &AnnualReport,
    sections: &[SectionOutput],
    withholdings: Option<&[WithholdingLine]>,
) -> String {
    let mut output = String::new();

    if let Some(year) = report.year() {
        output.push_str(&format!("Ejercicio fiscal: {}\n", year));
    }
    if let Some(id) = report.taxpayer_id() {
        output.push_str(&format!("RUC: {}\n", id));
    }
    if let Some(name) = report.legal_name() {
        output.push_str(&format!("Razón social: {}\n", name));
    }
    let labels: Vec<String> = report.periods().iter().map(|p| p.label()).collect();
    output.push_str(&format!("Períodos: {}\n", labels.join(", ")));

    let columns: String = report
        .periods()
        .iter()
        .map(|p| format!(" {:>12}", p.short_label()))
        .collect();

    let populated: Vec<&SectionOutput> = sections.iter().filter(|s| !s.lines.is_empty()).collect();
    if populated.is_empty() {
        output.push_str("\nTotales:\n");
        for code in sorted_codes(report) {
            output.push_str(&format!("  {:>4}  {:>16}\n", code, format_amount(report.total(code))));
        }
    }

    for section in populated {
        output.push_str(&format!("\n{} ({})\n", section.title, section.range));
        output.push_str(&format!("  {:<40} {:>5}{} {:>14}\n", "", "", columns, "TOTAL"));
        for line in &section.lines {
            let values: String = line
                .values
                .iter()
                .map(|v| format!(" {:>12}", format_amount(*v)))
                .collect();
            output.push_str(&format!(
                "  {:<40} {:>5}{} {:>14}\n",
                truncate(&line.description, 40),
                line.code,
                values,
                format_amount(line.total)
            ));
        }
    }

    if let Some(lines) = withholdings.filter(|l| !l.is_empty()) {
        output.push_str("\nRetenciones en la fuente\n");
        for line in lines {
            output.push_str(&format!(
                "  {:<40} {:>5} {:>14} {:>5} {:>14}\n",
                truncate(&line.description, 40),
                line.base_code.as_deref().unwrap_or("-"),
                format_amount(line.base_total),
                line.retained_code.as_deref().unwrap_or("-"),
                format_amount(line.retained_total)
            ));
        }
    }

    output
}
