//! Declaration command - extract fields from a single declaration.

use std::fs;
use std::path::PathBuf;

use clap::Args;
use tracing::info;

use fisc_core::declaration::rules::format_amount;
use fisc_core::models::record::compare_codes;
use fisc_core::{Declaration, RuleBasedParser};

use super::{emit, OutputFormat};

/// Arguments for the declaration command.
#[derive(Args)]
pub struct DeclarationArgs {
    /// Linearized declaration text file
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,
}

pub async fn run(args: DeclarationArgs, _config_path: Option<&str>) -> anyhow::Result<()> {
    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let bytes = fs::read(&args.input)?;
    let text = String::from_utf8_lossy(&bytes);

    let declaration = RuleBasedParser::new().parse_single(&text)?;

    let output = match args.format {
        OutputFormat::Json => serde_json::to_string_pretty(&declaration)?,
        OutputFormat::Csv => format_declaration_csv(&declaration)?,
        OutputFormat::Text => format_declaration_text(&declaration),
    };

    emit(args.output.as_deref(), &output)
}

fn sorted_fields(declaration: &Declaration) -> Vec<(&String, &rust_decimal::Decimal)> {
    let mut fields: Vec<_> = declaration.fields.iter().collect();
    fields.sort_by(|a, b| compare_codes(a.0, b.0));
    fields
}

fn format_declaration_csv(declaration: &Declaration) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["code", "value"])?;
    for (code, value) in sorted_fields(declaration) {
        wtr.write_record([code.as_str(), &value.to_string()])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_declaration_text(declaration: &Declaration) -> String {
    let mut output = String::new();

    let period = if declaration.period_label.is_empty() {
        "(sin período)"
    } else {
        declaration.period_label.as_str()
    };
    output.push_str(&format!("Período: {} ({})\n", period, declaration.kind.keyword()));
    if let Some(id) = &declaration.taxpayer_id {
        output.push_str(&format!("RUC: {}\n", id));
    }
    if let Some(name) = &declaration.legal_name {
        output.push_str(&format!("Razón social: {}\n", name));
    }
    output.push('\n');

    for (code, value) in sorted_fields(declaration) {
        output.push_str(&format!("  {:>4}  {:>16}\n", code, format_amount(*value)));
    }

    output
}
