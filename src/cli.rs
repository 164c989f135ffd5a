use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{breakdown::SCREEN_TOP_N, mapping::StandardField};

#[derive(Debug, Parser)]
#[command(author, version, about = "Summarize MIS exports into KPIs, breakdowns and reports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print data-quality notes, KPIs and top breakdowns for the filtered view
    Summary(SummaryArgs),
    /// Show which source column satisfied each standard field
    Columns(ColumnsArgs),
    /// List the values a categorical field can be filtered on
    Values(ValuesArgs),
    /// Preview the first rows of the filtered view in a formatted table
    Preview(PreviewArgs),
    /// Write the filtered view as CSV
    Export(ExportArgs),
    /// Build a PowerPoint (.pptx) report of the filtered view
    Report(ReportArgs),
    /// Print, create or check a column mapping file
    Mapping(MappingArgs),
}

/// Input, mapping and filter options shared by every data command.
#[derive(Debug, Clone, Default, Args)]
pub struct DataArgs {
    /// MIS export to read (CSV/TSV or xlsx/xlsm/xlsb/xls/ods; '-' for stdin). Uses the bundled sample when omitted
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,
    /// Column mapping JSON file (defaults to the built-in synonyms)
    #[arg(short = 'm', long = "mapping")]
    pub mapping: Option<PathBuf>,
    /// CSV delimiter character (supports ',', 'tab', ';', '|')
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// First day of the date range (inclusive); needs --to
    #[arg(long = "from")]
    pub from: Option<String>,
    /// Last day of the date range (inclusive); needs --from
    #[arg(long = "to")]
    pub to: Option<String>,
    /// Keep only these segments (comma-separated, repeatable)
    #[arg(long = "segment", action = clap::ArgAction::Append)]
    pub segment: Vec<String>,
    /// Keep only these regions (comma-separated, repeatable)
    #[arg(long = "region", action = clap::ArgAction::Append)]
    pub region: Vec<String>,
    /// Keep only these channels (comma-separated, repeatable)
    #[arg(long = "channel", action = clap::ArgAction::Append)]
    pub channel: Vec<String>,
    /// Keep only these products (comma-separated, repeatable)
    #[arg(long = "product", action = clap::ArgAction::Append)]
    pub product: Vec<String>,
}

#[derive(Debug, Args)]
pub struct SummaryArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Rows per breakdown table
    #[arg(long, default_value_t = SCREEN_TOP_N)]
    pub top: usize,
    /// Emit the summary as JSON instead of tables
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ColumnsArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

#[derive(Debug, Args)]
pub struct ValuesArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Categorical field to list (segment, region, channel, product)
    #[arg(short = 'c', long = "column")]
    pub column: StandardField,
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Number of rows to display
    #[arg(long, default_value_t = 10)]
    pub rows: usize,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Output CSV file (stdout if omitted or '-')
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,
    /// Delimiter to use for output (defaults by output extension)
    #[arg(long = "output-delimiter", value_parser = parse_delimiter)]
    pub output_delimiter: Option<u8>,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    #[command(flatten)]
    pub data: DataArgs,
    /// Destination .pptx file
    #[arg(short = 'o', long = "output")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct MappingArgs {
    #[command(subcommand)]
    pub action: MappingAction,
}

#[derive(Debug, Subcommand)]
pub enum MappingAction {
    /// Print a mapping as JSON (the built-in one unless --mapping is given)
    Show {
        #[arg(short = 'm', long = "mapping")]
        mapping: Option<PathBuf>,
    },
    /// Write the built-in mapping to a file for editing
    Init {
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Validate a mapping file, optionally against an input's headers
    Check {
        path: PathBuf,
        /// Input whose columns the mapping is tried against
        #[arg(short = 'i', long = "input")]
        input: Option<PathBuf>,
    },
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}
