//! csv-sleuth CLI - structural inference for delimited text files

use clap::Parser;
use csv_sleuth::{
    CodePage, Delimiter, FormatDescriptor, LegacyFallback, Quote, RefreshReport, Refresher,
    ResolvedFormat, SampleLimits, empty_columns,
};
use log::LevelFilter;
use serde_json::json;
use std::env;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Infer the layout of delimited text files.
///
/// Reports encoding, line breaks, delimiter, qualifier and escape
/// convention, preamble rows, header presence and column names.
#[derive(Parser, Debug)]
#[command(name = "csv-sleuth")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input file(s) to inspect
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Maximum number of lines to sample
    #[arg(short = 'n', long, default_value = "300")]
    max_lines: usize,

    /// Maximum number of bytes to sample
    #[arg(short = 'b', long, default_value = "65536")]
    max_bytes: usize,

    /// Pin the delimiter (single character, or TAB)
    #[arg(short = 'd', long)]
    delimiter: Option<Delimiter>,

    /// Pin the qualifier (single character, or 'none')
    #[arg(short = 'q', long)]
    quote: Option<String>,

    /// Pin the number of preamble rows to skip
    #[arg(short = 's', long)]
    skip_rows: Option<usize>,

    /// Treat the first tabular row as a header
    #[arg(long, conflicts_with = "no_header")]
    header: bool,

    /// Treat the first tabular row as data
    #[arg(long)]
    no_header: bool,

    /// Pin the encoding by code page number (e.g. 65001, 1252, 1200)
    #[arg(short = 'e', long)]
    code_page: Option<u32>,

    /// Guess legacy encodings statistically instead of assuming code page 1252
    #[arg(long)]
    detect_encoding: bool,

    /// Output format: text (default), json, or csv
    #[arg(short = 'f', long, default_value = "text")]
    format: OutputFormat,

    /// Show column names, stage outcomes and info-level logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Only output the detected delimiter
    #[arg(long)]
    delimiter_only: bool,

    /// Also list header columns that are blank in every sampled row
    #[arg(long)]
    empty_columns: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

/// Everything printed for one file.
struct Inspection {
    descriptor: FormatDescriptor,
    report: RefreshReport,
    empty: Option<Vec<String>>,
}

fn init_logging(verbose: bool) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
    if env::var("RUST_LOG").is_err() {
        let level = if verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Warn
        };
        builder.filter_module("csv_sleuth", level);
    }
    let _ = builder.format_timestamp_millis().try_init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut exit_code = ExitCode::SUCCESS;
    let mut csv_header_printed = false;

    for file in &args.files {
        match inspect_file(file, &args) {
            Ok(inspection) => {
                if args.delimiter_only {
                    println!("{}", inspection.descriptor.resolved().delimiter);
                    continue;
                }
                match args.format {
                    OutputFormat::Text => print_text_output(file, &inspection, args.verbose),
                    OutputFormat::Json => print_json_output(file, &inspection, args.verbose),
                    OutputFormat::Csv => {
                        if let Err(e) = print_csv_output(file, &inspection, !csv_header_printed) {
                            eprintln!("Error writing {}: {}", file.display(), e);
                            exit_code = ExitCode::FAILURE;
                        }
                        csv_header_printed = true;
                    }
                }
            }
            Err(e) => {
                eprintln!("Error processing {}: {}", file.display(), e);
                exit_code = ExitCode::FAILURE;
            }
        }
    }

    exit_code
}

fn parse_quote(raw: &str) -> Result<Quote, String> {
    if raw.eq_ignore_ascii_case("none") {
        return Ok(Quote::None);
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Quote::Some(c)),
        _ => Err(format!("quote must be a single character or 'none', got {raw:?}")),
    }
}

fn inspect_file(path: &Path, args: &Args) -> Result<Inspection, Box<dyn std::error::Error>> {
    let limits = SampleLimits {
        max_lines: args.max_lines,
        max_bytes: args.max_bytes,
    };

    let mut refresher = Refresher::new();
    refresher.sample_limits(limits);
    if args.detect_encoding {
        refresher.legacy_fallback(LegacyFallback::Detect);
    }

    let mut descriptor = FormatDescriptor::new();
    descriptor.delimiter = args.delimiter;
    descriptor.skip_rows = args.skip_rows;
    descriptor.code_page = args.code_page.map(CodePage);
    if let Some(ref raw) = args.quote {
        descriptor.qualifier = Some(parse_quote(raw)?);
    }
    if args.header {
        descriptor.has_header = Some(true);
    } else if args.no_header {
        descriptor.has_header = Some(false);
    }

    let report = refresher.refresh_path(path, &mut descriptor)?;

    let empty = if args.empty_columns {
        let mut reader = BufReader::new(File::open(path)?);
        Some(empty_columns(&mut reader, &descriptor.resolved(), &limits)?)
    } else {
        None
    };

    Ok(Inspection {
        descriptor,
        report,
        empty,
    })
}

fn column_names(descriptor: &FormatDescriptor) -> Vec<String> {
    descriptor
        .columns
        .as_ref()
        .map(|c| c.names().map(str::to_string).collect())
        .unwrap_or_default()
}

fn print_text_output(path: &Path, inspection: &Inspection, verbose: bool) {
    let format: ResolvedFormat = inspection.descriptor.resolved();
    let columns = column_names(&inspection.descriptor);

    println!("File: {}", path.display());
    println!("  Encoding: {}", format.code_page);
    println!("  Newline: {}", format.newline);
    println!("  Delimiter: {}", format.delimiter);
    println!("  Qualifier: {}", format.qualifier);
    println!("  Escape: {}", format.escape);
    println!("  Preamble rows: {}", format.skip_rows);
    println!("  Has header: {}", format.has_header);
    println!("  Columns: {}", columns.len());
    if inspection.report.not_delimited {
        println!("  Not delimited: true");
    }
    if let Some(ref empty) = inspection.empty {
        println!("  Empty columns: {}", empty.join(", "));
    }

    if verbose {
        println!("  Column names:");
        for (i, name) in columns.iter().enumerate() {
            println!("    {}: {}", i + 1, name);
        }
        println!("  Stages:");
        for stage in &inspection.report.stages {
            println!("    {}: {:?}", stage.stage, stage.outcome);
        }
        for rejected in &inspection.report.rejected {
            println!("  Ignored override: {rejected}");
        }
    }

    println!();
}

fn print_json_output(path: &Path, inspection: &Inspection, verbose: bool) {
    let format = inspection.descriptor.resolved();
    let mut value = json!({
        "file": path.display().to_string(),
        "code_page": format.code_page,
        "encoding": format.code_page.name(),
        "newline": format.newline.name(),
        "delimiter": format.delimiter,
        "qualifier": format.qualifier.char(),
        "escape": format.escape.to_string(),
        "skip_rows": format.skip_rows,
        "has_header": format.has_header,
        "columns": column_names(&inspection.descriptor),
        "not_delimited": inspection.report.not_delimited,
    });

    if let Some(ref empty) = inspection.empty {
        value["empty_columns"] = json!(empty);
    }
    if verbose {
        value["state"] = json!(inspection.report.state);
        value["stages"] = json!(inspection.report.stages);
        value["ignored_overrides"] = json!(
            inspection
                .report
                .rejected
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
        );
    }

    println!("{value}");
}

fn print_csv_output(path: &Path, inspection: &Inspection, with_header: bool) -> csv::Result<()> {
    let format = inspection.descriptor.resolved();
    let mut writer = csv::Writer::from_writer(io::stdout().lock());
    if with_header {
        writer.write_record([
            "file",
            "code_page",
            "newline",
            "delimiter",
            "qualifier",
            "skip_rows",
            "has_header",
            "num_columns",
            "not_delimited",
        ])?;
    }

    writer.write_record([
        path.display().to_string(),
        format.code_page.0.to_string(),
        format.newline.name().to_string(),
        format.delimiter.to_string(),
        format.qualifier.to_string(),
        format.skip_rows.to_string(),
        format.has_header.to_string(),
        column_names(&inspection.descriptor).len().to_string(),
        inspection.report.not_delimited.to_string(),
    ])?;
    writer.flush()?;
    Ok(())
}
