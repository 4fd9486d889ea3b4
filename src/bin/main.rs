use anyhow::{bail, Context, Result};
use clap::Parser;
use dicom_audit::actions::HashLength;
use dicom_audit::config::{Config, ConfigBuilder, EquipmentCapture};
use dicom_audit::flatten::{flatten, render_line, FlattenOptions};
use dicom_audit::log_sink::FileLogSink;
use dicom_audit::pipeline::Pipeline;
use dicom_object::open_file;
use env_logger::Builder;
use log::{info, Level, LevelFilter};
use std::io::Write;
use std::path::PathBuf;

const LOG_FILE_NAME: &str = "logfile.txt";

/// Audit and anonymize DICOM metadata
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Input directory, searched recursively for .dcm files, or a single file to print
    #[arg(short, long, value_name = "INPUT_PATH")]
    input: PathBuf,

    /// Output directory for metadata exports, anonymized copies and reports
    #[arg(short, long, value_name = "OUTPUT_PATH")]
    output: Option<PathBuf>,

    /// JSON configuration file; command line flags take precedence
    #[arg(short, long, value_name = "CONFIG_FILE", env = "DCMAUDIT_CONFIG")]
    config: Option<PathBuf>,

    /// Write anonymized copies of the input files
    #[arg(short, long)]
    anonymize: bool,

    /// Leave private tags out of the metadata export
    #[arg(long)]
    no_private: bool,

    /// Keep private tags in the anonymized copies
    #[arg(long)]
    keep_private_tags: bool,

    /// Render the pixel data value in the metadata export
    #[arg(long)]
    include_pixel_data: bool,

    /// Truncate exported values after this many characters
    #[arg(long, value_name = "LENGTH")]
    max_value_length: Option<usize>,

    /// Length of the generated pseudo-identifiers (minimum 8)
    #[arg(long, value_name = "LENGTH")]
    pseudonym_length: Option<usize>,

    /// Report placeholders instead of the recorded equipment manufacturer and institution
    #[arg(long)]
    write_only_equipment: bool,

    /// Process one file at a time
    #[arg(long)]
    sequential: bool,

    /// Show more verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(args: &Args) -> Result<Config> {
    let base = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut config_builder = ConfigBuilder::from_config(base);

    if args.anonymize {
        config_builder = config_builder.anonymize(true);
    }
    if args.no_private {
        config_builder = config_builder.include_private(false);
    }
    if args.keep_private_tags {
        config_builder = config_builder.remove_private_tags(false);
    }
    if args.include_pixel_data {
        config_builder = config_builder.include_pixel_data(true);
    }
    if let Some(length) = args.max_value_length {
        config_builder = config_builder.max_value_length(length);
    }
    if let Some(length) = args.pseudonym_length {
        match HashLength::new(length) {
            Ok(length) => config_builder = config_builder.pseudonym_length(length),
            Err(e) => bail!(e),
        }
    }
    if args.write_only_equipment {
        config_builder = config_builder.equipment_capture(EquipmentCapture::WriteOnly);
    }

    Ok(config_builder.build()?)
}

fn print_file(input_path: &PathBuf, options: &FlattenOptions) -> Result<()> {
    let obj = open_file(input_path)
        .with_context(|| format!("failed to open {}", input_path.display()))?;
    let mut stdout = std::io::stdout().lock();
    for record in flatten(&obj, options) {
        writeln!(stdout, "{}", render_line(&record))?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Error
    };

    let mut builder = Builder::from_default_env();
    builder
        .format(|buf, record| {
            let level = match record.level() {
                Level::Error => "Error",
                Level::Warn => "Warning",
                Level::Info => "Info",
                Level::Debug => "Debug",
                Level::Trace => "Trace",
            };
            writeln!(buf, "{}: {}", level, record.args())
        })
        .filter(None, log_level);
    builder.init();

    let config = build_config(&args)?;

    // Input is a single file: print its flattened metadata
    if args.input.is_file() {
        return print_file(&args.input, &FlattenOptions::from(&config));
    }

    if !args.input.is_dir() {
        bail!("Input should either be a file or a directory");
    }

    let Some(output_path) = args.output else {
        bail!("an output directory is required when the input is a directory");
    };
    std::fs::create_dir_all(&output_path)
        .with_context(|| format!("failed to create {}", output_path.display()))?;

    let log_path = output_path.join(LOG_FILE_NAME);
    let sink = FileLogSink::create(&log_path)
        .with_context(|| format!("failed to create {}", log_path.display()))?;

    let pipeline = Pipeline::new(config).sequential(args.sequential);
    let report = pipeline.run(&args.input, &output_path, &sink)?;
    report
        .write(&output_path)
        .with_context(|| format!("failed to write reports to {}", output_path.display()))?;

    info!(
        "processed {} file(s), {} failed, {} series of {} patient(s)",
        report.files_found,
        report.files_failed,
        report.series.series.len(),
        report.series.patient_count
    );

    Ok(())
}
