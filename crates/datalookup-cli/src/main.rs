//! Datalookup CLI
//!
//! Loads a JSON document and prints the records matching the given lookups.
//!
//! Usage:
//!   datalookup --file books.json --filter books__genre__iexact=fantasy [OPTIONS]

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use datalookup::{FilterValue, Filters, RecordSet};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Query nested JSON records with Django-style lookups
#[derive(Parser, Debug)]
#[command(name = "datalookup")]
#[command(author, version, about = "Filter JSON records with field__lookup=value expressions")]
struct Args {
    /// JSON file holding an object or a list of objects
    #[arg(short, long)]
    file: PathBuf,

    /// Keep records matching KEY=VALUE (repeatable)
    #[arg(long = "filter", value_name = "KEY=VALUE", value_parser = parse_pair)]
    filters: Vec<(String, Value)>,

    /// Drop records matching KEY=VALUE (repeatable)
    #[arg(long = "exclude", value_name = "KEY=VALUE", value_parser = parse_pair)]
    excludes: Vec<(String, Value)>,

    /// Query the records reachable through a dotted path instead (e.g. batters.batter)
    #[arg(short, long)]
    related: Option<String>,

    /// Remove structurally equal duplicates from the result
    #[arg(short, long)]
    distinct: bool,

    /// Narrow related collections to their matching records
    #[arg(short, long)]
    cascade: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    output: OutputFormat,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

/// Split `KEY=VALUE`. The value is read as JSON when it parses, else as a string.
fn parse_pair(input: &str) -> std::result::Result<(String, Value), String> {
    let (key, raw) = input
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{input}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{input}'"));
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

fn to_filters(pairs: &[(String, Value)]) -> Filters {
    pairs
        .iter()
        .map(|(key, value)| (key.clone(), FilterValue::from(value.clone())))
        .collect()
}

fn run(args: &Args) -> Result<RecordSet> {
    let mut records = RecordSet::from_json_file(&args.file)
        .with_context(|| format!("Failed to load {}", args.file.display()))?;
    debug!("Loaded {} records from {}", records.len(), args.file.display());

    if args.cascade {
        records.on_cascade();
    }
    if let Some(path) = &args.related {
        records = records
            .related_records(path)
            .with_context(|| format!("Failed to follow related path '{path}'"))?;
    }

    let mut result = records.filter_by(&to_filters(&args.filters))?;
    if !args.excludes.is_empty() {
        result = result.exclude_by(&to_filters(&args.excludes))?;
    }
    if args.distinct {
        result = result.distinct();
    }
    Ok(result)
}

fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let result = run(&args)?;
    match args.output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
        OutputFormat::Text => {
            println!("{result}");
            println!("{} record(s)", result.len());
        }
    }
    Ok(())
}
