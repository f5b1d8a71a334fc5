//! rspl CLI
//!
//! Run a pipeline query against a JSON file (or stdin) and print the
//! resulting records.

use std::io::Read;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rspl::{Dataset, Engine};

#[derive(Parser)]
#[command(name = "rspl", version, about = "Pipeline queries over JSON records")]
struct Cli {
    /// Input file containing a JSON object or array of objects; `-`
    /// reads stdin
    #[arg(short, long, default_value = "-")]
    input: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// The query to run, e.g. 'status="active" | stats count by city'
    query: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Table,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "rspl=warn".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let raw = if cli.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("reading stdin")?;
        buf
    } else {
        std::fs::read_to_string(&cli.input)
            .with_context(|| format!("reading {}", cli.input.display()))?
    };

    let json: serde_json::Value = serde_json::from_str(&raw).context("parsing input JSON")?;
    let engine = Engine::from_json(json)?;
    let results = engine.execute(&cli.query)?;

    match cli.format {
        Format::Json => println!("{}", serde_json::to_string_pretty(&results)?),
        Format::Table => print_table(&results),
    }

    Ok(())
}

/// Render records as an aligned text table. Columns are the union of
/// all fields in first-appearance order; missing cells are blank.
fn print_table(results: &Dataset) {
    if results.is_empty() {
        return;
    }

    let mut columns: Vec<String> = Vec::new();
    for record in results {
        for field in record.fields() {
            if !columns.contains(field) {
                columns.push(field.clone());
            }
        }
    }

    let mut widths: Vec<usize> = columns.iter().map(String::len).collect();
    let rows: Vec<Vec<String>> = results
        .iter()
        .map(|record| {
            columns
                .iter()
                .enumerate()
                .map(|(i, col)| {
                    let cell = record
                        .get(col)
                        .map(|v| v.to_string())
                        .unwrap_or_default();
                    widths[i] = widths[i].max(cell.len());
                    cell
                })
                .collect()
        })
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(col, w)| format!("{:<width$}", col, width = w))
        .collect();
    println!("{}", header.join("  "));

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    println!("{}", rule.join("  "));

    for row in rows {
        let line: Vec<String> = row
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = w))
            .collect();
        println!("{}", line.join("  ").trim_end());
    }
}
