//! Backfill Service - Regenerates the static JSON dataset from a local file
//!
//! Offline fallback for when the published sheet is unreachable: point
//! it at a downloaded workbook (or CSV export) and it rewrites the
//! static dataset the frontend can serve directly.

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use pipeline::SheetMatrix;

#[derive(Parser, Debug)]
#[command(name = "backfill", about = "Rebuilds the static records dataset from a local spreadsheet")]
struct Args {
    /// Spreadsheet to read (.xlsx or .csv)
    #[arg(long, default_value = "data/indicadores.xlsx")]
    file: PathBuf,

    /// Where to write the JSON dataset
    #[arg(long, default_value = "data/records.json")]
    out: PathBuf,

    /// Dry run - parse and report, don't write
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    let args = Args::parse();

    println!("=== Indicadores Semanais Backfill ===");
    println!("Reading {}", args.file.display());

    let matrix = SheetMatrix::from_path(&args.file)
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    println!(
        "Loaded sheet: {} columns x {} rows",
        matrix.columns.len(),
        matrix.rows.len()
    );

    let today = chrono::Local::now().date_naive();
    let outcome = pipeline::run(&matrix, today)
        .with_context(|| format!("failed to process {}", args.file.display()))?;
    let report = &outcome.report;

    println!("\nPeriods found: {}", report.period_columns.len());
    for period in &report.period_columns {
        println!("  {}", period);
    }
    if !report.duplicate_periods.is_empty() {
        println!("Duplicates dropped (first occurrence kept):");
        for period in &report.duplicate_periods {
            println!("  {}", period);
        }
    }
    if !report.unmatched_labels.is_empty() {
        println!("Unmatched indicator rows (possible catalog gaps):");
        for label in &report.unmatched_labels {
            println!("  {}", label);
        }
    }
    if !report.rescales.is_empty() {
        println!("Percentage rescales applied: {}", report.rescales.len());
    }
    if !report.implausible.is_empty() {
        println!("Implausible values discarded: {}", report.implausible.len());
        for event in &report.implausible {
            println!(
                "  {} {} = {} (cap {})",
                event.period, event.field, event.value, event.cap
            );
        }
    }
    if !report.unsortable_periods.is_empty() {
        println!("Periods without a resolvable date (sorted last):");
        for period in &report.unsortable_periods {
            println!("  {}", period);
        }
    }

    println!("\nRecords assembled: {}", outcome.records.len());

    if args.dry_run {
        println!("Dry run - not writing {}", args.out.display());
        return Ok(());
    }

    let json = serde_json::to_string_pretty(&outcome.records)?;
    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    fs::write(&args.out, json)
        .with_context(|| format!("failed to write {}", args.out.display()))?;
    println!("Wrote {}", args.out.display());

    Ok(())
}
