//! tms-migrate CLI - converts legacy tenant-management CSV exports into SQL inserts
//!
//! Reads the nine legacy exports, remaps every legacy id to a new UUID and
//! writes one `INSERT` statement per migrated row.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process;

use tms_migrate::{EntityKind, MigrationConfig, MigrationReport, Migrator};

#[derive(Parser)]
#[command(name = "tms-migrate")]
#[command(version, about = "Migrate legacy tenant-management CSV exports to SQL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the migration and write the SQL file
    Run {
        /// Path to migration.yaml (defaults apply if it does not exist)
        #[arg(short, long, default_value = "migration.yaml")]
        config: PathBuf,

        /// Directory holding the CSV exports (overrides config)
        #[arg(short, long)]
        input_dir: Option<PathBuf>,

        /// SQL output file (overrides config)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write a JSON migration report to this path (overrides config)
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Run every pass but do not write the SQL file
        #[arg(long)]
        dry_run: bool,
    },

    /// Check that every source file exists and has the expected columns
    Validate {
        /// Path to migration.yaml (defaults apply if it does not exist)
        #[arg(short, long, default_value = "migration.yaml")]
        config: PathBuf,

        /// Directory holding the CSV exports (overrides config)
        #[arg(short, long)]
        input_dir: Option<PathBuf>,
    },

    /// List the passes with their source files, tables and required columns
    Sources {
        /// Path to migration.yaml (defaults apply if it does not exist)
        #[arg(short, long, default_value = "migration.yaml")]
        config: PathBuf,
    },
}

fn main() {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run { config, input_dir, output, report, dry_run } => {
            run_migration(config, input_dir, output, report, dry_run)
        }
        Commands::Validate { config, input_dir } => {
            validate_sources(config, input_dir)
        }
        Commands::Sources { config } => {
            list_sources(config)
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn load_config(path: &Path, input_dir: Option<PathBuf>) -> Result<MigrationConfig, String> {
    let mut config = MigrationConfig::load_or_default(path).map_err(|e| e.to_string())?;
    if let Some(dir) = input_dir {
        config.input_dir = dir;
    }
    Ok(config)
}

/// Run all passes and write the SQL file
fn run_migration(
    config_path: PathBuf,
    input_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    report: Option<PathBuf>,
    dry_run: bool,
) -> Result<(), String> {
    let mut config = load_config(&config_path, input_dir)?;
    if let Some(output) = output {
        config.output_file = output;
    }
    if report.is_some() {
        config.report_file = report;
    }

    println!("🔧 Migrating CSV exports from {}...", config.input_dir.display());

    let migrator = Migrator::new(config.clone());
    let result = migrator.run().map_err(|e| e.to_string())?;

    print_summary(&result.report);

    let sql_path = (!dry_run).then_some(config.output_file.as_path());
    let written = result
        .write_files(sql_path, config.report_file.as_deref())
        .map_err(|e| e.to_string())?;

    if let Some(report_path) = &config.report_file {
        println!("  ✓ Wrote report to {}", report_path.display());
    }
    match written {
        Some(written) => println!(
            "\n✨ Successfully generated {} statements at: {}",
            written,
            config.output_file.display()
        ),
        None => println!("\n  ℹ Dry run: {} statements not written", result.records.len()),
    }

    Ok(())
}

fn print_summary(report: &MigrationReport) {
    for pass in &report.passes {
        if pass.entity == EntityKind::User {
            println!("  ✓ Generated SQL for {}.", pass.entity);
            continue;
        }

        println!("  ✓ Processed {} {}.", pass.migrated, pass.entity);
        for (reason, count) in &pass.skipped {
            println!("      skipped {} ({})", count, reason);
        }
        for (kind, count) in &pass.degraded {
            println!("      {} {}", count, kind);
        }
    }

    let degraded: usize = report.degradation_totals().values().sum();
    println!(
        "\n  Total: {} migrated, {} skipped, {} degraded fields",
        report.total_migrated(),
        report.total_skipped(),
        degraded
    );
}

/// Check every source file without migrating anything
fn validate_sources(config_path: PathBuf, input_dir: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(&config_path, input_dir)?;
    println!("🔍 Validating sources in {}...", config.input_dir.display());

    let checks = Migrator::new(config)
        .validate_sources()
        .map_err(|e| e.to_string())?;

    for check in &checks {
        println!(
            "  ✓ {} ({} columns) for {}",
            check.path.display(),
            check.columns,
            check.entity
        );
    }

    println!("✨ All {} sources are valid", checks.len());
    Ok(())
}

/// Print the pass order with source files and required columns
fn list_sources(config_path: PathBuf) -> Result<(), String> {
    let config = load_config(&config_path, None)?;

    for (index, entity) in EntityKind::ALL.into_iter().enumerate() {
        let source = config.source_file(entity).unwrap_or("(generated)");
        println!("{}. {} -> {}", index + 1, source, entity.table());

        let columns = entity.required_columns();
        if !columns.is_empty() {
            println!("     {}", columns.join(", "));
        }
    }

    Ok(())
}
