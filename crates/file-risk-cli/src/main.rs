mod commands;
mod logging;
mod progress;

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::process;

use anyhow::Context;
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{Cli, Commands};
use dotenv::dotenv;
use file_risk_core::scanner::{self, import};
use file_risk_core::storage::Database;
use file_risk_core::{AppConfig, NoEmbedder, RiskEngine};
use progress::CliReporter;
use tracing::{error, info, warn};

fn main() {
    dotenv().ok();

    let args = Cli::parse();
    let _guard = logging::init_logger(args.verbose);

    let config = match file_risk_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let outcome = match args.command {
        Some(Commands::Collect) => run_collect(&config),
        Some(Commands::Import { file }) => run_import(&config, &file),
        Some(Commands::Process) => run_process(&config),
        Some(Commands::Report { limit }) => run_report(&config, limit),
        Some(Commands::Export { output }) => run_export(&config, &output),
        Some(Commands::PrintConfig) => config
            .to_toml()
            .map(|text| println!("{}", text))
            .map_err(anyhow::Error::from),
        Some(Commands::TruncateDb) => run_truncate(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = outcome {
        error!("Error: {:#}", err);
        process::exit(1);
    }
}

fn open_database(config: &AppConfig) -> anyhow::Result<Database> {
    Database::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path))
}

fn run_collect(config: &AppConfig) -> anyhow::Result<()> {
    if config.root_paths.is_empty() {
        warn!("No root_paths configured, nothing to collect");
        return Ok(());
    }
    let db = open_database(config)?;
    let written = scanner::collect_into(&db, config, &NoEmbedder, &CliReporter::new())?;
    info!(
        "{} catalog records written for server {}",
        format!("{}", written).green(),
        config.server_name.cyan(),
    );
    Ok(())
}

fn run_import(config: &AppConfig, file: &Path) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let reader = BufReader::new(
        File::open(file).with_context(|| format!("opening {}", file.display()))?,
    );
    let result = import::import_catalog(&db, reader, &config.server_name)?;
    info!(
        "{} records imported, {} skipped",
        format!("{}", result.imported).green(),
        format!("{}", result.skipped).yellow(),
    );
    Ok(())
}

fn run_process(config: &AppConfig) -> anyhow::Result<()> {
    let engine = RiskEngine::new(config.engine.clone())?;
    let db = open_database(config)?;
    let result = engine.run(&db, &CliReporter::new())?;

    println!();
    info!(
        "Detect: {}, Score: {}",
        format!("{:.2}s", result.detect_duration.as_secs_f64()).green(),
        format!("{:.2}s", result.score_duration.as_secs_f64()).green(),
    );
    info!(
        "{} inserted, {} updated, {} skipped, {} failed",
        format!("{}", result.inserted).green(),
        format!("{}", result.updated).green(),
        format!("{}", result.malformed_skipped + result.repeated_skipped).yellow(),
        format!("{}", result.failures.len()).red(),
    );
    info!(
        "{} embedded files, {} near-duplicate pairs",
        format!("{}", result.embedded_files).cyan(),
        format!("{}", result.duplicate_pairs).cyan(),
    );
    for failure in &result.failures {
        warn!("Not stored: {} ({})", failure.path.red(), failure.error);
    }

    Ok(())
}

fn run_report(config: &AppConfig, limit: i64) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let statuses = db.list_statuses(0, limit)?;
    if statuses.is_empty() {
        println!("No file statuses yet, run `process` first");
        return Ok(());
    }

    println!(
        "{:>7}  {:>7}  {:>5}  {}",
        "risk".bold(),
        "dupe%".bold(),
        "peers".bold(),
        "path".bold()
    );
    for status in statuses {
        let risk = format!("{:>7.1}", status.deletion_score);
        let risk = if status.deletion_score >= 80.0 {
            risk.red()
        } else if status.deletion_score >= 50.0 {
            risk.yellow()
        } else {
            risk.green()
        };
        println!(
            "{}  {:>7.1}  {:>5}  {}",
            risk,
            status.duplicate_score,
            status.duplicates.len(),
            status.path
        );
    }
    Ok(())
}

fn run_export(config: &AppConfig, output: &Path) -> anyhow::Result<()> {
    let db = open_database(config)?;
    let out = BufWriter::new(
        File::create(output).with_context(|| format!("creating {}", output.display()))?,
    );
    let rows = file_risk_core::export::export_statuses(&db, out)?;
    info!(
        "{} statuses written to {}",
        format!("{}", rows).green(),
        output.display()
    );
    Ok(())
}

fn run_truncate(config: &AppConfig) -> anyhow::Result<()> {
    if !prompt_confirm(
        "Are you SURE you want to COMPLETELY DELETE the Database?",
        Some(false),
    )? {
        return Ok(());
    }
    open_database(config)?.truncate_all()?;
    println!("All tables truncated");
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
