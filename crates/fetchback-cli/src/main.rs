mod commands;
mod logging;
mod progress;

use std::fs;
use std::io;
use std::path::Path;
use std::process;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use colored::*;
use commands::{CleanArgs, Cli, Commands, PreservedAction};
use dotenv::dotenv;
use fetchback_core::extractor::PlatformOrigins;
use fetchback_core::ledger::Ledger;
use fetchback_core::preserved::PreservedSet;
use fetchback_core::probe::ProbeSettings;
use fetchback_core::size::{format_size, parse_size};
use fetchback_core::storage::Database;
use fetchback_core::workflow::StdinPrompter;
use fetchback_core::{
    config, scanner, AppConfig, Assembler, HttpProbe, LocalFileSystem, ProgressReporter, RunMode,
    UrlExtractor, ValidatorComparator, Workflow,
};
use progress::CliReporter;
use tracing::{error, info};

fn main() -> Result<()> {
    dotenv().ok();

    let home = config::app_home();
    let _guard = logging::init_logger(&home);

    let config = match config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            eprintln!("{} {}", "Error loading configuration:".red(), err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    let command = match args.command {
        Some(command) => command,
        None => Commands::Clean(args.clean),
    };

    let result = match command {
        Commands::Clean(clean) => run_clean(&config, &home, &clean),
        Commands::Stats => run_stats(&config, &home),
        Commands::Lookup { md5 } => run_lookup(&config, &home, &md5),
        Commands::History { limit } => run_history(&config, &home, limit),
        Commands::Preserved { action } => run_preserved(&config, &home, action),
        Commands::PrintConfig => {
            println!("Configuration home: {}", home.display());
            println!("Database: {}", config.database_path(&home).display());
            println!("Configuration: {:#?}", config);
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        eprintln!("{} {:#}", "Error:".red(), err);
        process::exit(1);
    }

    Ok(())
}

fn open_database(config: &AppConfig, home: &Path) -> Result<Database> {
    let path = config.database_path(home);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating database directory {}", parent.display()))?;
    }
    Database::open(&path).with_context(|| format!("opening database {}", path.display()))
}

fn run_clean(config: &AppConfig, home: &Path, args: &CleanArgs) -> Result<()> {
    let threshold = match &args.size {
        Some(size) => parse_size(size)?,
        None => config.threshold_bytes(),
    };
    let mode = if args.delete {
        RunMode::Unattended
    } else {
        RunMode::Interactive
    };
    let downloads = config.downloads_path();
    let fs = LocalFileSystem;
    let db = open_database(config, home)?;
    let reporter = CliReporter::new();

    info!(
        "Scanning {} for files over {} ({:?})",
        downloads.display(),
        format_size(threshold),
        mode
    );
    let started = Instant::now();
    reporter.on_scan_start(&downloads.display().to_string());
    let preserved_paths = PreservedSet::new(&db).path_set()?;
    let candidates = scanner::find_large_files(
        &fs,
        &downloads,
        threshold,
        &config.ignore_patterns,
        &preserved_paths,
    )?;
    reporter.on_scan_complete(candidates.len(), started.elapsed().as_secs_f64());

    if candidates.is_empty() {
        println!("No files larger than {} found.", format_size(threshold));
        return Ok(());
    }

    let probe = HttpProbe::new(ProbeSettings::with_timeout(config.probe_timeout()))?;
    let origins = PlatformOrigins;
    let extractor = UrlExtractor::new(&fs, &origins);
    let assessment =
        Assembler::new(&fs, extractor, &probe, &ValidatorComparator).assess(candidates, &reporter);

    let mut workflow = Workflow::new(&fs, mode)
        .with_preserved(PreservedSet::new(&db))
        .write_placeholders(config.write_redirect_placeholders)
        .report_to(downloads.clone());
    if config.use_ledger {
        workflow = workflow.with_ledger(Ledger::new(&db));
    }

    let outcome = workflow.run(assessment, &mut StdinPrompter, &mut io::stdout());

    if !outcome.deleted.is_empty() {
        println!(
            "{} {} freed",
            "✓".green(),
            format_size(outcome.freed_bytes()).green()
        );
    }
    for failure in &outcome.failures {
        eprintln!(
            "{} {}: {}",
            "Not deleted".red(),
            failure.path.display(),
            failure.error
        );
    }
    if let Some(err) = &outcome.ledger_error {
        eprintln!(
            "{} deleted files were not recorded: {}",
            "Warning:".yellow(),
            err
        );
    }
    Ok(())
}

fn run_stats(config: &AppConfig, home: &Path) -> Result<()> {
    let db = open_database(config, home)?;
    let stats = Ledger::new(&db).statistics()?;

    println!("{}", "Ledger statistics".bold());
    println!(
        "  Total: {} files, {} freed",
        stats.total_files.to_string().cyan(),
        format_size(stats.total_size_freed.max(0) as u64).cyan()
    );
    println!(
        "  Last 30 days: {} files, {} freed",
        stats.recent_files.to_string().cyan(),
        format_size(stats.recent_size_freed.max(0) as u64).cyan()
    );
    for by_type in &stats.urls_by_type {
        println!(
            "  {} URLs: {} ({} accessible)",
            by_type.url_type, by_type.total, by_type.accessible
        );
    }
    Ok(())
}

fn run_lookup(config: &AppConfig, home: &Path, md5: &str) -> Result<()> {
    let db = open_database(config, home)?;
    let ledger = Ledger::new(&db);
    let files = ledger.find_by_hash(md5)?;
    if files.is_empty() {
        println!("No deleted file with MD5 {}", md5);
        return Ok(());
    }

    for file in files {
        println!(
            "{} ({}) deleted {}",
            file.name.bold(),
            format_size(file.size.max(0) as u64),
            file.deleted_at
        );
        println!("  was at {}", file.path);
        for url in ledger.urls_for(file.id)? {
            let marker = if url.accessible {
                "+".green()
            } else {
                "-".red()
            };
            println!("  [{}] {} ({})", marker, url.url, url.url_type);
        }
    }
    Ok(())
}

fn run_history(config: &AppConfig, home: &Path, limit: i64) -> Result<()> {
    let db = open_database(config, home)?;
    let files = Ledger::new(&db).recent(limit)?;
    if files.is_empty() {
        println!("Nothing deleted yet.");
    }
    for file in files {
        println!(
            "{}  {:>10}  {}  {}",
            file.deleted_at,
            format_size(file.size.max(0) as u64),
            if file.md5.is_empty() { "-" } else { file.md5.as_str() },
            file.name
        );
    }
    Ok(())
}

fn run_preserved(config: &AppConfig, home: &Path, action: PreservedAction) -> Result<()> {
    let db = open_database(config, home)?;
    let preserved = PreservedSet::new(&db);
    match action {
        PreservedAction::List => {
            let paths = preserved.paths()?;
            if paths.is_empty() {
                println!("No preserved files.");
            }
            for path in paths {
                println!("{}", path.display());
            }
        }
        PreservedAction::Add { path } => {
            if preserved.add(&path)? {
                println!("Preserved {}", path.display());
            } else {
                println!("{} was already preserved", path.display());
            }
        }
        PreservedAction::Remove { path } => {
            if preserved.remove(&path)? {
                println!("{} is no longer preserved", path.display());
            } else {
                println!("{} was not preserved", path.display());
            }
        }
    }
    Ok(())
}
