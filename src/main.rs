use anyhow::Result;
use bcupper::config;
use bcupper::managers::backup::{BackupManager, JobOutcome, JobReport, JobWarning};
use bcupper::managers::logging;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "bcupper")]
#[command(about = "Space-aware directory backups to local disk, FTP or SFTP", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to configuration file (.json or .toml)
    #[arg(short, long, default_value = "config.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Back up every configured directory once (default)
    Run,

    /// List existing backups at each destination, oldest first
    List,

    /// Validate configuration file
    Validate,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = match config::load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            logging::init_console_logging();
            return Err(e.into());
        }
    };
    let jobs = config::resolve_jobs(&config);

    let command = cli.command.unwrap_or(Commands::Run);

    if let Commands::Validate = command {
        println!("Configuration is valid!");
        println!("Directories: {}", jobs.len());
        for job in &jobs {
            let retention = job
                .max_backups
                .map(|n| n.to_string())
                .unwrap_or_else(|| "unlimited".to_string());
            println!(
                "  {} -> {} (max backups: {})",
                job.source.display(),
                job.destination_label(),
                retention
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    // Dropped on return, which flushes the file log
    let _log_guard = logging::init_logging(&logging::LoggingConfig::from_global(&config.global))?;

    let backup_manager = BackupManager::new(&config, jobs);

    match command {
        Commands::Run => {
            let summary = backup_manager.backup_all();
            for report in &summary.reports {
                print_report(report);
            }

            if summary.has_failures() {
                eprintln!(
                    "{} of {} backups failed",
                    summary.failed(),
                    summary.reports.len()
                );
                return Ok(ExitCode::FAILURE);
            }
        }

        Commands::List => {
            for job in backup_manager.jobs() {
                println!("{}:", job.destination_label());
                match backup_manager.list_destination(job) {
                    Ok(artifacts) if artifacts.is_empty() => println!("  (no backups)"),
                    Ok(artifacts) => {
                        for artifact in artifacts {
                            println!(
                                "  {}  {}",
                                artifact.modified.format("%Y-%m-%d %H:%M:%S UTC"),
                                artifact.name
                            );
                        }
                    }
                    Err(e) => eprintln!("  ✗ {}", e),
                }
            }
        }

        Commands::Validate => unreachable!("handled before logging setup"),
    }

    Ok(ExitCode::SUCCESS)
}

/// Operator-facing result line for one job
fn print_report(report: &JobReport) {
    for name in &report.evicted {
        println!("Removed oldest backup <{}>", name);
    }

    match &report.outcome {
        JobOutcome::Success { artifact } => println!(
            "[SUCCESS] backup <{}> to <{}> with name `{}` was created",
            report.source.display(),
            report.destination,
            artifact
        ),
        JobOutcome::Warning(JobWarning::SourceMissing(source)) => {
            println!("[WARNING] <{}> was not found", source.display())
        }
        JobOutcome::Failed(e) => eprintln!(
            "[FAILED] backup <{}> to <{}>: {}",
            report.source.display(),
            report.destination,
            e
        ),
    }
}
