use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

use person_sift::pipeline::RunStatus;
use person_sift::service::summarize;
use person_sift::utils::{format_duration, setup_logging};
use person_sift::{
    ImportConfig, ImportService, JsonFileStore, PersonDirectory, RecordStore, RunSummary,
};

#[derive(Parser)]
#[command(name = "person-sift")]
#[command(about = "Imports person names from CSV files, normalized and without duplicates")]
#[command(version)]
struct Args {
    #[arg(short, long, default_value = "person_sift_config.json", help = "Configuration file")]
    config: PathBuf,

    #[arg(short, long, help = "Store file (overrides the configuration)")]
    store: Option<PathBuf>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,

    #[arg(short, long, help = "Only log errors", conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Import CSV files from the data directory, or by absolute path
    Import {
        /// File names; `.csv` is appended when missing. Several names run concurrently
        names: Vec<String>,

        #[arg(long, help = "Records per chunk (overrides the configuration)")]
        chunk_size: Option<usize>,
    },
    /// Import a local file as an upload
    Upload { file: PathBuf },
    /// Add one person
    Add { name: String },
    /// List all persons
    List,
    /// Show one person
    Get { id: u64 },
    /// Rename a person
    Rename { id: u64, name: String },
    /// Delete a person
    Delete { id: u64 },
    /// Delete every person
    Clear,
    /// Describe the import job
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = if args.config.exists() {
        ImportConfig::from_file(&args.config)?
    } else {
        let default_config = ImportConfig::default();
        default_config.to_file(&args.config)?;
        eprintln!("📄 Config file not found, created default: {}", args.config.display());
        default_config
    };

    if args.verbose {
        config.verbose = true;
    }
    if let Some(store_path) = &args.store {
        config.store_path = store_path.clone();
    }

    let verbosity = if args.quiet {
        "silent"
    } else if config.verbose {
        "verbose"
    } else {
        "normal"
    };
    setup_logging(verbosity)?;

    let store: Arc<dyn RecordStore> = Arc::new(
        JsonFileStore::open(&config.store_path)
            .with_context(|| format!("Failed to open store {}", config.store_path.display()))?,
    );

    match args.command {
        Command::Import { names, chunk_size } => {
            if let Some(size) = chunk_size {
                config.chunk_size = size;
            }
            let service = ImportService::new(config, store)?
                .with_shutdown_signal(shutdown_signal());
            import(&service, names).await
        }
        Command::Upload { file } => {
            let service = ImportService::new(config, store)?;
            upload(&service, &file).await
        }
        Command::Add { name } => {
            let person = PersonDirectory::new(store).create(&name)?;
            print_json(&person)
        }
        Command::List => {
            let persons = PersonDirectory::new(store).list()?;
            eprintln!("👥 {} persons", persons.len());
            print_json(&persons)
        }
        Command::Get { id } => print_json(&PersonDirectory::new(store).get(id)?),
        Command::Rename { id, name } => print_json(&PersonDirectory::new(store).rename(id, &name)?),
        Command::Delete { id } => {
            PersonDirectory::new(store).delete(id)?;
            eprintln!("🗑️ Person {} deleted", id);
            Ok(())
        }
        Command::Clear => {
            let count = PersonDirectory::new(store).delete_all()?;
            eprintln!("🗑️ Deleted {} persons", count);
            Ok(())
        }
        Command::Info => {
            let service = ImportService::new(config, store)?;
            print_json(&service.job_info())
        }
    }
}

async fn import(service: &ImportService, names: Vec<String>) -> Result<()> {
    let summaries = if names.len() > 1 {
        let sources = names.iter().map(|n| service.resolve(Some(n.as_str()))).collect();
        service.run_all(sources).await?
    } else {
        let source = service.resolve(names.first().map(String::as_str));
        info!("Importing {}", source.display_name());
        vec![summarize(&service.spawn_run(source).await?)]
    };

    report(&summaries)
}

async fn upload(service: &ImportService, file: &Path) -> Result<()> {
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow::anyhow!("Not a file: {}", file.display()))?;
    let content =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let source = service.validate_upload(&filename, content)?;
    let summary = summarize(&service.spawn_run(source).await?);
    report(&[summary])
}

fn report(summaries: &[RunSummary]) -> Result<()> {
    for summary in summaries {
        let icon = match summary.status {
            RunStatus::Completed => "✅",
            RunStatus::CompletedWithErrors => "⚠️",
            _ => "💥",
        };
        let duration = summary
            .end_time
            .map(|end| format_duration(end.saturating_sub(summary.start_time)))
            .unwrap_or_default();
        eprintln!(
            "{} {}: {} ({})",
            icon,
            summary.filename.as_deref().unwrap_or("import"),
            summary.message,
            duration
        );
    }

    if summaries.len() == 1 {
        print_json(&summaries[0])?;
    } else {
        print_json(&summaries)?;
    }

    let failed = summaries
        .iter()
        .filter(|s| s.status == RunStatus::Failed)
        .count();
    if failed > 0 {
        bail!("{} of {} import runs failed", failed, summaries.len());
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn shutdown_signal() -> Arc<AtomicBool> {
    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n🛑 Shutdown signal received. Stopping after the current chunk...");
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        }
    });

    shutdown_flag
}
