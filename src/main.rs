use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use workload_sizer::checkpoint_store::{CheckpointStatus, CheckpointStore};
use workload_sizer::monitor::MonitorOutcome;
use workload_sizer::sizing::SizingPolicy;
use workload_sizer::*;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[derive(Parser)]
#[command(name = "workload-sizer", version)]
#[command(
    about = "Sample a database server's load over hours or days and size infrastructure for it",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a monitoring session from the config file (CONFIG_FILE, default config.toml)
    Monitor {
        /// Resume from this checkpoint file
        #[arg(long)]
        resume_from: Option<String>,

        /// Override run.duration_minutes
        #[arg(short, long)]
        duration: Option<u64>,

        /// Override run.interval_seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Show progress of a running or interrupted session from its checkpoint
    Status {
        /// Checkpoint file
        checkpoint: PathBuf,

        /// Keep refreshing until Ctrl-C
        #[arg(short, long)]
        watch: bool,

        /// Refresh period in seconds for --watch
        #[arg(long, default_value = "30")]
        every: u64,

        /// Print the status as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute hourly analysis and sizing from a result document or checkpoint
    Analyze {
        /// Result document or checkpoint file
        input: PathBuf,

        /// Catalog to size against (default: sizing.catalog_path from the config file)
        #[arg(short, long)]
        catalog: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Monitor {
            resume_from,
            duration,
            interval,
        } => run_monitor(resume_from, duration, interval).await,
        Commands::Status {
            checkpoint,
            watch,
            every,
            json,
        } => run_status(checkpoint, watch, every, json).await,
        Commands::Analyze { input, catalog } => run_analyze(input, catalog).await,
    }
}

async fn run_monitor(
    resume_from: Option<String>,
    duration: Option<u64>,
    interval: Option<u64>,
) -> Result<()> {
    let app_config = config::AppConfig::load()?.with_overrides(duration, interval, resume_from)?;
    let catalog = models::Catalog::load(&app_config.sizing.catalog_path)?;
    let mut source = source::ConfiguredSource::from_config(&app_config.source).await?;
    tracing::info!(
        version = version::VERSION,
        server = %app_config.run.server,
        catalog = %catalog.version,
        output = %app_config.run.output_path,
        "Starting {}",
        version::NAME
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Received shutdown signal");
        let _ = shutdown_tx.send(());
    });

    match monitor::run(&app_config, &catalog, &mut source, shutdown_rx).await? {
        MonitorOutcome::Completed(doc) => {
            let rec = &doc.recommendation;
            println!(
                "Collected {}/{} samples ({} errors) -> {}",
                doc.metadata.samples_collected,
                doc.metadata.total_samples,
                doc.metadata.error_count,
                app_config.run.output_path
            );
            println!(
                "Compute: {} ({} vCPUs, {} GB) ${:.2}/month",
                rec.compute_sku, rec.vcpus, rec.memory_gb, rec.compute_monthly_cost
            );
            println!(
                "Storage: {} x {} ({} IOPS, {} MB/s, {} GB) ${:.2}/month",
                rec.storage_config.unit_count,
                rec.storage_config.sku,
                rec.storage_config.total_iops,
                rec.storage_config.total_throughput,
                rec.storage_config.total_capacity_gb,
                rec.storage_config.monthly_cost
            );
            println!("Total:   ${:.2}/month", rec.total_monthly_cost);
        }
        MonitorOutcome::Interrupted {
            samples_collected,
            total_samples,
            checkpoint_path,
        } => {
            println!(
                "Interrupted at {}/{} samples. Resume with: {} monitor --resume-from {}",
                samples_collected,
                total_samples,
                version::NAME,
                checkpoint_path
            );
        }
    }
    Ok(())
}

async fn run_status(checkpoint: PathBuf, watch: bool, every: u64, json: bool) -> Result<()> {
    loop {
        let Some(record) = CheckpointStore::load(&checkpoint).await else {
            anyhow::bail!(
                "no readable checkpoint at {}; the run may have completed",
                checkpoint.display()
            );
        };
        let status = CheckpointStatus::from_record(&record, chrono::Utc::now());
        if json {
            println!("{}", serde_json::to_string_pretty(&status)?);
        } else {
            print!("{}", status);
        }
        if !watch {
            return Ok(());
        }
        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(every.max(1))) => println!(),
            _ = shutdown_signal() => return Ok(()),
        }
    }
}

async fn run_analyze(input: PathBuf, catalog_path: Option<String>) -> Result<()> {
    let (catalog_path, policy) = match catalog_path {
        Some(path) => (path, SizingPolicy::default()),
        None => {
            let app_config = config::AppConfig::load()?;
            let policy = SizingPolicy::from(&app_config.sizing);
            (app_config.sizing.catalog_path, policy)
        }
    };
    let catalog = models::Catalog::load(&catalog_path)?;
    let doc = monitor::analyze_file(&input, &catalog, &policy).await?;
    println!("{}", serde_json::to_string_pretty(&doc)?);
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
