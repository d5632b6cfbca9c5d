//! cmon-ingest - condition matrix ingestion
//!
//! Reads the equipment condition workbook, scores every row against the criteria sheet and
//! reconciles the results into the machines store. Runs one-shot from the command line or
//! as a small HTTP service.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cmon_common::config::TomlConfig;
use cmon_common::db::init_database;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cmon_ingest::db::machines::{color_counts, sample_machines};
use cmon_ingest::services::{analyze, analyzer, ImportOrchestrator};
use cmon_ingest::{build_router, AppState};

/// Machines listed by `colors`
const COLOR_SAMPLE_SIZE: i64 = 20;

/// Command-line arguments for cmon-ingest
#[derive(Parser, Debug)]
#[command(name = "cmon-ingest")]
#[command(about = "Condition matrix workbook ingestion")]
#[command(version)]
struct Cli {
    /// SQLite database path
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service
    Serve {
        /// Address to listen on
        #[arg(long)]
        bind: Option<String>,

        /// Workbook served by GET /import_excel
        #[arg(long)]
        workbook: Option<PathBuf>,
    },

    /// Import a workbook once and exit
    Import {
        workbook: Option<PathBuf>,
    },

    /// Profile a workbook into CSV and summary files without touching the store
    Analyze {
        workbook: PathBuf,

        /// Output directory (default: analysis_output beside the workbook)
        outdir: Option<PathBuf>,
    },

    /// Machine counts per color and a sample of machines
    Colors,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = TomlConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    // RUST_LOG wins over the configured level
    let level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("cmon_ingest={level},cmon_common={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Command::Serve { bind, workbook } => {
            serve(&config, cli.database, bind, workbook).await
        }
        Command::Import { workbook } => import(&config, cli.database, workbook).await,
        Command::Analyze { workbook, outdir } => run_analysis(config, workbook, outdir).await,
        Command::Colors => colors(&config, cli.database).await,
    }
}

async fn open_store(config: &TomlConfig, database: Option<PathBuf>) -> Result<sqlx::SqlitePool> {
    let db_path = config.resolve_database_path(database.as_deref());
    info!("Database: {}", db_path.display());
    init_database(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))
}

async fn serve(
    config: &TomlConfig,
    database: Option<PathBuf>,
    bind: Option<String>,
    workbook: Option<PathBuf>,
) -> Result<()> {
    let pool = open_store(config, database).await?;
    let workbook_path = config.resolve_workbook_path(workbook.as_deref());
    let addr = config.resolve_bind_address(bind.as_deref());

    info!("Workbook: {}", workbook_path.display());

    let app = build_router(AppState::new(pool, config.clone(), workbook_path));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn import(config: &TomlConfig, database: Option<PathBuf>, workbook: Option<PathBuf>) -> Result<()> {
    let pool = open_store(config, database).await?;
    let workbook_path = config.resolve_workbook_path(workbook.as_deref());

    let summary = ImportOrchestrator::new(pool.clone(), config.clone())
        .run(&workbook_path)
        .await;
    pool.close().await;

    let summary = summary?;
    println!("{}", summary.message());
    Ok(())
}

async fn run_analysis(config: TomlConfig, workbook: PathBuf, outdir: Option<PathBuf>) -> Result<()> {
    let outdir = outdir.unwrap_or_else(|| analyzer::default_output_dir(&workbook));

    let summary = tokio::task::spawn_blocking(move || analyze(&workbook, &outdir, &config))
        .await
        .context("Analysis task failed")??;

    print!("{}", analyzer::render_summary(&summary));
    println!("Output written to {}", summary.output_dir.display());
    Ok(())
}

async fn colors(config: &TomlConfig, database: Option<PathBuf>) -> Result<()> {
    let pool = open_store(config, database).await?;

    println!("Machines per color:");
    for (color, count) in color_counts(&pool).await? {
        println!("  {:<8} {}", color.as_deref().unwrap_or("none"), count);
    }

    println!("\nSample machines:");
    for machine in sample_machines(&pool, COLOR_SAMPLE_SIZE).await? {
        println!(
            "  #{:<5} {:<40} priority {} color {}",
            machine.id,
            machine.name,
            machine.priority,
            machine.color.as_deref().unwrap_or("none")
        );
    }

    pool.close().await;
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
