//! galamsey-api - Galamsey site data store service
//!
//! Serves the REST API (default) or imports a CSV file from the command
//! line through the same ingestion pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sqlx::SqlitePool;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use galamsey_api::{build_router, AppState};
use galamsey_common::config::{ConfigOverrides, ServiceConfig};
use galamsey_common::db::init_database;
use galamsey_common::ingest::{ingest_csv, IngestMode, IngestOptions};

/// Command-line arguments for galamsey-api
#[derive(Parser, Debug)]
#[command(name = "galamsey-api")]
#[command(about = "Galamsey site data store: CSV ingestion and site statistics")]
#[command(version)]
struct Args {
    /// Root folder holding the database (env: GALAMSEY_ROOT_FOLDER)
    #[arg(short, long)]
    root_folder: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "GALAMSEY_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "GALAMSEY_PORT")]
    port: Option<u16>,

    /// Largest accepted upload in bytes
    #[arg(long, env = "GALAMSEY_MAX_UPLOAD_BYTES")]
    max_upload_bytes: Option<usize>,

    /// Path to config.toml (must exist when given)
    #[arg(short, long, env = "GALAMSEY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Import a CSV file into the database
    ImportCsv {
        /// CSV file with Town,Region,Number_of_Galamsay_Sites columns
        path: PathBuf,

        /// Also report regions whose total exceeds this value
        #[arg(long)]
        threshold: Option<i64>,

        /// Report existing (Town, Region) pairs as duplicates instead of updating them
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "galamsey_api=info,galamsey_common=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Log build identification immediately after tracing init
    info!(
        "Starting galamsey-api v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();

    let overrides = ConfigOverrides {
        root_folder: args.root_folder,
        host: args.host,
        port: args.port,
        max_upload_bytes: args.max_upload_bytes,
    };
    let config = ServiceConfig::resolve(overrides, args.config.as_deref())
        .context("Failed to load configuration")?;

    config
        .ensure_root_folder()
        .context("Failed to create root folder")?;

    let db_path = config.database_path();
    info!("Database path: {}", db_path.display());

    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, pool).await,
        Command::ImportCsv {
            path,
            threshold,
            strict,
        } => {
            let mode = if strict {
                IngestMode::Strict
            } else {
                IngestMode::Upsert
            };
            import_csv_file(&pool, &path, IngestOptions { threshold, mode }).await
        }
    }
}

async fn serve(config: ServiceConfig, pool: SqlitePool) -> Result<()> {
    let state = AppState::new(pool, config.max_upload_bytes);
    let app = build_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("galamsey-api listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Command-line import, the counterpart of POST /upload-csv/
async fn import_csv_file(pool: &SqlitePool, path: &Path, options: IngestOptions) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string());

    let summary = ingest_csv(pool, &filename, &bytes, options)
        .await
        .with_context(|| format!("Failed to import {}", path.display()))?;

    for skipped in &summary.skipped_rows {
        warn!(line = skipped.line, kind = ?skipped.kind, "{}", skipped.reason);
    }

    info!(
        batch_id = summary.batch.id,
        inserted = summary.inserted,
        updated = summary.updated,
        duplicates = summary.duplicates,
        invalid = summary.invalid,
        "Imported {}",
        filename
    );

    println!("{}", serde_json::to_string_pretty(&summary)?);
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
                warn!("Failed to install SIGTERM handler: {}", e);
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
