#![doc = include_str!("../README.md")]

mod config;
mod telemetry;

use anyhow::Context;
use clap::Parser;
use config::{AppConfig, CliArgs};
use std::sync::Arc;
use telemetry::init_telemetry;
use tokio::signal;
use tokio::sync::watch;
use warband::{
    BuildCatalog, CapabilityModel, ConstraintValidator, JobStatus, OptimizationJob, SquadStore,
};
use warband_client::{JobClient, SquadSession};

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = AppConfig::try_from(args)?;

    init_telemetry(config.log_format)?;
    log_startup_info(&config);

    let raw = std::fs::read_to_string(&config.catalog)
        .with_context(|| format!("Failed to read catalog {}", config.catalog.display()))?;
    let catalog = Arc::new(BuildCatalog::from_json(&raw).context("Failed to parse catalog")?);

    let client = JobClient::new(config.client.clone())?;
    let store = SquadStore::new(Arc::new(CapabilityModel::standard()), Arc::clone(&catalog));
    let mut session = SquadSession::new(client, store);
    session.initialize_squad(config.squad_size, catalog)?;

    let validator = ConstraintValidator::new(config.thresholds.clone());
    report(&session, &validator, "Initial composition")?;

    let job_id = session.start(&config.job).await?;
    tracing::info!(%job_id, "Optimization started");

    let mut updates = session.updates();
    let finished = tokio::select! {
        job = follow(&mut updates) => job,
        () = shutdown_signal() => None,
    };
    let Some(job) = finished else {
        session.stop();
        tracing::info!("Job stream closed before the job finished");
        return Ok(());
    };

    report(&session, &validator, "Final composition")?;
    if job.status == JobStatus::Error {
        anyhow::bail!("Job {job_id} failed after {} ms", job.elapsed_ms);
    }
    tracing::info!(status = %job.status, best_score = job.best_score, "Optimization finished");
    Ok(())
}

fn log_startup_info(config: &AppConfig) {
    if cfg!(debug_assertions) {
        tracing::info!("Starting warband with full config: {:#?}", config);
    } else {
        tracing::info!(
            "Starting warband against {} with a squad of {}",
            config.client.base_url,
            config.squad_size
        );
    }
}

/// Logs every job update until the job reaches a terminal status.
async fn follow(updates: &mut watch::Receiver<OptimizationJob>) -> Option<OptimizationJob> {
    loop {
        {
            let job = updates.borrow_and_update();
            tracing::info!(
                status = %job.status,
                best_score = job.best_score,
                elapsed_ms = job.elapsed_ms,
                "Job progress"
            );
            if job.status.is_terminal() {
                return Some(job.clone());
            }
        }
        if updates.changed().await.is_err() {
            return None;
        }
    }
}

/// Prints the snapshot as JSON on stdout and logs the composition warnings.
fn report(
    session: &SquadSession,
    validator: &ConstraintValidator,
    title: &str,
) -> anyhow::Result<()> {
    let snapshot = session.snapshot();
    println!("{}", serde_json::to_string_pretty(&snapshot)?);

    let warnings = validator.validate(&snapshot);
    tracing::info!(warnings = warnings.len(), "{title}");
    for warning in &warnings {
        tracing::warn!("{warning}");
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
