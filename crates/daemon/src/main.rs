//! Classlens Analysis Daemon - Main Entry Point

mod telemetry;

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use classlens_api_rpc::{RpcServer, RpcServerConfig};
use classlens_core::application::worker::{shutdown_channel, wake_channel, Worker};
use classlens_core::application::{RecoveryService, StatusService, SubmitService, Watchdog};
use classlens_core::domain::{AnalysisKind, ClassId, TeacherId};
use classlens_core::port::id_provider::UuidProvider;
use classlens_core::port::time_provider::SystemTimeProvider;
use classlens_core::port::{ClassContext, ClassDirectory, JobRepository};
use classlens_infra_http::{HostedClassDirectory, OpenAiAnalysisProvider};
use classlens_infra_sqlite::{create_pool, run_migrations, SqliteJobRepository};

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_DB_PATH: &str = "~/.classlens/classlens.db";

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize logging
    let log_format = std::env::var("CLASSLENS_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("classlens=info"))
        .expect("Failed to create env filter");

    match log_format.as_str() {
        "json" => {
            // Production: JSON structured logging
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .init();
        }
        _ => {
            // Development: pretty formatting with colors
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .init();
        }
    }

    info!("Classlens analysis daemon v{} starting...", VERSION);

    if let Err(e) = telemetry::init_telemetry() {
        warn!(error = ?e, "Failed to initialize OpenTelemetry (continuing without it)");
    }

    // 2. Load configuration
    let db_path = std::env::var("CLASSLENS_DB_PATH")
        .unwrap_or_else(|_| shellexpand::tilde(DEFAULT_DB_PATH).into_owned());

    info!(db_path = %db_path, "Initializing database...");

    if !db_path.contains(":memory:") {
        if let Some(parent) = std::path::Path::new(&db_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // 3. Initialize database
    let pool = create_pool(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("DB pool creation failed: {}", e))?;
    run_migrations(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;

    // 4. Setup dependencies (DI wiring)
    let time_provider = Arc::new(SystemTimeProvider);
    let id_provider = Arc::new(UuidProvider);
    let job_repo: Arc<dyn JobRepository> = Arc::new(SqliteJobRepository::new(pool.clone()));

    let provider = Arc::new(OpenAiAnalysisProvider::from_env());

    let class_directory: Arc<dyn ClassDirectory> = match HostedClassDirectory::from_env() {
        Ok(directory) => Arc::new(directory),
        Err(e) => {
            warn!(error = %e, "Classroom backend not configured; ownership checks disabled");
            Arc::new(UnscopedDirectory)
        }
    };

    let worker_wake = wake_channel();

    let submit_service = Arc::new(SubmitService::new(
        job_repo.clone(),
        class_directory.clone(),
        id_provider,
        time_provider.clone(),
        worker_wake.clone(),
    ));
    let status_service = Arc::new(StatusService::new(job_repo.clone()));

    // 5. Fail jobs left in Processing by a previous run
    info!("Running startup recovery...");
    let recovery_service = RecoveryService::new(job_repo.clone(), time_provider.clone());
    match recovery_service.recover_interrupted_jobs().await {
        Ok(count) => info!(recovered_jobs = count, "Startup recovery completed"),
        Err(e) => tracing::error!(error = ?e, "Startup recovery failed"),
    }

    // 6. Start JSON-RPC server
    info!("Starting JSON-RPC server...");
    let rpc_server = RpcServer::new(
        RpcServerConfig::from_env(),
        submit_service,
        status_service,
        job_repo.clone(),
    );
    let rpc_handle = rpc_server
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 7. Start Worker (analysis loop)
    info!("Starting worker...");
    let (shutdown_tx, shutdown_rx) = shutdown_channel();

    let worker = Worker::new(
        job_repo.clone(),
        provider,
        class_directory,
        time_provider.clone(),
        worker_wake,
    );

    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run(shutdown_rx).await {
            tracing::error!(error = ?e, "Worker failed");
        }
    });

    // 8. Start watchdog (stuck-Processing sweep)
    let max_processing_ms = std::env::var("CLASSLENS_WATCHDOG_MAX_PROCESSING_MS")
        .ok()
        .and_then(|s| s.parse().ok());

    let watchdog = Watchdog::new(job_repo, time_provider, max_processing_ms, None);
    let watchdog_shutdown = shutdown_tx.subscribe();
    tokio::spawn(async move {
        watchdog.run(watchdog_shutdown).await;
    });

    info!("System ready. Waiting for analysis requests...");
    info!("Press Ctrl+C to shutdown");

    // 9. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutdown signal received. Exiting gracefully...");

    // 10. Graceful shutdown
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), worker_handle).await;

    info!("Shutdown complete.");

    Ok(())
}

/// Fallback directory for deployments without a classroom backend:
/// every teacher owns every class and no auxiliary data exists.
/// Intended for local development and diagnostics only.
struct UnscopedDirectory;

#[async_trait::async_trait]
impl ClassDirectory for UnscopedDirectory {
    async fn owns_class(
        &self,
        _teacher_id: &TeacherId,
        _class_id: &ClassId,
    ) -> classlens_core::Result<bool> {
        Ok(true)
    }

    async fn class_context(
        &self,
        _class_id: &ClassId,
        _kind: AnalysisKind,
    ) -> classlens_core::Result<ClassContext> {
        Ok(ClassContext::default())
    }
}
