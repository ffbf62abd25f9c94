use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use animepipe_core::{
    load_config, validate_config, Config, FileRoutingSource, FinalRipTranscoder, JackettFeed,
    PipelineLoop, PollPolicy, QBittorrentDownloader, SqliteTaskStore, TaskExecutor, TaskPipeline,
    TaskStatusStore, TelegramPublisher,
};
use animepipe_server::{api::create_router, state::AppState};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine config path
    let config_path = std::env::var("ANIMEPIPE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "Configuration loaded successfully"
    );
    info!("Database path: {:?}", config.database.path);
    info!("Routing path: {:?}", config.routing_path);

    // Create SQLite task status store
    let store: Arc<dyn TaskStatusStore> = Arc::new(
        SqliteTaskStore::new(&config.database.path).context("Failed to create task store")?,
    );
    info!("Task store initialized");

    let executor = TaskExecutor::new(config.pipeline_loop.max_concurrent_tasks);
    let pipeline = Arc::new(build_pipeline(&config, Arc::clone(&store))?);

    info!("Initializing Jackett feed at {}", config.jackett.url);
    let feed = Arc::new(
        JackettFeed::new(config.jackett.clone()).context("Failed to create Jackett feed")?,
    );
    let routing = Arc::new(FileRoutingSource::new(config.routing_path.clone()));

    let pipeline_loop = PipelineLoop::new(
        routing,
        feed,
        executor.clone(),
        pipeline,
        Duration::from_secs(config.pipeline_loop.interval_secs),
    );

    // Start the discovery loop
    let shutdown = CancellationToken::new();
    let loop_handle = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { pipeline_loop.run(shutdown).await })
    };

    // Create app state and router
    let state = Arc::new(AppState::new(config.clone(), store, executor.clone()));
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    // Run server with graceful shutdown
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            server_shutdown.cancel();
        })
        .await
        .context("Server error")?;

    // Stop discovering, then give in-flight tasks a chance to reach a checkpoint
    info!("Server shutting down...");
    shutdown.cancel();
    if let Err(e) = loop_handle.await {
        warn!("Pipeline loop task failed: {}", e);
    }

    let grace = Duration::from_secs(config.pipeline_loop.shutdown_grace_secs);
    if tokio::time::timeout(grace, executor.wait_idle()).await.is_err() {
        warn!(
            running = ?executor.running_ids(),
            "Tasks still running at shutdown; they resume from their last checkpoint on restart"
        );
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wire the stage clients into a task pipeline.
fn build_pipeline(config: &Config, store: Arc<dyn TaskStatusStore>) -> Result<TaskPipeline> {
    info!("Initializing qBittorrent downloader at {}", config.qbittorrent.url);
    let downloader = QBittorrentDownloader::new(config.qbittorrent.clone())
        .context("Failed to create qBittorrent downloader")?;

    info!("Initializing FinalRip transcoder at {}", config.finalrip.url);
    let transcoder = FinalRipTranscoder::new(config.finalrip.clone())
        .context("Failed to create FinalRip transcoder")?;

    let mut poll = PollPolicy::new(Duration::from_secs(config.pipeline_loop.poll_interval_secs));
    if let Some(max_attempts) = config.pipeline_loop.poll_max_attempts {
        poll = poll.with_max_attempts(max_attempts);
    }

    let pipeline = TaskPipeline::new(store, Arc::new(downloader), Arc::new(transcoder))
        .with_poll_policy(poll);

    if config.telegram.enable {
        info!("Publishing to Telegram channel {}", config.telegram.channel_id);
        let publisher = TelegramPublisher::new(config.telegram.clone())
            .context("Failed to create Telegram publisher")?;
        Ok(pipeline.with_publisher(Arc::new(publisher)))
    } else {
        info!("Publishing disabled in config");
        Ok(pipeline)
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
