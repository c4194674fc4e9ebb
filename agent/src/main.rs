//! Fieldsync agent binary: local store, sync scheduler and control API.

use std::sync::Arc;

use fieldsync_agent::config::Config;
use fieldsync_agent::db::Database;
use fieldsync_agent::gateway::{
    ConnectivityFlag, CredentialProvider, HttpGateway, HttpProbe, HttpSerialDirectory, StaticToken,
};
use fieldsync_agent::pipeline::UploadPipeline;
use fieldsync_agent::reconciler::SerialReconciler;
use fieldsync_agent::scheduler::Scheduler;
use fieldsync_agent::{router, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fieldsync_agent=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing::info!(backend = %config.api_base_url, "Starting Fieldsync agent");

    let db = Database::open(&config.database_url).await?;

    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(StaticToken::new(config.auth_token.clone()));
    if credentials.token().is_none() {
        tracing::warn!("AUTH_TOKEN not set, uploads will fail as unauthenticated");
    }

    let link = ConnectivityFlag::default();
    let probe = Arc::new(HttpProbe::new(config.api_base_url.clone(), link.clone())?);
    let gateway = Arc::new(HttpGateway::new(
        config.api_base_url.clone(),
        credentials.clone(),
        config.request_timeout,
        config.upload_timeout,
    )?);
    let directory = Arc::new(HttpSerialDirectory::new(
        config.serial_directory_url.clone(),
        credentials,
        config.request_timeout,
    )?);

    let reconciler = Arc::new(SerialReconciler::new(db.clone(), directory, probe.clone()));
    let pipeline = Arc::new(UploadPipeline::new(
        db.clone(),
        gateway,
        probe,
        config.pipeline_options(),
    ));
    let scheduler = Scheduler::new(reconciler, pipeline, config.scheduler_config());
    let timers = scheduler.start();

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState {
        db: db.clone(),
        scheduler: scheduler.clone(),
        link,
        config: Arc::new(config),
    };

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Control API listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.shutdown();
    for timer in timers {
        if let Err(e) = timer.await {
            tracing::warn!("Timer task ended abnormally: {}", e);
        }
    }
    db.close().await;
    tracing::info!("Agent stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
