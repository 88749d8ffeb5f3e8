use anyhow::Context;
use gradebook_server::db;
use gradebook_server::repository::{
    SeaOrmEnrollmentRepository, SeaOrmResultRepository, SeaOrmSubmissionRepository,
};
use grading_engine::{Gradebook, config::load_or_default};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_CONFIG_PATH: &str = "gradebook.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting gradebook server");
    let config_path =
        env::var("GRADEBOOK_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    info!(path = %config_path, "loading gradebook config");
    let config = load_or_default(&config_path)?;

    let db = db::init_pool_and_migrate()
        .await
        .context("failed to connect and migrate database")?;
    info!("database ready");

    let gradebook = Gradebook::new(
        config,
        Arc::new(SeaOrmSubmissionRepository::new(db.clone())),
        Arc::new(SeaOrmResultRepository::new(db.clone())),
        Arc::new(SeaOrmEnrollmentRepository::new(db)),
    )
    .context("failed to initialize gradebook")?;

    let mut event_stream = gradebook.subscribe_events();
    info!("subscribed to grading event stream");
    info!("server is ready, press Ctrl+C to shut down");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received, stopping server");
                break;
            }
            event = event_stream.recv() => {
                match event {
                    Ok(event) => info!(?event, "grading event"),
                    Err(err) => {
                        warn!(error = %err, "grading event stream closed");
                        break;
                    }
                }
            }
        }
    }

    info!("server shutdown complete");
    Ok(())
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
