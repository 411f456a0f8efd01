use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};

use predictor::cache::{CacheStore, MemoryCacheStore};
use predictor::cache_redis::RedisCacheStore;
use predictor::config::AppConfig;
use predictor::persistence::StoragePaths;
use predictor::remote_github::GitHubStore;
use predictor::trainer::CsvTrainer;
use predictor::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cfg = AppConfig::from_env()?;

    // --- Cache ---
    let cache_store: Arc<dyn CacheStore> = match &cfg.redis_url {
        Some(url) => Arc::new(
            RedisCacheStore::connect(url, cfg.remote_timeout)
                .await
                .context("Failed to connect to Redis")?,
        ),
        None => {
            info!("REDIS_URL not set, using in-process cache");
            Arc::new(MemoryCacheStore::new())
        }
    };

    // --- Remote prediction storage ---
    let remote = Arc::new(
        GitHubStore::new(&cfg.github, cfg.remote_timeout).context("Failed to build GitHub client")?,
    );
    let paths = StoragePaths {
        rows: cfg.predictions_csv_path.clone(),
        table: cfg.predictions_xlsx_path.clone(),
    };

    let trainer = CsvTrainer::new(cfg.training_csv.clone());
    let app_state = Arc::new(AppState::new(Box::new(trainer), cache_store, remote, paths));

    // Train once up front; a failure here is retried by the first request.
    if let Err(e) = app_state.lifecycle.ensure_loaded().await {
        error!(error = %e, "startup training failed, serving anyway");
    }

    let app = predictor::router(app_state);

    let addr = &cfg.bind_addr;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "predictor listening");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
