use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

#[derive(Clone, Debug)]
pub struct GitHubConfig {
    pub api_url: String,
    pub username: String,
    pub repo: String,
    pub token: String,
    pub branch: String,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub github: GitHubConfig,
    pub redis_url: Option<String>,
    pub bind_addr: String,
    pub training_csv: PathBuf,
    pub remote_timeout: Duration,
    pub predictions_csv_path: String,
    pub predictions_xlsx_path: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let github = GitHubConfig {
            api_url: std::env::var("GITHUB_API_URL")
                .unwrap_or_else(|_| "https://api.github.com".to_string()),
            username: get("GITHUB_USERNAME")?,
            repo: get("GITHUB_REPO")?,
            token: get("GITHUB_TOKEN")?,
            branch: std::env::var("GITHUB_BRANCH").unwrap_or_else(|_| "main".to_string()),
        };

        let redis_url = std::env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty());
        let bind_addr =
            std::env::var("PREDICTOR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let training_csv = PathBuf::from(
            std::env::var("PENGUINS_CSV").unwrap_or_else(|_| "penguins.csv".to_string()),
        );

        let remote_timeout = match std::env::var("REMOTE_TIMEOUT_SECS") {
            Ok(v) => Duration::from_secs(v.trim().parse::<u64>().with_context(|| {
                format!("REMOTE_TIMEOUT_SECS must be a whole number of seconds, got {v:?}")
            })?),
            Err(_) => Duration::from_secs(30),
        };

        let predictions_csv_path = std::env::var("PREDICTIONS_CSV_PATH")
            .unwrap_or_else(|_| "Github_Prediction_Storage/predictions.csv".to_string());
        let predictions_xlsx_path = std::env::var("PREDICTIONS_XLSX_PATH")
            .unwrap_or_else(|_| "Github_Prediction_Storage/predictions.xlsx".to_string());

        // Fail fast on obviously broken values
        if !github.api_url.starts_with("http://") && !github.api_url.starts_with("https://") {
            bail!("GITHUB_API_URL must start with http:// or https://");
        }
        if let Some(url) = &redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                bail!("REDIS_URL must start with redis:// or rediss://");
            }
        }
        if remote_timeout.is_zero() {
            bail!("REMOTE_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            github,
            redis_url,
            bind_addr,
            training_csv,
            remote_timeout,
            predictions_csv_path,
            predictions_xlsx_path,
        })
    }
}

fn get(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Missing required env var: {key}"))
}
