pub mod cache;
pub mod cache_redis;
pub mod config;
pub mod lifecycle;
pub mod model_info;
pub mod persistence;
pub mod predict;
pub mod remote;
pub mod remote_github;
pub mod routes_info;
pub mod routes_predict;
pub mod state;
pub mod trainer;
pub mod types;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;

pub use state::{AppState, SharedState};

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/api/info/penguin-info", get(routes_info::get_penguin_info))
        .route("/api/predict/single", post(routes_predict::predict_single))
        .route("/api/predict/batch", post(routes_predict::predict_batch))
        .layer(CorsLayer::permissive())
        .with_state(state)
}
