use axum::{extract::State, http::StatusCode, Json};
use tracing::{error, info};

use crate::predict::{predict_many, predict_one};
use crate::state::SharedState;
use crate::types::{
    BatchPredictionResponse, BatchRequest, PenguinFeatures, ServiceResponse,
    SinglePredictionResponse,
};

type ApiResult<T> = (StatusCode, Json<ServiceResponse<T>>);

fn fail<T>(status: StatusCode, message: impl Into<String>) -> ApiResult<T> {
    (status, Json(ServiceResponse::error(message)))
}

pub async fn predict_single(
    State(st): State<SharedState>,
    Json(req): Json<PenguinFeatures>,
) -> ApiResult<SinglePredictionResponse> {
    let model = match st.lifecycle.ensure_loaded().await {
        Ok(m) => m,
        Err(e) => return fail(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    };

    let result = match predict_one(&model, &req) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "single prediction failed");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let persisted = st
        .persistence
        .persist(std::slice::from_ref(&req), std::slice::from_ref(&result))
        .await;
    info!(prediction = %result.prediction, persisted, "single prediction");

    (StatusCode::OK, Json(ServiceResponse::ok(SinglePredictionResponse { result, persisted })))
}

pub async fn predict_batch(
    State(st): State<SharedState>,
    Json(req): Json<BatchRequest>,
) -> ApiResult<BatchPredictionResponse> {
    if req.records.is_empty() {
        return fail(StatusCode::BAD_REQUEST, "batch must contain at least one record");
    }

    let model = match st.lifecycle.ensure_loaded().await {
        Ok(m) => m,
        Err(e) => return fail(StatusCode::SERVICE_UNAVAILABLE, e.to_string()),
    };

    let results = match predict_many(&model, &req.records) {
        Ok(r) => r,
        Err(e) => {
            error!(error = %e, "batch prediction failed");
            return fail(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let persisted = st.persistence.persist(&req.records, &results).await;
    info!(count = results.len(), persisted, "batch prediction");

    (StatusCode::OK, Json(ServiceResponse::ok(BatchPredictionResponse { results, persisted })))
}
