use axum::{extract::State, http::StatusCode, Json};
use speciesml::ModelInfo;
use tracing::error;

use crate::model_info::InfoError;
use crate::state::SharedState;
use crate::types::ServiceResponse;

pub async fn get_penguin_info(
    State(st): State<SharedState>,
) -> (StatusCode, Json<ServiceResponse<ModelInfo>>) {
    match st.model_info.get_info().await {
        Ok(info) => (StatusCode::OK, Json(ServiceResponse::ok(info))),
        Err(e) => {
            error!(error = %e, "model info unavailable");
            let status = match e {
                InfoError::Load(_) => StatusCode::SERVICE_UNAVAILABLE,
                InfoError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, Json(ServiceResponse::error(e.to_string())))
        }
    }
}
