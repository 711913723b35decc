use axum::{
    Json,
    extract::{ConnectInfo, State, rejection::JsonRejection},
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::error::ApiError;
use crate::metrics::{self, ActiveRequest};
use crate::models::{InferPayload, InferenceResponse};
use crate::state::AppState;

const ENDPOINT: &str = "/api/v1/infer";

pub async fn infer_handler(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    payload: Result<Json<InferPayload>, JsonRejection>,
) -> Result<Json<InferenceResponse>, ApiError> {
    let _active = ActiveRequest::start();
    let start = Instant::now();

    // body errors are reported after admission, like field validation
    let payload = payload
        .map(|Json(p)| p)
        .map_err(|rejection| ApiError::Validation(rejection.body_text()));

    let identity = addr.ip().to_string();
    let result = state.service.handle(&identity, payload).await;

    let status = match &result {
        Ok(_) => 200,
        Err(e) => {
            if let ApiError::Validation(detail) = e {
                tracing::debug!(%identity, detail, "rejected invalid request");
            }
            e.status().as_u16()
        }
    };
    metrics::record_request("POST", ENDPOINT, status, start.elapsed().as_secs_f64());

    result.map(Json)
}
