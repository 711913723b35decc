use axum::{Json, extract::State};
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::{self, ActiveRequest};
use crate::models::ModelInfo;
use crate::state::AppState;

pub async fn model_info_handler(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    let _active = ActiveRequest::start();
    let start = Instant::now();

    let info = state.service.model().info();

    metrics::record_request("GET", "/api/v1/model", 200, start.elapsed().as_secs_f64());
    Json(info)
}
