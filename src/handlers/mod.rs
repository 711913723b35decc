mod health;
mod infer;
mod metrics;
mod model;

pub use health::{health_handler, root_handler};
pub use infer::infer_handler;
pub use metrics::metrics_handler;
pub use model::model_info_handler;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .route("/api/v1/infer", post(infer_handler))
        .route("/api/v1/model", get(model_info_handler))
        .with_state(state)
}
