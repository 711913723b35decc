use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::time::Duration;

// Never leaves the cache module
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend: {0}")]
    Backend(#[from] redis::RedisError),

    #[error("cache serialization: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cache operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("unsupported cache url: {0}")]
    UnsupportedUrl(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("model unavailable: {0}")]
    Unavailable(String),

    #[error("inference failed: {0}")]
    Failed(String),
}

impl ModelError {
    // Label value for inference_errors_total
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::Unavailable(_) => "Unavailable",
            ModelError::Failed(_) => "Failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("Rate limit exceeded: {limit} per {window_secs} seconds")]
    RateLimited {
        limit: u32,
        window_secs: u64,
        retry_after: Duration,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Model(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.to_string();
        match self {
            ApiError::Validation(detail) => {
                (status, Json(serde_json::json!({ "detail": detail }))).into_response()
            }
            ApiError::RateLimited { retry_after, .. } => {
                let body = Json(serde_json::json!({ "error": message }));
                let mut response = (status, body).into_response();
                // round up so clients never retry early
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                if let Ok(value) = HeaderValue::from_str(&secs.to_string()) {
                    response.headers_mut().insert(header::RETRY_AFTER, value);
                }
                response
            }
            ApiError::Model(_) => (
                status,
                Json(serde_json::json!({ "detail": "Internal server error" })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_error_kind() {
        assert_eq!(
            ApiError::Validation("prompt".into()).status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::from(ModelError::Failed("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn rate_limited_response_carries_retry_after() {
        let err = ApiError::RateLimited {
            limit: 10,
            window_secs: 60,
            retry_after: Duration::from_millis(1500),
        };
        assert_eq!(err.to_string(), "Rate limit exceeded: 10 per 60 seconds");

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }
}
