use lazy_static::lazy_static;
use prometheus::{
    Encoder, Gauge, HistogramVec, IntCounterVec, IntGauge, TextEncoder, register_gauge,
    register_histogram_vec, register_int_counter_vec, register_int_gauge,
};

pub const CACHE_TYPE: &str = "inference";

lazy_static! {
    pub static ref HTTP_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total number of HTTP requests",
        &["method", "endpoint", "status_code"]
    )
    .unwrap();
    pub static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request duration in seconds",
        &["method", "endpoint"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();
    pub static ref CACHE_HITS: IntCounterVec =
        register_int_counter_vec!("cache_hits_total", "Total number of cache hits", &["cache_type"])
            .unwrap();
    pub static ref CACHE_MISSES: IntCounterVec = register_int_counter_vec!(
        "cache_misses_total",
        "Total number of cache misses",
        &["cache_type"]
    )
    .unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("cache_size", "Current number of items in the in-process cache").unwrap();
    pub static ref INFERENCE_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "inference_requests_total",
        "Total number of inference requests",
        &["model_name", "model_version"]
    )
    .unwrap();
    pub static ref INFERENCE_DURATION: HistogramVec = register_histogram_vec!(
        "inference_duration_seconds",
        "Inference processing duration in seconds",
        &["model_name"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap();
    pub static ref INFERENCE_TOKENS: HistogramVec = register_histogram_vec!(
        "inference_tokens_total",
        "Total tokens used for inference",
        &["model_name"],
        vec![10.0, 50.0, 100.0, 500.0, 1000.0, 5000.0, 10000.0]
    )
    .unwrap();
    pub static ref INFERENCE_ERRORS: IntCounterVec = register_int_counter_vec!(
        "inference_errors_total",
        "Total number of inference errors",
        &["error_type", "model_name"]
    )
    .unwrap();
    pub static ref ACTIVE_REQUESTS: IntGauge =
        register_int_gauge!("active_requests", "Number of currently active requests").unwrap();
}

pub fn record_request(method: &str, endpoint: &str, status_code: u16, duration_secs: f64) {
    let status = status_code.to_string();
    HTTP_REQUESTS
        .with_label_values(&[method, endpoint, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method, endpoint])
        .observe(duration_secs);
}

pub fn record_cache_hit() {
    CACHE_HITS.with_label_values(&[CACHE_TYPE]).inc();
}

pub fn record_cache_miss() {
    CACHE_MISSES.with_label_values(&[CACHE_TYPE]).inc();
}

pub fn record_inference(model_name: &str, model_version: &str, duration_secs: f64, tokens_used: u64) {
    INFERENCE_REQUESTS
        .with_label_values(&[model_name, model_version])
        .inc();
    INFERENCE_DURATION
        .with_label_values(&[model_name])
        .observe(duration_secs);
    INFERENCE_TOKENS
        .with_label_values(&[model_name])
        .observe(tokens_used as f64);
}

pub fn record_error(error_type: &str, model_name: &str) {
    INFERENCE_ERRORS
        .with_label_values(&[error_type, model_name])
        .inc();
}

// active_requests stays raised while this is alive
pub struct ActiveRequest(());

impl ActiveRequest {
    pub fn start() -> Self {
        ACTIVE_REQUESTS.inc();
        Self(())
    }
}

impl Drop for ActiveRequest {
    fn drop(&mut self) {
        ACTIVE_REQUESTS.dec();
    }
}

// Text exposition of the default registry
pub fn render() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_series_show_up_in_render() {
        record_request("GET", "/test-only", 200, 0.01);
        record_error("Failed", "render-test-model");

        let text = render().unwrap();
        assert!(text.contains("http_requests_total"));
        assert!(text.contains(r#"endpoint="/test-only""#));
        assert!(text.contains(r#"model_name="render-test-model""#));
    }

    #[test]
    fn hit_counter_increments() {
        let before = CACHE_HITS.with_label_values(&[CACHE_TYPE]).get();
        record_cache_hit();
        assert!(CACHE_HITS.with_label_values(&[CACHE_TYPE]).get() > before);
    }
}
