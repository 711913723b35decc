use std::sync::Arc;

use crate::cache::CacheStore;
use crate::config::Config;
use crate::inference::{InferenceModel, PlaceholderModel};
use crate::rate_limit::RateLimiter;
use crate::service::InferenceService;

// app's shared state
pub struct AppState {
    pub service: InferenceService,
    pub service_name: String,
    pub service_version: String,
}

impl AppState {
    pub fn new(
        service: InferenceService,
        service_name: impl Into<String>,
        service_version: impl Into<String>,
    ) -> Self {
        Self {
            service,
            service_name: service_name.into(),
            service_version: service_version.into(),
        }
    }

    // cache comes back unconnected
    pub fn from_config(config: &Config) -> Self {
        let cache = Arc::new(CacheStore::new(config.cache_settings()));
        let model: Arc<dyn InferenceModel> =
            Arc::new(PlaceholderModel::new(config.model_settings()));
        let limiter = RateLimiter::from_settings(&config.rate_limit_settings()).map(Arc::new);

        Self::new(
            InferenceService::new(cache, model, limiter)
                .with_request_defaults(config.request_defaults()),
            config.service_name.clone(),
            config.service_version.clone(),
        )
    }
}
