use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, field, info_span};

use crate::cache::{CacheStore, request_fingerprint};
use crate::config::RequestDefaults;
use crate::error::ApiError;
use crate::inference::InferenceModel;
use crate::metrics;
use crate::models::{CacheEntry, InferPayload, InferenceRequest, InferenceResponse};
use crate::rate_limit::RateLimiter;

pub struct InferenceService {
    cache: Arc<CacheStore>,
    model: Arc<dyn InferenceModel>,
    limiter: Option<Arc<RateLimiter>>,
    defaults: RequestDefaults,
}

impl InferenceService {
    pub fn new(
        cache: Arc<CacheStore>,
        model: Arc<dyn InferenceModel>,
        limiter: Option<Arc<RateLimiter>>,
    ) -> Self {
        Self {
            cache,
            model,
            limiter,
            defaults: RequestDefaults::default(),
        }
    }

    // Values for fields the client leaves out of the body
    pub fn with_request_defaults(mut self, defaults: RequestDefaults) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn model(&self) -> &Arc<dyn InferenceModel> {
        &self.model
    }

    pub fn cache(&self) -> &Arc<CacheStore> {
        &self.cache
    }

    pub fn limiter(&self) -> Option<&Arc<RateLimiter>> {
        self.limiter.as_ref()
    }

    // Rate limit is charged before the payload is looked at
    pub async fn handle(
        &self,
        identity: &str,
        payload: Result<InferPayload, ApiError>,
    ) -> Result<InferenceResponse, ApiError> {
        self.admit(identity)?;
        let request = InferenceRequest::from_payload(payload?, &self.defaults)?;
        self.infer(&request).await
    }

    pub fn admit(&self, identity: &str) -> Result<(), ApiError> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        limiter.check(identity).map_err(|rejection| {
            tracing::info!(identity, limit = rejection.limit, "rate limit exceeded");
            ApiError::RateLimited {
                limit: rejection.limit,
                window_secs: rejection.window.as_secs(),
                retry_after: rejection.retry_after,
            }
        })
    }

    pub async fn infer(&self, request: &InferenceRequest) -> Result<InferenceResponse, ApiError> {
        let span = info_span!(
            "inference_request",
            prompt.length = request.prompt().chars().count(),
            max_tokens = field::debug(request.max_tokens()),
            temperature = field::debug(request.temperature()),
            cache.result = field::Empty,
            tokens_used = field::Empty,
        );

        async move {
            let start = Instant::now();
            let key = request_fingerprint(request);

            let cached = self
                .cache
                .get(&key)
                .instrument(info_span!("cache.get"))
                .await;

            if let Some(entry) = cached {
                metrics::record_cache_hit();
                let current = tracing::Span::current();
                current.record("cache.result", "hit");
                current.record("tokens_used", entry.tokens_used);
                metrics::record_inference(
                    self.model.name(),
                    &entry.model_version,
                    start.elapsed().as_secs_f64(),
                    entry.tokens_used,
                );
                return Ok(InferenceResponse::from(entry));
            }

            metrics::record_cache_miss();
            tracing::Span::current().record("cache.result", "miss");

            let inference_start = Instant::now();
            let predicted = self
                .model
                .predict(request.prompt(), request.max_tokens(), request.temperature())
                .instrument(info_span!(
                    "model.predict",
                    model.name = self.model.name(),
                    model.version = self.model.version()
                ))
                .await;

            let result = match predicted {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "inference failed");
                    metrics::record_error(e.kind(), self.model.name());
                    return Err(e.into());
                }
            };
            let inference_duration = inference_start.elapsed().as_secs_f64();

            let entry = CacheEntry::from(&result);
            self.cache
                .set(&key, &entry, self.cache.ttl())
                .instrument(info_span!("cache.set"))
                .await;

            tracing::Span::current().record("tokens_used", result.tokens_used);
            metrics::record_inference(
                &result.model_name,
                &result.model_version,
                inference_duration,
                result.tokens_used,
            );

            Ok(InferenceResponse::from(entry))
        }
        .instrument(span)
        .await
    }
}
