use clap::Parser;
use std::time::Duration;

// CLI / environment configuration
#[derive(Parser, Debug, Clone)]
#[command(name = "inference-gateway")]
#[command(about = "Caching, rate-limited HTTP front for a placeholder inference model")]
pub struct Config {
    // Interface to bind
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    pub host: String,

    // Port to run the server on
    #[arg(short, long, env = "API_PORT", default_value_t = 8000)]
    pub port: u16,

    // Cache backend, "redis://..." or "memory://"
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379/0")]
    pub redis_url: String,

    // Cache TTL in seconds
    #[arg(short, long = "cache-ttl", env = "REDIS_TTL", default_value_t = 60)]
    pub cache_ttl: u64,

    // Connect attempts before caching is disabled
    #[arg(long, env = "CACHE_CONNECT_ATTEMPTS", default_value_t = 3)]
    pub cache_connect_attempts: u32,

    // Delay between connect attempts, seconds
    #[arg(long, env = "CACHE_RETRY_DELAY_SECS", default_value_t = 2)]
    pub cache_retry_delay: u64,

    // Per-attempt connect timeout, seconds
    #[arg(long, env = "CACHE_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub cache_connect_timeout: u64,

    #[arg(long, env = "RATE_LIMIT_ENABLED", default_value_t = true, action = clap::ArgAction::Set)]
    pub rate_limit_enabled: bool,

    // Max requests per client per window
    #[arg(long, env = "RATE_LIMIT_PER_MINUTE", default_value_t = 10)]
    pub rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60)]
    pub rate_window: u64,

    // Filled in when a request omits max_tokens
    #[arg(long, env = "REQUEST_DEFAULT_MAX_TOKENS", default_value_t = 100)]
    pub request_max_tokens: u32,

    // Filled in when a request omits temperature
    #[arg(long, env = "REQUEST_DEFAULT_TEMPERATURE", default_value_t = 0.7)]
    pub request_temperature: f64,

    #[arg(long, env = "MODEL_NAME", default_value = "default-model")]
    pub model_name: String,

    #[arg(long, env = "MODEL_VERSION", default_value = "1.0.0")]
    pub model_version: String,

    // Used when a request sends max_tokens: null
    #[arg(long, env = "MODEL_MAX_TOKENS", default_value_t = 1000)]
    pub model_max_tokens: u32,

    // Used when a request sends temperature: null
    #[arg(long, env = "MODEL_TEMPERATURE", default_value_t = 0.7)]
    pub model_temperature: f64,

    // Simulated compute time of the placeholder model, milliseconds
    #[arg(long, env = "INFERENCE_LATENCY_MS", default_value_t = 100)]
    pub inference_latency_ms: u64,

    #[arg(long, env = "SERVICE_NAME", default_value = "ai-inference-platform")]
    pub service_name: String,

    #[arg(long, env = "SERVICE_VERSION", default_value = "1.0.0")]
    pub service_version: String,

    // Fallback filter when RUST_LOG is unset
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub url: String,
    pub ttl: Duration,
    pub connect_attempts: u32,
    pub retry_delay: Duration,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub limit: u32,
    pub window: Duration,
}

// Values for fields a request leaves out entirely
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RequestDefaults {
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            max_tokens: 100,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub name: String,
    pub version: String,
    pub default_max_tokens: u32,
    pub default_temperature: f64,
    pub latency: Duration,
}

impl Config {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            url: self.redis_url.clone(),
            ttl: Duration::from_secs(self.cache_ttl),
            connect_attempts: self.cache_connect_attempts.max(1),
            retry_delay: Duration::from_secs(self.cache_retry_delay),
            connect_timeout: Duration::from_secs(self.cache_connect_timeout),
        }
    }

    pub fn rate_limit_settings(&self) -> RateLimitSettings {
        RateLimitSettings {
            enabled: self.rate_limit_enabled,
            limit: self.rate_limit,
            window: Duration::from_secs(self.rate_window),
        }
    }

    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            max_tokens: self.request_max_tokens,
            temperature: self.request_temperature,
        }
    }

    pub fn model_settings(&self) -> ModelSettings {
        ModelSettings {
            name: self.model_name.clone(),
            version: self.model_version.clone(),
            default_max_tokens: self.model_max_tokens,
            default_temperature: self.model_temperature,
            latency: Duration::from_millis(self.inference_latency_ms),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            name: "default-model".to_string(),
            version: "1.0.0".to_string(),
            default_max_tokens: 1000,
            default_temperature: 0.7,
            latency: Duration::from_millis(100),
        }
    }
}
