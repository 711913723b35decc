pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod inference;
pub mod metrics;
pub mod models;
pub mod rate_limit;
pub mod service;
pub mod state;

pub use config::Config;
pub use handlers::router;
pub use state::AppState;
