//! HTTP facade over the blob store.
//!
//! Exposes `GET`, `POST` and `DELETE` on `/cache` plus health endpoints,
//! so services that cannot link the crate can still share the cache.

mod config;
mod error;
mod logging;
mod routes;
mod state;

pub use config::{Config, CorsConfig, LogFormat, LoggingConfig, ServerConfig};
pub use error::ApiError;
pub use logging::{LoggingError, init as init_logging};
pub use routes::{MAX_TTL_SECS, router};
pub use state::{AppState, StateError};
