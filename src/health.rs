//! Connectivity self-test run before cache operations.
//!
//! The gate writes a throwaway key and reads it back. Any failure means the
//! caller should skip the cache entirely and go to the backing store.

use std::time::Duration;

use chrono::Utc;

use crate::config::CacheConfig;
use crate::error::{CacheError, Result};
use crate::logging::trace;
use crate::transport::KvTransport;

/// Key written by the probe.
pub const HEALTH_KEY: &str = "__novel_cache_health__";

const HEALTH_TTL: Duration = Duration::from_secs(60);

/// Probe the store.
///
/// Returns [`CacheError::Disabled`] when caching is switched off, without
/// touching the transport. A read that returns any value counts as healthy:
/// concurrent probes from other processes overwrite the same key.
pub async fn probe(transport: &dyn KvTransport, config: &CacheConfig) -> Result<()> {
    if !config.enabled {
        return Err(CacheError::Disabled);
    }
    if !config.health_check {
        return Ok(());
    }

    let stamp = Utc::now().timestamp_micros().to_string();
    transport.set(HEALTH_KEY, &stamp, Some(HEALTH_TTL)).await?;
    match transport.get(HEALTH_KEY).await? {
        Some(_) => {
            trace!("health probe ok");
            Ok(())
        }
        None => Err(CacheError::HealthCheck(
            "probe key was written but could not be read back".into(),
        )),
    }
}
