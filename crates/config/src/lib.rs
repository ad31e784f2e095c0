//! Relay configuration: destination webhook URL, download cap, and timeouts.
//!
//! Everything is sourced from the environment once at startup and then
//! treated as read-only. The webhook URL is deliberately optional here —
//! its absence is reported per request, not at boot, so the relay can come
//! up before the destination is configured.

pub mod error;

pub use error::{Error, Result};

use std::time::Duration;

use error::Context;

/// Environment variable holding the destination webhook URL.
pub const WEBHOOK_URL_VAR: &str = "DISCORD_WEBHOOK_URL";
/// Override for the remote download cap, in bytes.
pub const MAX_REMOTE_BYTES_VAR: &str = "HOOKBRIDGE_MAX_REMOTE_BYTES";
/// Override for the remote fetch timeout, in seconds.
pub const FETCH_TIMEOUT_VAR: &str = "HOOKBRIDGE_FETCH_TIMEOUT_SECS";
/// Override for the outbound dispatch timeout, in seconds.
pub const DISPATCH_TIMEOUT_VAR: &str = "HOOKBRIDGE_DISPATCH_TIMEOUT_SECS";

/// Default cap on a single remote download: 8 MiB.
pub const DEFAULT_MAX_REMOTE_BYTES: u64 = 8 * 1024 * 1024;
/// Default remote fetch timeout.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
/// Default outbound dispatch timeout.
pub const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 30;

/// Immutable relay configuration, established once at process start.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Destination webhook URL. `None` surfaces as a configuration error on
    /// each relay attempt.
    pub webhook_url: Option<String>,
    /// Maximum size of a single remote download, in bytes. Larger downloads
    /// are aborted and the attachment is skipped.
    pub max_remote_bytes: u64,
    /// Overall timeout for one remote attachment fetch.
    pub fetch_timeout: Duration,
    /// Overall timeout for the outbound webhook dispatch.
    pub dispatch_timeout: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            max_remote_bytes: DEFAULT_MAX_REMOTE_BYTES,
            fetch_timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
            dispatch_timeout: Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS),
        }
    }
}

impl RelayConfig {
    /// Build the configuration from environment variables.
    ///
    /// Unset variables fall back to defaults; set-but-unparseable numeric
    /// overrides are a hard error rather than a silent fallback.
    pub fn from_env() -> Result<Self> {
        let webhook_url = read_nonempty(WEBHOOK_URL_VAR);
        if webhook_url.is_none() {
            tracing::debug!("{WEBHOOK_URL_VAR} is not set; relay requests will fail with 500");
        }

        let max_remote_bytes = parse_override(MAX_REMOTE_BYTES_VAR, read_nonempty(MAX_REMOTE_BYTES_VAR))?
            .unwrap_or(DEFAULT_MAX_REMOTE_BYTES);
        let fetch_timeout_secs = parse_override(FETCH_TIMEOUT_VAR, read_nonempty(FETCH_TIMEOUT_VAR))?
            .unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS);
        let dispatch_timeout_secs =
            parse_override(DISPATCH_TIMEOUT_VAR, read_nonempty(DISPATCH_TIMEOUT_VAR))?
                .unwrap_or(DEFAULT_DISPATCH_TIMEOUT_SECS);

        Ok(Self {
            webhook_url,
            max_remote_bytes,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            dispatch_timeout: Duration::from_secs(dispatch_timeout_secs),
        })
    }
}

/// Read an env var, treating unset and blank values the same.
fn read_nonempty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse an optional override value, keeping the variable name in the error.
fn parse_override(name: &str, raw: Option<String>) -> Result<Option<u64>> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<u64>()
            .map(Some)
            .with_context(|| format!("invalid {name}: {raw:?}")),
    }
}
