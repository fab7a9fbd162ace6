//! Immutable transport configuration.
//!
//! Built once at construction (from defaults, code, or `CREDMESH_*`
//! environment overrides) and never mutated afterwards. Retry and
//! partition knobs are plain fields, not ambient globals.

use std::env;
use std::time::Duration;

use crate::TransportError;

/// Networked-transport configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportConfig {
    /// Per-request timeout
    pub timeout: Duration,
    /// Total attempts per call (first try included)
    pub max_retries: u32,
    /// First backoff delay; doubles each retry
    pub backoff_base: Duration,
    /// Backoff ceiling
    pub backoff_cap: Duration,
    /// Consecutive failures before a peer turns SUSPECT
    pub suspect_after_failures: u32,
    /// Consecutive failures before a peer turns OFFLINE
    pub offline_after_failures: u32,
    /// Consecutive successes before a demoted peer recovers
    pub recovery_successes: u32,
    /// Require HTTPS peers and pinned identities
    pub require_mtls: bool,
    /// Trust-root bundle paths; must be non-empty under mutual auth
    pub trust_roots: Vec<String>,
    pub client_cert_path: Option<String>,
    pub client_key_path: Option<String>,
    /// Directory watched for rotated certificates
    pub cert_rotation_path: Option<String>,
    /// Prefer the dense wire codec when compiled in
    pub prefer_dense_codec: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5_000),
            max_retries: 3,
            backoff_base: Duration::from_millis(500),
            backoff_cap: Duration::from_millis(5_000),
            suspect_after_failures: 1,
            offline_after_failures: 2,
            recovery_successes: 1,
            require_mtls: false,
            trust_roots: Vec::new(),
            client_cert_path: None,
            client_key_path: None,
            cert_rotation_path: None,
            prefer_dense_codec: false,
        }
    }
}

impl TransportConfig {
    /// Defaults overridden by `CREDMESH_*` environment variables.
    ///
    /// Unparseable values fall back to the default rather than failing
    /// startup; validation still applies afterwards.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            timeout: env_ms("CREDMESH_TIMEOUT_MS").unwrap_or(defaults.timeout),
            max_retries: env_parse("CREDMESH_MAX_RETRIES").unwrap_or(defaults.max_retries),
            backoff_base: env_ms("CREDMESH_BACKOFF_BASE_MS").unwrap_or(defaults.backoff_base),
            backoff_cap: env_ms("CREDMESH_BACKOFF_CAP_MS").unwrap_or(defaults.backoff_cap),
            suspect_after_failures: env_parse("CREDMESH_SUSPECT_AFTER")
                .unwrap_or(defaults.suspect_after_failures),
            offline_after_failures: env_parse("CREDMESH_OFFLINE_AFTER")
                .unwrap_or(defaults.offline_after_failures),
            recovery_successes: env_parse("CREDMESH_RECOVERY_SUCCESSES")
                .unwrap_or(defaults.recovery_successes),
            require_mtls: env_parse("CREDMESH_REQUIRE_MTLS").unwrap_or(defaults.require_mtls),
            trust_roots: env::var("CREDMESH_TRUST_ROOTS")
                .map(|v| v.split(':').map(str::to_string).filter(|s| !s.is_empty()).collect())
                .unwrap_or(defaults.trust_roots),
            client_cert_path: env::var("CREDMESH_CLIENT_CERT").ok(),
            client_key_path: env::var("CREDMESH_CLIENT_KEY").ok(),
            cert_rotation_path: env::var("CREDMESH_CERT_ROTATION_PATH").ok(),
            prefer_dense_codec: env_parse("CREDMESH_DENSE_CODEC")
                .unwrap_or(defaults.prefer_dense_codec),
        }
    }

    /// Reject configurations that cannot behave sensibly.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.max_retries < 1 {
            return Err(TransportError::InvalidConfig(
                "max_retries must be >= 1".into(),
            ));
        }
        if self.suspect_after_failures < 1 {
            return Err(TransportError::InvalidConfig(
                "suspect_after_failures must be >= 1".into(),
            ));
        }
        if self.offline_after_failures < self.suspect_after_failures {
            return Err(TransportError::InvalidConfig(
                "offline_after_failures must be >= suspect_after_failures".into(),
            ));
        }
        if self.recovery_successes < 1 {
            return Err(TransportError::InvalidConfig(
                "recovery_successes must be >= 1".into(),
            ));
        }
        if self.require_mtls && self.trust_roots.is_empty() {
            return Err(TransportError::InvalidConfig(
                "mutual auth requires at least one trust root".into(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok()?.parse().ok()
}

fn env_ms(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_millis)
}
