//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// HTTP server settings
    #[serde(default)]
    pub server: RawServerConfig,

    /// Admission guard settings
    #[serde(default)]
    pub rate_limit: RawRateLimitConfig,

    /// Login session settings
    #[serde(default)]
    pub sessions: RawSessionConfig,

    /// Password hashing settings
    #[serde(default)]
    pub auth: RawAuthConfig,

    /// Report defaults
    #[serde(default)]
    pub report: RawReportConfig,
}

/// Server-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServerConfig {
    /// Listen address (default: 127.0.0.1:3000)
    pub bind: Option<String>,

    /// Data directory for the database
    pub data_dir: Option<PathBuf>,

    /// Identify clients by X-Forwarded-For / X-Real-IP. Only enable behind
    /// a reverse proxy that sets them.
    #[serde(default)]
    pub trust_proxy_headers: bool,

    /// Mark the session cookie `Secure`
    #[serde(default)]
    pub secure_cookies: bool,
}

/// Admission guard settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawRateLimitConfig {
    /// Trailing window length in milliseconds
    pub window_ms: Option<u64>,

    /// Requests admitted per key and window
    pub max_requests: Option<u32>,

    /// How often idle keys and expired sessions are swept
    pub sweep_interval_secs: Option<u64>,
}

/// Login session settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawSessionConfig {
    /// Session lifetime in days
    pub ttl_days: Option<u64>,
}

/// Password hashing settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawAuthConfig {
    /// PBKDF2 iteration count for new password hashes
    pub password_iterations: Option<u32>,
}

/// Report defaults
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawReportConfig {
    /// Days covered when the request doesn't say
    pub default_days: Option<u32>,

    /// Upper bound on requested days
    pub max_days: Option<u32>,
}
