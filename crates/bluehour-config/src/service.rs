//! Validated service configuration

use crate::schema::{
    RawAuthConfig, RawConfig, RawRateLimitConfig, RawReportConfig, RawServerConfig,
    RawSessionConfig,
};
use crate::validation::parse_bind;
use bluehour_util::{DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW, default_data_dir};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Default listen port
pub const DEFAULT_PORT: u16 = 3000;

/// Default stale-key sweep interval
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Default session lifetime in days
pub const DEFAULT_SESSION_TTL_DAYS: u64 = 7;

/// Default PBKDF2 iteration count
pub const DEFAULT_PASSWORD_ITERATIONS: u32 = 100_000;

/// Default report range
pub const DEFAULT_REPORT_DAYS: u32 = 7;

/// Default upper bound on report range
pub const DEFAULT_MAX_REPORT_DAYS: u32 = 365;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Validated configuration ready for use by the service
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub server: ServerConfig,
    pub rate_limit: RateLimitConfig,
    pub sessions: SessionConfig,
    pub auth: AuthConfig,
    pub report: ReportConfig,
}

impl ServiceConfig {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self {
            server: ServerConfig::from_raw(raw.server),
            rate_limit: RateLimitConfig::from_raw(raw.rate_limit),
            sessions: SessionConfig::from_raw(raw.sessions),
            auth: AuthConfig::from_raw(raw.auth),
            report: ReportConfig::from_raw(raw.report),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub data_dir: PathBuf,
    pub trust_proxy_headers: bool,
    pub secure_cookies: bool,
}

impl ServerConfig {
    fn from_raw(raw: RawServerConfig) -> Self {
        let defaults = Self::default();
        Self {
            bind: raw
                .bind
                .as_deref()
                .and_then(|b| parse_bind(b).ok())
                .unwrap_or(defaults.bind),
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            trust_proxy_headers: raw.trust_proxy_headers,
            secure_cookies: raw.secure_cookies,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_PORT)),
            data_dir: default_data_dir(),
            trust_proxy_headers: false,
            secure_cookies: false,
        }
    }
}

/// Admission guard configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
    pub sweep_interval: Duration,
}

impl RateLimitConfig {
    fn from_raw(raw: RawRateLimitConfig) -> Self {
        Self {
            window: raw.window_ms.map(Duration::from_millis).unwrap_or(DEFAULT_WINDOW),
            max_requests: raw.max_requests.unwrap_or(DEFAULT_MAX_REQUESTS),
            sweep_interval: raw
                .sweep_interval_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SWEEP_INTERVAL),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::from_raw(RawRateLimitConfig::default())
    }
}

/// Login session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub ttl: Duration,
}

impl SessionConfig {
    fn from_raw(raw: RawSessionConfig) -> Self {
        let days = raw.ttl_days.unwrap_or(DEFAULT_SESSION_TTL_DAYS);
        Self {
            ttl: Duration::from_secs(days.saturating_mul(SECONDS_PER_DAY)),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_raw(RawSessionConfig::default())
    }
}

/// Password hashing configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub password_iterations: u32,
}

impl AuthConfig {
    fn from_raw(raw: RawAuthConfig) -> Self {
        Self {
            password_iterations: raw.password_iterations.unwrap_or(DEFAULT_PASSWORD_ITERATIONS),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self::from_raw(RawAuthConfig::default())
    }
}

/// Report configuration
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub default_days: u32,
    pub max_days: u32,
}

impl ReportConfig {
    fn from_raw(raw: RawReportConfig) -> Self {
        Self {
            default_days: raw.default_days.unwrap_or(DEFAULT_REPORT_DAYS),
            max_days: raw.max_days.unwrap_or(DEFAULT_MAX_REPORT_DAYS),
        }
    }

    /// Resolve a requested day count: missing means the default, and the
    /// result is kept within `1..=max_days`.
    pub fn resolve_days(&self, requested: Option<i64>) -> i64 {
        requested
            .unwrap_or(self.default_days as i64)
            .clamp(1, self.max_days.max(1) as i64)
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self::from_raw(RawReportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.server.bind.to_string(), "127.0.0.1:3000");
        assert_eq!(config.rate_limit.window, Duration::from_secs(60));
        assert_eq!(config.rate_limit.max_requests, 30);
        assert_eq!(config.sessions.ttl, Duration::from_secs(7 * 86_400));
        assert_eq!(config.auth.password_iterations, 100_000);
        assert_eq!(config.report.max_days, 365);
    }

    #[test]
    fn resolve_report_days() {
        let report = ReportConfig {
            default_days: 7,
            max_days: 30,
        };

        assert_eq!(report.resolve_days(None), 7);
        assert_eq!(report.resolve_days(Some(14)), 14);
        assert_eq!(report.resolve_days(Some(0)), 1);
        assert_eq!(report.resolve_days(Some(-3)), 1);
        assert_eq!(report.resolve_days(Some(1000)), 30);
    }
}
