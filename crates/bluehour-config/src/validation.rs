//! Configuration validation

use crate::schema::RawConfig;
use bluehour_util::MAX_TRAILING_DAYS;
use std::net::SocketAddr;
use thiserror::Error;

/// Lowest accepted PBKDF2 iteration count
pub const MIN_PASSWORD_ITERATIONS: u32 = 1_000;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("[{section}] {field}: {message}")]
    InvalidValue {
        section: &'static str,
        field: &'static str,
        message: String,
    },

    #[error("Invalid bind address '{value}': {message}")]
    InvalidBindAddress { value: String, message: String },

    #[error("report.default_days ({default_days}) exceeds report.max_days ({max_days})")]
    DefaultDaysExceedMax { default_days: u32, max_days: u32 },
}

/// Validate a raw configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(bind) = &config.server.bind
        && let Err(e) = parse_bind(bind)
    {
        errors.push(e);
    }

    let rate_limit = &config.rate_limit;
    require_positive(&mut errors, "rate_limit", "window_ms", rate_limit.window_ms);
    require_positive(
        &mut errors,
        "rate_limit",
        "max_requests",
        rate_limit.max_requests.map(u64::from),
    );
    require_positive(
        &mut errors,
        "rate_limit",
        "sweep_interval_secs",
        rate_limit.sweep_interval_secs,
    );

    require_positive(&mut errors, "sessions", "ttl_days", config.sessions.ttl_days);

    if let Some(iterations) = config.auth.password_iterations
        && iterations < MIN_PASSWORD_ITERATIONS
    {
        errors.push(ValidationError::InvalidValue {
            section: "auth",
            field: "password_iterations",
            message: format!("must be at least {MIN_PASSWORD_ITERATIONS}"),
        });
    }

    let report = &config.report;
    require_positive(&mut errors, "report", "default_days", report.default_days.map(u64::from));
    require_positive(&mut errors, "report", "max_days", report.max_days.map(u64::from));
    if let Some(max_days) = report.max_days
        && i64::from(max_days) > MAX_TRAILING_DAYS
    {
        errors.push(ValidationError::InvalidValue {
            section: "report",
            field: "max_days",
            message: format!("must be at most {MAX_TRAILING_DAYS}"),
        });
    }

    let default_days = report.default_days.unwrap_or(crate::DEFAULT_REPORT_DAYS);
    let max_days = report.max_days.unwrap_or(crate::DEFAULT_MAX_REPORT_DAYS);
    if default_days > 0 && max_days > 0 && default_days > max_days {
        errors.push(ValidationError::DefaultDaysExceedMax {
            default_days,
            max_days,
        });
    }

    errors
}

fn require_positive(
    errors: &mut Vec<ValidationError>,
    section: &'static str,
    field: &'static str,
    value: Option<u64>,
) {
    if value == Some(0) {
        errors.push(ValidationError::InvalidValue {
            section,
            field,
            message: "must be greater than zero".into(),
        });
    }
}

/// Parse a listen address like `127.0.0.1:3000` or `[::1]:3000`
pub fn parse_bind(value: &str) -> Result<SocketAddr, ValidationError> {
    value
        .parse()
        .map_err(|e: std::net::AddrParseError| ValidationError::InvalidBindAddress {
            value: value.to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(toml_str: &str) -> RawConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_parse_bind() {
        assert_eq!(parse_bind("127.0.0.1:3000").unwrap().port(), 3000);
        assert!(parse_bind("[::1]:8080").unwrap().is_ipv6());
        assert!(parse_bind("localhost").is_err());
        assert!(parse_bind("127.0.0.1").is_err());
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate_config(&raw("config_version = 1")).is_empty());
    }

    #[test]
    fn collects_every_error() {
        let config = raw(
            r#"
            config_version = 1

            [server]
            bind = "nowhere"

            [rate_limit]
            window_ms = 0
            sweep_interval_secs = 0

            [sessions]
            ttl_days = 0

            [auth]
            password_iterations = 10
        "#,
        );

        let errors = validate_config(&config);
        assert_eq!(errors.len(), 5);
        assert!(matches!(errors[0], ValidationError::InvalidBindAddress { .. }));
    }

    #[test]
    fn default_days_must_fit_max() {
        let config = raw(
            r#"
            config_version = 1

            [report]
            default_days = 30
            max_days = 14
        "#,
        );

        let errors = validate_config(&config);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::DefaultDaysExceedMax {
                default_days: 30,
                max_days: 14
            }]
        ));
    }

    #[test]
    fn default_days_checked_against_default_max() {
        let config = raw(
            r#"
            config_version = 1

            [report]
            default_days = 400
        "#,
        );

        assert_eq!(validate_config(&config).len(), 1);
    }

    #[test]
    fn max_days_is_bounded() {
        let config = raw(
            r#"
            config_version = 1

            [report]
            max_days = 100000
        "#,
        );

        let errors = validate_config(&config);
        assert!(matches!(
            errors.as_slice(),
            [ValidationError::InvalidValue {
                section: "report",
                field: "max_days",
                ..
            }]
        ));
        assert!(validate_config(&raw("config_version = 1\n[report]\nmax_days = 3660")).is_empty());
    }
}
