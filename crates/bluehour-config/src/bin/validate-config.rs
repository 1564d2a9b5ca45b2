//! Config validation CLI tool
//!
//! Validates a bluehourd configuration file and reports any errors.

use bluehour_util::default_config_path;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a bluehourd configuration file.");
            eprintln!();
            eprintln!("Example:");
            eprintln!("  validate-config {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match bluehour_config::load_config(&config_path) {
        Ok(config) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", bluehour_config::CURRENT_CONFIG_VERSION);
            println!("  Listen address: {}", config.server.bind);
            println!("  Data directory: {}", config.server.data_dir.display());
            println!(
                "  Proxy headers:  {}",
                if config.server.trust_proxy_headers { "trusted" } else { "ignored" }
            );
            println!(
                "  Rate limit:     {} requests / {} ms",
                config.rate_limit.max_requests,
                config.rate_limit.window.as_millis()
            );
            println!("  Session TTL:    {} s", config.sessions.ttl.as_secs());
            println!(
                "  Report days:    {} (max {})",
                config.report.default_days, config.report.max_days
            );

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                bluehour_config::ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                bluehour_config::ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                bluehour_config::ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                bluehour_config::ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver,
                        bluehour_config::CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
