//! bluehourd - The Blue Hour mood journal service
//!
//! Wires together:
//! - Configuration loading
//! - Store initialization
//! - Journal service and admission guard
//! - HTTP API
//! - Periodic housekeeping (stale guard keys, expired sessions)
//!
//! Also carries a few maintenance subcommands that work on the database
//! directly.

mod render;

use anyhow::{Context, Result, bail};
use bluehour_api::SignUpRequest;
use bluehour_config::{ServiceConfig, load_config};
use bluehour_core::{JournalService, normalize_email};
use bluehour_http::AppState;
use bluehour_store::{AuditEvent, AuditEventType, SqliteStore, Store};
use bluehour_util::{
    AdmissionGuard, DATABASE_FILENAME, default_config_path, format_datetime_full,
    parse_calendar_date,
};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// bluehourd - Mood journal service
#[derive(Parser, Debug)]
#[command(name = "bluehourd")]
#[command(about = "Mood journal service with gentle reflection reports", long_about = None)]
struct Args {
    /// Configuration file path (default: ~/.config/bluehour/config.toml)
    #[arg(short, long, env = "BLUEHOUR_CONFIG", default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Data directory override (or set BLUEHOUR_DATA_DIR env var)
    #[arg(short, long, env = "BLUEHOUR_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Listen address override (or set BLUEHOUR_BIND env var)
    #[arg(short, long, env = "BLUEHOUR_BIND")]
    bind: Option<SocketAddr>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service (default)
    Serve,

    /// Create an account
    CreateUser {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        /// Password (or set BLUEHOUR_PASSWORD env var)
        #[arg(long, env = "BLUEHOUR_PASSWORD")]
        password: String,
    },

    /// Show database statistics and recent audit events
    CheckDatabase {
        /// Number of audit events to show
        #[arg(long, default_value_t = 10)]
        audit_limit: usize,
    },

    /// Print a reflection report for one account
    Report {
        #[arg(long)]
        email: String,

        /// Number of days, ending today (default from config)
        #[arg(long)]
        days: Option<i64>,

        /// Last day of the report, YYYY-MM-DD (default: today)
        #[arg(long)]
        until: Option<String>,
    },
}

/// Load the config file, falling back to defaults when it does not exist,
/// then apply command-line overrides.
fn resolve_config(args: &Args) -> Result<ServiceConfig> {
    let mut config = if args.config.exists() {
        let config = load_config(&args.config)
            .with_context(|| format!("Failed to load config from {:?}", args.config))?;
        info!(config_path = %args.config.display(), "Configuration loaded");
        config
    } else {
        warn!(
            config_path = %args.config.display(),
            "Config file not found, using defaults"
        );
        ServiceConfig::default()
    };

    if let Some(data_dir) = &args.data_dir {
        config.server.data_dir = data_dir.clone();
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }

    Ok(config)
}

fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>> {
    let data_dir = &config.server.data_dir;
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("Failed to create data directory {:?}", data_dir))?;

    let db_path = data_dir.join(DATABASE_FILENAME);
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database {:?}", db_path))?;

    info!(db_path = %db_path.display(), "Store initialized");
    Ok(Arc::new(store))
}

/// Main service state
struct Service {
    config: Arc<ServiceConfig>,
    store: Arc<dyn Store>,
    journal: Arc<JournalService>,
    guard: Arc<AdmissionGuard>,
}

impl Service {
    fn new(config: ServiceConfig) -> Result<Self> {
        let store = open_store(&config)?;
        let journal = Arc::new(JournalService::new(store.clone(), &config));
        let guard = Arc::new(AdmissionGuard::new(
            config.rate_limit.max_requests,
            config.rate_limit.window,
        ));

        info!(
            max_requests = config.rate_limit.max_requests,
            window_ms = config.rate_limit.window.as_millis() as u64,
            "Admission guard initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            store,
            journal,
            guard,
        })
    }

    async fn run(self) -> Result<()> {
        let bind = self.config.server.bind;
        let listener = TcpListener::bind(bind)
            .await
            .with_context(|| format!("Failed to bind {bind}"))?;

        self.store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStarted))?;

        let state = AppState::new(self.journal.clone(), self.guard.clone(), self.config.clone());
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let mut server = tokio::spawn(bluehour_http::serve(listener, state, async move {
            let _ = shutdown_rx.await;
        }));

        // Set up signal handlers
        let mut sigterm =
            signal(SignalKind::terminate()).context("Failed to create SIGTERM handler")?;
        let mut sigint =
            signal(SignalKind::interrupt()).context("Failed to create SIGINT handler")?;
        let mut sighup = signal(SignalKind::hangup()).context("Failed to create SIGHUP handler")?;

        let mut sweep_timer = tokio::time::interval(self.config.rate_limit.sweep_interval);

        info!(%bind, "Service running");

        let finished = loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                    break None;
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                    break None;
                }
                _ = sighup.recv() => {
                    info!("Received SIGHUP, shutting down gracefully");
                    break None;
                }

                result = &mut server => {
                    error!("HTTP server stopped unexpectedly");
                    break Some(result);
                }

                _ = sweep_timer.tick() => {
                    self.housekeeping().await;
                }
            }
        };

        info!("Shutting down bluehourd");
        let _ = shutdown_tx.send(());
        let result = match finished {
            Some(result) => result,
            None => server.await,
        };

        if let Err(e) = self
            .store
            .append_audit(AuditEvent::new(AuditEventType::ServiceStopped))
        {
            warn!(error = %e, "Failed to log service shutdown");
        }

        result
            .context("HTTP server task panicked")?
            .context("HTTP server failed")?;

        info!("Shutdown complete");
        Ok(())
    }

    async fn housekeeping(&self) {
        let evicted = self.guard.sweep();

        let journal = self.journal.clone();
        match tokio::task::spawn_blocking(move || journal.purge_expired_sessions()).await {
            Ok(Ok(purged)) => debug!(evicted, purged, "Housekeeping complete"),
            Ok(Err(e)) => warn!(error = %e, "Failed to purge expired sessions"),
            Err(e) => warn!(error = %e, "Housekeeping task failed"),
        }
    }
}

fn create_user(config: &ServiceConfig, email: String, name: String, password: String) -> Result<()> {
    let store = open_store(config)?;
    let journal = JournalService::new(store, config);

    let user = journal
        .sign_up(&SignUpRequest {
            email,
            password,
            full_name: name,
        })
        .context("Failed to create user")?;

    println!("Created user {} ({})", user.email, user.id);
    Ok(())
}

fn check_database(config: &ServiceConfig, audit_limit: usize) -> Result<()> {
    let store = open_store(config)?;

    if !store.is_healthy() {
        bail!("Database is not responding");
    }

    println!(
        "Database:  {}",
        config.server.data_dir.join(DATABASE_FILENAME).display()
    );
    println!("Users:     {}", store.count_users()?);
    println!("Entries:   {}", store.count_entries()?);

    let audits = store.get_recent_audits(audit_limit)?;
    if !audits.is_empty() {
        println!();
        println!("Recent audit events:");
        for event in audits {
            println!(
                "  {}  {:?}",
                format_datetime_full(&event.timestamp),
                event.event
            );
        }
    }

    Ok(())
}

fn print_report(
    config: &ServiceConfig,
    email: &str,
    days: Option<i64>,
    until: Option<&str>,
) -> Result<()> {
    let store = open_store(config)?;
    let journal = JournalService::new(store.clone(), config);

    let user = store
        .find_user_by_email(&normalize_email(email))?
        .with_context(|| format!("No account for {email}"))?
        .to_user();

    let reference = match until {
        Some(raw) => parse_calendar_date(raw)
            .with_context(|| format!("Invalid date {raw:?}, expected YYYY-MM-DD"))?,
        None => bluehour_util::today(),
    };
    let days = config.report.resolve_days(days);

    let report = journal.report(&user, days, reference)?;
    print!("{}", render::render_report(&report, &user.full_name));
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let config = resolve_config(&args)?;

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            info!(version = env!("CARGO_PKG_VERSION"), "bluehourd starting");
            let service = Service::new(config)?;
            service.run().await
        }
        Command::CreateUser {
            email,
            name,
            password,
        } => create_user(&config, email, name, password),
        Command::CheckDatabase { audit_limit } => check_database(&config, audit_limit),
        Command::Report { email, days, until } => {
            print_report(&config, &email, days, until.as_deref())
        }
    }
}
