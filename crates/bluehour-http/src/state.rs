//! Shared application state

use bluehour_config::ServiceConfig;
use bluehour_core::{CoreResult, JournalService};
use bluehour_util::AdmissionGuard;
use std::sync::Arc;
use tracing::warn;

use crate::AppError;

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub journal: Arc<JournalService>,
    pub guard: Arc<AdmissionGuard>,
    pub config: Arc<ServiceConfig>,
}

impl AppState {
    pub fn new(
        journal: Arc<JournalService>,
        guard: Arc<AdmissionGuard>,
        config: Arc<ServiceConfig>,
    ) -> Self {
        Self {
            journal,
            guard,
            config,
        }
    }

    /// Run a journal operation on the blocking pool (SQLite and password
    /// hashing are synchronous).
    pub async fn run<T, F>(&self, op: F) -> Result<T, AppError>
    where
        T: Send + 'static,
        F: FnOnce(&JournalService) -> CoreResult<T> + Send + 'static,
    {
        let journal = self.journal.clone();
        match tokio::task::spawn_blocking(move || op(&journal)).await {
            Ok(result) => result.map_err(AppError::from),
            Err(e) => Err(AppError::Internal(format!("journal task failed: {e}"))),
        }
    }

    /// Spend one unit of the guard budget for `action` from `client`.
    ///
    /// A refusal is audited before the 429 is returned.
    pub async fn admit(&self, action: &str, client: &str, message: &str) -> Result<(), AppError> {
        let key = format!("{action}:{client}");
        if self.guard.admit(&key) {
            return Ok(());
        }

        warn!(key = %key, "Request rate limited");
        // Audit write failures are already logged by the journal
        let _ = self
            .run(move |journal| {
                journal.record_rate_limited(&key);
                Ok(())
            })
            .await;

        Err(AppError::RateLimited(message.to_string()))
    }
}
