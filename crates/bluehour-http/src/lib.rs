//! JSON HTTP API for bluehour
//!
//! Routes live under `/api`. Mutating routes pass through the shared
//! [`AdmissionGuard`](bluehour_util::AdmissionGuard) keyed by action and
//! client identity; authenticated routes check the session cookie first.

mod error;
mod extract;
mod routes;
mod state;

pub use error::AppError;
pub use extract::{ClientIdentity, CurrentUser, SESSION_COOKIE, resolve_client_identity};
pub use routes::router;
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::info;

/// Serve the API on `listener` until `shutdown` resolves
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "HTTP API listening");
    }

    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
}
