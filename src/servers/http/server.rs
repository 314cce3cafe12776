//! The HTTP server: an axum application serving the tracker routes.
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

use super::handlers::{self, HttpService};
use crate::bootstrap::jobs::Started;
use crate::servers::signals::{shutdown_signal_with_message, Halted};

/// Builds the tracker router.
#[must_use]
pub fn router(service: Arc<HttpService>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/announce", get(handlers::handle_announce))
        .route("/scrape", get(handlers::handle_scrape))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(service)
}

/// Starts the HTTP server task.
///
/// The task binds the listener, reports the bound address through
/// `tx_start` and serves requests until the halt channel or a global
/// shutdown signal fires.
#[must_use]
pub fn start_job(
    bind_to: SocketAddr,
    service: Arc<HttpService>,
    request_timeout: Duration,
    tx_start: oneshot::Sender<Started>,
    rx_halt: oneshot::Receiver<Halted>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(bind_to).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("could not bind http tracker to {bind_to}: {e}");
                return;
            }
        };

        let address = listener.local_addr().expect("a bound listener has a local address");

        info!("http tracker listening on http://{address}");

        tx_start
            .send(Started { address })
            .expect("the server starter should wait for the started message");

        let app = router(service, request_timeout);

        if let Err(e) = axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown_signal_with_message(
                rx_halt,
                format!("shutting down http tracker on {address}"),
            ))
            .await
        {
            error!("http tracker on {address} exited with error: {e}");
        }
    })
}
