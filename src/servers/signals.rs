//! Process signal handling.
//!
//! Every long-lived service task (frontends, the metrics server, the
//! background jobs) is stopped through a oneshot [`Halted`] channel, and
//! additionally honors the global interrupt/terminate signals. The main
//! application loop listens for `SIGUSR1` separately to trigger a live
//! reload.
use derive_more::Display;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::info;

/// The message a spawned service task receives from the main application to
/// shut down.
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
pub enum Halted {
    Normal,
    Dropped,
}

/// Creates a future awaiting the terminate signal (unix only).
///
/// # Panics
///
/// Panics if the signal handler cannot be installed.
#[must_use]
pub fn global_terminate_signal<'a>() -> BoxFuture<'a, ()> {
    #[cfg(unix)]
    let terminate: BoxFuture<'a, ()> = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install the terminate signal handler")
            .recv()
            .await;
    }
    .boxed();

    #[cfg(not(unix))]
    let terminate: BoxFuture<'a, ()> = std::future::pending::<()>().boxed();

    terminate
}

/// Creates a future awaiting the interrupt (`ctrl_c`) signal.
///
/// # Panics
///
/// Panics if the signal handler cannot be installed.
#[must_use]
pub fn global_interrupt_signal<'a>() -> BoxFuture<'a, ()> {
    async {
        tokio::signal::ctrl_c().await.expect("failed to install the Ctrl+C handler");
    }
    .boxed()
}

/// Creates a future awaiting `SIGUSR1`, the live-reload trigger (unix only).
///
/// # Panics
///
/// Panics if the signal handler cannot be installed.
#[must_use]
pub fn global_reload_signal<'a>() -> BoxFuture<'a, ()> {
    #[cfg(unix)]
    let reload: BoxFuture<'a, ()> = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::user_defined1())
            .expect("failed to install the SIGUSR1 handler")
            .recv()
            .await;
    }
    .boxed();

    #[cfg(not(unix))]
    let reload: BoxFuture<'a, ()> = std::future::pending::<()>().boxed();

    reload
}

/// Resolves on `ctrl_c` or the terminate signal.
pub async fn global_shutdown_signal() {
    let interrupt = global_interrupt_signal();
    let terminate = global_terminate_signal();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {}
    }
}

/// Resolves when the halt channel or the global shutdown signal resolves.
///
/// # Panics
///
/// Panics if the sending half of the halt channel was dropped without
/// sending.
pub async fn shutdown_signal(rx_halt: tokio::sync::oneshot::Receiver<Halted>) {
    let halt = async {
        match rx_halt.await {
            Ok(signal) => signal,
            Err(err) => panic!("failed to install the halt channel: {err}"),
        }
    };

    tokio::select! {
        signal = halt => { info!("halt signal processed: {signal}") },
        () = global_shutdown_signal() => { info!("global shutdown signal processed") }
    }
}

/// Same as [`shutdown_signal`], but logs a message when it resolves.
pub async fn shutdown_signal_with_message(rx_halt: tokio::sync::oneshot::Receiver<Halted>, message: String) {
    shutdown_signal(rx_halt).await;

    info!("{message}");
}
