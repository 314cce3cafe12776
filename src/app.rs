//! The application: startup, live reload and graceful shutdown.
//!
//! The process starts the store and its background jobs once, then loops:
//! start the frontends, wait for a signal. `SIGUSR1` stops the frontends,
//! re-reads the configuration and starts them again against the same store,
//! so a reload never loses swarm state. `SIGINT`/`SIGTERM` stop everything
//! and exit with code 0; fatal startup errors exit non-zero.
use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::bootstrap::app::{start_services, start_store_jobs};
use crate::bootstrap::config::{initialize_configuration, Args};
use crate::bootstrap::{jobs, logging};
use crate::core::statistics::{EventSender, Keeper};
use crate::core::storage;
use crate::servers::signals::{global_reload_signal, global_shutdown_signal};

/// Runs the tracker until a shutdown signal arrives.
///
/// # Errors
///
/// Will return an error for fatal startup failures: an unreadable or
/// invalid configuration, or a hook rejecting its options.
pub async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = initialize_configuration(&args).context("failed to read the configuration")?;

    logging::setup(&config, &args);

    let store = storage::build(&config.storage);

    let (stats_event_sender, stats_repo) = Keeper::new_active_instance();
    let stats_event_sender: Option<Arc<dyn EventSender>> = Some(Arc::from(stats_event_sender));

    let _store_jobs = start_store_jobs(&store, &stats_event_sender);

    loop {
        let services = start_services(&config, &store, &stats_event_sender, &stats_repo)
            .await
            .context("failed to start the tracker services")?;

        tokio::select! {
            () = global_reload_signal() => {
                info!("reloading; received SIGUSR1");

                stop_services(services).await;

                config = initialize_configuration(&args).context("failed to re-read the configuration")?;
            }
            () = global_shutdown_signal() => {
                info!("shutting down; received SIGINT/SIGTERM");

                stop_services(services).await;

                store.stop().context("failed to stop the peer store")?;

                break;
            }
        }
    }

    info!("goodbye");

    Ok(())
}

async fn stop_services(services: Vec<jobs::ServiceJob>) {
    for service in services {
        service.stop().await;
    }
}
