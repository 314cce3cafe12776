//! Assembly of the pipeline and the service jobs.
use std::sync::Arc;

use swarm_tracker_configuration::Configuration;
use tokio::task::JoinHandle;

use super::jobs::{http_tracker, metrics_api, stats_reporter, swarm_cleanup, udp_tracker, ServiceJob};
use crate::core::hooks::{self, build_hooks};
use crate::core::pipeline::Logic;
use crate::core::statistics::{EventSender, Repo};
use crate::core::storage::PeerStorage;

/// Builds the request pipeline from the configuration.
///
/// # Errors
///
/// Will return a [`hooks::BuildError`] if a configured hook rejects its
/// options. Fatal at startup.
pub fn build_logic(config: &Configuration, store: Arc<dyn PeerStorage>) -> Result<Logic, hooks::BuildError> {
    let pre_hooks = build_hooks(&config.prehooks)?;
    let post_hooks = build_hooks(&config.posthooks)?;

    Ok(Logic::new(store, config.response.clone(), pre_hooks, post_hooks))
}

/// Starts the configured frontends and the metrics server.
///
/// Called once at startup and again after every live reload; the returned
/// jobs are the ones a reload stops.
///
/// # Errors
///
/// Will return a [`hooks::BuildError`] if a configured hook rejects its
/// options.
pub async fn start_services(
    config: &Configuration,
    store: &Arc<dyn PeerStorage>,
    stats_event_sender: &Option<Arc<dyn EventSender>>,
    stats_repo: &Repo,
) -> Result<Vec<ServiceJob>, hooks::BuildError> {
    let logic = Arc::new(build_logic(config, store.clone())?);

    let mut jobs: Vec<ServiceJob> = Vec::new();

    if let Some(udp_config) = &config.udp {
        jobs.push(udp_tracker::start_job(udp_config, logic.clone(), stats_event_sender.clone()).await);
    }

    if let Some(http_config) = &config.http {
        jobs.push(http_tracker::start_job(http_config, logic.clone(), stats_event_sender.clone()).await);
    }

    if let Some(metrics_addr) = config.metrics_addr {
        jobs.push(metrics_api::start_job(metrics_addr, stats_repo.clone()).await);
    }

    Ok(jobs)
}

/// Starts the background jobs bound to the store: garbage collection and
/// statistics collection, where the store asks the core to drive them.
///
/// These survive live reloads; they die with the store.
#[must_use]
pub fn start_store_jobs(
    store: &Arc<dyn PeerStorage>,
    stats_event_sender: &Option<Arc<dyn EventSender>>,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::new();

    if let Some(policy) = store.garbage_collection_policy() {
        handles.push(swarm_cleanup::start_job(store, policy, stats_event_sender.clone()));
    }

    if let Some(reporting_interval) = store.statistics_policy() {
        handles.push(stats_reporter::start_job(store, reporting_interval, stats_event_sender.clone()));
    }

    handles
}
