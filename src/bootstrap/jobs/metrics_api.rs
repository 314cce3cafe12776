//! Job serving the metrics exposition endpoint.
//!
//! A minimal HTTP application on `metrics_addr` rendering the statistics
//! repository in the Prometheus text exposition format. An empty address in
//! the configuration disables the job entirely.
use std::fmt::Write as _;
use std::net::SocketAddr;

use axum::extract::State;
use axum::routing::get;
use axum::Router;
use tokio::sync::oneshot;
use tracing::{error, info};

use super::{ServiceJob, Started};
use crate::core::statistics::{Metrics, Repo};
use crate::servers::signals::{shutdown_signal_with_message, Halted};

/// Starts the metrics server.
///
/// # Panics
///
/// Panics if the server does not report back its bound address.
pub async fn start_job(bind_to: SocketAddr, repo: Repo) -> ServiceJob {
    let (tx_start, rx_start) = oneshot::channel::<Started>();
    let (tx_halt, rx_halt) = oneshot::channel::<Halted>();

    let handle = tokio::spawn(async move {
        let listener = match tokio::net::TcpListener::bind(bind_to).await {
            Ok(listener) => listener,
            Err(e) => {
                error!("could not bind metrics server to {bind_to}: {e}");
                return;
            }
        };

        let address = listener.local_addr().expect("a bound listener has a local address");

        info!("metrics server listening on http://{address}/metrics");

        tx_start
            .send(Started { address })
            .expect("the server starter should wait for the started message");

        let app = Router::new().route("/metrics", get(handle_metrics)).with_state(repo);

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal_with_message(
                rx_halt,
                format!("shutting down metrics server on {address}"),
            ))
            .await
        {
            error!("metrics server on {address} exited with error: {e}");
        }
    });

    let address = rx_start
        .await
        .expect("the metrics server should report its bound address")
        .address;

    ServiceJob {
        name: "metrics server",
        address,
        handle,
        tx_halt,
    }
}

async fn handle_metrics(State(repo): State<Repo>) -> String {
    render(&repo.get_stats().await.clone())
}

/// Renders the metrics in the Prometheus text exposition format.
#[must_use]
pub fn render(metrics: &Metrics) -> String {
    let mut out = String::with_capacity(2048);

    writeln!(out, "# TYPE tracker_announces_total counter").unwrap();
    writeln!(
        out,
        "tracker_announces_total{{protocol=\"http\",family=\"inet\"}} {}",
        metrics.tcp4_announces_handled
    )
    .unwrap();
    writeln!(
        out,
        "tracker_announces_total{{protocol=\"http\",family=\"inet6\"}} {}",
        metrics.tcp6_announces_handled
    )
    .unwrap();
    writeln!(
        out,
        "tracker_announces_total{{protocol=\"udp\",family=\"inet\"}} {}",
        metrics.udp4_announces_handled
    )
    .unwrap();
    writeln!(
        out,
        "tracker_announces_total{{protocol=\"udp\",family=\"inet6\"}} {}",
        metrics.udp6_announces_handled
    )
    .unwrap();

    writeln!(out, "# TYPE tracker_scrapes_total counter").unwrap();
    writeln!(
        out,
        "tracker_scrapes_total{{protocol=\"http\",family=\"inet\"}} {}",
        metrics.tcp4_scrapes_handled
    )
    .unwrap();
    writeln!(
        out,
        "tracker_scrapes_total{{protocol=\"http\",family=\"inet6\"}} {}",
        metrics.tcp6_scrapes_handled
    )
    .unwrap();
    writeln!(
        out,
        "tracker_scrapes_total{{protocol=\"udp\",family=\"inet\"}} {}",
        metrics.udp4_scrapes_handled
    )
    .unwrap();
    writeln!(
        out,
        "tracker_scrapes_total{{protocol=\"udp\",family=\"inet6\"}} {}",
        metrics.udp6_scrapes_handled
    )
    .unwrap();

    writeln!(out, "# TYPE tracker_connections_total counter").unwrap();
    writeln!(
        out,
        "tracker_connections_total{{protocol=\"udp\",family=\"inet\"}} {}",
        metrics.udp4_connections_handled
    )
    .unwrap();
    writeln!(
        out,
        "tracker_connections_total{{protocol=\"udp\",family=\"inet6\"}} {}",
        metrics.udp6_connections_handled
    )
    .unwrap();

    writeln!(out, "# TYPE tracker_errors_total counter").unwrap();
    writeln!(
        out,
        "tracker_errors_total{{protocol=\"http\"}} {}",
        metrics.tcp4_errors_handled + metrics.tcp6_errors_handled
    )
    .unwrap();
    writeln!(
        out,
        "tracker_errors_total{{protocol=\"udp\"}} {}",
        metrics.udp4_errors_handled + metrics.udp6_errors_handled
    )
    .unwrap();

    writeln!(out, "# TYPE tracker_torrents gauge").unwrap();
    writeln!(out, "tracker_torrents {}", metrics.torrents).unwrap();
    writeln!(out, "# TYPE tracker_seeders gauge").unwrap();
    writeln!(out, "tracker_seeders {}", metrics.seeders).unwrap();
    writeln!(out, "# TYPE tracker_leechers gauge").unwrap();
    writeln!(out, "tracker_leechers {}", metrics.leechers).unwrap();

    writeln!(out, "# TYPE tracker_gc_sweep_duration_seconds summary").unwrap();
    writeln!(
        out,
        "tracker_gc_sweep_duration_seconds_sum {}",
        metrics.gc_sweep_duration_total.as_secs_f64()
    )
    .unwrap();
    writeln!(out, "tracker_gc_sweep_duration_seconds_count {}", metrics.gc_sweeps_run).unwrap();

    out
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::render;
    use crate::core::statistics::Metrics;

    #[test]
    fn it_should_render_counters_gauges_and_the_gc_summary() {
        let metrics = Metrics {
            tcp4_announces_handled: 1,
            udp4_scrapes_handled: 2,
            udp6_connections_handled: 3,
            torrents: 4,
            seeders: 5,
            leechers: 6,
            gc_sweeps_run: 2,
            gc_sweep_duration_total: Duration::from_millis(1500),
            ..Metrics::default()
        };

        let rendered = render(&metrics);

        assert!(rendered.contains("tracker_announces_total{protocol=\"http\",family=\"inet\"} 1"));
        assert!(rendered.contains("tracker_scrapes_total{protocol=\"udp\",family=\"inet\"} 2"));
        assert!(rendered.contains("tracker_connections_total{protocol=\"udp\",family=\"inet6\"} 3"));
        assert!(rendered.contains("tracker_torrents 4"));
        assert!(rendered.contains("tracker_seeders 5"));
        assert!(rendered.contains("tracker_leechers 6"));
        assert!(rendered.contains("tracker_gc_sweep_duration_seconds_sum 1.5"));
        assert!(rendered.contains("tracker_gc_sweep_duration_seconds_count 2"));
    }
}
