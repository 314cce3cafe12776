use clap::Parser;
use swarm_tracker::app;
use swarm_tracker::bootstrap::config::Args;

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(error) = app::run(args).await {
        eprintln!("swarm_tracker: {error:#}");
        std::process::exit(1);
    }
}
