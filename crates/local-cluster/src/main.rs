// Local cluster harness - writes the cluster config, starts the servers
// and the benchmark, and tears everything down on Ctrl+C.
use anyhow::Context;
use clap::Parser;
use local_cluster::{
    cli::Args,
    launcher::ShutdownSignals,
    logger::set_up_logger,
    LaunchSettings,
    Launcher,
};
use tokio::sync::watch;
use tracing::{error, info};

// Conventional exit status for a process ended by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    set_up_logger(&args.log_level)?;

    info!("Start server locally with number {}", args.num_server);
    let settings = LaunchSettings::from(args);

    let signals = ShutdownSignals::install().context("failed to install shutdown signal handlers")?;
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    tokio::spawn(async move {
        signals.forward(shutdown_tx).await;
        error!("Interrupted during cleanup, exiting without finishing it");
        std::process::exit(INTERRUPTED_EXIT_CODE);
    });

    let mut launcher = Launcher::with_system(settings);
    let reason = launcher
        .run(shutdown_rx)
        .await
        .context("local cluster run failed")?;

    info!("Cluster stopped ({:?})", reason);
    Ok(())
}
