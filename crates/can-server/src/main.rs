use std::process;

use can_server::{Args, Config, Emitter, ServerError};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn run(args: Args) -> Result<(), ServerError> {
    let config = Config::try_from(args)?;
    let emitter = Emitter::bind(config).await?;
    let report = emitter.serve(ctrl_c()).await?;
    info!(
        "Stopped after {} frames ({:?})",
        report.frames_sent, report.shutdown
    );
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = Args::parse();
    init_tracing();

    if let Err(e) = run(args).await {
        error!("{}", e);
        process::exit(1);
    }
}
