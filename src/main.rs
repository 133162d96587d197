mod cli;
mod input;
mod model;
mod output;
mod runner;

use clap::Parser;
use cli::Cli;
use handshake_check::cancel_pair;
use output::OutputSink;
use runner::Runner;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    if cli.list_protocols {
        print!("{}", cli::render_catalog());
        return Ok(());
    }
    let cfg = cli.into_config()?;

    let (cancel, signal) = cancel_pair();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; abandoning in-flight probes");
            cancel.cancel();
        }
    });

    let sink = OutputSink::new(cfg.output.clone())?;
    let mut runner = Runner::new(cfg, sink.clone(), signal);
    runner.run().await?;
    sink.shutdown().await?;

    Ok(())
}
