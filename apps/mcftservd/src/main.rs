//! mcft ingest daemon entry point.

mod app;
mod config;

use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting mcftservd");

    let config = config::Config::load()?;
    tracing::info!(
        port = config.port,
        mcfs_dir = %config.mcfs_dir.display(),
        users = config.users.len(),
        projects = config.projects.len(),
        "configuration loaded"
    );

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(app::run(config))?;

    tracing::info!("mcftservd shut down cleanly");
    Ok(())
}
