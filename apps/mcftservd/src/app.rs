//! Wires the store, content layout and server together.

use std::sync::Arc;
use std::time::Duration;

use mcft_server::{IngestServer, ServerConfig, Services};
use mcft_store::MemoryStore;
use mcft_transfer::ContentLayout;

use crate::config::Config;

/// How long shutdown waits for running sessions to finalize.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs the daemon until SIGINT or a server failure.
pub async fn run(config: Config) -> anyhow::Result<()> {
    let store = Arc::new(seed_store(&config).await);
    let layout = ContentLayout::new(&config.mcfs_dir);
    let services = Services::new(store.clone(), store, layout);

    let server_config = ServerConfig {
        port: config.port,
        max_message_size: config.max_message_size,
    };
    let server = IngestServer::new(server_config, services);
    let server_run = Arc::clone(&server);
    let mut server_task = tokio::spawn(async move { server_run.run().await });

    tokio::select! {
        result = &mut server_task => {
            result??;
            return Ok(());
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("SIGINT received, shutting down");
        }
    }

    server.shutdown();
    server_task.await??;
    drain(&server).await;
    Ok(())
}

/// Builds the in-process store from the config's seed records.
pub async fn seed_store(config: &Config) -> MemoryStore {
    let store = MemoryStore::new();
    for user in &config.users {
        store.add_user(user.id, &user.name, &user.api_token).await;
    }
    for project in &config.projects {
        store
            .add_project(project.id, &project.name, project.owner_id)
            .await;
        for member in &project.members {
            store.grant_access(*member, project.id).await;
        }
    }
    store
}

/// Waits for running sessions to finish their teardown.
async fn drain(server: &IngestServer) {
    let deadline = tokio::time::Instant::now() + DRAIN_TIMEOUT;
    while server.active_sessions() > 0 {
        if tokio::time::Instant::now() >= deadline {
            tracing::warn!(
                active = server.active_sessions(),
                "sessions still running at shutdown"
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
