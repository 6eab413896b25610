//! Relay command handler

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::info;

use catch_core::remote::relay;
use catch_core::{Config, MemoryRemote};

use crate::output::Output;

/// Run a relay server until interrupted
///
/// The tree is persisted to `data` (defaults to the config's tree file), so a
/// restarted relay serves the same inventories.
pub async fn run(
    config: &Config,
    bind: Option<String>,
    data: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.relay_bind.clone());
    let data = data.unwrap_or_else(|| config.tree_path());

    let tree =
        MemoryRemote::open(&data).with_context(|| format!("Failed to open relay data {:?}", data))?;
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    let addr = listener.local_addr()?;

    info!(%addr, data = ?data, "Relay listening");
    output.message(&format!("Relay listening on ws://{}", addr));
    output.message(&format!("Data: {}", data.display()));
    output.message("Press Ctrl-C to stop");

    tokio::select! {
        result = relay::serve(listener, tree) => {
            result.context("Relay server failed")?;
        }
        _ = tokio::signal::ctrl_c() => {
            output.message("Relay stopped");
        }
    }

    Ok(())
}
