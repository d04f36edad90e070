//! `pmagent serve`

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::server;
use crate::store::{PlanningManager, ProjectStore, ToolRegistry};

/// Run the MCP server until interrupted
pub async fn run_serve(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.server.data_dir = data_dir;
    }

    let addr = config.server.addr()?;
    let data_dir = &config.server.data_dir;
    tracing::info!(data_dir = %data_dir.display(), "opening data stores");

    let registry = Arc::new(ToolRegistry::new(
        Arc::new(ProjectStore::open(data_dir)?),
        Arc::new(PlanningManager::open(data_dir)?),
    ));
    server::serve(addr, registry).await
}
