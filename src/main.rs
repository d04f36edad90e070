//! PMAgent - Project-management MCP server and client CLI

use anyhow::Result;
use clap::CommandFactory;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use pmagent::cli::{Cli, Commands};
use pmagent::commands;
use pmagent::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse_args();

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Serve {
            host,
            port,
            data_dir,
        } => {
            tracing::info!("starting MCP server");
            commands::serve::run_serve(config, host, port, data_dir).await
        }
        Commands::Tools { json } => commands::tools::run_tools(&config, json).await,
        Commands::Invoke { name, params } => {
            commands::invoke::run_invoke(&config, &name, params).await
        }
        Commands::Projects { command } => commands::projects::run_projects(&config, command).await,
        Commands::Tasks { command } => commands::tasks::run_tasks(&config, command).await,
        Commands::Plan { command } => commands::plan::run_plan(&config, command).await,
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pmagent=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
