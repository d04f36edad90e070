//! `pmagent tools`

use colored::Colorize;

use crate::config::Config;
use crate::error::Result;

/// Print the server's tool catalog
pub async fn run_tools(config: &Config, json: bool) -> Result<()> {
    let client = super::client(config)?;
    let tools = client.list_tools().await?;

    if json {
        println!("{}", serde_json::to_string(&tools)?);
        return Ok(());
    }

    for tool in &tools {
        println!("{}  {}", tool.name.cyan().bold(), tool.description);
    }
    println!("\n{} tools", tools.len());
    Ok(())
}
