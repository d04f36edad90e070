//! Command handlers
//!
//! One module per CLI command. Client-side handlers build a [`PmClient`]
//! from the configuration and print JSON results to stdout.

pub mod invoke;
pub mod plan;
pub mod projects;
pub mod serve;
pub mod tasks;
pub mod tools;

use std::time::Duration;

use crate::client::PmClient;
use crate::config::Config;
use crate::error::Result;

/// Build the REST client from the configuration
pub(crate) fn client(config: &Config) -> Result<PmClient> {
    PmClient::with_timeout(
        &config.client.url,
        Duration::from_secs(config.client.timeout_seconds),
    )
}

/// Pretty-print a result to stdout
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
