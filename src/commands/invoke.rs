//! `pmagent invoke`

use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{PmAgentError, Result};

/// Invoke an arbitrary tool and print its result
pub async fn run_invoke(config: &Config, name: &str, params: Option<String>) -> Result<()> {
    let parameters: Value = match params {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|err| PmAgentError::InvalidParams(format!("--params is not valid JSON: {err}")))?,
        None => json!({}),
    };

    let client = super::client(config)?;
    let result = client.invoke(name, parameters).await?;
    super::print_json(&result)
}
