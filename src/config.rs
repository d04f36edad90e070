//! Configuration management
//!
//! Settings load from an optional YAML file, then environment variables
//! (`PMAGENT_HOST`, `PMAGENT_PORT`, `PMAGENT_DATA_DIR`, `PMAGENT_URL`),
//! then command-line flags, each layer overriding the last.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::cli::Cli;
use crate::error::{PmAgentError, Result};

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server settings
    #[serde(default)]
    pub server: ServerConfig,
    /// Client settings
    #[serde(default)]
    pub client: ClientConfig,
}

/// Settings for `pmagent serve`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Bind port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory holding the JSON data files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// Settings for the client commands
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL of the server
    #[serde(default = "default_url")]
    pub url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl ServerConfig {
    /// The socket address to bind
    pub fn addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| PmAgentError::Config(format!("invalid host address: {}", self.host)))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

impl Config {
    /// Load configuration, layering file, environment, and CLI overrides
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if std::path::Path::new(path).exists() {
            let raw = std::fs::read_to_string(path)?;
            serde_yaml::from_str(&raw).map_err(PmAgentError::Yaml)?
        } else {
            tracing::debug!(path, "config file not found, using defaults");
            Config::default()
        };

        config.apply_env();
        if let Some(url) = &cli.url {
            config.client.url = url.clone();
        }
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(host) = std::env::var("PMAGENT_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("PMAGENT_PORT") {
            if let Ok(port) = port.parse() {
                self.server.port = port;
            } else {
                tracing::warn!(port, "ignoring non-numeric PMAGENT_PORT");
            }
        }
        if let Ok(data_dir) = std::env::var("PMAGENT_DATA_DIR") {
            self.server.data_dir = PathBuf::from(data_dir);
        }
        if let Ok(url) = std::env::var("PMAGENT_URL") {
            self.client.url = url;
        }
    }

    /// Check the configuration for obvious mistakes
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(PmAgentError::Config("server port must not be 0".to_string()).into());
        }
        self.server.addr()?;
        url::Url::parse(&self.client.url)
            .map_err(|err| PmAgentError::Config(format!("invalid client URL: {err}")))?;
        if self.client.timeout_seconds == 0 {
            return Err(
                PmAgentError::Config("client timeout must be at least 1 second".to_string()).into(),
            );
        }
        Ok(())
    }
}
