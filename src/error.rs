//! Error types for PMAgent
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for PMAgent operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, transport I/O, protocol exchanges, tool
/// dispatch, and store persistence.
#[derive(Error, Debug)]
pub enum PmAgentError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-related errors (connect failures, closed connections)
    #[error("Transport error: {0}")]
    Transport(String),

    /// JSON-RPC protocol errors surfaced by the remote server
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Tool dispatch errors (unknown tool, invocation failure)
    #[error("Tool error: {0}")]
    Tool(String),

    /// Store persistence errors (load/save failures, corrupt data files)
    #[error("Store error: {0}")]
    Store(String),

    /// A requested domain object does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid parameters supplied to a tool or API call
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Authentication errors (e.g., 401 Unauthorized)
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for PMAgent operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
