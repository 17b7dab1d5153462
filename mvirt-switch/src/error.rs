//! Error types for mvirt-switch.

use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::model::{Action, VmId};

/// Failure to obtain desired or actual state.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level HTTP failure (connect, TLS, timeout, body read).
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// The response body could not be decoded.
    #[error("malformed response from {url}: {source}")]
    Payload {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Startup health check answered, but not with the expected message.
    #[error("health check of {url} failed: {message}")]
    Unhealthy { url: String, message: String },

    /// The inventory command could not be spawned.
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The inventory command exited unsuccessfully.
    #[error("{command} exited with {status}: {stderr}")]
    Command {
        command: String,
        status: ExitStatus,
        stderr: String,
    },
}

/// Failure to apply a single directive.
#[derive(Debug, Error)]
pub enum ActuationError {
    #[error("failed to run {action} on VM {handle}: {source}")]
    Spawn {
        handle: VmId,
        action: Action,
        #[source]
        source: std::io::Error,
    },

    #[error("{action} on VM {handle} exited with {status}: {stderr}")]
    Failed {
        handle: VmId,
        action: Action,
        status: ExitStatus,
        stderr: String,
    },
}

impl ActuationError {
    pub fn handle(&self) -> VmId {
        match self {
            ActuationError::Spawn { handle, .. } | ActuationError::Failed { handle, .. } => *handle,
        }
    }

    pub fn action(&self) -> Action {
        match self {
            ActuationError::Spawn { action, .. } | ActuationError::Failed { action, .. } => *action,
        }
    }
}

/// Invalid startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read token file '{path}': {source}")]
    ReadToken {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token file '{path}' is empty")]
    EmptyToken { path: PathBuf },

    #[error("invalid URL for {option}: '{value}' (expected http:// or https://)")]
    InvalidUrl { option: &'static str, value: String },

    #[error("entity prefix must not be empty")]
    EmptyPrefix,

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}
