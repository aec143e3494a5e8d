//! Pipeline-level errors using thiserror for structured error handling.
//!
//! These errors represent domain-specific failures that can occur inside
//! the detection pipeline. They provide context and can be chained with
//! anyhow. None of them cross the public API boundary as panics; callers
//! observe failure indicators and connection-change events instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Failed to connect to recognition backend at {endpoint}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to send message over the socket")]
    SendFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Malformed message from backend")]
    MalformedMessage(#[source] serde_json::Error),

    #[error("Connection to recognition backend lost")]
    ConnectionLost(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Not connected to the recognition backend")]
    NotConnected,
}

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to acquire still image from camera")]
    CaptureFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to encode captured frame")]
    EncodeFailed(#[source] image::ImageError),
}

#[derive(Error, Debug)]
pub enum DetectionError {
    #[error("Invalid detection target: {0:?}")]
    InvalidTarget(String),

    #[error("Detection pipeline not initialized")]
    NotInitialized,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration from {path}")]
    LoadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Failed to save configuration to {path}")]
    SaveFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to create config directory: {path}")]
    DirectoryCreationFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Type alias for application Results using anyhow for context chaining
pub type AppResult<T> = anyhow::Result<T>;
