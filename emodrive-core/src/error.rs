//! # Error Types for emodrive
//!
//! Unified error handling across the emodrive crates.

use thiserror::Error;

/// Main error type for emodrive operations
#[derive(Error, Debug)]
pub enum EmoError {
    /// Invalid or unreadable mapper/hub configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Mapper variant tag that no mapper answers to
    #[error("Unknown mapper type: {0:?} (expected \"stateless\" or \"stateful\")")]
    UnknownMapper(String),

    /// Text analyzer unreachable or returned undecodable data
    #[error("Analysis failed: {0}")]
    Analysis(String),

    /// Write to a viewer transport failed (local to one session)
    #[error("Session write failed: {0}")]
    SessionWrite(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for emodrive operations
pub type EmoResult<T> = Result<T, EmoError>;

impl EmoError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an analysis error
    pub fn analysis(msg: impl Into<String>) -> Self {
        Self::Analysis(msg.into())
    }

    /// Create a session write error
    pub fn session_write(msg: impl Into<String>) -> Self {
        Self::SessionWrite(msg.into())
    }

    /// Is this a configuration-time failure?
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_) | Self::UnknownMapper(_))
    }
}

impl From<serde_json::Error> for EmoError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
