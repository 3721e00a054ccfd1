//! Error types for cache engines
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

use crate::engine::Operation;

// == Engine Error Enum ==
/// Unified error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The engine does not provide this operation
    #[error("The engine must implement its own '{0}'")]
    NotImplemented(Operation),

    /// Operation issued before `load` initialized the engine
    #[error("Engine not loaded: '{0}' requires a prior load")]
    NotLoaded(Operation),

    /// `load` may only run once per engine instance
    #[error("Engine already loaded")]
    AlreadyLoaded,

    /// Operation issued after `close`
    #[error("Engine closed: '{0}' is no longer available")]
    Closed(Operation),

    /// Engine options rejected at construction
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend-specific failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// I/O failure in a persistent engine
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot encoding or decoding failure
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Returns the contract operation this error is attributed to, if any.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            EngineError::NotImplemented(op)
            | EngineError::NotLoaded(op)
            | EngineError::Closed(op) => Some(*op),
            EngineError::AlreadyLoaded => Some(Operation::Load),
            _ => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
