//! Error types for the scope authorization engine

use thiserror::Error;

/// Authorization engine errors
///
/// Declaration-time problems (malformed expressions, mistyped template
/// parameters, runaway role closures) are reported through this type and are
/// meant to abort start-up. Request-time evaluation never produces an error.
#[derive(Debug, Error)]
pub enum AuthzError {
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Malformed scope expression or template shape
    #[error("{0}")]
    InvalidExpression(String),

    /// Template parameter present with the wrong type
    #[error("Template error: {0}")]
    Template(String),

    /// Role closure did not reach a fixed point within its iteration bound
    #[error("Role closure error: {0}")]
    RoleClosure(String),

    /// Operation was never registered
    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// Operation registered twice
    #[error("Duplicate operation: {0}")]
    DuplicateOperation(String),

    /// Client is not present in the current snapshot
    #[error("Client not found: {0}")]
    ClientNotFound(String),

    /// Role or client store failure
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for authorization operations
pub type Result<T> = std::result::Result<T, AuthzError>;
