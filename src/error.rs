//! Error types for the GKE Cluster Operator

use thiserror::Error;

use crate::cloud::CloudError;

/// Result type alias using the operator's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Operator error types
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// Cloud provider error other than the expected not-found precondition
    #[error("Cloud provider error: {0}")]
    Cloud(#[from] CloudError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reconciliation was cancelled by deadline or shutdown
    #[error("Reconciliation cancelled while waiting for cluster {0}")]
    Cancelled(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Whether this error is a cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}
