//! Kubelet client errors

use thiserror::Error;

/// Errors that can occur when reading pods from the kubelet
#[derive(Debug, Error)]
pub enum KubeletError {
    /// HTTP transport error (connection refused, timeout, ...)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Kubelet answered with a non-success status
    #[error("Kubelet API error: {0}")]
    Api(String),

    /// Response body was not a pod list
    #[error("Failed to decode pod list: {0}")]
    Decode(String),
}
