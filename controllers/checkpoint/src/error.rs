//! Controller-specific error types.
//!
//! Errors are split into two classes. Transient errors are logged and the
//! next checkpoint pass retries. Fatal errors mean the deployment artifact
//! is broken or the control plane cannot hand over the apiserver's
//! credentials; the process exits and the host supervisor restarts it.

use kube::Error as KubeError;
use kubelet_client::KubeletError;
use static_pods::StaticPodError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the checkpoint controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] KubeError),

    /// Kubelet pod listing failed
    #[error("Kubelet error: {0}")]
    Kubelet(#[from] KubeletError),

    /// Embedded manifest template is unusable
    #[error("Manifest template error: {0}")]
    Template(#[source] StaticPodError),

    /// Captured pod could not be rendered into a manifest
    #[error("Failed to render manifest: {0}")]
    Render(#[source] StaticPodError),

    /// Standby manifest could not be written
    #[error("Failed to write standby manifest: {0}")]
    StandbyWrite(#[source] StaticPodError),

    /// Active manifest could not be installed or removed
    #[error("Failed to update active manifest: {0}")]
    ActiveManifest(#[source] StaticPodError),

    /// Snapshot classified as primary-running but no primary pod was found
    #[error("Primary apiserver pod not found in snapshot")]
    PrimaryNotFound,

    /// Captured primary pod has no spec
    #[error("Pod {0} has no spec")]
    MissingPodSpec(String),

    /// Secrets volume does not name a secret
    #[error("Volume {0} references a secret without a name")]
    MissingSecretName(String),

    /// Referenced secret does not exist
    #[error("Secret {namespace}/{name} not found")]
    SecretNotFound {
        /// Secret namespace
        namespace: String,
        /// Secret name
        name: String,
    },

    /// Secret data key cannot be used as a file name
    #[error("Secret key {0:?} is not a valid file name")]
    InvalidSecretKey(String),

    /// TLS material directory could not be created
    #[error("Failed to create secrets directory {}: {source}", .path.display())]
    SecretsDir {
        /// Directory path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// TLS material file could not be written
    #[error("Failed to write secret material: {0}")]
    SecretWrite(#[source] StaticPodError),
}

impl ControllerError {
    /// Whether the process must exit instead of retrying on the next pass.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Self::Kubelet(_) | Self::ActiveManifest(_) | Self::PrimaryNotFound | Self::MissingPodSpec(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn io_error() -> StaticPodError {
        StaticPodError::Io {
            path: PathBuf::from("/etc/kubernetes/manifests/apiserver.json"),
            source: std::io::Error::other("disk full"),
        }
    }

    #[test]
    fn test_transient_errors() {
        assert!(!ControllerError::Kubelet(KubeletError::Api("503".to_string())).is_fatal());
        assert!(!ControllerError::ActiveManifest(io_error()).is_fatal());
        assert!(!ControllerError::PrimaryNotFound.is_fatal());
        assert!(!ControllerError::MissingPodSpec("kube-apiserver-x".to_string()).is_fatal());
    }

    #[test]
    fn test_fatal_errors() {
        assert!(ControllerError::InvalidConfig("bad".to_string()).is_fatal());
        assert!(ControllerError::StandbyWrite(io_error()).is_fatal());
        assert!(ControllerError::SecretWrite(io_error()).is_fatal());
        assert!(ControllerError::InvalidSecretKey("../x".to_string()).is_fatal());
        assert!(
            ControllerError::SecretNotFound {
                namespace: "kube-system".to_string(),
                name: "kube-apiserver".to_string(),
            }
            .is_fatal()
        );
        assert!(
            ControllerError::SecretsDir {
                path: PathBuf::from("/etc/kubernetes/checkpoint-secrets"),
                source: std::io::Error::other("read-only file system"),
            }
            .is_fatal()
        );
    }
}
