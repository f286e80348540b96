//! KubeletClient trait for mocking
//!
//! The controller only depends on this trait, so tests can swap in
//! `MockKubeletClient` (feature `test-util`) for the real HTTP client.

use crate::error::KubeletError;
use crate::models::PodSnapshot;

/// Read-only access to the pods the kubelet is currently running
#[async_trait::async_trait]
pub trait KubeletClientTrait: Send + Sync {
    /// URL of the pod listing endpoint
    fn pods_url(&self) -> &str;

    /// Fetch the current pod list. One request, no retries.
    async fn list_pods(&self) -> Result<PodSnapshot, KubeletError>;
}
