//! Mock KubeletClient for unit testing
//!
//! Serves a configurable pod list from memory, or fails as if the kubelet
//! were unreachable.

use crate::error::KubeletError;
use crate::kubelet_trait::KubeletClientTrait;
use crate::models::PodSnapshot;
use k8s_openapi::api::core::v1::Pod;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Mock KubeletClient for testing
///
/// Clones share state, so a test can keep a handle and change the served
/// pods between reconcile passes.
#[derive(Debug, Clone)]
pub struct MockKubeletClient {
    pods_url: String,
    // `None` simulates an unreachable kubelet
    pods: Arc<Mutex<Option<Vec<Pod>>>>,
    requests: Arc<AtomicUsize>,
}

impl MockKubeletClient {
    /// Create a mock serving an empty pod list
    pub fn new(pods_url: &str) -> Self {
        Self {
            pods_url: pods_url.to_string(),
            pods: Arc::new(Mutex::new(Some(Vec::new()))),
            requests: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the pods served by subsequent calls
    pub fn set_pods(&self, pods: Vec<Pod>) {
        *self.pods.lock().unwrap_or_else(PoisonError::into_inner) = Some(pods);
    }

    /// Make subsequent calls fail as if the kubelet were down
    pub fn set_unreachable(&self) {
        *self.pods.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of `list_pods` calls made so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Build a minimal pod with the given name and namespace
    pub fn pod(name: &str, namespace: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

#[async_trait::async_trait]
impl KubeletClientTrait for MockKubeletClient {
    fn pods_url(&self) -> &str {
        &self.pods_url
    }

    async fn list_pods(&self) -> Result<PodSnapshot, KubeletError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.pods
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(PodSnapshot::new)
            .ok_or_else(|| KubeletError::Api(format!("GET {} failed: connection refused", self.pods_url)))
    }
}
