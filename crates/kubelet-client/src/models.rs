//! Pod listing models
//!
//! The kubelet answers `/pods` with a `v1.PodList` document. Only `items` is
//! needed; list metadata, `kind` and `apiVersion` are ignored.

use k8s_openapi::api::core::v1::Pod;
use serde::Deserialize;

/// Wire shape of the kubelet `/pods` response
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodList {
    /// Pods known to the kubelet. `null` and a missing field both mean none.
    #[serde(default)]
    pub items: Option<Vec<Pod>>,
}

/// Pods visible on the node at the time of one fetch.
///
/// A snapshot is rebuilt on every poll and never merged with an earlier one.
/// Order is whatever the kubelet returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodSnapshot(Vec<Pod>);

impl PodSnapshot {
    /// Create a snapshot from a list of pods
    #[must_use]
    pub fn new(pods: Vec<Pod>) -> Self {
        Self(pods)
    }

    /// Pods in the snapshot, in kubelet order
    #[must_use]
    pub fn pods(&self) -> &[Pod] {
        &self.0
    }

    /// Iterate over the pods in the snapshot
    pub fn iter(&self) -> std::slice::Iter<'_, Pod> {
        self.0.iter()
    }

    /// Number of pods in the snapshot
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the snapshot contains no pods
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Pod>> for PodSnapshot {
    fn from(pods: Vec<Pod>) -> Self {
        Self(pods)
    }
}

impl From<PodList> for PodSnapshot {
    fn from(list: PodList) -> Self {
        Self(list.items.unwrap_or_default())
    }
}

impl<'a> IntoIterator for &'a PodSnapshot {
    type Item = &'a Pod;
    type IntoIter = std::slice::Iter<'a, Pod>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
