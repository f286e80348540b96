//! Control-plane state classification.
//!
//! Pods are identified by substring match on their name, restricted to the
//! system namespace: the kubelet reports static pods as mirror pods named
//! `<manifest name>-<node name>`, and the self-hosted apiserver runs under a
//! generated name, so neither has a fixed full name to compare against.
//! A differently-prefixed workload whose name happens to contain one of the
//! markers (e.g. `my-kube-apiserver-proxy`) would be misclassified.

use k8s_openapi::api::core::v1::Pod;
use kubelet_client::PodSnapshot;
use std::fmt;

/// Name marker of the self-hosted (primary) apiserver pod
pub const PRIMARY_APISERVER_MARKER: &str = "kube-apiserver";

/// Name marker of the temporary bootstrap apiserver pod
pub const TEMP_APISERVER_MARKER: &str = "temp-apiserver";

/// Which apiservers are running on this node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlPlaneState {
    /// Primary and temporary apiservers are both running
    BothRunning,
    /// Only the primary apiserver is running
    PrimaryRunning,
    /// No primary apiserver is running (the temporary one may be)
    NoneRunning,
}

impl fmt::Display for ControlPlaneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BothRunning => "both-running",
            Self::PrimaryRunning => "primary-running",
            Self::NoneRunning => "none-running",
        };
        f.write_str(name)
    }
}

/// Classifies pod snapshots into a [`ControlPlaneState`]
#[derive(Debug, Clone)]
pub struct StateClassifier {
    system_namespace: String,
}

impl StateClassifier {
    /// Create a classifier matching pods in `system_namespace`
    pub fn new(system_namespace: impl Into<String>) -> Self {
        Self {
            system_namespace: system_namespace.into(),
        }
    }

    fn matches(&self, pod: &Pod, marker: &str) -> bool {
        let in_namespace = pod.metadata.namespace.as_deref() == Some(self.system_namespace.as_str());
        let named = pod
            .metadata
            .name
            .as_deref()
            .is_some_and(|name| name.contains(marker));
        in_namespace && named
    }

    /// Whether `pod` is the self-hosted apiserver
    pub fn is_primary(&self, pod: &Pod) -> bool {
        self.matches(pod, PRIMARY_APISERVER_MARKER)
    }

    /// Whether `pod` is the temporary apiserver
    pub fn is_temporary(&self, pod: &Pod) -> bool {
        self.matches(pod, TEMP_APISERVER_MARKER)
    }

    /// Classify a snapshot. Depends only on which pods are present, never on
    /// their order.
    pub fn classify(&self, snapshot: &PodSnapshot) -> ControlPlaneState {
        let primary = snapshot.iter().any(|pod| self.is_primary(pod));
        let temporary = snapshot.iter().any(|pod| self.is_temporary(pod));

        match (primary, temporary) {
            (true, true) => ControlPlaneState::BothRunning,
            (true, false) => ControlPlaneState::PrimaryRunning,
            (false, _) => ControlPlaneState::NoneRunning,
        }
    }

    /// First primary apiserver pod in the snapshot
    pub fn find_primary<'a>(&self, snapshot: &'a PodSnapshot) -> Option<&'a Pod> {
        snapshot.iter().find(|pod| self.is_primary(pod))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kubelet_client::MockKubeletClient;

    fn classifier() -> StateClassifier {
        StateClassifier::new("kube-system")
    }

    fn snapshot(pods: &[(&str, &str)]) -> PodSnapshot {
        PodSnapshot::new(
            pods.iter()
                .map(|(name, ns)| MockKubeletClient::pod(name, ns))
                .collect(),
        )
    }

    #[test]
    fn test_both_running() {
        let snap = snapshot(&[
            ("kube-apiserver-xyz", "kube-system"),
            ("temp-apiserver-node1", "kube-system"),
        ]);
        assert_eq!(classifier().classify(&snap), ControlPlaneState::BothRunning);
    }

    #[test]
    fn test_primary_running() {
        let snap = snapshot(&[("kube-apiserver-xyz", "kube-system")]);
        assert_eq!(classifier().classify(&snap), ControlPlaneState::PrimaryRunning);
    }

    #[test]
    fn test_none_running() {
        assert_eq!(
            classifier().classify(&PodSnapshot::default()),
            ControlPlaneState::NoneRunning
        );
    }

    #[test]
    fn test_only_temporary_is_none_running() {
        let snap = snapshot(&[("temp-apiserver-node1", "kube-system")]);
        assert_eq!(classifier().classify(&snap), ControlPlaneState::NoneRunning);
    }

    #[test]
    fn test_ignores_unrelated_pods_and_order() {
        let pods = [
            ("kube-scheduler-abc", "kube-system"),
            ("temp-apiserver-node1", "kube-system"),
            ("nginx", "default"),
            ("kube-apiserver-xyz", "kube-system"),
            ("kube-dns-123", "kube-system"),
        ];

        let forward = snapshot(&pods);
        let mut reversed_pods = pods;
        reversed_pods.reverse();
        let reversed = snapshot(&reversed_pods);

        assert_eq!(classifier().classify(&forward), ControlPlaneState::BothRunning);
        assert_eq!(classifier().classify(&reversed), ControlPlaneState::BothRunning);

        let without_temp = snapshot(&[pods[0], pods[2], pods[3], pods[4]]);
        assert_eq!(
            classifier().classify(&without_temp),
            ControlPlaneState::PrimaryRunning
        );
    }

    #[test]
    fn test_requires_system_namespace() {
        let snap = snapshot(&[
            ("kube-apiserver-xyz", "default"),
            ("temp-apiserver-node1", "tenant-a"),
        ]);
        assert_eq!(classifier().classify(&snap), ControlPlaneState::NoneRunning);
    }

    #[test]
    fn test_substring_match_is_preserved() {
        // Any name containing the marker counts, not only the canonical prefix.
        let snap = snapshot(&[("self-hosted-kube-apiserver-7d9f", "kube-system")]);
        assert_eq!(classifier().classify(&snap), ControlPlaneState::PrimaryRunning);
    }

    #[test]
    fn test_find_primary_returns_first_match() {
        let snap = snapshot(&[
            ("etcd-node1", "kube-system"),
            ("kube-apiserver-a", "kube-system"),
            ("kube-apiserver-b", "kube-system"),
        ]);

        let primary = classifier().find_primary(&snap).unwrap();
        assert_eq!(primary.metadata.name.as_deref(), Some("kube-apiserver-a"));
        assert!(classifier().find_primary(&PodSnapshot::default()).is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(ControlPlaneState::BothRunning.to_string(), "both-running");
        assert_eq!(ControlPlaneState::PrimaryRunning.to_string(), "primary-running");
        assert_eq!(ControlPlaneState::NoneRunning.to_string(), "none-running");
    }
}
