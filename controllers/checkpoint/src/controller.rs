//! Main controller implementation.
//!
//! This module contains the `Controller` struct that drives the checkpoint
//! loop: fetch pods from the kubelet, reconcile, sleep, repeat. Passes never
//! overlap, so the manifest and secrets directories have a single writer.

use crate::config::CheckpointConfig;
use crate::error::ControllerError;
use crate::reconciler::Reconciler;
use crate::secrets::{SecretMaterializer, SecretSource};
use crate::state::{ControlPlaneState, StateClassifier};
use kubelet_client::{KubeletClientTrait, PodSnapshot};
use static_pods::{ManifestStore, ManifestTemplate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Main controller for apiserver checkpointing.
pub struct Controller {
    kubelet: Arc<dyn KubeletClientTrait>,
    reconciler: Reconciler,
    interval: Duration,
}

impl Controller {
    /// Creates a new controller instance.
    pub fn new(
        kubelet: Arc<dyn KubeletClientTrait>,
        reconciler: Reconciler,
        interval: Duration,
    ) -> Self {
        Self {
            kubelet,
            reconciler,
            interval,
        }
    }

    /// Wires up a controller from configuration and its external clients.
    pub fn from_config(
        config: &CheckpointConfig,
        kubelet: Arc<dyn KubeletClientTrait>,
        secrets: Arc<dyn SecretSource>,
        template: ManifestTemplate,
    ) -> Self {
        let reconciler = Reconciler::new(
            StateClassifier::new(config.system_namespace.clone()),
            SecretMaterializer::new(config.secrets_dir.clone(), config.system_namespace.clone()),
            secrets,
            template,
            ManifestStore::new(
                config.active_manifest_dir.clone(),
                config.standby_manifest_dir.clone(),
                config.manifest_filename.clone(),
            ),
        );
        Self::new(kubelet, reconciler, config.interval)
    }

    /// Fetch the current pods. An unreachable or misbehaving kubelet is
    /// logged and reported as an empty snapshot; the next pass retries.
    pub async fn observe(&self) -> PodSnapshot {
        match self.kubelet.list_pods().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(url = %self.kubelet.pods_url(), error = %e, "Failed to list pods, treating as none running");
                PodSnapshot::default()
            }
        }
    }

    /// Runs a single observe-and-reconcile pass.
    pub async fn run_once(&self) -> Result<ControlPlaneState, ControllerError> {
        let snapshot = self.observe().await;
        self.reconciler.reconcile(&snapshot).await
    }

    /// Runs the controller until a fatal error occurs.
    pub async fn run(&self) -> Result<(), ControllerError> {
        info!("Begin apiserver checkpointing");

        loop {
            match self.run_once().await {
                Ok(state) => debug!(%state, "Checkpoint pass complete"),
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Checkpoint pass failed fatally, exiting");
                    return Err(e);
                }
                Err(e) => warn!(error = %e, "Checkpoint pass failed, retrying next interval"),
            }

            tokio::time::sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockSecretSource, apiserver_secret, primary_apiserver_pod};
    use kubelet_client::MockKubeletClient;
    use tempfile::TempDir;

    struct Fixture {
        root: TempDir,
        kubelet: MockKubeletClient,
        controller: Controller,
    }

    fn fixture(source: MockSecretSource) -> Fixture {
        let root = TempDir::new().unwrap();
        let config = CheckpointConfig {
            active_manifest_dir: root.path().join("active"),
            standby_manifest_dir: root.path().join("standby"),
            secrets_dir: root.path().join("checkpoint-secrets"),
            interval: Duration::from_millis(10),
            ..Default::default()
        };
        std::fs::create_dir(&config.active_manifest_dir).unwrap();
        std::fs::create_dir(&config.standby_manifest_dir).unwrap();

        let kubelet = MockKubeletClient::new(&config.kubelet_pods_url);
        let controller = Controller::from_config(
            &config,
            Arc::new(kubelet.clone()),
            Arc::new(source),
            ManifestTemplate::embedded().unwrap(),
        );

        Fixture {
            root,
            kubelet,
            controller,
        }
    }

    #[tokio::test]
    async fn test_unreachable_kubelet_promotes_standby() {
        let f = fixture(MockSecretSource::new());
        std::fs::write(f.root.path().join("standby/apiserver.json"), b"known-good").unwrap();
        f.kubelet.set_unreachable();

        let state = f.controller.run_once().await.unwrap();

        assert_eq!(state, ControlPlaneState::NoneRunning);
        assert_eq!(
            std::fs::read(f.root.path().join("active/apiserver.json")).unwrap(),
            b"known-good"
        );
    }

    #[tokio::test]
    async fn test_each_pass_uses_a_fresh_snapshot() {
        let source = MockSecretSource::new();
        source.add_secret("kube-system", "kube-apiserver", apiserver_secret());
        let f = fixture(source);

        f.kubelet
            .set_pods(vec![primary_apiserver_pod("kube-apiserver-xyz", "kube-system")]);
        assert_eq!(f.controller.run_once().await.unwrap(), ControlPlaneState::PrimaryRunning);

        f.kubelet.set_pods(Vec::new());
        assert_eq!(f.controller.run_once().await.unwrap(), ControlPlaneState::NoneRunning);
        assert_eq!(
            std::fs::read(f.root.path().join("active/apiserver.json")).unwrap(),
            std::fs::read(f.root.path().join("standby/apiserver.json")).unwrap()
        );
        assert_eq!(f.kubelet.request_count(), 2);
    }

    #[tokio::test]
    async fn test_run_exits_on_fatal_error() {
        // No secret in the source: checkpointing the primary is fatal.
        let f = fixture(MockSecretSource::new());
        f.kubelet
            .set_pods(vec![primary_apiserver_pod("kube-apiserver-xyz", "kube-system")]);

        let result = tokio::time::timeout(Duration::from_secs(5), f.controller.run())
            .await
            .expect("run should return on a fatal error");

        assert!(matches!(result, Err(ControllerError::SecretNotFound { .. })));
        assert_eq!(f.kubelet.request_count(), 1);
    }

    #[tokio::test]
    async fn test_run_keeps_going_on_transient_errors() {
        let f = fixture(MockSecretSource::new());
        f.kubelet.set_unreachable();

        // The loop never returns on its own; it is still polling after several intervals.
        let result = tokio::time::timeout(Duration::from_millis(100), f.controller.run()).await;

        assert!(result.is_err());
        assert!(f.kubelet.request_count() >= 2);
    }
}
