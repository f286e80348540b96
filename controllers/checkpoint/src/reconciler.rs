//! Reconciliation logic for the temporary apiserver.
//!
//! One pass takes a fresh pod snapshot, classifies it and applies the action
//! for that state:
//!
//! | State            | Action                                                   |
//! |------------------|----------------------------------------------------------|
//! | `BothRunning`    | remove the active manifest (the primary has taken over)  |
//! | `PrimaryRunning` | checkpoint the primary's spec into the standby manifest  |
//! | `NoneRunning`    | promote the standby manifest into the active directory   |
//!
//! Nothing is remembered between passes except the files on disk.

use crate::error::ControllerError;
use crate::sanitize::sanitize;
use crate::secrets::{SecretMaterializer, SecretSource};
use crate::state::{ControlPlaneState, StateClassifier};
use kubelet_client::PodSnapshot;
use static_pods::{ManifestStore, ManifestTemplate, PromoteOutcome, RemoveOutcome};
use std::sync::Arc;
use tracing::{debug, info};

/// Applies the state-dependent action for one pod snapshot.
pub struct Reconciler {
    classifier: StateClassifier,
    materializer: SecretMaterializer,
    secrets: Arc<dyn SecretSource>,
    template: ManifestTemplate,
    store: ManifestStore,
}

impl Reconciler {
    /// Creates a new reconciler instance.
    pub fn new(
        classifier: StateClassifier,
        materializer: SecretMaterializer,
        secrets: Arc<dyn SecretSource>,
        template: ManifestTemplate,
        store: ManifestStore,
    ) -> Self {
        Self {
            classifier,
            materializer,
            secrets,
            template,
            store,
        }
    }

    /// Manifest store the reconciler acts on
    #[cfg(test)]
    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    /// Classify `snapshot` and act on the result.
    pub async fn reconcile(
        &self,
        snapshot: &PodSnapshot,
    ) -> Result<ControlPlaneState, ControllerError> {
        let state = self.classifier.classify(snapshot);
        debug!(%state, pods = snapshot.len(), "Classified pod snapshot");

        match state {
            ControlPlaneState::BothRunning => self.retire_temp_apiserver().await?,
            ControlPlaneState::PrimaryRunning => self.checkpoint_primary(snapshot).await?,
            ControlPlaneState::NoneRunning => self.install_temp_apiserver().await?,
        }

        Ok(state)
    }

    async fn retire_temp_apiserver(&self) -> Result<(), ControllerError> {
        info!("Both temp and kube apiserver running, removing temp apiserver");
        let outcome = self
            .store
            .remove_active()
            .await
            .map_err(ControllerError::ActiveManifest)?;
        match outcome {
            RemoveOutcome::Removed => {
                info!(path = %self.store.active_path().display(), "Removed temp apiserver manifest");
            }
            RemoveOutcome::NotPresent => {
                debug!(path = %self.store.active_path().display(), "Temp apiserver manifest already absent");
            }
        }
        Ok(())
    }

    async fn checkpoint_primary(&self, snapshot: &PodSnapshot) -> Result<(), ControllerError> {
        info!("kube-apiserver found, creating temp apiserver manifest");
        let pod = self
            .classifier
            .find_primary(snapshot)
            .cloned()
            .ok_or(ControllerError::PrimaryNotFound)?;
        let pod_name = pod.metadata.name.clone().unwrap_or_default();

        let pod = sanitize(pod);
        let spec = pod
            .spec
            .ok_or_else(|| ControllerError::MissingPodSpec(pod_name.clone()))?;
        let spec = self
            .materializer
            .materialize(spec, self.secrets.as_ref())
            .await?;

        let manifest = self.template.render(spec).map_err(ControllerError::Render)?;
        self.store
            .write_standby(&manifest)
            .await
            .map_err(ControllerError::StandbyWrite)?;

        info!(
            source = %pod_name,
            path = %self.store.standby_path().display(),
            "Finished creating temp apiserver manifest"
        );
        Ok(())
    }

    async fn install_temp_apiserver(&self) -> Result<(), ControllerError> {
        info!("No apiserver running, installing temp apiserver static manifest");
        let outcome = self
            .store
            .promote_standby()
            .await
            .map_err(ControllerError::ActiveManifest)?;
        match outcome {
            PromoteOutcome::Promoted | PromoteOutcome::StandbyMissing => {}
            PromoteOutcome::AlreadyCurrent => {
                debug!(path = %self.store.active_path().display(), "Temp apiserver manifest already installed");
            }
        }
        Ok(())
    }
}
