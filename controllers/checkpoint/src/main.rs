//! Apiserver Checkpoint Controller
//!
//! Keeps a self-hosted control plane bootable. While the self-hosted
//! kube-apiserver runs, its pod spec is checkpointed into a standby static-pod
//! manifest (with its TLS secret cached on the host). When no apiserver runs,
//! the checkpoint is installed into the kubelet's manifest directory as a
//! temporary apiserver, and it is removed again once the self-hosted one is
//! back.

mod config;
mod controller;
mod error;
mod reconciler;
mod sanitize;
mod secrets;
mod state;
mod test_utils;

use crate::config::CheckpointConfig;
use crate::controller::Controller;
use crate::error::ControllerError;
use crate::secrets::KubeSecretSource;
use kubelet_client::KubeletClient;
use static_pods::ManifestTemplate;
use std::sync::Arc;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "apiserver_checkpoint=info,kubelet_client=info,static_pods=info".into()
            }),
        )
        .init();

    // Required for rustls 0.23+ when no default provider is set via features
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting Apiserver Checkpoint Controller");

    let config = CheckpointConfig::from_env()?;
    config.log_summary();

    // A broken template is a broken build; fail before the first pass.
    let template = ManifestTemplate::embedded().map_err(ControllerError::Template)?;

    let kubelet = KubeletClient::new(config.kubelet_pods_url.clone(), config.kubelet_timeout)?;
    let kube_client = kube::Client::try_default().await?;

    let controller = Controller::from_config(
        &config,
        Arc::new(kubelet),
        Arc::new(KubeSecretSource::new(kube_client)),
        template,
    );

    tokio::select! {
        result = controller.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal, stopping");
            Ok(())
        }
    }
}
