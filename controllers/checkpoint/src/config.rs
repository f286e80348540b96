//! Controller configuration.
//!
//! Built once at startup from environment variables and handed to each
//! component. Every setting has a default matching a standard self-hosted
//! control-plane node layout.

use crate::error::ControllerError;
use static_pods::store::{TEMP_FILE_PREFIX, validate_file_name};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const DEFAULT_KUBELET_PODS_URL: &str = "http://127.0.0.1:10255/pods";
const DEFAULT_ACTIVE_MANIFEST_DIR: &str = "/etc/kubernetes/manifests";
const DEFAULT_STANDBY_MANIFEST_DIR: &str = "/srv/kubernetes/manifests";
const DEFAULT_MANIFEST_FILENAME: &str = "apiserver.json";
const DEFAULT_SECRETS_DIR: &str = "/etc/kubernetes/checkpoint-secrets";
const DEFAULT_SYSTEM_NAMESPACE: &str = "kube-system";
const DEFAULT_INTERVAL_SECS: u64 = 60;
const DEFAULT_KUBELET_TIMEOUT_SECS: u64 = 30;

/// Runtime configuration for the checkpoint controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointConfig {
    /// Kubelet pod listing endpoint
    pub kubelet_pods_url: String,
    /// Manifest directory watched by the kubelet
    pub active_manifest_dir: PathBuf,
    /// Manifest directory holding the last known-good checkpoint
    pub standby_manifest_dir: PathBuf,
    /// Manifest file name used in both directories
    pub manifest_filename: String,
    /// Directory the apiserver's TLS material is cached in
    pub secrets_dir: PathBuf,
    /// Namespace of the control-plane pods and their secrets
    pub system_namespace: String,
    /// Delay between checkpoint passes
    pub interval: Duration,
    /// Transport timeout for kubelet requests
    pub kubelet_timeout: Duration,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            kubelet_pods_url: DEFAULT_KUBELET_PODS_URL.to_string(),
            active_manifest_dir: PathBuf::from(DEFAULT_ACTIVE_MANIFEST_DIR),
            standby_manifest_dir: PathBuf::from(DEFAULT_STANDBY_MANIFEST_DIR),
            manifest_filename: DEFAULT_MANIFEST_FILENAME.to_string(),
            secrets_dir: PathBuf::from(DEFAULT_SECRETS_DIR),
            system_namespace: DEFAULT_SYSTEM_NAMESPACE.to_string(),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            kubelet_timeout: Duration::from_secs(DEFAULT_KUBELET_TIMEOUT_SECS),
        }
    }
}

impl CheckpointConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ControllerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let config = Self {
            kubelet_pods_url: lookup("KUBELET_PODS_URL").unwrap_or(defaults.kubelet_pods_url),
            active_manifest_dir: lookup("ACTIVE_MANIFEST_DIR")
                .map_or(defaults.active_manifest_dir, PathBuf::from),
            standby_manifest_dir: lookup("STANDBY_MANIFEST_DIR")
                .map_or(defaults.standby_manifest_dir, PathBuf::from),
            manifest_filename: lookup("MANIFEST_FILENAME").unwrap_or(defaults.manifest_filename),
            secrets_dir: lookup("CHECKPOINT_SECRETS_DIR").map_or(defaults.secrets_dir, PathBuf::from),
            system_namespace: lookup("SYSTEM_NAMESPACE").unwrap_or(defaults.system_namespace),
            interval: parse_secs(&lookup, "CHECKPOINT_INTERVAL_SECS", defaults.interval)?,
            kubelet_timeout: parse_secs(&lookup, "KUBELET_TIMEOUT_SECS", defaults.kubelet_timeout)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ControllerError> {
        if validate_file_name(&self.manifest_filename).is_err()
            || self.manifest_filename.starts_with('.')
        {
            return Err(ControllerError::InvalidConfig(format!(
                "MANIFEST_FILENAME must be a plain file name not starting with '.' (got {:?}; '{}' is reserved for temporaries)",
                self.manifest_filename, TEMP_FILE_PREFIX
            )));
        }
        if self.active_manifest_dir == self.standby_manifest_dir {
            return Err(ControllerError::InvalidConfig(
                "ACTIVE_MANIFEST_DIR and STANDBY_MANIFEST_DIR must differ".to_string(),
            ));
        }
        if self.system_namespace.is_empty() {
            return Err(ControllerError::InvalidConfig(
                "SYSTEM_NAMESPACE must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Log the effective configuration
    pub fn log_summary(&self) {
        info!("Configuration:");
        info!("  Kubelet pods URL: {}", self.kubelet_pods_url);
        info!("  Active manifest: {}", self.active_manifest_dir.join(&self.manifest_filename).display());
        info!("  Standby manifest: {}", self.standby_manifest_dir.join(&self.manifest_filename).display());
        info!("  Secrets directory: {}", self.secrets_dir.display());
        info!("  System namespace: {}", self.system_namespace);
        info!("  Interval: {}s", self.interval.as_secs());
    }
}

fn parse_secs<F>(lookup: &F, key: &str, default: Duration) -> Result<Duration, ControllerError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ControllerError::InvalidConfig(format!(
            "{key} must be a positive number of seconds (got {raw:?})"
        ))),
    }
}
