//! Materialization of the apiserver's secret volume onto the host.
//!
//! The temporary apiserver has to start while no apiserver is reachable, so
//! it cannot mount a secret. Before checkpointing, the secret behind the
//! `secrets` volume is fetched once and cached under the secrets directory,
//! and the volume is rewritten into a host path pointing at that cache.

use crate::error::ControllerError;
use k8s_openapi::api::core::v1::{HostPathVolumeSource, PodSpec, Secret};
use kube::{Api, Client};
use static_pods::store::{TEMP_FILE_PREFIX, validate_file_name, write_with_mode};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the volume carrying the apiserver's TLS material
pub const SECRETS_VOLUME_NAME: &str = "secrets";

const SECRET_FILE_MODE: u32 = 0o600;
const SECRETS_DIR_MODE: u32 = 0o700;

/// Secret data: key (used as file name) to raw bytes
pub type SecretMaterial = BTreeMap<String, Vec<u8>>;

/// Resolves a secret by name to its data
#[async_trait::async_trait]
pub trait SecretSource: Send + Sync {
    /// Fetch the data of secret `namespace/name`
    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SecretMaterial, ControllerError>;
}

/// [`SecretSource`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeSecretSource {
    client: Client,
}

impl KubeSecretSource {
    /// Create a source using a pre-configured Kubernetes client
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl SecretSource for KubeSecretSource {
    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SecretMaterial, ControllerError> {
        let secrets: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        match secrets.get(name).await {
            Ok(secret) => Ok(secret
                .data
                .unwrap_or_default()
                .into_iter()
                .map(|(key, value)| (key, value.0))
                .collect()),
            Err(kube::Error::Api(api_err)) if api_err.code == 404 => {
                Err(ControllerError::SecretNotFound {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                })
            }
            Err(e) => Err(ControllerError::Kube(e)),
        }
    }
}

/// Writes a pod's secret volume to disk and repoints the volume at it
#[derive(Debug, Clone)]
pub struct SecretMaterializer {
    secrets_dir: PathBuf,
    namespace: String,
}

impl SecretMaterializer {
    /// Create a materializer caching into `secrets_dir`, resolving secrets in `namespace`
    pub fn new(secrets_dir: impl Into<PathBuf>, namespace: impl Into<String>) -> Self {
        Self {
            secrets_dir: secrets_dir.into(),
            namespace: namespace.into(),
        }
    }

    /// Replace the first secret-backed `secrets` volume in `spec` with a host
    /// path holding the secret's data. Specs without such a volume are
    /// returned unchanged and nothing is fetched or written.
    pub async fn materialize(
        &self,
        mut spec: PodSpec,
        source: &dyn SecretSource,
    ) -> Result<PodSpec, ControllerError> {
        let Some(volume) = spec.volumes.as_mut().and_then(|volumes| {
            volumes
                .iter_mut()
                .find(|v| v.name == SECRETS_VOLUME_NAME && v.secret.is_some())
        }) else {
            debug!("No secret-backed {} volume to materialize", SECRETS_VOLUME_NAME);
            return Ok(spec);
        };

        let secret_name = volume
            .secret
            .as_ref()
            .and_then(|s| s.secret_name.clone())
            .ok_or_else(|| ControllerError::MissingSecretName(volume.name.clone()))?;

        let material = source.get_secret_data(&self.namespace, &secret_name).await?;
        self.persist(&material).await?;

        volume.secret = None;
        volume.host_path = Some(HostPathVolumeSource {
            path: self.secrets_dir.to_string_lossy().into_owned(),
            ..Default::default()
        });

        info!(
            secret = %format!("{}/{}", self.namespace, secret_name),
            dir = %self.secrets_dir.display(),
            keys = material.len(),
            "Materialized secret volume to host path"
        );
        Ok(spec)
    }

    async fn persist(&self, material: &SecretMaterial) -> Result<(), ControllerError> {
        // Validate every key before touching the disk. Keys carrying the
        // staging prefix would be clobbered by another key's staged write.
        if let Some(bad) = material
            .keys()
            .find(|key| validate_file_name(key).is_err() || key.starts_with(TEMP_FILE_PREFIX))
        {
            return Err(ControllerError::InvalidSecretKey(bad.clone()));
        }

        create_secrets_dir(&self.secrets_dir).await?;

        for (key, bytes) in material {
            write_with_mode(&self.secrets_dir, key, bytes, SECRET_FILE_MODE)
                .await
                .map_err(ControllerError::SecretWrite)?;
            debug!(file = %self.secrets_dir.join(key).display(), "Wrote secret file");
        }
        Ok(())
    }
}

async fn create_secrets_dir(path: &Path) -> Result<(), ControllerError> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(SECRETS_DIR_MODE);
    builder
        .create(path)
        .await
        .map_err(|source| ControllerError::SecretsDir {
            path: path.to_path_buf(),
            source,
        })
}
