//! Embedded temp-apiserver manifest template.

use crate::error::StaticPodError;
use k8s_openapi::api::core::v1::{Pod, PodSpec};

/// The temp-apiserver static pod, embedded at build time
const TEMP_APISERVER_TEMPLATE: &str = include_str!("../templates/temp-apiserver.yaml");

/// A parsed pod template: metadata from the template, spec supplied per render.
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestTemplate {
    pod: Pod,
}

impl ManifestTemplate {
    /// Parse the template embedded in this crate
    pub fn embedded() -> Result<Self, StaticPodError> {
        Self::from_yaml(TEMP_APISERVER_TEMPLATE)
    }

    /// Parse a template from a YAML (or JSON) pod document
    pub fn from_yaml(source: &str) -> Result<Self, StaticPodError> {
        let pod: Pod = serde_yaml::from_str(source)?;
        match pod.metadata.name.as_deref() {
            Some(name) if !name.is_empty() => Ok(Self { pod }),
            _ => Err(StaticPodError::InvalidTemplate(
                "metadata.name is required".to_string(),
            )),
        }
    }

    /// Name of the pod the template produces
    pub fn pod_name(&self) -> &str {
        self.pod.metadata.name.as_deref().unwrap_or_default()
    }

    /// Namespace of the pod the template produces, if set
    pub fn pod_namespace(&self) -> Option<&str> {
        self.pod.metadata.namespace.as_deref()
    }

    /// Build the manifest pod around `spec`
    pub fn instantiate(&self, spec: PodSpec) -> Pod {
        Pod {
            spec: Some(spec),
            status: None,
            ..self.pod.clone()
        }
    }

    /// Render the manifest JSON the kubelet reads
    pub fn render(&self, spec: PodSpec) -> Result<Vec<u8>, StaticPodError> {
        let pod = self.instantiate(spec);
        Ok(serde_json::to_vec_pretty(&pod)?)
    }
}
