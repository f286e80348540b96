//! Test utilities for unit testing the checkpoint pipeline
//!
//! This module provides pod fixtures shaped like a self-hosted apiserver and
//! an in-memory secret source.

#[cfg(test)]
use crate::error::ControllerError;
#[cfg(test)]
use crate::secrets::{SecretMaterial, SecretSource};
#[cfg(test)]
use k8s_openapi::api::core::v1::{
    Container, HostPathVolumeSource, Pod, PodSpec, PodStatus, SecretVolumeSource, Volume,
    VolumeMount,
};
#[cfg(test)]
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicUsize, Ordering};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// Helper to create a self-hosted apiserver pod as the kubelet reports it
#[cfg(test)]
pub fn primary_apiserver_pod(name: &str, namespace: &str) -> Pod {
    let mount = |name: &str, path: &str| VolumeMount {
        name: name.to_string(),
        mount_path: path.to_string(),
        read_only: Some(true),
        ..Default::default()
    };

    Pod {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            uid: Some("3f1c2a9e-0000-4000-8000-000000000001".to_string()),
            ..Default::default()
        },
        spec: Some(PodSpec {
            host_network: Some(true),
            node_name: Some("node1".to_string()),
            containers: vec![Container {
                name: "kube-apiserver".to_string(),
                image: Some("quay.io/coreos/hyperkube:v1.5.1_coreos.0".to_string()),
                command: Some(
                    [
                        "/hyperkube",
                        "apiserver",
                        "--bind-address=0.0.0.0",
                        "--secure-port=443",
                        "--insecure-port=8080",
                        "--etcd-servers=http://127.0.0.1:2379",
                        "--tls-cert-file=/etc/kubernetes/secrets/apiserver.crt",
                        "--tls-private-key-file=/etc/kubernetes/secrets/apiserver.key",
                        "--client-ca-file=/etc/kubernetes/secrets/ca.crt",
                    ]
                    .iter()
                    .map(ToString::to_string)
                    .collect(),
                ),
                volume_mounts: Some(vec![
                    mount("secrets", "/etc/kubernetes/secrets"),
                    mount(
                        "default-token-abcde",
                        "/var/run/secrets/kubernetes.io/serviceaccount",
                    ),
                    mount("ssl-certs-host", "/etc/ssl/certs"),
                ]),
                ..Default::default()
            }],
            volumes: Some(vec![
                Volume {
                    name: "secrets".to_string(),
                    secret: Some(SecretVolumeSource {
                        secret_name: Some("kube-apiserver".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Volume {
                    name: "default-token-abcde".to_string(),
                    secret: Some(SecretVolumeSource {
                        secret_name: Some("default-token-abcde".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
                Volume {
                    name: "ssl-certs-host".to_string(),
                    host_path: Some(HostPathVolumeSource {
                        path: "/usr/share/ca-certificates".to_string(),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            ]),
            ..Default::default()
        }),
        status: Some(PodStatus {
            phase: Some("Running".to_string()),
            ..Default::default()
        }),
    }
}

/// Helper to create the apiserver's TLS secret data
#[cfg(test)]
pub fn apiserver_secret() -> SecretMaterial {
    SecretMaterial::from([
        ("apiserver.crt".to_string(), b"CERT".to_vec()),
        ("apiserver.key".to_string(), b"KEY".to_vec()),
        ("ca.crt".to_string(), b"CA".to_vec()),
    ])
}

/// In-memory secret source
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct MockSecretSource {
    secrets: Arc<Mutex<HashMap<(String, String), SecretMaterial>>>,
    requests: Arc<AtomicUsize>,
}

#[cfg(test)]
impl MockSecretSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret to the mock store (for test setup)
    pub fn add_secret(&self, namespace: &str, name: &str, data: SecretMaterial) {
        self.secrets
            .lock()
            .unwrap()
            .insert((namespace.to_string(), name.to_string()), data);
    }

    /// Number of secret lookups made so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[async_trait::async_trait]
impl SecretSource for MockSecretSource {
    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SecretMaterial, ControllerError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| ControllerError::SecretNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }
}
