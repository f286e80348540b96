//! Kubelet read-only API client

use crate::error::KubeletError;
use crate::kubelet_trait::KubeletClientTrait;
use crate::models::{PodList, PodSnapshot};
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Number of response body characters echoed back in decode errors
const BODY_PREVIEW_CHARS: usize = 500;

/// Kubelet pod listing client
#[derive(Debug, Clone)]
pub struct KubeletClient {
    client: Client,
    pods_url: String,
}

impl KubeletClient {
    /// Create a new kubelet client
    ///
    /// # Arguments
    /// * `pods_url` - Full URL of the pod listing endpoint (e.g., "http://127.0.0.1:10255/pods")
    /// * `timeout` - Transport timeout applied to each request. It bounds only
    ///   the pod listing fetch; a reconcile pass as a whole has no deadline.
    pub fn new(pods_url: String, timeout: Duration) -> Result<Self, KubeletError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(KubeletError::Http)?;

        Ok(Self { client, pods_url })
    }

    /// Get the pod listing URL
    #[must_use]
    pub fn pods_url(&self) -> &str {
        &self.pods_url
    }

    /// Fetch and decode the kubelet's pod list
    pub async fn list_pods(&self) -> Result<PodSnapshot, KubeletError> {
        debug!("GET {}", self.pods_url);

        let response = self
            .client
            .get(&self.pods_url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(KubeletError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(KubeletError::Api(format!(
                "GET {} failed: {} - {}",
                self.pods_url, status, body
            )));
        }

        let response_text = response.text().await?;
        let list: PodList = serde_json::from_str(&response_text).map_err(|e| {
            KubeletError::Decode(format!(
                "{} - Response (first {} chars): {}",
                e,
                BODY_PREVIEW_CHARS,
                response_text.chars().take(BODY_PREVIEW_CHARS).collect::<String>()
            ))
        })?;

        let snapshot = PodSnapshot::from(list);
        debug!("Kubelet reported {} pods", snapshot.len());
        Ok(snapshot)
    }
}

#[async_trait::async_trait]
impl KubeletClientTrait for KubeletClient {
    fn pods_url(&self) -> &str {
        KubeletClient::pods_url(self)
    }

    async fn list_pods(&self) -> Result<PodSnapshot, KubeletError> {
        KubeletClient::list_pods(self).await
    }
}
