//! Kubelet Pod Listing Client
//!
//! Read-only client for the kubelet's `/pods` endpoint (normally the
//! unauthenticated read-only port, `10255`). Every call performs exactly one
//! request and never retries; callers poll on their own schedule.
//!
//! # Example
//!
//! ```no_run
//! use kubelet_client::{KubeletClient, KubeletClientTrait};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = KubeletClient::new(
//!     "http://127.0.0.1:10255/pods".to_string(),
//!     Duration::from_secs(30),
//! )?;
//!
//! let snapshot = client.list_pods().await?;
//! for pod in snapshot.iter() {
//!     println!("{:?}", pod.metadata.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod models;
#[path = "trait.rs"]
pub mod kubelet_trait;
#[cfg(feature = "test-util")]
pub mod mock;

pub use client::KubeletClient;
pub use error::KubeletError;
pub use models::{PodList, PodSnapshot};
pub use kubelet_trait::KubeletClientTrait;
#[cfg(feature = "test-util")]
pub use mock::MockKubeletClient;
