//! Static Pod Manifests
//!
//! Storage for the kubelet static-pod manifests used to bootstrap a
//! self-hosted control plane:
//!
//! - [`store`]: atomic write, idempotent remove and standby-to-active
//!   promotion of manifest files.
//! - [`template`]: the temp-apiserver manifest template, embedded at build
//!   time and rendered around a captured pod spec.
//!
//! Two directories are involved. The *active* directory is watched by the
//! kubelet, so a file appearing there starts a pod and a file disappearing
//! stops it. The *standby* directory is not watched and holds the last
//! known-good manifest. The active copy is only ever produced by promoting
//! the standby copy byte for byte.

pub mod error;
pub mod store;
pub mod template;

pub use error::StaticPodError;
pub use store::{
    ManifestStore, PromoteOutcome, RemoveOutcome, StagedWrite, promote, remove, stage, write,
    write_with_mode,
};
pub use template::ManifestTemplate;
