//! Cluster API boundary of the dev pod controller.
//!
//! [`ClusterApi`] is the seam the controllers talk through; the
//! [`RegistryClient`] implements it on top of any [`pkg_state::Store`],
//! persisting objects under `/registry/<plural>/<namespace>/<name>` the same
//! way the control plane does.

pub mod cache;
pub mod client;
pub mod error;
pub mod patch;
pub mod registry;

pub use cache::RemoteCache;
pub use client::{ClusterApi, ClusterExt};
pub use error::ApiError;
pub use patch::MergePatch;
pub use registry::RegistryClient;
