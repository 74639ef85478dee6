//! Object model shared by the dev pod controller crates.

pub mod config;
pub mod configmap;
pub mod deployment;
pub mod devpod;
pub mod meta;
pub mod pod;
pub mod quantity;
pub mod replicaset;
pub mod statefulset;
pub mod validate;
pub mod volume;
pub mod workload;
