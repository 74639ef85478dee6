//! Centralized constants for the k3rs dev pod controller.
//!
//! All project-wide constant values live here.
//! Change a value in one place and it applies everywhere.

pub mod devpod;
pub mod paths;
pub mod state;
