//! Core types, collaborator traits, and configuration for sp-autocopy.
//!
//! This crate provides the foundational types used across the workspace:
//!
//! - Domain types (`ProjectId`, `ProjectItemFile`, `DeploymentType`, `WatchKey`)
//! - Collaborator traits describing the host's project model, build
//!   evaluation, assembly inspection, and hierarchy notifications
//! - Configuration structures
//! - Error types for consistent error handling
//! - Type aliases for `FxHashMap`/`FxHashSet` (faster than std)
//!
//! # Crate Dependencies
//!
//! ```text
//! spd-cli ──► spd-deploy ──► spd-watcher ──► spd-core
//!                        └──────────────────►
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod host;
pub mod types;

pub use config::{Config, DeployConfig, WatchConfig};
pub use error::{ConfigError, HostError};
pub use hash::{FxHashMap, FxHashSet};
pub use host::{
    AssemblyInspector, BuildEvaluator, HierarchyListener, Project, ProjectEvaluation,
    ProjectModel,
};
pub use types::{
    AssemblyIdentity, DeploymentDescriptor, DeploymentKind, DeploymentType, PackageInfo,
    ProjectId, ProjectItem, ProjectItemFile, WatchKey,
};
