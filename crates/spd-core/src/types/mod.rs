//! Domain types for sp-autocopy.
//!
//! # Module Organization
//!
//! - [`project`] - Projects, items, files, and their deployment classification
//! - [`assembly`] - Compiled output assembly identity
//! - [`key`] - Case-insensitive watch keys
//!
//! All public types are re-exported at this module level and at the crate root:
//!
//! ```
//! use spd_core::{DeploymentType, ProjectId, ProjectItemFile, WatchKey};
//! ```

mod assembly;
mod key;
mod project;

pub use assembly::AssemblyIdentity;
pub use key::WatchKey;
pub use project::{
    DeploymentDescriptor, DeploymentKind, DeploymentType, PackageInfo, ProjectId, ProjectItem,
    ProjectItemFile, combine_deployment_path,
};
