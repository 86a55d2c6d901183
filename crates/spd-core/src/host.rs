//! Collaborator traits implemented by the host.
//!
//! The deployment engine never talks to an IDE, a build engine, or a .NET
//! runtime directly. Everything it needs from the outside world comes through
//! these traits:
//!
//! - [`ProjectModel`] / [`Project`] - enumerate projects and their files,
//!   execute commands against a project's SharePoint connection
//! - [`BuildEvaluator`] / [`ProjectEvaluation`] - read build properties
//! - [`AssemblyInspector`] - read the identity of a built assembly
//! - [`HierarchyListener`] - receive item added/removed notifications
//!
//! # Examples
//!
//! A minimal single-project model:
//!
//! ```
//! use std::sync::Arc;
//! use camino::{Utf8Path, Utf8PathBuf};
//! use spd_core::{HostError, PackageInfo, Project, ProjectId, ProjectItem, ProjectModel};
//! use uuid::Uuid;
//!
//! struct Intranet {
//!     package: PackageInfo,
//! }
//!
//! impl Project for Intranet {
//!     fn id(&self) -> ProjectId { ProjectId::new(Uuid::nil()) }
//!     fn name(&self) -> &str { "Intranet" }
//!     fn project_file(&self) -> &Utf8Path { Utf8Path::new("/src/Intranet/Intranet.csproj") }
//!     fn output_path(&self) -> &Utf8Path { Utf8Path::new("/src/Intranet/bin/Intranet.dll") }
//!     fn package(&self) -> &PackageInfo { &self.package }
//!     fn items(&self) -> Vec<ProjectItem> { Vec::new() }
//!     fn execute_command(&self, command: &str) -> Result<String, HostError> {
//!         Err(HostError::not_connected(self.name()))
//!     }
//! }
//!
//! struct Solution(Vec<Arc<dyn Project>>);
//!
//! impl ProjectModel for Solution {
//!     fn projects(&self) -> Vec<Arc<dyn Project>> { self.0.clone() }
//!     fn sharepoint_install_path(&self) -> Utf8PathBuf { Utf8PathBuf::from("/opt/sharepoint/16") }
//! }
//! ```

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::HostError;
use crate::types::{AssemblyIdentity, PackageInfo, ProjectId, ProjectItem, ProjectItemFile};

/// The host's collection of open projects.
pub trait ProjectModel: Send + Sync {
    /// Returns the currently open projects, in the host's iteration order.
    fn projects(&self) -> Vec<Arc<dyn Project>>;

    /// Returns the SharePoint install path on this machine.
    fn sharepoint_install_path(&self) -> Utf8PathBuf;
}

/// A single project in the host's project model.
pub trait Project: Send + Sync {
    /// Stable unique id.
    fn id(&self) -> ProjectId;

    /// Display name used in log messages.
    fn name(&self) -> &str;

    /// Absolute path of the project definition file.
    fn project_file(&self) -> &Utf8Path;

    /// Absolute path of the compiled output assembly.
    fn output_path(&self) -> &Utf8Path;

    /// The package this project produces.
    fn package(&self) -> &PackageInfo;

    /// The project's items and their files.
    fn items(&self) -> Vec<ProjectItem>;

    /// Executes a named command against the project's SharePoint connection
    /// and returns its string result.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::NotConnected`] if the project has no live
    /// connection, or [`HostError::CommandFailed`] if the command fails.
    fn execute_command(&self, command: &str) -> Result<String, HostError>;

    /// Returns the first file of any item located at `path`, ignoring case.
    fn find_file(&self, path: &Utf8Path) -> Option<ProjectItemFile> {
        self.items()
            .into_iter()
            .flat_map(|item| item.files)
            .find(|file| file.is_at(path))
    }
}

/// Evaluated build properties of one project file.
pub trait ProjectEvaluation: Send + Sync {
    /// Returns the evaluated value of a property, or `None` if it is not
    /// defined.
    fn property(&self, name: &str) -> Option<String>;
}

/// The build tool used to read project-level configuration properties.
pub trait BuildEvaluator: Send + Sync {
    /// Returns the evaluation of `project_file` if the build tool already has
    /// it loaded.
    fn loaded_project(&self, project_file: &Utf8Path) -> Option<Arc<dyn ProjectEvaluation>>;

    /// Evaluates `project_file` from disk into a temporary in-memory
    /// evaluation.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Evaluation`] if the project cannot be evaluated.
    fn evaluate(&self, project_file: &Utf8Path) -> Result<Arc<dyn ProjectEvaluation>, HostError>;
}

/// Reads the identity of a compiled assembly.
pub trait AssemblyInspector: Send + Sync {
    /// Returns the identity of the assembly at `assembly_path`.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::AssemblyUnavailable`] if the assembly has not been
    /// built or cannot be read.
    fn inspect(&self, assembly_path: &Utf8Path) -> Result<AssemblyIdentity, HostError>;
}

/// Receives project hierarchy changes.
///
/// Paths are the canonical names the hierarchy reports for the added or
/// removed item.
pub trait HierarchyListener: Send + Sync {
    /// An item was added to a project.
    fn on_item_added(&self, path: &Utf8Path);

    /// An item was removed from a project.
    fn on_item_removed(&self, path: &Utf8Path);
}
