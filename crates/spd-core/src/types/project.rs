//! Project, item, and file types.
//!
//! These types mirror what the host's project model reports for each file:
//! where it lives, how it is classified for deployment, and where it should
//! land relative to a deployment root.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identity of a project within the host's project collection.
///
/// Used as the cache key for per-project metadata.
///
/// # Examples
///
/// ```
/// use spd_core::ProjectId;
/// use uuid::Uuid;
///
/// let id = ProjectId::new(Uuid::nil());
/// assert_eq!(id.to_string(), "00000000-0000-0000-0000-000000000000");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    /// Creates a project id from a UUID.
    #[inline]
    #[must_use]
    pub const fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Returns the inner UUID.
    #[inline]
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for ProjectId {
    #[inline]
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The SharePoint deployment type declared on a project item file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum DeploymentType {
    /// Not deployed.
    #[default]
    NoDeployment,
    /// Deployed relative to the SharePoint root folder.
    RootFile,
    /// Deployed relative to the `TEMPLATE` folder.
    TemplateFile,
    /// Part of a feature element.
    ElementFile,
    /// A feature element manifest.
    ElementManifest,
    /// A feature resource file.
    Resource,
    /// An application-wide global resource.
    AppGlobalResource,
    /// A class resource.
    ClassResource,
}

impl DeploymentType {
    /// Returns the deployment classification for this type.
    ///
    /// # Examples
    ///
    /// ```
    /// use spd_core::{DeploymentKind, DeploymentType};
    ///
    /// assert_eq!(DeploymentType::TemplateFile.kind(), DeploymentKind::Template);
    /// assert_eq!(DeploymentType::RootFile.kind(), DeploymentKind::Root);
    /// assert_eq!(DeploymentType::ElementManifest.kind(), DeploymentKind::Unsupported);
    /// ```
    #[must_use]
    pub const fn kind(self) -> DeploymentKind {
        match self {
            Self::TemplateFile => DeploymentKind::Template,
            Self::RootFile => DeploymentKind::Root,
            Self::NoDeployment
            | Self::ElementFile
            | Self::ElementManifest
            | Self::Resource
            | Self::AppGlobalResource
            | Self::ClassResource => DeploymentKind::Unsupported,
        }
    }
}

/// How a changed file is synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentKind {
    /// A template file; content tokens may be substituted.
    Template,
    /// A root file; content tokens may be substituted.
    Root,
    /// Not synchronized. Its watch is pruned on the next change.
    Unsupported,
}

impl DeploymentKind {
    /// Returns `true` for the two kinds that are copied on change.
    #[inline]
    #[must_use]
    pub const fn is_supported(self) -> bool {
        matches!(self, Self::Template | Self::Root)
    }
}

/// The package a project produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageInfo {
    /// Package identifier.
    pub id: Uuid,

    /// Package name as declared in the package designer.
    pub name: String,

    /// Path of the generated solution package (`.wsp`).
    pub output_path: Utf8PathBuf,
}

/// A file belonging to a project item.
///
/// # Examples
///
/// ```
/// use spd_core::{DeploymentType, ProjectItemFile};
/// use camino::Utf8PathBuf;
///
/// let file = ProjectItemFile::new(
///     Utf8PathBuf::from("/src/Intranet/Layouts/Intranet/site.css"),
///     DeploymentType::TemplateFile,
///     "{SharePointRoot}/Template/",
///     "Layouts/Intranet/site.css",
/// );
/// assert_eq!(file.name(), "site.css");
/// assert!(file.kind().is_supported());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectItemFile {
    /// Absolute path of the source file.
    pub path: Utf8PathBuf,

    /// Declared deployment type.
    pub deployment_type: DeploymentType,

    /// Deployment root, possibly containing path tokens.
    pub deployment_root: String,

    /// Path relative to the deployment root.
    pub relative_path: String,
}

impl ProjectItemFile {
    /// Creates a new project item file.
    #[must_use]
    pub fn new(
        path: impl Into<Utf8PathBuf>,
        deployment_type: DeploymentType,
        deployment_root: impl Into<String>,
        relative_path: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            deployment_type,
            deployment_root: deployment_root.into(),
            relative_path: relative_path.into(),
        }
    }

    /// Returns the file name of the source file.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.file_name().unwrap_or_default()
    }

    /// Returns the deployment classification.
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> DeploymentKind {
        self.deployment_type.kind()
    }

    /// Returns `true` if this file is at `path`, ignoring case.
    #[must_use]
    pub fn is_at(&self, path: &Utf8Path) -> bool {
        self.path.as_str().to_lowercase() == path.as_str().to_lowercase()
    }

    /// Returns the unresolved destination: deployment root joined with the
    /// relative path.
    #[must_use]
    pub fn raw_destination(&self) -> String {
        combine_deployment_path(&self.deployment_root, &self.relative_path)
    }

    /// Builds the per-change deployment descriptor for this file.
    #[must_use]
    pub fn descriptor(&self) -> DeploymentDescriptor {
        DeploymentDescriptor {
            source: self.path.clone(),
            deployment_root: self.deployment_root.clone(),
            relative_path: self.relative_path.clone(),
            kind: self.kind(),
        }
    }
}

/// What to deploy for one change event.
///
/// Derived from a [`ProjectItemFile`] each time its source changes and never
/// stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentDescriptor {
    /// Absolute path of the source file.
    pub source: Utf8PathBuf,

    /// Deployment root, possibly containing path tokens.
    pub deployment_root: String,

    /// Path relative to the deployment root.
    pub relative_path: String,

    /// Deployment classification.
    pub kind: DeploymentKind,
}

impl DeploymentDescriptor {
    /// Returns the unresolved destination path.
    #[must_use]
    pub fn raw_destination(&self) -> String {
        combine_deployment_path(&self.deployment_root, &self.relative_path)
    }

    /// Returns the file name of the source.
    #[must_use]
    pub fn source_name(&self) -> &str {
        self.source.file_name().unwrap_or_default()
    }
}

/// A project item and the files it contains.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectItem {
    /// Item name.
    pub name: String,

    /// Files of this item.
    #[serde(default)]
    pub files: Vec<ProjectItemFile>,
}

/// Joins a deployment root and a relative path.
///
/// Either `/` or `\` counts as a separator so that roots written for the
/// host's platform combine cleanly. A rooted relative path replaces the root.
///
/// # Examples
///
/// ```
/// use spd_core::types::combine_deployment_path;
///
/// assert_eq!(combine_deployment_path("{SharePointRoot}/Template/", "Layouts/a.js"),
///            "{SharePointRoot}/Template/Layouts/a.js");
/// assert_eq!(combine_deployment_path("{SharePointRoot}\\Template", "Layouts\\a.js"),
///            "{SharePointRoot}\\Template\\Layouts\\a.js");
/// ```
#[must_use]
pub fn combine_deployment_path(root: &str, relative: &str) -> String {
    if root.is_empty() {
        return relative.to_owned();
    }
    if relative.is_empty() {
        return root.to_owned();
    }
    if relative.starts_with(['/', '\\']) {
        return relative.to_owned();
    }
    if root.ends_with(['/', '\\']) {
        return format!("{root}{relative}");
    }
    let separator = if root.contains('\\') && !root.contains('/') {
        '\\'
    } else {
        '/'
    };
    format!("{root}{separator}{relative}")
}
