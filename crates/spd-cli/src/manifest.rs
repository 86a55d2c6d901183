//! A JSON project manifest standing in for the IDE's project model.
//!
//! The manifest lists each project with its build properties, the identity
//! of its output assembly, and its items:
//!
//! ```json
//! {
//!   "sharepoint_install_path": "/opt/sharepoint/16",
//!   "projects": [
//!     {
//!       "id": "6f0c6c2e-3c1b-4b8e-9a39-2f1e0c1a7d11",
//!       "name": "Intranet",
//!       "project_file": "Intranet/Intranet.csproj",
//!       "output_path": "Intranet/bin/Debug/Contoso.Intranet.dll",
//!       "package": {
//!         "id": "5f1c3b0e-8d4a-4c43-b7a2-0c5bb5e2a001",
//!         "name": "Intranet",
//!         "output_path": "Intranet/bin/Debug/Intranet.wsp"
//!       },
//!       "properties": { "TokenReplacementFileExtensions": "webpart;xml" },
//!       "assembly": {
//!         "name": "Contoso.Intranet",
//!         "version": "1.0.0.0",
//!         "public_key_token": "71e9bce111e9429c"
//!       },
//!       "web_application_root": "/srv/sharepoint/wss/VirtualDirectories/80",
//!       "items": [
//!         {
//!           "name": "Layouts",
//!           "files": [
//!             {
//!               "path": "Intranet/Layouts/Intranet/site.css",
//!               "deployment_type": "template_file",
//!               "deployment_root": "{SharePointRoot}\\Template\\",
//!               "relative_path": "Layouts\\Intranet\\site.css"
//!             }
//!           ]
//!         }
//!       ]
//!     }
//!   ]
//! }
//! ```
//!
//! Relative paths are resolved against the manifest's directory. An assembly
//! counts as built once its output file exists.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use spd_core::{
    AssemblyIdentity, AssemblyInspector, BuildEvaluator, ConfigError, FxHashMap, FxHashSet,
    HostError, PackageInfo, Project, ProjectEvaluation, ProjectId, ProjectItem, ProjectItemFile,
    ProjectModel, WatchKey,
};
use uuid::Uuid;

/// Install path used when the manifest does not name one.
pub const DEFAULT_SHAREPOINT_INSTALL_PATH: &str =
    "C:\\Program Files\\Common Files\\Microsoft Shared\\Web Server Extensions\\16";

/// The manifest file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Manifest {
    /// SharePoint install path on this machine.
    pub sharepoint_install_path: Option<Utf8PathBuf>,

    /// Open projects, in iteration order.
    pub projects: Vec<ProjectEntry>,
}

/// One project in the manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectEntry {
    /// Stable project id.
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// Project definition file.
    pub project_file: Utf8PathBuf,

    /// Compiled output assembly.
    pub output_path: Utf8PathBuf,

    /// Package produced by the project.
    pub package: PackageInfo,

    /// Evaluated build properties.
    #[serde(default)]
    pub properties: FxHashMap<String, String>,

    /// Identity reported for the output assembly once it exists.
    #[serde(default)]
    pub assembly: Option<AssemblyIdentity>,

    /// Result of the web application root command; `None` when the project
    /// has no SharePoint connection.
    #[serde(default)]
    pub web_application_root: Option<String>,

    /// Project items.
    #[serde(default)]
    pub items: Vec<ProjectItem>,
}

impl ProjectEntry {
    /// Returns `true` if everything except the item list is equal.
    fn same_metadata(&self, other: &Self) -> bool {
        self.name == other.name
            && self.project_file == other.project_file
            && self.output_path == other.output_path
            && self.package == other.package
            && self.properties == other.properties
            && self.assembly == other.assembly
            && self.web_application_root == other.web_application_root
    }

    fn resolve_paths(&mut self, base: &Utf8Path) {
        absolutize(&mut self.project_file, base);
        absolutize(&mut self.output_path, base);
        absolutize(&mut self.package.output_path, base);
        for file in self.items.iter_mut().flat_map(|item| item.files.iter_mut()) {
            absolutize(&mut file.path, base);
        }
    }
}

fn absolutize(path: &mut Utf8PathBuf, base: &Utf8Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

/// A manifest project exposed through the [`Project`] trait.
#[derive(Debug)]
pub struct ManifestProject {
    entry: ProjectEntry,
}

impl ManifestProject {
    /// Wraps a manifest entry.
    #[must_use]
    pub const fn new(entry: ProjectEntry) -> Self {
        Self { entry }
    }

    /// Returns the manifest entry.
    #[must_use]
    pub const fn entry(&self) -> &ProjectEntry {
        &self.entry
    }
}

impl Project for ManifestProject {
    fn id(&self) -> ProjectId {
        ProjectId::new(self.entry.id)
    }

    fn name(&self) -> &str {
        &self.entry.name
    }

    fn project_file(&self) -> &Utf8Path {
        &self.entry.project_file
    }

    fn output_path(&self) -> &Utf8Path {
        &self.entry.output_path
    }

    fn package(&self) -> &PackageInfo {
        &self.entry.package
    }

    fn items(&self) -> Vec<ProjectItem> {
        self.entry.items.clone()
    }

    fn execute_command(&self, _command: &str) -> Result<String, HostError> {
        self.entry
            .web_application_root
            .clone()
            .ok_or_else(|| HostError::not_connected(&self.entry.name))
    }
}

/// Build properties of one manifest project.
#[derive(Debug)]
struct PropertyBag(FxHashMap<String, String>);

impl ProjectEvaluation for PropertyBag {
    fn property(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

#[derive(Debug)]
struct State {
    install_path: Utf8PathBuf,
    projects: Vec<Arc<ManifestProject>>,
}

impl State {
    fn from_manifest(manifest: Manifest) -> Self {
        Self {
            install_path: manifest
                .sharepoint_install_path
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_SHAREPOINT_INSTALL_PATH)),
            projects: manifest
                .projects
                .into_iter()
                .map(|entry| Arc::new(ManifestProject::new(entry)))
                .collect(),
        }
    }

    fn files(&self) -> FxHashMap<WatchKey, &ProjectItemFile> {
        self.projects
            .iter()
            .flat_map(|project| project.entry.items.iter())
            .flat_map(|item| item.files.iter())
            .map(|file| (WatchKey::new(&file.path), file))
            .collect()
    }

    fn find(&self, id: Uuid) -> Option<&ManifestProject> {
        self.projects
            .iter()
            .find(|project| project.entry.id == id)
            .map(Arc::as_ref)
    }
}

/// What changed between two versions of the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestChanges {
    /// Files now listed that were not before, sorted.
    pub added_files: Vec<Utf8PathBuf>,

    /// Files no longer listed, sorted.
    pub removed_files: Vec<Utf8PathBuf>,

    /// Files still listed under a different deployment type, sorted.
    pub reclassified_files: Vec<Utf8PathBuf>,

    /// Projects whose properties, package or assembly changed, or which
    /// were removed. Their cached metadata is stale.
    pub stale_projects: Vec<ProjectId>,

    /// `true` if projects were added or removed.
    pub projects_changed: bool,
}

impl ManifestChanges {
    fn between(old: &State, new: &State) -> Self {
        let before = old.files();
        let after = new.files();

        let mut added_files: Vec<_> = after
            .iter()
            .filter(|(key, _)| !before.contains_key(*key))
            .map(|(_, file)| file.path.clone())
            .collect();
        added_files.sort();

        let mut removed_files: Vec<_> = before
            .iter()
            .filter(|(key, _)| !after.contains_key(*key))
            .map(|(_, file)| file.path.clone())
            .collect();
        removed_files.sort();

        let mut reclassified_files: Vec<_> = after
            .iter()
            .filter(|(key, file)| {
                before
                    .get(*key)
                    .is_some_and(|old| old.deployment_type != file.deployment_type)
            })
            .map(|(_, file)| file.path.clone())
            .collect();
        reclassified_files.sort();

        let stale_projects = old
            .projects
            .iter()
            .filter(|project| {
                new.find(project.entry.id)
                    .is_none_or(|next| !next.entry.same_metadata(&project.entry))
            })
            .map(|project| project.id())
            .collect();

        let ids = |state: &State| -> FxHashSet<Uuid> {
            state.projects.iter().map(|p| p.entry.id).collect()
        };

        Self {
            added_files,
            removed_files,
            reclassified_files,
            stale_projects,
            projects_changed: ids(old) != ids(new),
        }
    }

    /// Returns `true` if nothing relevant changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_files.is_empty()
            && self.removed_files.is_empty()
            && self.reclassified_files.is_empty()
            && self.stale_projects.is_empty()
            && !self.projects_changed
    }
}

/// The project model, build evaluator and assembly inspector backed by a
/// manifest file.
#[derive(Debug)]
pub struct ManifestHost {
    path: Utf8PathBuf,
    state: RwLock<State>,
}

impl ManifestHost {
    /// Loads the manifest at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is missing, unreadable, or not a
    /// valid manifest.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let path = absolute(path)?;
        let manifest = read_manifest(&path)?;
        Ok(Self {
            state: RwLock::new(State::from_manifest(manifest)),
            path,
        })
    }

    /// Returns the absolute path of the manifest file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Reads the manifest again and reports what changed.
    ///
    /// On error the previous projects stay in place.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read or parsed.
    pub fn reload(&self) -> Result<ManifestChanges, ConfigError> {
        let next = State::from_manifest(read_manifest(&self.path)?);
        let mut state = self.state.write();
        let changes = ManifestChanges::between(&state, &next);
        *state = next;
        Ok(changes)
    }

    fn find_by<F>(&self, mut predicate: F) -> Option<Arc<ManifestProject>>
    where
        F: FnMut(&ProjectEntry) -> bool,
    {
        self.state
            .read()
            .projects
            .iter()
            .find(|project| predicate(&project.entry))
            .map(Arc::clone)
    }
}

impl ProjectModel for ManifestHost {
    fn projects(&self) -> Vec<Arc<dyn Project>> {
        self.state
            .read()
            .projects
            .iter()
            .map(|project| Arc::clone(project) as Arc<dyn Project>)
            .collect()
    }

    fn sharepoint_install_path(&self) -> Utf8PathBuf {
        self.state.read().install_path.clone()
    }
}

impl BuildEvaluator for ManifestHost {
    fn loaded_project(&self, project_file: &Utf8Path) -> Option<Arc<dyn ProjectEvaluation>> {
        let key = WatchKey::new(project_file);
        let project = self.find_by(|entry| key.matches(&entry.project_file))?;
        Some(Arc::new(PropertyBag(project.entry.properties.clone())))
    }

    fn evaluate(&self, project_file: &Utf8Path) -> Result<Arc<dyn ProjectEvaluation>, HostError> {
        let manifest = read_manifest(&self.path)
            .map_err(|error| HostError::evaluation(project_file, error.to_string()))?;
        let key = WatchKey::new(project_file);
        manifest
            .projects
            .into_iter()
            .find(|entry| key.matches(&entry.project_file))
            .map(|entry| Arc::new(PropertyBag(entry.properties)) as Arc<dyn ProjectEvaluation>)
            .ok_or_else(|| HostError::evaluation(project_file, "not listed in the manifest"))
    }
}

impl AssemblyInspector for ManifestHost {
    fn inspect(&self, assembly_path: &Utf8Path) -> Result<AssemblyIdentity, HostError> {
        let key = WatchKey::new(assembly_path);
        let unavailable = || HostError::AssemblyUnavailable(assembly_path.to_owned());

        if !assembly_path.is_file() {
            return Err(unavailable());
        }
        self.find_by(|entry| key.matches(&entry.output_path))
            .and_then(|project| project.entry.assembly.clone())
            .ok_or_else(unavailable)
    }
}

/// Reads and validates a manifest, resolving relative paths against its
/// directory.
fn read_manifest(path: &Utf8Path) -> Result<Manifest, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::MissingFile(path.to_owned()));
    }
    let contents = std::fs::read_to_string(path.as_std_path())?;
    let mut manifest: Manifest = serde_json::from_str(&contents)?;

    let base = path.parent().unwrap_or_else(|| Utf8Path::new("."));
    let mut seen = FxHashSet::default();
    for entry in &mut manifest.projects {
        if !seen.insert(entry.id) {
            return Err(ConfigError::invalid_option(
                "projects",
                format!("duplicate project id {}", entry.id),
            ));
        }
        entry.resolve_paths(base);
    }
    if let Some(install_path) = manifest.sharepoint_install_path.as_mut() {
        absolutize(install_path, base);
    }
    Ok(manifest)
}

fn absolute(path: &Utf8Path) -> Result<Utf8PathBuf, ConfigError> {
    if path.is_absolute() {
        return Ok(path.to_owned());
    }
    let cwd = std::env::current_dir()?;
    let cwd = Utf8PathBuf::from_path_buf(cwd).map_err(|cwd| ConfigError::InvalidPath {
        path: Utf8PathBuf::from(cwd.to_string_lossy().into_owned()),
        reason: "working directory is not valid UTF-8".to_owned(),
    })?;
    Ok(cwd.join(path))
}
