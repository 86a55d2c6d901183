//! Per-project allow-list of file extensions that get content tokens.
//!
//! A project opts files into content substitution through a build property
//! holding a semicolon-delimited list of extensions, for example
//! `webpart;xml;aspx`. The list is read once per project and cached.

use std::sync::Arc;

use camino::Utf8Path;
use parking_lot::RwLock;
use spd_core::{BuildEvaluator, FxHashMap, FxHashSet, Project, ProjectId};
use tracing::{debug, warn};

/// Lower-cased extensions without a leading dot.
pub type ExtensionSet = FxHashSet<String>;

/// Lazily built, per-project extension allow-lists.
///
/// Entries are built on first use and kept until
/// [`invalidate`](Self::invalidate) is called. A failed evaluation is not
/// cached, so the next lookup tries again.
pub struct ExtensionPolicyCache {
    evaluator: Arc<dyn BuildEvaluator>,
    property: String,
    entries: RwLock<FxHashMap<ProjectId, Arc<ExtensionSet>>>,
}

impl std::fmt::Debug for ExtensionPolicyCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionPolicyCache")
            .field("property", &self.property)
            .field("projects", &self.entries.read().len())
            .finish_non_exhaustive()
    }
}

impl ExtensionPolicyCache {
    /// Creates an empty cache reading `property` through `evaluator`.
    #[must_use]
    pub fn new(evaluator: Arc<dyn BuildEvaluator>, property: impl Into<String>) -> Self {
        Self {
            evaluator,
            property: property.into(),
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Returns `true` if `file_name`'s extension is allow-listed for
    /// `project`, ignoring case.
    ///
    /// The extension is the text after the last `.` of the file name, so a
    /// dotfile such as `.xml` has the extension `xml`. Files without an
    /// extension never match.
    pub fn is_token_replacement_extension(&self, project: &dyn Project, file_name: &str) -> bool {
        let name = Utf8Path::new(file_name).file_name().unwrap_or(file_name);
        let Some((_, extension)) = name.rsplit_once('.') else {
            return false;
        };
        if extension.is_empty() {
            return false;
        }
        self.extensions(project).contains(&extension.to_lowercase())
    }

    /// Returns the allow-list for `project`, building it on first use.
    pub fn extensions(&self, project: &dyn Project) -> Arc<ExtensionSet> {
        let id = project.id();
        if let Some(set) = self.entries.read().get(&id) {
            return Arc::clone(set);
        }

        let Some(set) = self.load(project) else {
            return Arc::new(ExtensionSet::default());
        };
        let set = Arc::new(set);
        Arc::clone(self.entries.write().entry(id).or_insert(set))
    }

    /// Drops the cached allow-list for `id`.
    ///
    /// Returns `true` if an entry was present.
    pub fn invalidate(&self, id: ProjectId) -> bool {
        self.entries.write().remove(&id).is_some()
    }

    /// Returns the number of projects with a cached allow-list.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn load(&self, project: &dyn Project) -> Option<ExtensionSet> {
        let project_file = project.project_file();
        let evaluation = match self.evaluator.loaded_project(project_file) {
            Some(evaluation) => evaluation,
            None => match self.evaluator.evaluate(project_file) {
                Ok(evaluation) => evaluation,
                Err(error) => {
                    warn!(
                        project = %project_file,
                        error = %error,
                        "Cannot read token replacement extensions"
                    );
                    return None;
                }
            },
        };

        let Some(value) = evaluation.property(&self.property) else {
            warn!(
                project = %project_file,
                property = %self.property,
                "Property not set, no files receive content tokens"
            );
            return Some(ExtensionSet::default());
        };

        let set = parse_extension_list(&value);
        debug!(
            project = %project_file,
            extensions = set.len(),
            "Loaded token replacement extensions"
        );
        Some(set)
    }
}

/// Parses a semicolon-delimited extension list.
///
/// Empty entries are dropped, duplicates are merged without regard to case,
/// and surrounding whitespace and a leading dot are ignored.
///
/// # Examples
///
/// ```
/// use spd_deploy::extensions::parse_extension_list;
///
/// let set = parse_extension_list("webpart;XML;;.xml; aspx ");
/// assert_eq!(set.len(), 3);
/// assert!(set.contains("xml"));
/// ```
#[must_use]
pub fn parse_extension_list(value: &str) -> ExtensionSet {
    value
        .split(';')
        .map(|entry| entry.trim().trim_start_matches('.'))
        .filter(|entry| !entry.is_empty())
        .map(str::to_lowercase)
        .collect()
}
