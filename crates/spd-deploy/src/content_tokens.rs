//! Content token tables.
//!
//! Template files may contain `$SharePoint.*$` placeholders that stand for
//! values known only after the project has been built. A
//! [`ContentTokenTable`] maps each placeholder to its value for one project;
//! [`ContentTokenCache`] builds tables lazily and keeps them per project.

use std::sync::Arc;

use camino::Utf8Path;
use parking_lot::RwLock;
use spd_core::{AssemblyIdentity, AssemblyInspector, FxHashMap, Project, ProjectId};
use tracing::{debug, warn};

/// `$SharePoint.Project.FileName$`
pub const PROJECT_FILE_NAME: &str = "$SharePoint.Project.FileName$";
/// `$SharePoint.Project.FileNameWithoutExtension$`
pub const PROJECT_FILE_STEM: &str = "$SharePoint.Project.FileNameWithoutExtension$";
/// `$SharePoint.Package.Name$`
pub const PACKAGE_NAME: &str = "$SharePoint.Package.Name$";
/// `$SharePoint.Package.FileName$`
pub const PACKAGE_FILE_NAME: &str = "$SharePoint.Package.FileName$";
/// `$SharePoint.Package.FileNameWithoutExtension$`
pub const PACKAGE_FILE_STEM: &str = "$SharePoint.Package.FileNameWithoutExtension$";
/// `$SharePoint.Package.Id$`
pub const PACKAGE_ID: &str = "$SharePoint.Package.Id$";
/// `$SharePoint.Project.AssemblyFullName$`
pub const ASSEMBLY_FULL_NAME: &str = "$SharePoint.Project.AssemblyFullName$";
/// `$SharePoint.Project.AssemblyFileName$`
pub const ASSEMBLY_FILE_NAME: &str = "$SharePoint.Project.AssemblyFileName$";
/// `$SharePoint.Project.AssemblyFileNameWithoutExtension$`
pub const ASSEMBLY_FILE_STEM: &str = "$SharePoint.Project.AssemblyFileNameWithoutExtension$";
/// `$SharePoint.Project.AssemblyPublicKeyToken$`
pub const ASSEMBLY_PUBLIC_KEY_TOKEN: &str = "$SharePoint.Project.AssemblyPublicKeyToken$";

/// Every content token, in table order.
pub const ALL_TOKENS: [&str; 10] = [
    PROJECT_FILE_NAME,
    PROJECT_FILE_STEM,
    PACKAGE_NAME,
    PACKAGE_FILE_NAME,
    PACKAGE_FILE_STEM,
    PACKAGE_ID,
    ASSEMBLY_FULL_NAME,
    ASSEMBLY_FILE_NAME,
    ASSEMBLY_FILE_STEM,
    ASSEMBLY_PUBLIC_KEY_TOKEN,
];

/// The content tokens of one project and their values.
///
/// Immutable once built. Replacement is literal and case-sensitive.
///
/// # Examples
///
/// ```
/// use spd_deploy::ContentTokenTable;
///
/// let table = ContentTokenTable::from_pairs([
///     ("$SharePoint.Package.Id$", "5f1c3b0e-0000-0000-0000-000000000001"),
/// ]);
/// assert_eq!(
///     table.apply("<Solution Id=\"$SharePoint.Package.Id$\" />"),
///     "<Solution Id=\"5f1c3b0e-0000-0000-0000-000000000001\" />"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentTokenTable {
    entries: Vec<(String, String)>,
}

impl ContentTokenTable {
    /// Creates an empty table. Applying it leaves text unchanged.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from token/value pairs.
    #[must_use]
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(token, value)| (token.into(), value.into()))
                .collect(),
        }
    }

    /// Builds the ten standard tokens for `project` from its built assembly.
    #[must_use]
    pub fn for_project(project: &dyn Project, assembly: &AssemblyIdentity) -> Self {
        let project_file = project.project_file();
        let output = project.output_path();
        let package = project.package();
        let package_name = Utf8Path::new(&package.name);

        Self::from_pairs([
            (PROJECT_FILE_NAME, file_name(project_file)),
            (PROJECT_FILE_STEM, file_stem(project_file)),
            (PACKAGE_NAME, file_stem(&package.output_path)),
            (PACKAGE_FILE_NAME, file_name(package_name)),
            (PACKAGE_FILE_STEM, file_stem(package_name)),
            (PACKAGE_ID, package.id.to_string()),
            (ASSEMBLY_FULL_NAME, assembly.full_name()),
            (ASSEMBLY_FILE_NAME, file_name(output)),
            (ASSEMBLY_FILE_STEM, file_stem(output)),
            (ASSEMBLY_PUBLIC_KEY_TOKEN, assembly.public_key_token_hex()),
        ])
    }

    /// Returns the value of `token`, if present.
    #[must_use]
    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == token)
            .map(|(_, value)| value.as_str())
    }

    /// Iterates over token/value pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table has no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replaces every occurrence of every token in `text`.
    #[must_use]
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_owned();
        for (token, value) in &self.entries {
            if out.contains(token.as_str()) {
                out = out.replace(token.as_str(), value);
            }
        }
        out
    }
}

fn file_name(path: &Utf8Path) -> String {
    path.file_name().unwrap_or_default().to_owned()
}

fn file_stem(path: &Utf8Path) -> String {
    path.file_stem().unwrap_or_default().to_owned()
}

/// Lazily built, per-project content token tables.
///
/// A table is built the first time a project needs one and reused until
/// [`invalidate`](Self::invalidate). If the project's assembly cannot be
/// read, an empty table is returned and nothing is cached, so the tokens
/// appear once the project has been built.
pub struct ContentTokenCache {
    inspector: Arc<dyn AssemblyInspector>,
    tables: RwLock<FxHashMap<ProjectId, Arc<ContentTokenTable>>>,
}

impl std::fmt::Debug for ContentTokenCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentTokenCache")
            .field("projects", &self.tables.read().len())
            .finish_non_exhaustive()
    }
}

impl ContentTokenCache {
    /// Creates an empty cache reading assemblies through `inspector`.
    #[must_use]
    pub fn new(inspector: Arc<dyn AssemblyInspector>) -> Self {
        Self {
            inspector,
            tables: RwLock::new(FxHashMap::default()),
        }
    }

    /// Returns the token table for `project`, building it on first use.
    pub fn get_tokens(&self, project: &dyn Project) -> Arc<ContentTokenTable> {
        let id = project.id();
        if let Some(table) = self.tables.read().get(&id) {
            return Arc::clone(table);
        }

        let assembly = match self.inspector.inspect(project.output_path()) {
            Ok(assembly) => assembly,
            Err(error) => {
                warn!(
                    project = %project.project_file(),
                    error = %error,
                    "Please build the project {} at least one time to create the replace tokens.",
                    project.project_file()
                );
                return Arc::new(ContentTokenTable::new());
            }
        };

        let table = Arc::new(ContentTokenTable::for_project(project, &assembly));
        debug!(project = %id, assembly = %assembly.name, "Built content token table");
        Arc::clone(self.tables.write().entry(id).or_insert(table))
    }

    /// Replaces the content tokens of `project` in `text`.
    #[must_use]
    pub fn apply_content_tokens(&self, project: &dyn Project, text: &str) -> String {
        self.get_tokens(project).apply(text)
    }

    /// Drops the cached table for `id`.
    ///
    /// Returns `true` if an entry was present.
    pub fn invalidate(&self, id: ProjectId) -> bool {
        self.tables.write().remove(&id).is_some()
    }

    /// Returns the number of projects with a cached table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    /// Returns `true` if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }
}
