//! In-memory collaborators shared by the unit tests.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use spd_core::{
    AssemblyIdentity, AssemblyInspector, BuildEvaluator, FxHashMap, HostError, PackageInfo,
    Project, ProjectEvaluation, ProjectId, ProjectItem, ProjectItemFile, ProjectModel,
};
use uuid::Uuid;

pub(crate) struct FakeProject {
    pub id: ProjectId,
    pub name: String,
    pub project_file: Utf8PathBuf,
    pub output_path: Utf8PathBuf,
    pub package: PackageInfo,
    pub items: Mutex<Vec<ProjectItem>>,
    pub web_root: Option<String>,
}

impl FakeProject {
    pub(crate) fn new(root: &Utf8Path, name: &str, seed: u128) -> Self {
        Self {
            id: ProjectId::new(Uuid::from_u128(seed)),
            name: name.to_owned(),
            project_file: root.join(format!("{name}.csproj")),
            output_path: root.join("bin").join(format!("{name}.dll")),
            package: PackageInfo {
                id: Uuid::from_u128(seed + 1000),
                name: format!("{name}.wsp"),
                output_path: root.join("bin").join(format!("{name}.wsp")),
            },
            items: Mutex::new(Vec::new()),
            web_root: None,
        }
    }

    pub(crate) fn add_file(&self, file: ProjectItemFile) {
        self.items.lock().push(ProjectItem {
            name: file.name().to_owned(),
            files: vec![file],
        });
    }
}

impl Project for FakeProject {
    fn id(&self) -> ProjectId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn project_file(&self) -> &Utf8Path {
        &self.project_file
    }

    fn output_path(&self) -> &Utf8Path {
        &self.output_path
    }

    fn package(&self) -> &PackageInfo {
        &self.package
    }

    fn items(&self) -> Vec<ProjectItem> {
        self.items.lock().clone()
    }

    fn execute_command(&self, command: &str) -> Result<String, HostError> {
        self.web_root
            .clone()
            .ok_or_else(|| HostError::command_failed(command, "not connected"))
    }
}

#[derive(Default)]
pub(crate) struct FakeModel {
    pub projects: Mutex<Vec<Arc<dyn Project>>>,
}

impl ProjectModel for FakeModel {
    fn projects(&self) -> Vec<Arc<dyn Project>> {
        self.projects.lock().clone()
    }

    fn sharepoint_install_path(&self) -> Utf8PathBuf {
        Utf8PathBuf::from("/opt/sharepoint/16")
    }
}

pub(crate) struct FakeEvaluation(pub FxHashMap<String, String>);

impl ProjectEvaluation for FakeEvaluation {
    fn property(&self, name: &str) -> Option<String> {
        self.0.get(name).cloned()
    }
}

/// Evaluator with per-project properties; unknown projects fail to evaluate.
#[derive(Default)]
pub(crate) struct FakeEvaluator {
    pub loaded: Mutex<FxHashMap<Utf8PathBuf, Arc<dyn ProjectEvaluation>>>,
    pub on_disk: Mutex<FxHashMap<Utf8PathBuf, Arc<dyn ProjectEvaluation>>>,
    pub evaluations: Mutex<usize>,
}

impl FakeEvaluator {
    pub(crate) fn with_property(project_file: &Utf8Path, name: &str, value: &str) -> Self {
        let evaluator = Self::default();
        let mut properties = FxHashMap::default();
        properties.insert(name.to_owned(), value.to_owned());
        evaluator
            .on_disk
            .lock()
            .insert(project_file.to_owned(), Arc::new(FakeEvaluation(properties)));
        evaluator
    }
}

impl BuildEvaluator for FakeEvaluator {
    fn loaded_project(&self, project_file: &Utf8Path) -> Option<Arc<dyn ProjectEvaluation>> {
        self.loaded.lock().get(project_file).cloned()
    }

    fn evaluate(&self, project_file: &Utf8Path) -> Result<Arc<dyn ProjectEvaluation>, HostError> {
        *self.evaluations.lock() += 1;
        self.on_disk
            .lock()
            .get(project_file)
            .cloned()
            .ok_or_else(|| HostError::evaluation(project_file, "project file not found"))
    }
}

/// Inspector returning a fixed identity for assemblies it knows about.
#[derive(Default)]
pub(crate) struct FakeInspector {
    pub built: Mutex<FxHashMap<Utf8PathBuf, AssemblyIdentity>>,
    pub inspections: Mutex<usize>,
}

impl FakeInspector {
    pub(crate) fn built(assembly: &Utf8Path, identity: AssemblyIdentity) -> Self {
        let inspector = Self::default();
        inspector.built.lock().insert(assembly.to_owned(), identity);
        inspector
    }
}

impl AssemblyInspector for FakeInspector {
    fn inspect(&self, assembly_path: &Utf8Path) -> Result<AssemblyIdentity, HostError> {
        *self.inspections.lock() += 1;
        self.built
            .lock()
            .get(assembly_path)
            .cloned()
            .ok_or_else(|| HostError::AssemblyUnavailable(assembly_path.to_owned()))
    }
}

pub(crate) fn signed_identity(name: &str) -> AssemblyIdentity {
    AssemblyIdentity {
        name: name.to_owned(),
        version: "1.0.0.0".to_owned(),
        culture: None,
        public_key_token: vec![0x71, 0xe9, 0xbc, 0xe1, 0x11, 0xe9, 0x42, 0x9c],
    }
}
