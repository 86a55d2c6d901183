//! End-to-end deployment through the public API.

use std::fs;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use spd_core::config::DEFAULT_TOKEN_EXTENSIONS_PROPERTY;
use spd_core::{
    AssemblyIdentity, AssemblyInspector, BuildEvaluator, DeploymentType, HierarchyListener,
    HostError, PackageInfo, Project, ProjectEvaluation, ProjectId, ProjectItem, ProjectItemFile,
    ProjectModel,
};
use spd_deploy::content_tokens::ALL_TOKENS;
use spd_deploy::{
    ContentTokenCache, DeploymentWriter, ExtensionPolicyCache, PathTokenResolver, WatchRegistry,
};
use spd_watcher::{FileNotifier, ManualNotifier};
use tempfile::TempDir;
use uuid::Uuid;

struct Intranet {
    root: Utf8PathBuf,
    project_file: Utf8PathBuf,
    output_path: Utf8PathBuf,
    package: PackageInfo,
    files: Mutex<Vec<ProjectItemFile>>,
}

impl Project for Intranet {
    fn id(&self) -> ProjectId {
        ProjectId::new(Uuid::from_u128(42))
    }

    fn name(&self) -> &str {
        "Intranet"
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
        vec![ProjectItem {
            name: "Layouts".to_owned(),
            files: self.files.lock().clone(),
        }]
    }

    fn execute_command(&self, _command: &str) -> Result<String, HostError> {
        Ok(self.root.join("wwwroot").into_string())
    }
}

struct Solution {
    projects: Mutex<Vec<Arc<dyn Project>>>,
    hive: Utf8PathBuf,
}

impl ProjectModel for Solution {
    fn projects(&self) -> Vec<Arc<dyn Project>> {
        self.projects.lock().clone()
    }

    fn sharepoint_install_path(&self) -> Utf8PathBuf {
        self.hive.clone()
    }
}

struct Properties(String);

impl ProjectEvaluation for Properties {
    fn property(&self, name: &str) -> Option<String> {
        (name == DEFAULT_TOKEN_EXTENSIONS_PROPERTY).then(|| self.0.clone())
    }
}

struct Msbuild(String);

impl BuildEvaluator for Msbuild {
    fn loaded_project(&self, _project_file: &Utf8Path) -> Option<Arc<dyn ProjectEvaluation>> {
        None
    }

    fn evaluate(&self, _project_file: &Utf8Path) -> Result<Arc<dyn ProjectEvaluation>, HostError> {
        Ok(Arc::new(Properties(self.0.clone())))
    }
}

struct Reflection;

impl AssemblyInspector for Reflection {
    fn inspect(&self, assembly_path: &Utf8Path) -> Result<AssemblyIdentity, HostError> {
        if !assembly_path.exists() {
            return Err(HostError::AssemblyUnavailable(assembly_path.to_owned()));
        }
        Ok(AssemblyIdentity {
            name: "Contoso.Intranet".to_owned(),
            version: "1.0.0.0".to_owned(),
            culture: None,
            public_key_token: vec![0x71, 0xe9, 0xbc, 0xe1, 0x11, 0xe9, 0x42, 0x9c],
        })
    }
}

struct Harness {
    _dir: TempDir,
    root: Utf8PathBuf,
    project: Arc<Intranet>,
    solution: Arc<Solution>,
    notifier: Arc<ManualNotifier>,
    registry: WatchRegistry,
}

impl Harness {
    fn new(extensions: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        let src = root.join("src/Intranet");
        fs::create_dir_all(src.join("bin")).unwrap();
        fs::write(src.join("bin/Intranet.dll"), b"MZ").unwrap();

        let project = Arc::new(Intranet {
            root: root.clone(),
            project_file: src.join("Intranet.csproj"),
            output_path: src.join("bin/Intranet.dll"),
            package: PackageInfo {
                id: Uuid::from_u128(0x5eed),
                name: "Intranet".to_owned(),
                output_path: src.join("bin/Intranet.wsp"),
            },
            files: Mutex::new(Vec::new()),
        });
        let solution = Arc::new(Solution {
            projects: Mutex::new(vec![Arc::clone(&project) as Arc<dyn Project>]),
            hive: root.join("hive"),
        });

        let writer = DeploymentWriter::new(
            PathTokenResolver::new(solution.sharepoint_install_path()),
            ExtensionPolicyCache::new(
                Arc::new(Msbuild(extensions.to_owned())),
                DEFAULT_TOKEN_EXTENSIONS_PROPERTY,
            ),
            ContentTokenCache::new(Arc::new(Reflection)),
        );
        let notifier = Arc::new(ManualNotifier::new());
        let registry = WatchRegistry::new(
            Arc::clone(&solution) as Arc<dyn ProjectModel>,
            Arc::clone(&notifier) as Arc<dyn FileNotifier>,
            writer,
        );

        Self {
            _dir: dir,
            root,
            project,
            solution,
            notifier,
            registry,
        }
    }

    fn add(
        &self,
        name: &str,
        content: &[u8],
        deployment_type: DeploymentType,
        deployment_root: &str,
    ) -> Utf8PathBuf {
        let path = self.root.join("src/Intranet").join(name);
        fs::write(&path, content).unwrap();
        self.project.files.lock().push(ProjectItemFile::new(
            path.clone(),
            deployment_type,
            deployment_root,
            format!("Layouts\\Intranet\\{name}"),
        ));
        path
    }

    fn save(&self, path: &Utf8Path, content: &[u8]) {
        fs::write(path, content).unwrap();
        self.notifier.notify_changed([path]);
    }
}

#[test]
fn test_save_replaces_every_content_token() {
    let harness = Harness::new("webpart;xml");
    let path = harness.add(
        "elements.xml",
        b"",
        DeploymentType::TemplateFile,
        "{SharePointRoot}\\Template\\",
    );
    harness.registry.initialize();

    harness.save(&path, ALL_TOKENS.join("\n").as_bytes());

    let deployed = harness
        .root
        .join("hive/Template/Layouts/Intranet/elements.xml");
    let written = fs::read_to_string(&deployed).unwrap();
    assert!(!written.contains("$SharePoint."), "unreplaced token in {written}");
    let lines: Vec<&str> = written.lines().collect();
    assert_eq!(lines[0], "Intranet.csproj");
    assert_eq!(lines[1], "Intranet");
    assert_eq!(lines[5], Uuid::from_u128(0x5eed).to_string());
    assert_eq!(lines[9], "71e9bce111e9429c");
    assert_eq!(harness.registry.stats().substituted, 1);
}

#[test]
fn test_save_copies_binary_verbatim() {
    let harness = Harness::new("webpart;xml");
    let content = b"MZ\x90\x00\x03\x00$SharePoint.Package.Id$\xff";
    let path = harness.add(
        "Contoso.dll",
        b"",
        DeploymentType::RootFile,
        "{WebApplicationRoot}\\bin",
    );
    harness.registry.initialize();

    harness.save(&path, content);

    let deployed = harness
        .root
        .join("wwwroot/bin/Layouts/Intranet/Contoso.dll");
    assert_eq!(fs::read(&deployed).unwrap(), content);
    assert_eq!(harness.registry.stats().copied, 1);
}

#[test]
fn test_project_root_token() {
    let harness = Harness::new("");
    let path = harness.add("a.css", b"", DeploymentType::TemplateFile, "{ProjectRoot}\\out");
    harness.registry.initialize();

    harness.save(&path, b"body {}");

    let deployed = harness
        .root
        .join("src/Intranet/out/Layouts/Intranet/a.css");
    assert_eq!(fs::read(&deployed).unwrap(), b"body {}");
}

#[test]
fn test_closed_project_writes_nothing() {
    let harness = Harness::new("xml");
    let path = harness.add("a.xml", b"", DeploymentType::TemplateFile, "{SharePointRoot}");
    harness.registry.initialize();

    harness.solution.projects.lock().clear();
    harness.save(&path, b"<a/>");

    assert!(!harness.root.join("hive").exists());
    assert_eq!(harness.registry.stats().ignored, 1);
}

#[test]
fn test_reclassified_file_is_pruned() {
    let harness = Harness::new("xml");
    let path = harness.add("a.xml", b"", DeploymentType::TemplateFile, "{SharePointRoot}");
    harness.registry.initialize();
    assert!(harness.registry.is_watched(&path));

    harness.project.files.lock()[0].deployment_type = DeploymentType::ElementManifest;
    harness.save(&path, b"<a/>");

    assert!(!harness.registry.is_watched(&path));
    assert_eq!(harness.notifier.subscription_count(), 0);
    assert!(!harness.root.join("hive").exists());
}

#[test]
fn test_hierarchy_events_drive_watches() {
    let harness = Harness::new("");
    harness.registry.initialize();
    assert!(harness.registry.is_empty());

    let path = harness.add("late.js", b"", DeploymentType::RootFile, "{SharePointRoot}");
    harness.registry.on_item_added(&path);
    harness.registry.on_item_added(&path);
    assert_eq!(harness.notifier.subscription_count(), 1);

    harness.registry.on_item_removed(&path);
    harness.registry.on_item_removed(&path);
    assert!(harness.registry.is_empty());
}

#[test]
fn test_unbuilt_project_keeps_tokens() {
    let harness = Harness::new("xml");
    fs::remove_file(harness.root.join("src/Intranet/bin/Intranet.dll")).unwrap();
    let path = harness.add("a.xml", b"", DeploymentType::TemplateFile, "{SharePointRoot}");
    harness.registry.initialize();

    harness.save(&path, b"$SharePoint.Package.Id$");

    let deployed = harness.root.join("hive/Layouts/Intranet/a.xml");
    assert_eq!(
        fs::read_to_string(&deployed).unwrap(),
        "$SharePoint.Package.Id$"
    );
}
