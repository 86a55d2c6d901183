//! Materializes a changed source file at its deployment location.

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use spd_core::{DeploymentDescriptor, Project};
use tracing::{debug, info, warn};

use crate::content_tokens::ContentTokenCache;
use crate::error::DeployError;
use crate::extensions::ExtensionPolicyCache;
use crate::path_tokens::{PathTokenResolver, to_native_path};

/// What a deployment wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// Content tokens were applied and the result written.
    Substituted {
        /// The file written.
        destination: Utf8PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// The source was copied byte for byte.
    Copied {
        /// The file written.
        destination: Utf8PathBuf,
        /// Bytes written.
        bytes: u64,
    },
}

impl DeployOutcome {
    /// Returns the file that was written.
    #[must_use]
    pub fn destination(&self) -> &Utf8Path {
        match self {
            Self::Substituted { destination, .. } | Self::Copied { destination, .. } => {
                destination
            }
        }
    }

    /// Returns the number of bytes written.
    #[must_use]
    pub const fn bytes(&self) -> u64 {
        match self {
            Self::Substituted { bytes, .. } | Self::Copied { bytes, .. } => *bytes,
        }
    }

    /// Returns `true` if content tokens were applied.
    #[must_use]
    pub const fn is_substituted(&self) -> bool {
        matches!(self, Self::Substituted { .. })
    }
}

/// Writes deployed copies of source files.
///
/// The destination comes from the descriptor's deployment root and relative
/// path with path tokens resolved. Files whose extension the project
/// allow-lists have their content tokens replaced; everything else is copied
/// verbatim. Existing destination files are overwritten.
#[derive(Debug)]
pub struct DeploymentWriter {
    resolver: PathTokenResolver,
    extensions: ExtensionPolicyCache,
    tokens: ContentTokenCache,
}

impl DeploymentWriter {
    /// Creates a writer from its three collaborators.
    #[must_use]
    pub const fn new(
        resolver: PathTokenResolver,
        extensions: ExtensionPolicyCache,
        tokens: ContentTokenCache,
    ) -> Self {
        Self {
            resolver,
            extensions,
            tokens,
        }
    }

    /// Returns the path token resolver.
    #[must_use]
    pub const fn resolver(&self) -> &PathTokenResolver {
        &self.resolver
    }

    /// Returns the extension allow-list cache.
    #[must_use]
    pub const fn extensions(&self) -> &ExtensionPolicyCache {
        &self.extensions
    }

    /// Returns the content token cache.
    #[must_use]
    pub const fn tokens(&self) -> &ContentTokenCache {
        &self.tokens
    }

    /// Resolves the destination of `descriptor` without writing anything.
    ///
    /// # Errors
    ///
    /// Returns [`DeployError::PathToken`] if a path token cannot be resolved.
    pub fn destination(
        &self,
        project: &dyn Project,
        descriptor: &DeploymentDescriptor,
    ) -> Result<Utf8PathBuf, DeployError> {
        let raw = descriptor.raw_destination();
        let resolved = self
            .resolver
            .resolve(project, &raw)
            .map_err(|source| DeployError::PathToken { raw, source })?;
        Ok(to_native_path(&resolved))
    }

    /// Deploys the source file of `descriptor`.
    ///
    /// # Errors
    ///
    /// Returns a [`DeployError`] naming the failing step and path. Nothing is
    /// retried here.
    pub fn deploy(
        &self,
        project: &dyn Project,
        descriptor: &DeploymentDescriptor,
    ) -> Result<DeployOutcome, DeployError> {
        info!(
            "Copy {} -> {}",
            descriptor.relative_path,
            descriptor.raw_destination()
        );

        let destination = self.destination(project, descriptor)?;
        if let Some(parent) = destination.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DeployError::create_dir(parent, e))?;
        }

        let source = &descriptor.source;
        let outcome = if self
            .extensions
            .is_token_replacement_extension(project, descriptor.source_name())
        {
            self.write_substituted(project, source, destination)?
        } else {
            let bytes = fs::copy(source, &destination)
                .map_err(|e| DeployError::copy(source, &destination, e))?;
            DeployOutcome::Copied { destination, bytes }
        };

        debug!(
            source = %source,
            destination = %outcome.destination(),
            bytes = outcome.bytes(),
            substituted = outcome.is_substituted(),
            "Deployed"
        );
        Ok(outcome)
    }

    fn write_substituted(
        &self,
        project: &dyn Project,
        source: &Utf8Path,
        destination: Utf8PathBuf,
    ) -> Result<DeployOutcome, DeployError> {
        let raw = fs::read(source).map_err(|e| DeployError::read(source, e))?;
        match String::from_utf8(raw) {
            Ok(text) => {
                let content = self.tokens.apply_content_tokens(project, &text);
                fs::write(&destination, content.as_bytes())
                    .map_err(|e| DeployError::write(&destination, e))?;
                Ok(DeployOutcome::Substituted {
                    destination,
                    bytes: content.len() as u64,
                })
            }
            Err(not_utf8) => {
                warn!(
                    path = %source,
                    "File is not UTF-8 text, copying without token replacement"
                );
                let bytes = not_utf8.into_bytes();
                fs::write(&destination, &bytes)
                    .map_err(|e| DeployError::write(&destination, e))?;
                Ok(DeployOutcome::Copied {
                    destination,
                    bytes: bytes.len() as u64,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content_tokens::PACKAGE_ID;
    use crate::test_support::{FakeEvaluator, FakeInspector, FakeProject, signed_identity};
    use spd_core::config::DEFAULT_TOKEN_EXTENSIONS_PROPERTY;
    use spd_core::{DeploymentType, ProjectItemFile};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: Utf8PathBuf,
        project: FakeProject,
        writer: DeploymentWriter,
    }

    fn fixture(extensions: &str) -> Fixture {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        let project = FakeProject::new(&root.join("src"), "Intranet", 1);
        fs::create_dir_all(root.join("src")).unwrap();

        let evaluator = FakeEvaluator::with_property(
            &project.project_file,
            DEFAULT_TOKEN_EXTENSIONS_PROPERTY,
            extensions,
        );
        let inspector =
            FakeInspector::built(&project.output_path, signed_identity("Contoso.Intranet"));
        let writer = DeploymentWriter::new(
            PathTokenResolver::new(root.join("hive")),
            ExtensionPolicyCache::new(Arc::new(evaluator), DEFAULT_TOKEN_EXTENSIONS_PROPERTY),
            ContentTokenCache::new(Arc::new(inspector)),
        );
        Fixture {
            _dir: dir,
            root,
            project,
            writer,
        }
    }

    fn template(fixture: &Fixture, name: &str, content: &[u8]) -> DeploymentDescriptor {
        let source = fixture.root.join("src").join(name);
        fs::write(&source, content).unwrap();
        ProjectItemFile::new(
            source,
            DeploymentType::TemplateFile,
            "{SharePointRoot}\\Template\\",
            format!("Features\\Intranet\\{name}"),
        )
        .descriptor()
    }

    #[test]
    fn test_deploy_substitutes_allow_listed_file() {
        let fixture = fixture("webpart;xml");
        let descriptor = template(&fixture, "elements.xml", b"<Id>$SharePoint.Package.Id$</Id>");

        let outcome = fixture.writer.deploy(&fixture.project, &descriptor).unwrap();
        assert!(outcome.is_substituted());

        let expected = fixture.root.join("hive/Template/Features/Intranet/elements.xml");
        assert_eq!(outcome.destination(), expected);
        let written = fs::read_to_string(&expected).unwrap();
        assert_eq!(written, format!("<Id>{}</Id>", fixture.project.package.id));
        assert_eq!(outcome.bytes(), written.len() as u64);
    }

    #[test]
    fn test_deploy_copies_other_extensions_verbatim() {
        let fixture = fixture("webpart;xml");
        let content = b"MZ\x90\x00$SharePoint.Package.Id$";
        let descriptor = template(&fixture, "Intranet.dll", content);

        let outcome = fixture.writer.deploy(&fixture.project, &descriptor).unwrap();
        assert!(!outcome.is_substituted());
        assert_eq!(fs::read(outcome.destination()).unwrap(), content);
        assert_eq!(outcome.bytes(), content.len() as u64);
    }

    #[test]
    fn test_deploy_non_utf8_template_copied_verbatim() {
        let fixture = fixture("xml");
        let content = b"<a>\xff\xfe$SharePoint.Package.Id$</a>";
        let descriptor = template(&fixture, "broken.xml", content);

        let outcome = fixture.writer.deploy(&fixture.project, &descriptor).unwrap();
        assert!(matches!(outcome, DeployOutcome::Copied { .. }));
        assert_eq!(fs::read(outcome.destination()).unwrap(), content);
    }

    #[test]
    fn test_deploy_overwrites_existing_destination() {
        let fixture = fixture("");
        let descriptor = template(&fixture, "site.css", b"body { margin: 0 }");
        let first = fixture.writer.deploy(&fixture.project, &descriptor).unwrap();

        fs::write(&descriptor.source, b"body {}").unwrap();
        fixture.writer.deploy(&fixture.project, &descriptor).unwrap();
        assert_eq!(fs::read(first.destination()).unwrap(), b"body {}");
    }

    #[test]
    fn test_deploy_missing_source_is_error() {
        let fixture = fixture("");
        let descriptor = ProjectItemFile::new(
            fixture.root.join("src/missing.js"),
            DeploymentType::RootFile,
            "{SharePointRoot}",
            "TEMPLATE/LAYOUTS/missing.js",
        )
        .descriptor();

        let err = fixture.writer.deploy(&fixture.project, &descriptor).unwrap_err();
        assert!(matches!(err, DeployError::Copy { .. }));
    }

    #[test]
    fn test_deploy_unresolvable_web_application_root() {
        let fixture = fixture("");
        let mut descriptor = template(&fixture, "a.js", b"a");
        descriptor.deployment_root = "{WebApplicationRoot}/bin".to_owned();

        let err = fixture.writer.deploy(&fixture.project, &descriptor).unwrap_err();
        assert!(matches!(err, DeployError::PathToken { .. }));
    }

    #[test]
    fn test_deploy_without_built_assembly_leaves_tokens() {
        let fixture = fixture("xml");
        let writer = DeploymentWriter::new(
            fixture.writer.resolver().clone(),
            ExtensionPolicyCache::new(
                Arc::new(FakeEvaluator::with_property(
                    &fixture.project.project_file,
                    DEFAULT_TOKEN_EXTENSIONS_PROPERTY,
                    "xml",
                )),
                DEFAULT_TOKEN_EXTENSIONS_PROPERTY,
            ),
            ContentTokenCache::new(Arc::new(FakeInspector::default())),
        );
        let descriptor = template(&fixture, "elements.xml", PACKAGE_ID.as_bytes());

        let outcome = writer.deploy(&fixture.project, &descriptor).unwrap();
        assert_eq!(fs::read_to_string(outcome.destination()).unwrap(), PACKAGE_ID);
    }
}
