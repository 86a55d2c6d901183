//! Destination path token substitution.
//!
//! Deployment roots are written with environment tokens that only have a
//! value on the developer's machine:
//!
//! | Token                  | Value                                         |
//! |------------------------|-----------------------------------------------|
//! | `{ProjectRoot}`        | directory containing the project file         |
//! | `{SharePointRoot}`     | the SharePoint install path                   |
//! | `{WebApplicationRoot}` | local path of the connected web application   |
//!
//! Tokens are replaced in that order. After each step doubled separators
//! produced by the substitution are collapsed. Any other brace-delimited
//! text is left alone.

use camino::{Utf8Path, Utf8PathBuf};
use spd_core::config::DEFAULT_WEB_APPLICATION_ROOT_COMMAND;
use spd_core::{DeployConfig, Project};

use crate::error::TokenError;

/// Token for the directory of the project file.
pub const PROJECT_ROOT: &str = "{ProjectRoot}";

/// Token for the SharePoint install path.
pub const SHAREPOINT_ROOT: &str = "{SharePointRoot}";

/// Token for the local path of the project's web application.
pub const WEB_APPLICATION_ROOT: &str = "{WebApplicationRoot}";

/// Resolves path tokens in deployment destinations.
///
/// # Examples
///
/// ```
/// use spd_deploy::PathTokenResolver;
///
/// let resolver = PathTokenResolver::new("/opt/sharepoint/16");
/// assert_eq!(resolver.sharepoint_root().as_str(), "/opt/sharepoint/16");
/// ```
#[derive(Debug, Clone)]
pub struct PathTokenResolver {
    sharepoint_root: Utf8PathBuf,
    web_application_root_command: String,
}

impl PathTokenResolver {
    /// Creates a resolver using the default web application root command.
    #[must_use]
    pub fn new(sharepoint_root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            sharepoint_root: sharepoint_root.into(),
            web_application_root_command: DEFAULT_WEB_APPLICATION_ROOT_COMMAND.to_owned(),
        }
    }

    /// Creates a resolver from configuration.
    ///
    /// `install_path` is the host's SharePoint install path; the configured
    /// `sharepoint_root` takes precedence when set.
    #[must_use]
    pub fn from_config(config: &DeployConfig, install_path: &Utf8Path) -> Self {
        Self {
            sharepoint_root: config
                .sharepoint_root
                .clone()
                .unwrap_or_else(|| install_path.to_owned()),
            web_application_root_command: config.web_application_root_command.clone(),
        }
    }

    /// Returns the value substituted for `{SharePointRoot}`.
    #[must_use]
    pub fn sharepoint_root(&self) -> &Utf8Path {
        &self.sharepoint_root
    }

    /// Replaces the path tokens in `raw`.
    ///
    /// `{WebApplicationRoot}` is only resolved when present, since it needs a
    /// round trip through the project's SharePoint connection.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::WebApplicationRoot`] if the connection command
    /// fails. Nothing is substituted in that case.
    pub fn resolve(&self, project: &dyn Project, raw: &str) -> Result<String, TokenError> {
        let project_root = project
            .project_file()
            .parent()
            .map_or("", Utf8Path::as_str);

        let mut path = collapse_separators(&raw.replace(PROJECT_ROOT, project_root));
        path = collapse_separators(&path.replace(SHAREPOINT_ROOT, self.sharepoint_root.as_str()));

        if path.contains(WEB_APPLICATION_ROOT) {
            let web_root = project
                .execute_command(&self.web_application_root_command)
                .map_err(|source| TokenError::WebApplicationRoot {
                    command: self.web_application_root_command.clone(),
                    source,
                })?;
            path = collapse_separators(&path.replace(WEB_APPLICATION_ROOT, &web_root));
        }

        Ok(path)
    }
}

/// Collapses runs of `\` or `/` into a single separator.
///
/// A leading pair is kept so UNC paths survive. Applying it twice yields the
/// same result as applying it once.
///
/// # Examples
///
/// ```
/// use spd_deploy::path_tokens::collapse_separators;
///
/// assert_eq!(collapse_separators("C:\\SP\\\\Template"), "C:\\SP\\Template");
/// assert_eq!(collapse_separators("/opt//sp///Template"), "/opt/sp/Template");
/// assert_eq!(collapse_separators("\\\\server\\share"), "\\\\server\\share");
/// ```
#[must_use]
pub fn collapse_separators(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut rest = path;
    for prefix in ["\\\\", "//"] {
        if let Some(tail) = path.strip_prefix(prefix) {
            if !tail.starts_with(['\\', '/']) {
                out.push_str(prefix);
                rest = tail;
            }
            break;
        }
    }

    let mut previous: Option<char> = None;
    for c in rest.chars() {
        let is_separator = c == '\\' || c == '/';
        if is_separator && previous.is_some_and(|p| p == '\\' || p == '/') {
            continue;
        }
        out.push(c);
        previous = Some(c);
    }
    out
}

/// Converts a resolved destination into a path for this platform.
///
/// Deployment roots are authored with backslashes; on Unix those become `/`.
#[must_use]
pub fn to_native_path(resolved: &str) -> Utf8PathBuf {
    if cfg!(windows) {
        Utf8PathBuf::from(resolved)
    } else {
        Utf8PathBuf::from(resolved.replace('\\', "/"))
    }
}
