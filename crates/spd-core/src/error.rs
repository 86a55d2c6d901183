//! Error types for the spd-core crate.
//!
//! This module provides [`ConfigError`] for configuration loading failures and
//! [`HostError`] for failures reported by the host's collaborators (project
//! model, build evaluation, assembly inspection).

use camino::Utf8PathBuf;

/// Errors that can occur during configuration loading and validation.
///
/// # Examples
///
/// ```
/// use spd_core::ConfigError;
/// use camino::Utf8PathBuf;
///
/// let error = ConfigError::MissingFile(Utf8PathBuf::from("/etc/spd.json"));
/// assert!(error.to_string().contains("/etc/spd.json"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The provided path is invalid or malformed.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath {
        /// The invalid path.
        path: Utf8PathBuf,
        /// Explanation of why the path is invalid.
        reason: String,
    },

    /// A configuration file does not exist.
    #[error("configuration file not found: {0}")]
    MissingFile(Utf8PathBuf),

    /// A configuration option has an invalid value.
    #[error("invalid configuration option '{option}': {reason}")]
    InvalidOption {
        /// The name of the invalid option.
        option: String,
        /// Explanation of why the option is invalid.
        reason: String,
    },

    /// An I/O error occurred while reading configuration.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

impl ConfigError {
    /// Creates a new [`ConfigError::InvalidOption`] error.
    #[inline]
    pub fn invalid_option(option: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOption {
            option: option.into(),
            reason: reason.into(),
        }
    }
}

/// Errors reported by the host's collaborators.
///
/// None of these are fatal to the watching process. The caller decides how
/// to degrade: a missing assembly yields an empty token table, a failed
/// evaluation yields an empty extension set, a disconnected project fails
/// only the path resolution that needed it.
///
/// # Examples
///
/// ```
/// use spd_core::HostError;
///
/// let err = HostError::not_connected("Intranet.Web");
/// assert!(err.to_string().contains("Intranet.Web"));
/// ```
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum HostError {
    /// The project has no live connection to a SharePoint site.
    #[error("project '{0}' is not connected to a SharePoint site")]
    NotConnected(String),

    /// A command executed against the project's connection failed.
    #[error("command '{command}' failed: {reason}")]
    CommandFailed {
        /// The command name.
        command: String,
        /// Explanation of the failure.
        reason: String,
    },

    /// The project's output assembly could not be read.
    ///
    /// Usually the project has not been built yet.
    #[error("assembly {0} is unavailable")]
    AssemblyUnavailable(Utf8PathBuf),

    /// The build tool could not evaluate the project file.
    #[error("failed to evaluate project {path}: {reason}")]
    Evaluation {
        /// The project file.
        path: Utf8PathBuf,
        /// Explanation of the failure.
        reason: String,
    },
}

impl HostError {
    /// Creates a new [`HostError::NotConnected`] error.
    #[inline]
    pub fn not_connected(project: impl Into<String>) -> Self {
        Self::NotConnected(project.into())
    }

    /// Creates a new [`HostError::CommandFailed`] error.
    #[inline]
    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Creates a new [`HostError::Evaluation`] error.
    #[inline]
    pub fn evaluation(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::Evaluation {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_path_display() {
        let error = ConfigError::InvalidPath {
            path: Utf8PathBuf::from("/invalid/path"),
            reason: "not a file".to_owned(),
        };
        let msg = error.to_string();
        assert!(msg.contains("/invalid/path"));
        assert!(msg.contains("not a file"));
    }

    #[test]
    fn test_invalid_option_display() {
        let error = ConfigError::invalid_option("debounce_ms", "must be positive");
        let msg = error.to_string();
        assert!(msg.contains("debounce_ms"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn test_host_error_display() {
        let err = HostError::command_failed("GetWebApplicationLocalPath", "timeout");
        assert_eq!(
            err.to_string(),
            "command 'GetWebApplicationLocalPath' failed: timeout"
        );

        let err = HostError::AssemblyUnavailable(Utf8PathBuf::from("bin/Debug/Foo.dll"));
        assert!(err.to_string().contains("bin/Debug/Foo.dll"));
    }

    #[test]
    fn test_host_error_evaluation_display() {
        let err = HostError::evaluation("Intranet.csproj", "bad xml");
        assert_eq!(
            err.to_string(),
            "failed to evaluate project Intranet.csproj: bad xml"
        );
    }
}
