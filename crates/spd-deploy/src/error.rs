//! Error types for the spd-deploy crate.
//!
//! This module provides [`TokenError`] for path token resolution failures and
//! [`DeployError`] for failures while materializing a deployed file.

use camino::Utf8PathBuf;
use spd_core::HostError;

/// Errors that can occur while resolving path tokens.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// `{WebApplicationRoot}` could not be resolved through the project's
    /// connection.
    #[error("cannot resolve {{WebApplicationRoot}} via '{command}': {source}")]
    WebApplicationRoot {
        /// The command that was executed.
        command: String,
        /// The host's failure.
        #[source]
        source: HostError,
    },
}

/// Errors that can occur while deploying a single file.
///
/// Every variant carries the path involved. None of them end the watch: the
/// registry logs the error and the file is retried on its next change.
///
/// # Examples
///
/// ```
/// use spd_deploy::DeployError;
/// use std::io;
///
/// let err = DeployError::copy(
///     "/src/Intranet/bin/Intranet.dll",
///     "/opt/sharepoint/16/ISAPI/Intranet.dll",
///     io::Error::new(io::ErrorKind::PermissionDenied, "locked"),
/// );
/// assert!(err.to_string().contains("Intranet.dll"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// The destination path could not be resolved.
    #[error("failed to resolve destination {raw}: {source}")]
    PathToken {
        /// The unresolved destination.
        raw: String,
        /// The resolution failure.
        #[source]
        source: TokenError,
    },

    /// The destination directory could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        /// The directory.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source file could not be read.
    #[error("failed to read file {path}: {source}")]
    Read {
        /// The source file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The substituted content could not be written.
    #[error("failed to write file {path}: {source}")]
    Write {
        /// The destination file.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The source could not be copied to the destination.
    #[error("failed to copy {from} to {to}: {source}")]
    Copy {
        /// The source file.
        from: Utf8PathBuf,
        /// The destination file.
        to: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl DeployError {
    /// Creates a new [`DeployError::CreateDir`] error.
    #[inline]
    pub fn create_dir(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDir {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`DeployError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`DeployError::Write`] error.
    #[inline]
    pub fn write(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`DeployError::Copy`] error.
    #[inline]
    pub fn copy(
        from: impl Into<Utf8PathBuf>,
        to: impl Into<Utf8PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Self::Copy {
            from: from.into(),
            to: to.into(),
            source,
        }
    }
}
