//! Error types for the spd-watcher crate.
//!
//! This module provides the [`WatchError`] type for errors that can occur
//! while subscribing to or unsubscribing from file change notifications.

use camino::Utf8PathBuf;

use crate::notifier::SubscriptionId;

/// Errors that can occur during subscription operations.
///
/// # Error Recovery Strategy
///
/// - **Path not found** ([`WatchError::PathNotFound`]): Recoverable - skip that file
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): Recoverable - skip and continue
/// - **Unknown subscription** ([`WatchError::UnknownSubscription`]): Recoverable - already gone
/// - **Rejected** ([`WatchError::Rejected`]): Recoverable - skip that file
/// - **Notify errors** ([`WatchError::Notify`]): Fatal - the OS watcher is unusable
/// - **I/O errors** ([`WatchError::Io`]): Fatal - propagate immediately
///
/// # Examples
///
/// ```
/// use spd_watcher::WatchError;
///
/// fn handle_error(err: &WatchError) {
///     match err {
///         WatchError::Notify(e) => eprintln!("Notify error: {e}"),
///         WatchError::PathNotFound(p) => eprintln!("Path not found: {p}"),
///         WatchError::NonUtf8Path(p) => eprintln!("Invalid path: {}", p.display()),
///         WatchError::UnknownSubscription(id) => eprintln!("Unknown subscription: {id}"),
///         WatchError::Rejected { path, reason } => eprintln!("Rejected {path}: {reason}"),
///         WatchError::Io(e) => eprintln!("I/O error: {e}"),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Failed to initialize or operate the notify watcher.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The file's directory does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// A path is not valid UTF-8.
    ///
    /// This crate uses UTF-8 paths throughout. If a non-UTF-8 path is
    /// encountered in a file event, it is logged and skipped.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// The subscription id is not (or no longer) registered.
    #[error("unknown subscription: {0}")]
    UnknownSubscription(SubscriptionId),

    /// The notifier refused to watch the path.
    #[error("subscription rejected for {path}: {reason}")]
    Rejected {
        /// The path that was refused.
        path: Utf8PathBuf,
        /// Why it was refused.
        reason: String,
    },

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Creates a new [`WatchError::Rejected`] error.
    #[inline]
    pub fn rejected(path: impl Into<Utf8PathBuf>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` if this error only affects a single path.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PathNotFound(_)
                | Self::NonUtf8Path(_)
                | Self::UnknownSubscription(_)
                | Self::Rejected { .. }
        )
    }

    /// Returns `true` if the notifier itself is unusable.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    #[test]
    fn test_watch_error_path_not_found() {
        let err = WatchError::path_not_found("/src/Layouts");
        assert!(err.is_recoverable());
        assert!(!err.is_fatal());
        assert_eq!(err.to_string(), "path does not exist: /src/Layouts");
    }

    #[test]
    fn test_watch_error_rejected() {
        let err = WatchError::rejected("/src/a.js", "quota exceeded");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[test]
    fn test_watch_error_unknown_subscription() {
        let err = WatchError::UnknownSubscription(SubscriptionId::new(42));
        assert!(err.is_recoverable());
        assert_eq!(err.to_string(), "unknown subscription: #42");
    }

    #[test]
    fn test_watch_error_non_utf8() {
        let err = WatchError::non_utf8_path(PathBuf::from("test"));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_watch_error_io() {
        let err = WatchError::Io(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "access denied",
        ));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("I/O error"));
    }
}
