//! Case-insensitive keys for the watch set.
//!
//! The host reports the same file with differing case depending on where the
//! path came from (hierarchy canonical names, item metadata, OS events), so
//! the watch set is keyed by a case-folded form of the absolute path.

use std::fmt;

use camino::Utf8Path;

/// A case-insensitive identity for an absolute file path.
///
/// Two paths that differ only in letter case produce equal keys.
///
/// # Examples
///
/// ```
/// use spd_core::WatchKey;
/// use camino::Utf8Path;
///
/// let a = WatchKey::new(Utf8Path::new("/Projects/Intranet/Layouts/Site.CSS"));
/// let b = WatchKey::new(Utf8Path::new("/projects/intranet/layouts/site.css"));
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchKey(String);

impl WatchKey {
    /// Creates the key for `path`.
    #[must_use]
    pub fn new(path: &Utf8Path) -> Self {
        Self(path.as_str().to_lowercase())
    }

    /// Returns the case-folded path.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if `path` folds to this key.
    #[must_use]
    pub fn matches(&self, path: &Utf8Path) -> bool {
        path.as_str().to_lowercase() == self.0
    }
}

impl From<&Utf8Path> for WatchKey {
    #[inline]
    fn from(path: &Utf8Path) -> Self {
        Self::new(path)
    }
}

impl fmt::Display for WatchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
