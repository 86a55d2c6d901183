//! Event types for file change notifications.
//!
//! Notifiers deliver changes as a [`FileEventBatch`]: one or more files that
//! changed together. Each event carries the path exactly as it was passed to
//! [`FileNotifier::subscribe`](crate::FileNotifier::subscribe), so a
//! subscriber can match it against its own records without normalizing.

use camino::Utf8PathBuf;
use smallvec::SmallVec;

/// A single file change.
///
/// # Examples
///
/// ```
/// use spd_watcher::FileEvent;
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(Utf8PathBuf::from("/src/Intranet/Layouts/site.css"));
/// assert_eq!(event.path.as_str(), "/src/Intranet/Layouts/site.css");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// The path of the file that changed, as subscribed.
    pub path: Utf8PathBuf,
}

impl FileEvent {
    /// Creates a new file event for the given path.
    #[inline]
    #[must_use]
    pub const fn new(path: Utf8PathBuf) -> Self {
        Self { path }
    }
}

/// A batch of file events delivered together.
///
/// Uses [`SmallVec`] with inline storage for up to 8 events; a save usually
/// touches one file.
///
/// # Examples
///
/// ```
/// use spd_watcher::{FileEvent, FileEventBatch};
/// use camino::Utf8PathBuf;
///
/// let mut batch = FileEventBatch::new();
/// batch.push(FileEvent::new(Utf8PathBuf::from("/src/a.xml")));
/// batch.push(FileEvent::new(Utf8PathBuf::from("/src/b.xml")));
///
/// assert_eq!(batch.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct FileEventBatch {
    /// The events in this batch.
    pub events: SmallVec<[FileEvent; 8]>,
}

impl FileEventBatch {
    /// Creates a new empty batch.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: SmallVec::new(),
        }
    }

    /// Creates a batch from events.
    #[inline]
    #[must_use]
    pub fn from_events(events: impl IntoIterator<Item = FileEvent>) -> Self {
        Self {
            events: events.into_iter().collect(),
        }
    }

    /// Adds an event to the batch.
    #[inline]
    pub fn push(&mut self, event: FileEvent) {
        self.events.push(event);
    }

    /// Returns the number of events in this batch.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns `true` if the batch contains no events.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns an iterator over the events.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &FileEvent> {
        self.events.iter()
    }

    /// Returns the unique paths in this batch, sorted.
    ///
    /// The debouncer may report the same file more than once per window.
    #[must_use]
    pub fn unique_paths(&self) -> Vec<&Utf8PathBuf> {
        let mut paths: Vec<&Utf8PathBuf> = self.events.iter().map(|e| &e.path).collect();
        paths.sort();
        paths.dedup();
        paths
    }
}

impl Default for FileEventBatch {
    fn default() -> Self {
        Self::new()
    }
}

impl IntoIterator for FileEventBatch {
    type Item = FileEvent;
    type IntoIter = smallvec::IntoIter<[FileEvent; 8]>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.into_iter()
    }
}

impl<'a> IntoIterator for &'a FileEventBatch {
    type Item = &'a FileEvent;
    type IntoIter = std::slice::Iter<'a, FileEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

impl FromIterator<FileEvent> for FileEventBatch {
    fn from_iter<T: IntoIterator<Item = FileEvent>>(iter: T) -> Self {
        Self::from_events(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_event_batch_len() {
        let mut batch = FileEventBatch::default();
        assert!(batch.is_empty());

        batch.push(FileEvent::new(Utf8PathBuf::from("/src/a.webpart")));
        batch.push(FileEvent::new(Utf8PathBuf::from("/src/b.xml")));
        assert_eq!(batch.len(), 2);
        assert!(!batch.is_empty());
    }

    #[test]
    fn test_file_event_batch_unique_paths() {
        let mut batch = FileEventBatch::new();
        batch.push(FileEvent::new(Utf8PathBuf::from("/src/b.xml")));
        batch.push(FileEvent::new(Utf8PathBuf::from("/src/a.xml")));
        batch.push(FileEvent::new(Utf8PathBuf::from("/src/b.xml")));

        let unique = batch.unique_paths();
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].as_str(), "/src/a.xml");
    }

    #[test]
    fn test_file_event_batch_iteration() {
        let batch: FileEventBatch = vec![
            FileEvent::new(Utf8PathBuf::from("/src/a.js")),
            FileEvent::new(Utf8PathBuf::from("/src/b.js")),
        ]
        .into_iter()
        .collect();

        let paths: Vec<_> = batch.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["/src/a.js", "/src/b.js"]);

        let owned: Vec<_> = batch.into_iter().collect();
        assert_eq!(owned.len(), 2);
    }
}
