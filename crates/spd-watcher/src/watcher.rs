//! File system backed notifier.
//!
//! [`NotifyFileNotifier`] watches the *directory* of each subscribed file,
//! non-recursively, through a debounced `notify` watcher. Editors commonly
//! save by writing a temporary file and renaming it over the original, which
//! a watch on the file itself would lose.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                 Debouncer thread (notify-debouncer-mini)         │
//! │  ┌───────────────────┐   ┌──────────────┐   ┌─────────────────┐  │
//! │  │ RecommendedWatcher│ ->│ Debouncer    │ ->│ dispatch        │  │
//! │  │ (one watch / dir) │   │ (debounce_ms)│   │ (table lookup)  │  │
//! │  └───────────────────┘   └──────────────┘   └────────┬────────┘  │
//! └──────────────────────────────────────────────────────│───────────┘
//!                                                        │ lock released
//!                                                        ▼
//!                                              subscriber callbacks
//! ```

use std::sync::Arc;
use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::{RecommendedWatcher, RecursiveMode};
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use parking_lot::Mutex;
use spd_core::{FxHashMap, WatchConfig, WatchKey};

use crate::error::WatchError;
use crate::notifier::{ChangeCallback, FileNotifier, SubscriptionId, SubscriptionTable};

/// Reference counts for watched directories.
#[derive(Default)]
struct Directories {
    refs: FxHashMap<Utf8PathBuf, usize>,
    owner: FxHashMap<SubscriptionId, Utf8PathBuf>,
}

/// A [`FileNotifier`] backed by the operating system's file watcher.
///
/// Dropping the notifier stops the watcher thread; no callbacks run after
/// the drop completes.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use camino::Utf8Path;
/// use spd_core::WatchConfig;
/// use spd_watcher::{FileNotifier, NotifyFileNotifier};
///
/// # fn example() -> Result<(), spd_watcher::WatchError> {
/// let notifier = NotifyFileNotifier::new(&WatchConfig::default())?;
/// notifier.subscribe(
///     Utf8Path::new("/src/Intranet/Layouts/site.css"),
///     Arc::new(|batch| {
///         for event in batch {
///             println!("saved: {}", event.path);
///         }
///     }),
/// )?;
/// # Ok(())
/// # }
/// ```
pub struct NotifyFileNotifier {
    table: Arc<Mutex<SubscriptionTable>>,
    directories: Mutex<Directories>,
    debouncer: Mutex<Debouncer<RecommendedWatcher>>,
}

impl std::fmt::Debug for NotifyFileNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyFileNotifier")
            .field("subscriptions", &self.subscription_count())
            .field("directories", &self.watched_directory_count())
            .finish_non_exhaustive()
    }
}

impl NotifyFileNotifier {
    /// Starts the watcher thread.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::Notify`] if the OS watcher cannot be created.
    pub fn new(config: &WatchConfig) -> Result<Self, WatchError> {
        let table = Arc::new(Mutex::new(SubscriptionTable::default()));
        let dispatch_table = Arc::clone(&table);
        let timeout = Duration::from_millis(config.debounce_ms);

        let debouncer = new_debouncer(timeout, move |res: DebounceEventResult| match res {
            Ok(events) => {
                let mut keys = Vec::with_capacity(events.len());
                for event in events {
                    let path = match Utf8PathBuf::try_from(event.path) {
                        Ok(p) => p,
                        Err(e) => {
                            let invalid_path = e.into_path_buf();
                            tracing::warn!(
                                path = %invalid_path.display(),
                                "Skipping non-UTF-8 path in file event"
                            );
                            continue;
                        }
                    };
                    // Deletions and directory events are not saves.
                    if !path.is_file() {
                        tracing::trace!(path = %path, "Ignoring event for non-file");
                        continue;
                    }
                    keys.push(WatchKey::new(&path));
                }
                keys.sort();
                keys.dedup();

                let plan = dispatch_table.lock().dispatch_plan(&keys);
                for (callback, batch) in plan {
                    callback(&batch);
                }
            }
            Err(error) => tracing::warn!(error = %error, "Debouncer error"),
        })?;

        tracing::debug!(debounce_ms = config.debounce_ms, "File notifier started");

        Ok(Self {
            table,
            directories: Mutex::new(Directories::default()),
            debouncer: Mutex::new(debouncer),
        })
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.table.lock().len()
    }

    /// Returns the number of directories currently watched.
    #[must_use]
    pub fn watched_directory_count(&self) -> usize {
        self.directories.lock().refs.len()
    }
}

impl FileNotifier for NotifyFileNotifier {
    fn subscribe(
        &self,
        path: &Utf8Path,
        on_change: ChangeCallback,
    ) -> Result<SubscriptionId, WatchError> {
        let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
            return Err(WatchError::rejected(path, "not a file path"));
        };
        if !parent.is_dir() {
            return Err(WatchError::path_not_found(parent));
        }
        let directory = parent.canonicalize_utf8()?;
        let key = WatchKey::new(&directory.join(file_name));

        let mut directories = self.directories.lock();
        let refs = directories.refs.get(&directory).copied().unwrap_or(0);
        if refs == 0 {
            self.debouncer
                .lock()
                .watcher()
                .watch(directory.as_std_path(), RecursiveMode::NonRecursive)?;
            tracing::debug!(directory = %directory, "Watching directory");
        }
        directories.refs.insert(directory.clone(), refs + 1);

        let id = self.table.lock().insert(key, path.to_owned(), on_change);
        directories.owner.insert(id, directory);
        tracing::trace!(path = %path, id = %id, "Subscribed");
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), WatchError> {
        let mut directories = self.directories.lock();
        let directory = directories
            .owner
            .remove(&id)
            .ok_or(WatchError::UnknownSubscription(id))?;
        self.table.lock().remove(id);

        let refs = directories.refs.get(&directory).copied().unwrap_or(1);
        if refs <= 1 {
            directories.refs.remove(&directory);
            if let Err(error) = self
                .debouncer
                .lock()
                .watcher()
                .unwatch(directory.as_std_path())
            {
                // The directory may already be gone.
                tracing::debug!(directory = %directory, error = %error, "Unwatch failed");
            } else {
                tracing::debug!(directory = %directory, "Stopped watching directory");
            }
        } else {
            directories.refs.insert(directory, refs - 1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::FileEventBatch;
    use std::fs;
    use std::sync::mpsc;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        (dir, root)
    }

    fn noop() -> ChangeCallback {
        Arc::new(|_batch: &FileEventBatch| {})
    }

    fn fast() -> WatchConfig {
        WatchConfig { debounce_ms: 50 }
    }

    #[test]
    fn test_subscribe_missing_directory() {
        let notifier = NotifyFileNotifier::new(&fast()).unwrap();
        let result = notifier.subscribe(Utf8Path::new("/nonexistent/dir/a.js"), noop());
        match result {
            Err(WatchError::PathNotFound(path)) => assert_eq!(path.as_str(), "/nonexistent/dir"),
            other => panic!("Expected PathNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_directory_watch_is_shared() {
        let (_dir, root) = temp_root();
        fs::write(root.join("a.js"), "a").unwrap();
        fs::write(root.join("b.js"), "b").unwrap();

        let notifier = NotifyFileNotifier::new(&fast()).unwrap();
        let a = notifier.subscribe(&root.join("a.js"), noop()).unwrap();
        let b = notifier.subscribe(&root.join("b.js"), noop()).unwrap();
        assert_eq!(notifier.subscription_count(), 2);
        assert_eq!(notifier.watched_directory_count(), 1);

        notifier.unsubscribe(a).unwrap();
        assert_eq!(notifier.watched_directory_count(), 1);
        notifier.unsubscribe(b).unwrap();
        assert_eq!(notifier.watched_directory_count(), 0);
        assert_eq!(notifier.subscription_count(), 0);

        assert!(matches!(
            notifier.unsubscribe(b),
            Err(WatchError::UnknownSubscription(_))
        ));
    }

    #[test]
    fn test_subscribe_file_not_yet_created() {
        let (_dir, root) = temp_root();
        let notifier = NotifyFileNotifier::new(&fast()).unwrap();
        assert!(notifier.subscribe(&root.join("later.js"), noop()).is_ok());
    }

    #[test]
    fn test_change_is_delivered_with_subscribed_path() {
        let (_dir, root) = temp_root();
        let file = root.join("Site.css");
        fs::write(&file, "body {}").unwrap();

        let notifier = NotifyFileNotifier::new(&fast()).unwrap();
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        notifier
            .subscribe(
                &file,
                Arc::new(move |batch: &FileEventBatch| {
                    for event in batch {
                        let _ = tx.lock().send(event.path.clone());
                    }
                }),
            )
            .unwrap();

        fs::write(&file, "body { margin: 0 }").unwrap();

        // Timing-dependent; some CI file systems drop events.
        if let Ok(path) = rx.recv_timeout(Duration::from_secs(2)) {
            assert_eq!(path, file);
        }
    }
}
