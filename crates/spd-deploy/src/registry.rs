//! The live set of watched files.
//!
//! [`WatchRegistry`] owns one subscription per watched file, keyed without
//! regard to case. When a watched file changes it finds the file in the
//! project model again and hands it to the [`DeploymentWriter`].
//!
//! # Lifecycle
//!
//! 1. **Creation**: [`WatchRegistry::new`] wires the project model, the
//!    notifier, and the writer together. Nothing is watched yet.
//! 2. **Initialization**: [`WatchRegistry::initialize`] watches every template
//!    and root file of every open project.
//! 3. **Maintenance**: hierarchy changes arrive through
//!    [`HierarchyListener`] (or [`add_file`](WatchRegistry::add_file) /
//!    [`remove_file`](WatchRegistry::remove_file) directly);
//!    [`resync`](WatchRegistry::resync) reconciles after a configuration
//!    switch.
//! 4. **Shutdown**: [`WatchRegistry::shutdown`] releases every subscription.
//!    Dropping the last handle does the same.

use std::sync::{Arc, Weak};

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use spd_core::{
    FxHashMap, FxHashSet, HierarchyListener, Project, ProjectItemFile, ProjectModel, WatchKey,
};
use spd_watcher::{ChangeCallback, FileEventBatch, FileNotifier, SubscriptionId, WatchError};
use tracing::{debug, error, info, warn};

use crate::stats::{DeployStats, DeployStatsSnapshot};
use crate::writer::{DeployOutcome, DeploymentWriter};

/// A watched file and its subscription.
#[derive(Debug, Clone)]
struct WatchedFile {
    path: Utf8PathBuf,
    subscription: SubscriptionId,
}

struct Inner {
    model: Arc<dyn ProjectModel>,
    notifier: Arc<dyn FileNotifier>,
    writer: DeploymentWriter,
    watches: Mutex<FxHashMap<WatchKey, WatchedFile>>,
    stats: DeployStats,
}

/// Result of [`WatchRegistry::resync`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResyncSummary {
    /// Watches added for newly eligible files.
    pub added: usize,
    /// Watches removed for files no project contains any more.
    pub removed: usize,
    /// Files that could not be watched.
    pub failed: usize,
}

/// Orchestrates watching and deployment.
///
/// Cloning is cheap and yields a handle to the same registry. Notifier
/// callbacks hold only a weak reference, so they never keep it alive.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use spd_core::{BuildEvaluator, AssemblyInspector, ProjectModel};
/// use spd_deploy::{
///     ContentTokenCache, DeploymentWriter, ExtensionPolicyCache, PathTokenResolver,
///     WatchRegistry,
/// };
/// use spd_watcher::ManualNotifier;
///
/// # fn example(
/// #     model: Arc<dyn ProjectModel>,
/// #     evaluator: Arc<dyn BuildEvaluator>,
/// #     inspector: Arc<dyn AssemblyInspector>,
/// # ) {
/// let writer = DeploymentWriter::new(
///     PathTokenResolver::new(model.sharepoint_install_path()),
///     ExtensionPolicyCache::new(evaluator, "TokenReplacementFileExtensions"),
///     ContentTokenCache::new(inspector),
/// );
/// let registry = WatchRegistry::new(model, Arc::new(ManualNotifier::new()), writer);
/// let watched = registry.initialize();
/// println!("Watching {watched} files");
/// # }
/// ```
#[derive(Clone)]
pub struct WatchRegistry {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for WatchRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchRegistry")
            .field("watched", &self.len())
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}

impl WatchRegistry {
    /// Creates a registry with nothing watched.
    #[must_use]
    pub fn new(
        model: Arc<dyn ProjectModel>,
        notifier: Arc<dyn FileNotifier>,
        writer: DeploymentWriter,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                model,
                notifier,
                writer,
                watches: Mutex::new(FxHashMap::default()),
                stats: DeployStats::new(),
            }),
        }
    }

    /// Watches every template and root file of every open project.
    ///
    /// A file that cannot be watched is reported with a warning and skipped.
    /// A notifier failure stops the pass.
    /// Returns the number of files watched afterwards.
    pub fn initialize(&self) -> usize {
        let files = self.inner.eligible_files();
        info!(files = files.len(), "Initializing file watches");

        for path in files {
            match self.add_file(&path) {
                Ok(_) => {}
                Err(error) if error.is_fatal() => {
                    error!(error = %error, "File notifier failed, skipping remaining watches");
                    break;
                }
                Err(error) => {
                    self.inner.stats.increment_rejected();
                    warn!(path = %path, error = %error, "Cannot watch file");
                }
            }
        }

        let watched = self.len();
        info!(watched, "File watches initialized");
        watched
    }

    /// Starts watching `path`.
    ///
    /// Returns `Ok(false)` if the path was already watched, under any
    /// letter case.
    ///
    /// # Errors
    ///
    /// Returns the notifier's [`WatchError`] if the subscription is refused.
    pub fn add_file(&self, path: &Utf8Path) -> Result<bool, WatchError> {
        self.inner.add_file(&self.callback(), path)
    }

    /// Stops watching `path`.
    ///
    /// Returns `false` if the path was not watched.
    pub fn remove_file(&self, path: &Utf8Path) -> bool {
        self.inner.remove_file(path)
    }

    /// Handles a change to `path`.
    ///
    /// Called by the notifier for each changed file. Can also be called
    /// directly to force a deployment.
    pub fn on_file_changed(&self, path: &Utf8Path) -> Option<DeployOutcome> {
        self.inner.on_file_changed(path)
    }

    /// Returns `true` if `path` is watched, ignoring case.
    #[must_use]
    pub fn is_watched(&self, path: &Utf8Path) -> bool {
        self.inner.watches.lock().contains_key(&WatchKey::new(path))
    }

    /// Returns the watched paths, sorted.
    #[must_use]
    pub fn watched_paths(&self) -> Vec<Utf8PathBuf> {
        let mut paths: Vec<_> = self
            .inner
            .watches
            .lock()
            .values()
            .map(|w| w.path.clone())
            .collect();
        paths.sort();
        paths
    }

    /// Returns the number of watched files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.watches.lock().len()
    }

    /// Returns `true` if nothing is watched.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.watches.lock().is_empty()
    }

    /// Reconciles the watch set with the project model.
    ///
    /// Eligible files not yet watched are added; watched files that no open
    /// project contains are removed. Watches for files that are still in a
    /// project but no longer deployable are left for
    /// [`on_file_changed`](Self::on_file_changed) to prune.
    pub fn resync(&self) -> ResyncSummary {
        let projects = self.inner.model.projects();
        let eligible = eligible_files(&projects);
        let known: FxHashSet<WatchKey> = projects
            .iter()
            .flat_map(|p| p.items())
            .flat_map(|item| item.files)
            .map(|file| WatchKey::new(&file.path))
            .collect();

        let stale: Vec<Utf8PathBuf> = self
            .inner
            .watches
            .lock()
            .iter()
            .filter(|(key, _)| !known.contains(*key))
            .map(|(_, watch)| watch.path.clone())
            .collect();

        let mut summary = ResyncSummary::default();
        for path in stale {
            if self.remove_file(&path) {
                summary.removed += 1;
            }
        }
        for path in eligible {
            match self.add_file(&path) {
                Ok(true) => summary.added += 1,
                Ok(false) => {}
                Err(error) => {
                    summary.failed += 1;
                    self.inner.stats.increment_rejected();
                    warn!(path = %path, error = %error, "Cannot watch file");
                }
            }
        }

        info!(
            added = summary.added,
            removed = summary.removed,
            failed = summary.failed,
            "Watches resynchronized"
        );
        summary
    }

    /// Releases every subscription.
    ///
    /// The registry stays usable; files can be added again afterwards.
    pub fn shutdown(&self) {
        let released = self.inner.release_all();
        info!(released, "File watches released");
    }

    /// Returns a snapshot of the deployment statistics.
    #[must_use]
    pub fn stats(&self) -> DeployStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// Returns the writer, for cache access and diagnostics.
    #[must_use]
    pub fn writer(&self) -> &DeploymentWriter {
        &self.inner.writer
    }

    fn callback(&self) -> ChangeCallback {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        Arc::new(move |batch: &FileEventBatch| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            for path in batch.unique_paths() {
                inner.on_file_changed(path);
            }
        })
    }
}

impl HierarchyListener for WatchRegistry {
    fn on_item_added(&self, path: &Utf8Path) {
        match self.add_file(path) {
            Ok(true) => debug!(path = %path, "Watching added item"),
            Ok(false) => {}
            Err(error) => {
                self.inner.stats.increment_rejected();
                warn!(path = %path, error = %error, "Cannot watch added item");
            }
        }
    }

    fn on_item_removed(&self, path: &Utf8Path) {
        if self.remove_file(path) {
            debug!(path = %path, "Stopped watching removed item");
        }
    }
}

impl Inner {
    fn eligible_files(&self) -> Vec<Utf8PathBuf> {
        eligible_files(&self.model.projects())
    }

    fn add_file(&self, callback: &ChangeCallback, path: &Utf8Path) -> Result<bool, WatchError> {
        let key = WatchKey::new(path);
        let mut watches = self.watches.lock();
        if watches.contains_key(&key) {
            return Ok(false);
        }

        let subscription = self.notifier.subscribe(path, Arc::clone(callback))?;
        debug!(path = %path, subscription = %subscription, "Watching file");
        watches.insert(
            key,
            WatchedFile {
                path: path.to_owned(),
                subscription,
            },
        );
        Ok(true)
    }

    fn remove_file(&self, path: &Utf8Path) -> bool {
        let mut watches = self.watches.lock();
        let Some(watch) = watches.remove(&WatchKey::new(path)) else {
            return false;
        };
        self.release(&watch);
        true
    }

    fn release(&self, watch: &WatchedFile) {
        if let Err(error) = self.notifier.unsubscribe(watch.subscription) {
            debug!(path = %watch.path, error = %error, "Unsubscribe failed");
        }
    }

    fn release_all(&self) -> usize {
        let drained: Vec<WatchedFile> = self.watches.lock().drain().map(|(_, w)| w).collect();
        for watch in &drained {
            self.release(watch);
        }
        drained.len()
    }

    /// Finds `path` in the open projects. When several projects contain it
    /// the last one wins.
    fn lookup(&self, path: &Utf8Path) -> Option<(Arc<dyn Project>, ProjectItemFile)> {
        self.model
            .projects()
            .into_iter()
            .filter_map(|project| project.find_file(path).map(|file| (project, file)))
            .last()
    }

    fn on_file_changed(&self, path: &Utf8Path) -> Option<DeployOutcome> {
        let Some((project, file)) = self.lookup(path) else {
            debug!(path = %path, "Changed file is not in any open project");
            self.stats.increment_ignored();
            return None;
        };

        if !file.kind().is_supported() {
            debug!(
                path = %path,
                deployment_type = ?file.deployment_type,
                "File is no longer deployed, removing watch"
            );
            if self.remove_file(path) {
                self.stats.increment_pruned();
            }
            return None;
        }

        match self.writer.deploy(project.as_ref(), &file.descriptor()) {
            Ok(outcome) => {
                if outcome.is_substituted() {
                    self.stats.increment_substituted();
                } else {
                    self.stats.increment_copied();
                }
                Some(outcome)
            }
            Err(err) => {
                self.stats.increment_failed();
                error!(path = %path, project = %project.name(), "Error: {err}");
                None
            }
        }
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let released = self.release_all();
        if released > 0 {
            debug!(released, "Released watches on drop");
        }
    }
}

fn eligible_files(projects: &[Arc<dyn Project>]) -> Vec<Utf8PathBuf> {
    projects
        .iter()
        .flat_map(|project| project.items())
        .flat_map(|item| item.files)
        .filter(|file| file.kind().is_supported())
        .map(|file| file.path)
        .collect()
}
