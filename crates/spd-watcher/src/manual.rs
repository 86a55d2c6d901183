//! A notifier driven by explicit calls instead of the file system.

use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::Mutex;
use spd_core::{FxHashSet, WatchKey};

use crate::error::WatchError;
use crate::notifier::{ChangeCallback, FileNotifier, SubscriptionId, SubscriptionTable};

/// A [`FileNotifier`] whose changes are reported by calling
/// [`notify_changed`](Self::notify_changed).
///
/// Hosts that already receive save events from their editor use this instead
/// of a file system watcher. It also makes subscriber behavior testable
/// without timing.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use camino::Utf8Path;
/// use spd_watcher::{FileNotifier, ManualNotifier};
///
/// let notifier = ManualNotifier::new();
/// let hits = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&hits);
/// notifier
///     .subscribe(Utf8Path::new("/src/Site.css"), Arc::new(move |_batch| {
///         seen.fetch_add(1, Ordering::SeqCst);
///     }))
///     .unwrap();
///
/// assert_eq!(notifier.notify_changed([Utf8Path::new("/SRC/site.css")]), 1);
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct ManualNotifier {
    table: Mutex<SubscriptionTable>,
    rejected: Mutex<FxHashSet<WatchKey>>,
}

impl std::fmt::Debug for ManualNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualNotifier")
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

impl ManualNotifier {
    /// Creates a notifier with no subscriptions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports that `paths` changed and invokes the matching callbacks.
    ///
    /// Callbacks run on the calling thread after the subscription lock is
    /// released. Returns the number of callbacks invoked.
    pub fn notify_changed<'a>(&self, paths: impl IntoIterator<Item = &'a Utf8Path>) -> usize {
        let keys: Vec<WatchKey> = paths.into_iter().map(WatchKey::new).collect();
        let plan = self.table.lock().dispatch_plan(&keys);
        let invoked = plan.len();
        for (callback, batch) in plan {
            callback(&batch);
        }
        invoked
    }

    /// Makes future subscriptions to `path` fail with
    /// [`WatchError::Rejected`].
    pub fn reject_path(&self, path: impl AsRef<Utf8Path>) {
        self.rejected.lock().insert(WatchKey::new(path.as_ref()));
    }

    /// Returns the number of live subscriptions.
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.table.lock().len()
    }

    /// Returns `true` if at least one subscription matches `path`.
    #[must_use]
    pub fn is_subscribed(&self, path: &Utf8Path) -> bool {
        self.table.lock().count_for(&WatchKey::new(path)) > 0
    }

    /// Returns the ids of all live subscriptions in creation order.
    #[must_use]
    pub fn subscription_ids(&self) -> Vec<SubscriptionId> {
        self.table.lock().ids()
    }
}

impl FileNotifier for ManualNotifier {
    fn subscribe(
        &self,
        path: &Utf8Path,
        on_change: ChangeCallback,
    ) -> Result<SubscriptionId, WatchError> {
        let key = WatchKey::new(path);
        if self.rejected.lock().contains(&key) {
            return Err(WatchError::rejected(path, "rejected by notifier"));
        }
        let id = self
            .table
            .lock()
            .insert(key, Utf8PathBuf::from(path), on_change);
        tracing::trace!(path = %path, id = %id, "Subscribed");
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), WatchError> {
        self.table
            .lock()
            .remove(id)
            .map(|_| ())
            .ok_or(WatchError::UnknownSubscription(id))
    }
}
