//! The notification capability and its shared subscription bookkeeping.
//!
//! A [`FileNotifier`] delivers a callback whenever a subscribed file changes.
//! Implementations differ only in where changes come from; both keep their
//! subscribers in a [`SubscriptionTable`].

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use smallvec::SmallVec;
use spd_core::{FxHashMap, WatchKey};

use crate::error::WatchError;
use crate::events::{FileEvent, FileEventBatch};

/// Callback invoked with the subscribed paths that changed together.
pub type ChangeCallback = Arc<dyn Fn(&FileEventBatch) + Send + Sync>;

/// Handle returned by [`FileNotifier::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Creates a subscription id from a raw value.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Delivers change notifications for individual files.
///
/// Callbacks run on the notifier's own thread (or the caller's, for
/// [`ManualNotifier`](crate::ManualNotifier)). They may call back into the
/// notifier, including [`unsubscribe`](Self::unsubscribe) for their own id.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use camino::Utf8Path;
/// use spd_watcher::{FileNotifier, ManualNotifier};
///
/// let notifier = ManualNotifier::new();
/// let id = notifier
///     .subscribe(Utf8Path::new("/src/a.xml"), Arc::new(|batch| {
///         for event in batch {
///             println!("changed: {}", event.path);
///         }
///     }))
///     .unwrap();
///
/// notifier.unsubscribe(id).unwrap();
/// ```
pub trait FileNotifier: Send + Sync {
    /// Registers interest in changes to `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`WatchError`] if the path cannot be watched.
    fn subscribe(
        &self,
        path: &Utf8Path,
        on_change: ChangeCallback,
    ) -> Result<SubscriptionId, WatchError>;

    /// Releases a subscription.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::UnknownSubscription`] if `id` is not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> Result<(), WatchError>;
}

struct Subscription {
    key: WatchKey,
    path: Utf8PathBuf,
    callback: ChangeCallback,
}

/// Subscribers indexed by id and by case-folded match key.
#[derive(Default)]
pub(crate) struct SubscriptionTable {
    next_id: u64,
    by_id: FxHashMap<SubscriptionId, Subscription>,
    by_key: FxHashMap<WatchKey, SmallVec<[SubscriptionId; 2]>>,
}

impl SubscriptionTable {
    /// Adds a subscriber. `key` is what incoming event paths are matched
    /// against; `path` is what the subscriber gets back.
    pub(crate) fn insert(
        &mut self,
        key: WatchKey,
        path: Utf8PathBuf,
        callback: ChangeCallback,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.by_key.entry(key.clone()).or_default().push(id);
        self.by_id.insert(
            id,
            Subscription {
                key,
                path,
                callback,
            },
        );
        id
    }

    /// Removes a subscriber, returning its match key and whether it was the
    /// last subscriber for that key.
    pub(crate) fn remove(&mut self, id: SubscriptionId) -> Option<(WatchKey, bool)> {
        let subscription = self.by_id.remove(&id)?;
        let mut last = true;
        if let Some(ids) = self.by_key.get_mut(&subscription.key) {
            ids.retain(|other| *other != id);
            last = ids.is_empty();
            if last {
                self.by_key.remove(&subscription.key);
            }
        }
        Some((subscription.key, last))
    }

    /// Groups the given event paths by subscriber.
    ///
    /// The returned callbacks are cloned so they can run after the table's
    /// lock is released.
    pub(crate) fn dispatch_plan<'a>(
        &self,
        changed: impl IntoIterator<Item = &'a WatchKey>,
    ) -> Vec<(ChangeCallback, FileEventBatch)> {
        let mut plan: FxHashMap<SubscriptionId, (ChangeCallback, FileEventBatch)> =
            FxHashMap::default();
        for key in changed {
            let Some(ids) = self.by_key.get(key) else {
                continue;
            };
            for id in ids {
                if let Some(subscription) = self.by_id.get(id) {
                    plan.entry(*id)
                        .or_insert_with(|| {
                            (Arc::clone(&subscription.callback), FileEventBatch::new())
                        })
                        .1
                        .push(FileEvent::new(subscription.path.clone()));
                }
            }
        }
        let mut ordered: Vec<_> = plan.into_iter().collect();
        ordered.sort_by_key(|(id, _)| *id);
        ordered.into_iter().map(|(_, entry)| entry).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    pub(crate) fn count_for(&self, key: &WatchKey) -> usize {
        self.by_key.get(key).map_or(0, SmallVec::len)
    }

    pub(crate) fn ids(&self) -> Vec<SubscriptionId> {
        let mut ids: Vec<_> = self.by_id.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting() -> (ChangeCallback, Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let callback: ChangeCallback = Arc::new(move |batch: &FileEventBatch| {
            seen.fetch_add(batch.len(), Ordering::SeqCst);
        });
        (callback, count)
    }

    #[test]
    fn test_table_insert_and_remove() {
        let mut table = SubscriptionTable::default();
        let key = WatchKey::new(Utf8Path::new("/src/a.xml"));
        let (callback, _) = counting();

        let first = table.insert(key.clone(), "/src/a.xml".into(), Arc::clone(&callback));
        let second = table.insert(key.clone(), "/src/A.xml".into(), callback);
        assert_ne!(first, second);
        assert_eq!(table.len(), 2);
        assert_eq!(table.count_for(&key), 2);

        assert_eq!(table.remove(first), Some((key.clone(), false)));
        assert_eq!(table.remove(second), Some((key.clone(), true)));
        assert_eq!(table.remove(second), None);
        assert_eq!(table.count_for(&key), 0);
    }

    #[test]
    fn test_dispatch_plan_groups_by_subscriber() {
        let mut table = SubscriptionTable::default();
        let (callback, count) = counting();
        let a = WatchKey::new(Utf8Path::new("/src/a.xml"));
        let b = WatchKey::new(Utf8Path::new("/src/b.xml"));
        table.insert(a.clone(), "/src/a.xml".into(), Arc::clone(&callback));
        table.insert(b.clone(), "/src/b.xml".into(), callback);

        let unrelated = WatchKey::new(Utf8Path::new("/src/c.xml"));
        let plan = table.dispatch_plan([&a, &b, &unrelated]);
        assert_eq!(plan.len(), 2);

        for (callback, batch) in &plan {
            callback(batch);
        }
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_dispatch_plan_returns_subscribed_path() {
        let mut table = SubscriptionTable::default();
        let (callback, _) = counting();
        let key = WatchKey::new(Utf8Path::new("/Src/Site.CSS"));
        table.insert(key, "/Src/Site.CSS".into(), callback);

        let incoming = WatchKey::new(Utf8Path::new("/src/site.css"));
        let plan = table.dispatch_plan([&incoming]);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].1.events[0].path.as_str(), "/Src/Site.CSS");
    }

    #[test]
    fn test_subscription_id_display() {
        assert_eq!(SubscriptionId::new(3).to_string(), "#3");
        assert_eq!(SubscriptionId::new(3).as_u64(), 3);
    }
}
