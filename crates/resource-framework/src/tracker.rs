//! # Change Tracking
//!
//! Every observable resource and collection owns a [`ChangeTracker`]: the list
//! of [`ChangeObserver`]s interested in its changes. Observers are held weakly;
//! the tracker never keeps an observer alive and silently drops registrations
//! whose observer has gone away.
//!
//! Property identifiers passed to [`ChangeObserver::on_change`]:
//!
//! - an attribute name, for scalar and `belongsTo` replacement and for
//!   changes inside a `hasMany` collection owned by the resource,
//! - [`CONTENT_CHANGED`] (`"[]"`), for structural changes of a collection,
//! - [`ELEMENT_CHANGED`] (`"@each"`), for a change inside one of a
//!   collection's elements,
//! - [`ALL_PROPERTIES`] (`"*"`), for a batched change such as a copy.

use std::cell::RefCell;
use std::collections::HashSet;
use std::sync::{Arc, Weak};

pub const CONTENT_CHANGED: &str = "[]";
pub const ELEMENT_CHANGED: &str = "@each";
pub const ALL_PROPERTIES: &str = "*";

/// Receives change notifications from resources and collections.
///
/// Notifications are delivered synchronously after the change was applied and
/// after the notifying entity released its own lock, so implementations may
/// read the entity that changed.
pub trait ChangeObserver: Send + Sync {
    fn on_change(&self, property: &str);
}

impl<F> ChangeObserver for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_change(&self, property: &str) {
        self(property)
    }
}

thread_local! {
    static NOTIFYING: RefCell<HashSet<usize>> = RefCell::new(HashSet::new());
}

/// Marks an entity as notifying on the current thread until dropped.
///
/// Notification is synchronous, so a cycle in a resource graph always comes
/// back on the thread that started it. Entering an entity that is already
/// notifying on this thread yields `None`; other threads are unaffected.
pub(crate) struct NotifyGuard(usize);

impl NotifyGuard {
    pub(crate) fn enter(entity: usize) -> Option<Self> {
        NOTIFYING
            .with(|active| active.borrow_mut().insert(entity))
            .then_some(NotifyGuard(entity))
    }
}

impl Drop for NotifyGuard {
    fn drop(&mut self) {
        NOTIFYING.with(|active| {
            active.borrow_mut().remove(&self.0);
        });
    }
}

/// Identifies one registration on one tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Registration {
    id: ObserverId,
    key: usize,
    observer: Weak<dyn ChangeObserver>,
}

/// Address of the observer allocation; compared, never dereferenced.
pub(crate) fn observer_key(observer: &Weak<dyn ChangeObserver>) -> usize {
    observer.as_ptr() as *const () as usize
}

pub(crate) struct ChangeTracker {
    observable: bool,
    next_id: u64,
    registrations: Vec<Registration>,
}

impl ChangeTracker {
    pub(crate) fn new(observable: bool) -> Self {
        Self {
            observable,
            next_id: 1,
            registrations: Vec::new(),
        }
    }

    pub(crate) fn is_observable(&self) -> bool {
        self.observable
    }

    /// Registers `observer`. Registering the same observer twice returns the
    /// existing id. Unobservable trackers accept nothing and return `None`.
    pub(crate) fn register(&mut self, observer: Weak<dyn ChangeObserver>) -> Option<ObserverId> {
        if !self.observable {
            return None;
        }
        let key = observer_key(&observer);
        if let Some(existing) = self.registrations.iter().find(|r| r.key == key) {
            return Some(existing.id);
        }
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.registrations.push(Registration { id, key, observer });
        Some(id)
    }

    pub(crate) fn unregister(&mut self, id: ObserverId) -> bool {
        let before = self.registrations.len();
        self.registrations.retain(|r| r.id != id);
        self.registrations.len() != before
    }

    pub(crate) fn unregister_key(&mut self, key: usize) {
        self.registrations.retain(|r| r.key != key);
    }

    /// Upgrades every live observer, pruning registrations whose observer was
    /// dropped. The caller notifies them after releasing its own lock.
    pub(crate) fn live_observers(&mut self) -> Vec<Arc<dyn ChangeObserver>> {
        let mut live = Vec::with_capacity(self.registrations.len());
        self.registrations.retain(|r| match r.observer.upgrade() {
            Some(observer) => {
                live.push(observer);
                true
            }
            None => false,
        });
        live
    }

    pub(crate) fn clear(&mut self) {
        self.registrations.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.registrations.len()
    }
}

impl std::fmt::Debug for ChangeTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeTracker")
            .field("observable", &self.observable)
            .field("observers", &self.registrations.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn observer(log: &Arc<Mutex<Vec<String>>>) -> Arc<dyn ChangeObserver> {
        let log = log.clone();
        Arc::new(move |property: &str| log.lock().unwrap().push(property.to_string()))
    }

    #[test]
    fn test_register_dedupes_and_prunes() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = ChangeTracker::new(true);

        let first = observer(&log);
        let a = tracker.register(Arc::downgrade(&first)).unwrap();
        let b = tracker.register(Arc::downgrade(&first)).unwrap();
        assert_eq!(a, b);
        assert_eq!(tracker.len(), 1);

        {
            let second = observer(&log);
            tracker.register(Arc::downgrade(&second));
            assert_eq!(tracker.len(), 2);
        }

        let live = tracker.live_observers();
        assert_eq!(live.len(), 1);
        assert_eq!(tracker.len(), 1);
        live[0].on_change("title");
        assert_eq!(*log.lock().unwrap(), ["title"]);

        assert!(tracker.unregister(a));
        assert!(!tracker.unregister(a));
    }

    #[test]
    fn test_notify_guard_is_per_thread() {
        let outer = NotifyGuard::enter(42).unwrap();
        assert!(NotifyGuard::enter(42).is_none());
        assert!(std::thread::spawn(|| NotifyGuard::enter(42).is_some())
            .join()
            .unwrap());
        drop(outer);
        assert!(NotifyGuard::enter(42).is_some());
    }

    #[test]
    fn test_unobservable_tracker_accepts_nothing() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut tracker = ChangeTracker::new(false);
        let obs = observer(&log);
        assert!(tracker.register(Arc::downgrade(&obs)).is_none());
        assert!(tracker.live_observers().is_empty());
    }
}
