//! Subscriber registry for store notifications.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

/// Callback invoked with the store revision that triggered the notification.
pub(crate) type Callback = Arc<dyn Fn(u64) + Send + Sync>;

struct Entry {
    id: u64,
    active: Arc<AtomicBool>,
    callback: Callback,
}

#[derive(Default)]
struct SubscriberList {
    next_id: u64,
    entries: Vec<Entry>,
}

/// Registered callbacks, in registration order.
#[derive(Clone, Default)]
pub(crate) struct Subscribers {
    inner: Arc<Mutex<SubscriberList>>,
}

impl Subscribers {
    pub(crate) fn add(&self, callback: Callback) -> Subscription {
        let mut list = self.inner.lock();
        let id = list.next_id;
        list.next_id += 1;
        let active = Arc::new(AtomicBool::new(true));
        list.entries.push(Entry {
            id,
            active: Arc::clone(&active),
            callback,
        });
        Subscription {
            id,
            active,
            registry: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Invoke every live subscriber, in registration order.
    ///
    /// The list is snapshotted and the lock released first, so callbacks may
    /// subscribe, unsubscribe, or mutate the store. An entry unsubscribed
    /// while this dispatch is running is skipped.
    pub(crate) fn dispatch(&self, revision: u64) {
        let snapshot: Vec<(Arc<AtomicBool>, Callback)> = self
            .inner
            .lock()
            .entries
            .iter()
            .map(|e| (Arc::clone(&e.active), Arc::clone(&e.callback)))
            .collect();

        for (active, callback) in snapshot {
            if active.load(Ordering::SeqCst) {
                callback(revision);
            }
        }
    }
}

/// Handle for one registered callback.
///
/// Dropping the handle leaves the callback registered; call
/// [`Subscription::unsubscribe`] on teardown.
pub struct Subscription {
    id: u64,
    active: Arc<AtomicBool>,
    registry: Weak<Mutex<SubscriberList>>,
}

impl Subscription {
    /// Remove the callback. Idempotent, and safe to call from inside any
    /// callback, including the one being removed.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry.lock().entries.retain(|e| e.id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn dispatch_runs_in_registration_order() {
        let subs = Subscribers::default();
        let order = Arc::new(Mutex::new(Vec::new()));
        for tag in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            let _ = subs.add(Arc::new(move |_| order.lock().push(tag)));
        }
        subs.dispatch(1);
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn unsubscribe_is_idempotent() {
        let subs = Subscribers::default();
        let sub = subs.add(Arc::new(|_| {}));
        assert_eq!(subs.len(), 1);
        sub.unsubscribe();
        sub.unsubscribe();
        assert!(!sub.is_active());
        assert_eq!(subs.len(), 0);
    }

    #[test]
    fn entry_removed_mid_dispatch_is_skipped() {
        let subs = Subscribers::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let victim: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));

        let v = Arc::clone(&victim);
        let _killer = subs.add(Arc::new(move |_| {
            if let Some(sub) = v.lock().as_ref() {
                sub.unsubscribe();
            }
        }));
        let h = Arc::clone(&hits);
        let target = subs.add(Arc::new(move |_| {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        *victim.lock() = Some(target);

        subs.dispatch(1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(subs.len(), 1);
    }
}
