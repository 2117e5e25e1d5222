//! Shared test utilities.

#![allow(dead_code, unused_imports)]

use parking_lot::Mutex;
use querystate::{FilterConfig, FilterHook, FilterKey, LocationStore, MemoryLocation, Subscription};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// A store mirroring a fresh in-memory location, with writing enabled.
pub fn live_store(query: &str) -> (LocationStore, MemoryLocation) {
    let location = MemoryLocation::new(query);
    let store = LocationStore::with_location(location.clone());
    store.enable_url_writing();
    (store, location)
}

/// A hook over a live store, plus the location it writes to.
pub fn live_hook(query: &str, config: FilterConfig) -> (FilterHook, MemoryLocation) {
    let (store, location) = live_store(query);
    (FilterHook::new(store, config), location)
}

/// Counts notifications delivered to one subscriber.
pub struct NotificationCounter {
    count: Arc<AtomicUsize>,
    pub subscription: Subscription,
}

impl NotificationCounter {
    pub fn attach(store: &LocationStore) -> Self {
        let count = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&count);
        let subscription = store.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        Self {
            count,
            subscription,
        }
    }

    pub fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Records subscriber events in order.
pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn event_log() -> EventLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// `topN` defaults to 5 within 1..=20, `country`/`entity` exclusive,
/// `view` not active.
pub fn dashboard_config() -> FilterConfig {
    FilterConfig::new()
        .with_default(FilterKey::TopN, 5)
        .with_validator(FilterKey::TopN, querystate::Validator::range(1, 20))
        .with_exclusive(FilterKey::Country, FilterKey::Entity)
        .exclude_from_active(FilterKey::View)
}
