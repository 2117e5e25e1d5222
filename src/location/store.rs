//! The single source of truth for query-string state.
//!
//! Mutations always land in memory first. Mirroring them into the
//! [`Location`] and notifying subscribers both wait until
//! [`LocationStore::enable_url_writing`] has been called, so that nothing is
//! written back before the initial location has been read.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use crate::location::query::QueryMap;
use crate::location::source::Location;
use crate::location::subscription::{Subscribers, Subscription};

/// Nesting past this many re-entrant dispatches is logged as runaway.
pub const MAX_DISPATCH_DEPTH: usize = 32;

/// Shared, observable string key/value store.
///
/// Cloning is cheap and every clone refers to the same state. Inject one
/// instance into every [`FilterHook`](crate::filters::FilterHook) and
/// collaborator of a navigation context.
///
/// # Notification order
///
/// Each committed `set`, `set_many`, `clear`, or `clear_all` call produces
/// exactly one notification, delivered synchronously after the in-memory
/// state and the location have been updated. A subscriber that mutates the
/// store during its callback is handled depth-first: the nested mutation is
/// committed and fully dispatched before the remaining subscribers of the
/// outer notification run.
#[derive(Clone)]
pub struct LocationStore {
    inner: Arc<StoreShared>,
}

struct StoreShared {
    state: RwLock<StoreState>,
    subscribers: Subscribers,
    location: Option<Box<dyn Location>>,
    /// Revision last written to the location. Held across `replace_query`
    /// so writes land in revision order.
    written: Mutex<u64>,
    writing_enabled: AtomicBool,
    dispatch_depth: AtomicUsize,
}

#[derive(Default)]
struct StoreState {
    params: QueryMap,
    revision: u64,
    /// Last revision subscribers were told about.
    published: u64,
}

impl LocationStore {
    /// A store with no external location. Writes stay in memory.
    pub fn new() -> Self {
        Self::build(QueryMap::new(), None)
    }

    /// A detached store seeded from a query string.
    pub fn from_query(query: &str) -> Self {
        Self::build(QueryMap::parse(query), None)
    }

    /// A store mirroring `location`. The location's query string is read
    /// once, here, so reads during initial render see deep-linked state.
    pub fn with_location(location: impl Location + 'static) -> Self {
        let params = QueryMap::parse(&location.query());
        tracing::debug!(
            keys = params.len(),
            "Location store initialized from location"
        );
        Self::build(params, Some(Box::new(location)))
    }

    fn build(params: QueryMap, location: Option<Box<dyn Location>>) -> Self {
        Self {
            inner: Arc::new(StoreShared {
                state: RwLock::new(StoreState {
                    params,
                    ..StoreState::default()
                }),
                subscribers: Subscribers::default(),
                location,
                written: Mutex::new(0),
                writing_enabled: AtomicBool::new(false),
                dispatch_depth: AtomicUsize::new(0),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.state.read().params.get(key).map(str::to_string)
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.state.read().params.contains_key(key)
    }

    /// Present keys in insertion order. Callers should not depend on the order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.state.read().params.keys()
    }

    /// Copy of the current key/value pairs.
    pub fn snapshot(&self) -> QueryMap {
        self.inner.state.read().params.clone()
    }

    /// The query string the location holds (or would hold once writing is enabled).
    pub fn to_query_string(&self) -> String {
        self.inner.state.read().params.to_query_string()
    }

    /// Incremented on every committed in-memory mutation.
    pub fn revision(&self) -> u64 {
        self.inner.state.read().revision
    }

    pub fn is_writing_enabled(&self) -> bool {
        self.inner.writing_enabled.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Set a key. `None` clears it.
    pub fn set(&self, key: &str, value: Option<&str>) {
        match value {
            Some(value) => self.commit("set", |params| {
                params.insert(key.to_string(), value.to_string())
            }),
            None => self.clear(key),
        }
    }

    /// Apply a batch of updates with a single notification. `None` values
    /// clear their key.
    pub fn set_many<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, Option<V>)>,
        K: Into<String>,
        V: Into<String>,
    {
        let entries: Vec<(String, Option<String>)> = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.map(Into::into)))
            .collect();

        self.commit("set_many", |params| {
            let mut changed = false;
            for (key, value) in entries {
                changed |= match value {
                    Some(value) => params.insert(key, value),
                    None => params.remove(&key),
                };
            }
            changed
        });
    }

    pub fn clear(&self, key: &str) {
        self.commit("clear", |params| params.remove(key));
    }

    /// Remove the listed keys, or every key when `keys` is `None`.
    ///
    /// The store has no notion of reserved keys; callers that need some
    /// keys to survive pass an explicit list.
    pub fn clear_all(&self, keys: Option<&[&str]>) {
        self.commit("clear_all", |params| match keys {
            Some(keys) => keys
                .iter()
                .fold(false, |changed, key| params.remove(key) || changed),
            None => {
                let changed = !params.is_empty();
                *params = QueryMap::new();
                changed
            }
        });
    }

    /// Register a callback for every externally visible mutation.
    ///
    /// The callback receives the store revision of the mutation.
    pub fn subscribe(&self, callback: impl Fn(u64) + Send + Sync + 'static) -> Subscription {
        self.inner.subscribers.add(Arc::new(callback))
    }

    /// Start mirroring mutations into the location and notifying subscribers.
    ///
    /// Only the first call has an effect. Mutations buffered before it are
    /// flushed to the location, and subscribers are notified once if any
    /// were made.
    pub fn enable_url_writing(&self) {
        if self.inner.writing_enabled.swap(true, Ordering::SeqCst) {
            tracing::debug!("URL writing already enabled");
            return;
        }

        let (revision, params, pending) = {
            let mut state = self.inner.state.write();
            let pending = state.revision != state.published;
            state.published = state.revision;
            (state.revision, state.params.clone(), pending)
        };

        let in_sync = self
            .inner
            .location
            .as_ref()
            .map_or(true, |location| QueryMap::parse(&location.query()) == params);
        if !in_sync {
            self.write_location(revision, &params.to_query_string());
        }

        tracing::debug!(revision, pending, "URL writing enabled");

        if pending {
            self.notify(revision);
        }
    }

    fn commit(&self, op: &'static str, apply: impl FnOnce(&mut QueryMap) -> bool) {
        let (revision, query) = {
            let mut state = self.inner.state.write();
            if !apply(&mut state.params) {
                tracing::trace!(op, "No change, nothing committed");
                return;
            }
            state.revision += 1;
            if !self.is_writing_enabled() {
                tracing::debug!(op, revision = state.revision, "Buffered (URL writing disabled)");
                return;
            }
            state.published = state.revision;
            (state.revision, state.params.to_query_string())
        };

        self.write_location(revision, &query);
        tracing::debug!(op, revision, query = %query, "Committed");

        self.notify(revision);
    }

    /// Mirror `query` into the location unless a newer revision got there
    /// first. Commits on other threads serialize on `written`.
    fn write_location(&self, revision: u64, query: &str) {
        let Some(location) = &self.inner.location else {
            return;
        };
        let mut written = self.inner.written.lock();
        if *written >= revision {
            tracing::trace!(revision, written = *written, "Skipping stale location write");
            return;
        }
        location.replace_query(query);
        *written = revision;
    }

    fn notify(&self, revision: u64) {
        let depth = self.inner.dispatch_depth.fetch_add(1, Ordering::SeqCst) + 1;
        let _depth_guard = scopeguard::guard((), |_| {
            self.inner.dispatch_depth.fetch_sub(1, Ordering::SeqCst);
        });
        if depth > MAX_DISPATCH_DEPTH {
            tracing::warn!(
                revision,
                depth,
                limit = MAX_DISPATCH_DEPTH,
                "Re-entrant dispatch nested past the limit; a subscriber may be looping"
            );
        } else {
            tracing::trace!(revision, depth, "Notifying subscribers");
        }
        self.inner.subscribers.dispatch(revision);
    }
}

impl Default for LocationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LocationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("LocationStore")
            .field("params", &state.params)
            .field("revision", &state.revision)
            .field("writing_enabled", &self.is_writing_enabled())
            .field("subscribers", &self.inner.subscribers.len())
            .finish()
    }
}
