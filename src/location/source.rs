//! The navigable location a store mirrors.

use std::sync::Arc;

use parking_lot::Mutex;

/// The shareable representation of the store: a query string attached to
/// the host's current location (an address bar, a deep link, a saved URL).
///
/// Implementations only move strings; parsing lives in the store.
pub trait Location: Send + Sync {
    /// Current query string, with or without the leading `?`.
    fn query(&self) -> String;

    /// Replace the query string without creating a new history entry.
    fn replace_query(&self, query: &str);
}

/// In-memory location. Clones share the same underlying state, so a host
/// (or a test) can keep one handle while the store owns another.
#[derive(Clone, Default)]
pub struct MemoryLocation {
    inner: Arc<Mutex<MemoryLocationInner>>,
}

#[derive(Default)]
struct MemoryLocationInner {
    query: String,
    writes: Vec<String>,
}

impl MemoryLocation {
    /// Create a location holding the given query string.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryLocationInner {
                query: query.into(),
                writes: Vec::new(),
            })),
        }
    }

    /// Every query string written through [`Location::replace_query`], oldest first.
    pub fn writes(&self) -> Vec<String> {
        self.inner.lock().writes.clone()
    }
}

impl Location for MemoryLocation {
    fn query(&self) -> String {
        self.inner.lock().query.clone()
    }

    fn replace_query(&self, query: &str) {
        let mut inner = self.inner.lock();
        inner.query = query.to_string();
        inner.writes.push(query.to_string());
    }
}
