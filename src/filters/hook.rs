//! Typed, validated view over a [`LocationStore`].
//!
//! Every read goes back to the store, so any number of hooks over the same
//! store agree on every value after any mutation from any of them. Writes
//! are checked against the hook's [`FilterConfig`]; rejected writes leave
//! the store untouched and are logged, never returned as errors.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::filters::config::FilterConfig;
use crate::filters::key::{FilterKey, SystemKey, ValueKind};
use crate::filters::value::FilterValue;
use crate::filters::year_range::YearRange;
use crate::location::{LocationStore, Subscription};

/// Snapshot of every filter that has a value, explicit or default.
pub type FilterValues = BTreeMap<FilterKey, FilterValue>;

/// Why a write was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    /// The value's kind does not match the key's declared kind.
    KindMismatch { expected: ValueKind },
    /// The key's validator returned false.
    Validator { description: String },
    /// A later entry of the same batch set a mutually exclusive key.
    ExclusiveConflict { winner: FilterKey },
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectionReason::KindMismatch { expected } => {
                write!(f, "expected a {:?} value", expected)
            }
            RejectionReason::Validator { description } => {
                write!(f, "failed validator: {}", description)
            }
            RejectionReason::ExclusiveConflict { winner } => {
                write!(f, "'{}' set in the same batch", winner)
            }
        }
    }
}

/// Log entry for a rejected write.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub timestamp: SystemTime,
    pub key: FilterKey,
    pub value: FilterValue,
    pub reason: RejectionReason,
}

/// Typed filter accessor bound to one store and one configuration.
///
/// Subscribes to the store once, on construction, and unsubscribes on
/// [`FilterHook::dispose`] or drop.
pub struct FilterHook {
    store: LocationStore,
    config: Arc<FilterConfig>,
    revision: Arc<AtomicU64>,
    subscription: Subscription,
    rejections: Mutex<Vec<Rejection>>,
}

impl FilterHook {
    pub fn new(store: LocationStore, config: FilterConfig) -> Self {
        let revision = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&revision);
        let subscription = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        Self {
            store,
            config: Arc::new(config),
            revision,
            subscription,
            rejections: Mutex::new(Vec::new()),
        }
    }

    pub fn store(&self) -> &LocationStore {
        &self.store
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Number of store notifications this hook has seen.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }

    /// Register a callback run after every store notification, once this
    /// hook's revision has been bumped. The callback receives that revision.
    pub fn subscribe(&self, callback: impl Fn(u64) + Send + Sync + 'static) -> Subscription {
        let revision = Arc::clone(&self.revision);
        self.store
            .subscribe(move |_| callback(revision.load(Ordering::SeqCst)))
    }

    /// Decoded value, falling back to the configured default.
    ///
    /// Stored text that does not decode as the key's kind reads as absent.
    pub fn get(&self, key: FilterKey) -> Option<FilterValue> {
        self.store
            .get(key.as_str())
            .and_then(|raw| FilterValue::decode(&raw, key.kind()))
            .or_else(|| {
                self.config
                    .default_for(key)
                    .filter(|v| v.kind() == key.kind())
                    .cloned()
            })
    }

    pub fn get_number(&self, key: FilterKey) -> Option<i64> {
        self.get(key).and_then(|v| v.as_number())
    }

    pub fn get_text(&self, key: FilterKey) -> Option<String> {
        match self.get(key) {
            Some(FilterValue::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Explicit presence in the store. Defaults do not count.
    pub fn has(&self, key: FilterKey) -> bool {
        self.store.has(key.as_str())
    }

    /// Validate and commit `value`, clearing every mutually exclusive partner
    /// in the same store batch.
    pub fn set(&self, key: FilterKey, value: impl Into<FilterValue>) {
        self.assign(key, Some(value.into()));
    }

    /// [`FilterHook::set`] for `Some`, [`FilterHook::clear`] for `None`.
    pub fn assign(&self, key: FilterKey, value: Option<FilterValue>) {
        self.set_many([(key, value)]);
    }

    /// Apply several updates with a single store notification.
    ///
    /// `None` entries clear their key. Entries that fail validation are
    /// dropped and the rest still apply. When a batch gives values to both
    /// members of an exclusive pair, the later entry wins. Partners of the
    /// keys being set are cleared unless they are themselves part of the
    /// batch, which lets a caller swap two exclusive filters atomically.
    pub fn set_many<I>(&self, updates: I)
    where
        I: IntoIterator<Item = (FilterKey, Option<FilterValue>)>,
    {
        let mut batch: Vec<(FilterKey, Option<FilterValue>)> = Vec::new();
        for (key, value) in updates {
            batch.retain(|(k, _)| *k != key);
            batch.push((key, value));
        }

        batch.retain(|(key, value)| match value {
            Some(value) => self.admit(*key, value),
            None => true,
        });

        let mut index = 0;
        while index < batch.len() {
            let conflict = match &batch[index] {
                (key, Some(value)) => {
                    let partners = self.config.partners(*key);
                    batch[index + 1..]
                        .iter()
                        .find(|(later, v)| v.is_some() && partners.contains(later))
                        .map(|(later, _)| (*key, value.clone(), *later))
                }
                (_, None) => None,
            };
            match conflict {
                Some((key, value, winner)) => {
                    self.reject(key, value, RejectionReason::ExclusiveConflict { winner });
                    batch.remove(index);
                }
                None => index += 1,
            }
        }

        let mut partners: Vec<FilterKey> = batch
            .iter()
            .filter(|(_, value)| value.is_some())
            .flat_map(|(key, _)| self.config.partners(*key))
            .filter(|partner| !batch.iter().any(|(k, _)| k == partner))
            .filter(|partner| self.has(*partner))
            .collect();
        partners.sort();
        partners.dedup();

        if batch.is_empty() {
            return;
        }

        if !partners.is_empty() {
            tracing::debug!(?partners, "Clearing mutually exclusive filters");
        }

        let entries = partners
            .into_iter()
            .map(|key| (key.as_str(), None))
            .chain(
                batch
                    .iter()
                    .map(|(key, value)| (key.as_str(), value.as_ref().map(FilterValue::encode))),
            )
            .collect::<Vec<(&str, Option<String>)>>();

        self.store.set_many(entries);
    }

    pub fn clear(&self, key: FilterKey) {
        self.store.clear(key.as_str());
    }

    /// Remove everything from the store except the system keys, in one batch.
    pub fn clear_all(&self) {
        let keys = self.store.keys();
        let doomed: Vec<&str> = keys
            .iter()
            .map(String::as_str)
            .filter(|key| !SystemKey::is_system(key))
            .collect();

        tracing::debug!(
            cleared = doomed.len(),
            preserved = keys.len() - doomed.len(),
            "Clearing all filters"
        );
        self.store.clear_all(Some(doomed.as_slice()));
    }

    /// Keys explicitly present in the store that count as user intent, in
    /// vocabulary order.
    pub fn active_keys(&self) -> Vec<FilterKey> {
        FilterKey::all()
            .iter()
            .copied()
            .filter(|key| !self.config.is_excluded_from_active(*key))
            .filter(|key| self.has(*key))
            .collect()
    }

    pub fn has_active_filters(&self) -> bool {
        !self.active_keys().is_empty()
    }

    /// `yearMin`/`yearMax` as read through [`FilterHook::get`].
    pub fn year_range(&self) -> YearRange {
        YearRange::new(
            self.get_number(FilterKey::YearMin),
            self.get_number(FilterKey::YearMax),
        )
    }

    /// Set both bounds in one batch. A `None` bound is cleared.
    pub fn set_year_range(&self, min: Option<i64>, max: Option<i64>) {
        self.set_many([
            (FilterKey::YearMin, min.map(FilterValue::Number)),
            (FilterKey::YearMax, max.map(FilterValue::Number)),
        ]);
    }

    pub fn clear_year_range(&self) {
        self.store.clear_all(Some(
            &[FilterKey::YearMin.as_str(), FilterKey::YearMax.as_str()][..],
        ));
    }

    /// Every key of the vocabulary that has a value, defaults included.
    pub fn values(&self) -> FilterValues {
        FilterKey::all()
            .iter()
            .filter_map(|key| self.get(*key).map(|v| (*key, v)))
            .collect()
    }

    pub fn system(&self, key: SystemKey) -> Option<String> {
        self.store.get(key.as_str())
    }

    pub fn set_system(&self, key: SystemKey, value: Option<&str>) {
        self.store.set(key.as_str(), value);
    }

    /// Rejected writes, oldest first.
    pub fn rejections(&self) -> Vec<Rejection> {
        self.rejections.lock().clone()
    }

    /// Stop tracking store notifications. Reads keep working.
    pub fn dispose(&self) {
        self.subscription.unsubscribe();
    }

    fn admit(&self, key: FilterKey, value: &FilterValue) -> bool {
        if value.kind() != key.kind() {
            self.reject(
                key,
                value.clone(),
                RejectionReason::KindMismatch {
                    expected: key.kind(),
                },
            );
            return false;
        }

        if let Some(validator) = self.config.validator_for(key) {
            if !validator.check(value) {
                self.reject(
                    key,
                    value.clone(),
                    RejectionReason::Validator {
                        description: validator.description().to_string(),
                    },
                );
                return false;
            }
        }

        true
    }

    fn reject(&self, key: FilterKey, value: FilterValue, reason: RejectionReason) {
        tracing::warn!(
            key = %key,
            value = %value,
            reason = %reason,
            "Rejected filter write"
        );
        self.rejections.lock().push(Rejection {
            timestamp: SystemTime::now(),
            key,
            value,
            reason,
        });
    }
}

impl Drop for FilterHook {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

impl std::fmt::Debug for FilterHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterHook")
            .field("revision", &self.revision())
            .field("active_keys", &self.active_keys())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(config: FilterConfig) -> FilterHook {
        let store = LocationStore::new();
        store.enable_url_writing();
        FilterHook::new(store, config)
    }

    #[test]
    fn test_get_decodes_kind() {
        let store = LocationStore::from_query("yearMin=1990&country=Niger&topN=lots");
        let hook = FilterHook::new(store, FilterConfig::new());
        assert_eq!(hook.get(FilterKey::YearMin), Some(FilterValue::Number(1990)));
        assert_eq!(hook.get(FilterKey::Country), Some("Niger".into()));
        assert_eq!(hook.get(FilterKey::TopN), None);
        assert!(hook.has(FilterKey::TopN));
    }

    #[test]
    fn test_malformed_value_falls_back_to_default() {
        let store = LocationStore::from_query("topN=lots");
        let hook = FilterHook::new(store, FilterConfig::new().with_default(FilterKey::TopN, 5));
        assert_eq!(hook.get_number(FilterKey::TopN), Some(5));
    }

    #[test]
    fn test_kind_mismatch_rejected() {
        let hook = hook(FilterConfig::new());
        hook.set(FilterKey::TopN, "ten");
        assert!(!hook.has(FilterKey::TopN));
        let log = hook.rejections();
        assert_eq!(log.len(), 1);
        assert_eq!(
            log[0].reason,
            RejectionReason::KindMismatch {
                expected: ValueKind::Number
            }
        );
    }

    #[test]
    fn test_set_commits_partner_clear_in_one_notification() {
        let hook = hook(FilterConfig::new().with_exclusive(FilterKey::Country, FilterKey::Entity));
        hook.set(FilterKey::Country, "Niger");
        let before = hook.revision();
        hook.set(FilterKey::Entity, "Some Person");
        assert_eq!(hook.revision(), before + 1);
        assert!(!hook.has(FilterKey::Country));
    }

    #[test]
    fn test_batch_later_exclusive_entry_wins() {
        let hook = hook(FilterConfig::new().with_exclusive(FilterKey::Country, FilterKey::Entity));
        hook.set_many([
            (FilterKey::Country, Some("Niger".into())),
            (FilterKey::Entity, Some("Someone".into())),
        ]);
        assert!(!hook.has(FilterKey::Country));
        assert_eq!(hook.get_text(FilterKey::Entity), Some("Someone".to_string()));
        assert!(matches!(
            hook.rejections()[0].reason,
            RejectionReason::ExclusiveConflict {
                winner: FilterKey::Entity
            }
        ));
    }

    #[test]
    fn test_duplicate_batch_key_keeps_last() {
        let hook = hook(FilterConfig::new());
        hook.set_many([
            (FilterKey::Search, Some("first".into())),
            (FilterKey::Search, Some("second".into())),
        ]);
        assert_eq!(hook.get_text(FilterKey::Search), Some("second".to_string()));
    }

    #[test]
    fn test_dispose_stops_revision() {
        let hook = hook(FilterConfig::new());
        hook.set(FilterKey::Year, 2001);
        assert_eq!(hook.revision(), 1);
        hook.dispose();
        hook.set(FilterKey::Year, 2002);
        assert_eq!(hook.revision(), 1);
        assert_eq!(hook.get_number(FilterKey::Year), Some(2002));
        assert_eq!(hook.store().subscriber_count(), 0);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let store = LocationStore::new();
        {
            let _hook = FilterHook::new(store.clone(), FilterConfig::new());
            assert_eq!(store.subscriber_count(), 1);
        }
        assert_eq!(store.subscriber_count(), 0);
    }
}
