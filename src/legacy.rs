//! Named accessors for call sites written against the older per-field API.
//!
//! Everything delegates to a [`FilterHook`] with [`LegacyFilters::default_config`].
//! The only behavior of its own: an empty string passed to a text setter
//! clears the key, as the old setters did.

use crate::filters::{FilterConfig, FilterHook, FilterKey, FilterValue, Validator, YearRange};
use crate::location::LocationStore;

/// Default `topN` of the older views.
pub const DEFAULT_TOP_N: i64 = 10;

/// Value/setter pair for a single key.
#[derive(Debug, Clone, Copy)]
pub struct FilterParam<'a> {
    hook: &'a FilterHook,
    key: FilterKey,
}

impl FilterParam<'_> {
    pub fn key(&self) -> FilterKey {
        self.key
    }

    pub fn value(&self) -> Option<FilterValue> {
        self.hook.get(self.key)
    }

    pub fn is_set(&self) -> bool {
        self.hook.has(self.key)
    }

    /// `None` clears.
    pub fn set(&self, value: Option<FilterValue>) {
        self.hook.assign(self.key, value);
    }
}

#[derive(Debug)]
pub struct LegacyFilters {
    hook: FilterHook,
}

impl LegacyFilters {
    pub fn new(store: LocationStore) -> Self {
        Self {
            hook: FilterHook::new(store, Self::default_config()),
        }
    }

    /// `topN` defaults to [`DEFAULT_TOP_N`] and must stay within 1..=50,
    /// `view` never counts as an active filter, and `country`/`entity` are
    /// mutually exclusive.
    pub fn default_config() -> FilterConfig {
        FilterConfig::new()
            .with_default(FilterKey::TopN, DEFAULT_TOP_N)
            .with_validator(FilterKey::TopN, Validator::range(1, 50))
            .with_exclusive(FilterKey::Country, FilterKey::Entity)
            .exclude_from_active(FilterKey::View)
    }

    pub fn hook(&self) -> &FilterHook {
        &self.hook
    }

    pub fn param(&self, key: FilterKey) -> FilterParam<'_> {
        FilterParam {
            hook: &self.hook,
            key,
        }
    }

    pub fn country(&self) -> Option<String> {
        self.hook.get_text(FilterKey::Country)
    }

    pub fn set_country(&self, country: &str) {
        self.set_text(FilterKey::Country, country);
    }

    pub fn entity(&self) -> Option<String> {
        self.hook.get_text(FilterKey::Entity)
    }

    pub fn set_entity(&self, entity: &str) {
        self.set_text(FilterKey::Entity, entity);
    }

    pub fn search(&self) -> Option<String> {
        self.hook.get_text(FilterKey::Search)
    }

    pub fn set_search(&self, search: &str) {
        self.set_text(FilterKey::Search, search);
    }

    pub fn view(&self) -> Option<String> {
        self.hook.get_text(FilterKey::View)
    }

    pub fn set_view(&self, view: &str) {
        self.set_text(FilterKey::View, view);
    }

    pub fn top_n(&self) -> i64 {
        self.hook
            .get_number(FilterKey::TopN)
            .unwrap_or(DEFAULT_TOP_N)
    }

    pub fn set_top_n(&self, top_n: i64) {
        self.hook.set(FilterKey::TopN, top_n);
    }

    pub fn year_min(&self) -> Option<i64> {
        self.hook.get_number(FilterKey::YearMin)
    }

    pub fn year_max(&self) -> Option<i64> {
        self.hook.get_number(FilterKey::YearMax)
    }

    pub fn year_range(&self) -> YearRange {
        self.hook.year_range()
    }

    pub fn set_year_range(&self, min: Option<i64>, max: Option<i64>) {
        self.hook.set_year_range(min, max);
    }

    pub fn has_active_filters(&self) -> bool {
        self.hook.has_active_filters()
    }

    /// Clear every filter; `lang` and `theme` survive.
    pub fn reset(&self) {
        self.hook.clear_all();
    }

    fn set_text(&self, key: FilterKey, value: &str) {
        if value.is_empty() {
            self.hook.clear(key);
        } else {
            self.hook.set(key, value);
        }
    }
}
