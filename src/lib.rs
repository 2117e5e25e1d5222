//! Filter state that stays in sync with a shareable query string.
//!
//! ```text
//! consumer ──→ FilterHook ──→ LocationStore ──→ Location (query string)
//!    ↑                             │
//!    └──── revision / notify ──────┘
//! ```
//!
//! - [`location::LocationStore`]: string key/value source of truth, observable,
//!   with outward writes gated until the initial location has been read.
//! - [`filters::FilterHook`]: typed, validated, exclusivity-aware view over a
//!   store for a fixed filter vocabulary.
//! - [`legacy::LegacyFilters`]: named accessors for older call sites.

pub mod filters;
pub mod legacy;
pub mod location;
pub mod logging;

pub use filters::{
    ConfigError, ExclusivePair, FilterConfig, FilterHook, FilterKey, FilterValue, FilterValues,
    Rejection, RejectionReason, SystemKey, Validator, ValueKind, YearRange,
};
pub use legacy::{FilterParam, LegacyFilters};
pub use location::{Location, LocationStore, MemoryLocation, QueryMap, Subscription};
