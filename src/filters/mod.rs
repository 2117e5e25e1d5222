//! Typed projection over the location store for the filter vocabulary.

mod config;
mod hook;
mod key;
mod value;
mod year_range;

pub use config::{ConfigError, ExclusivePair, FilterConfig, Validator};
pub use hook::{FilterHook, FilterValues, Rejection, RejectionReason};
pub use key::{FilterKey, SystemKey, ValueKind};
pub use value::FilterValue;
pub use year_range::YearRange;
