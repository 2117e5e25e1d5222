//! Leaf layer: the query-string key/value store and its location.

mod query;
mod source;
mod store;
mod subscription;

pub use query::QueryMap;
pub use source::{Location, MemoryLocation};
pub use store::{LocationStore, MAX_DISPATCH_DEPTH};
pub use subscription::Subscription;
