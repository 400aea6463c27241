//! Versioned named caches backing the offline router

pub mod names;
pub mod storage;

pub use names::CacheNames;
pub use storage::{CacheStorage, NamedCache};
