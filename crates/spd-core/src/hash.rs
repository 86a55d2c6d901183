//! Fast hash map and hash set type aliases.
//!
//! This module provides type aliases for [`FxHashMap`] and [`FxHashSet`] from the
//! `rustc-hash` crate. Every map in this workspace is keyed by short strings
//! (normalized paths, token names, extensions) or UUIDs, and none of them are
//! exposed to untrusted input, so the Fx hash is a good fit.
//!
//! # Examples
//!
//! ```
//! use spd_core::{FxHashMap, FxHashSet};
//!
//! let mut map: FxHashMap<String, i32> = FxHashMap::default();
//! map.insert("key".to_owned(), 42);
//!
//! let set: FxHashSet<&str> = FxHashSet::default();
//! assert!(set.is_empty());
//! ```

/// A [`HashMap`](std::collections::HashMap) using the Fx hash algorithm.
pub type FxHashMap<K, V> = rustc_hash::FxHashMap<K, V>;

/// A [`HashSet`](std::collections::HashSet) using the Fx hash algorithm.
pub type FxHashSet<V> = rustc_hash::FxHashSet<V>;
