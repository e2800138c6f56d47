//! # lrucache
//!
//! Fixed-capacity LRU cache with O(1) `get` and `put`.
//!
//! ## Architecture
//! - **HashMap**: AHash-keyed table from key to list handle (O(1))
//! - **RecencyList**: arena-backed doubly linked list bounded by head/tail
//!   sentinels, most recently used first (O(1) promote and evict)
//! - **SharedLruCache**: the same cache behind one `parking_lot::Mutex`
//!
//! ## Example
//! ```
//! use lrucache::LruCache;
//!
//! let mut cache = LruCache::new(2)?;
//! cache.put(1, 1);
//! cache.put(2, 2);
//! assert_eq!(cache.get(&1), Some(&1));
//! assert_eq!(cache.put(3, 3), Some((2, 2)));
//! assert_eq!(cache.get(&2), None);
//! # Ok::<(), lrucache::Error>(())
//! ```

#![warn(missing_docs)]

mod cache;
mod error;
mod list;
mod shared;

pub use cache::LruCache;
pub use error::{Error, Result};
pub use list::{EntryId, Iter, RecencyList};
pub use shared::SharedLruCache;
