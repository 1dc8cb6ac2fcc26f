//! View cache with alias registration and explicit bulk release.
//!
//! This module keeps opened views alive for reuse across the application,
//! so a view is not reopened every time some code path needs it.
//!
//! # Keys
//!
//! The [`ViewKey`] type ensures that cache keys CANNOT be constructed
//! without the container's replica id, so two replicas holding views with
//! the same name never share a slot.
//!
//! # Aliases
//!
//! Views are addressable by name or alias. Every handle is filed under the
//! requested name and under its canonical name, so both spellings return
//! the same shared handle.
//!
//! # Example
//!
//! ```ignore
//! let cache = ViewCache::new(ViewCacheConfig::default());
//!
//! // Soft miss when the database is closed
//! assert!(cache.get(&closed_db, "Main")?.is_none());
//!
//! // Opened once, shared afterwards
//! let by_alias = cache.get(&db, "Alias")?.expect("db is open");
//! let by_name = cache.get(&db, "Main")?.expect("db is open");
//! assert!(Arc::ptr_eq(&by_alias, &by_name));
//!
//! // At shutdown
//! cache.release_all()?;
//! ```

pub mod view_cache;
pub mod view_key;

pub use view_cache::{ReleaseSummary, ViewCache, ViewCacheStats};
pub use view_key::ViewKey;
