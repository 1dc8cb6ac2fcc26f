//! Shared cache of opened views.
//!
//! Opening a view is expensive, and reopening one can make the store
//! re-materialize its index. The cache hands out one shared handle per view
//! and keeps it until [`ViewCache::release_all`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use notekit_core::{CacheError, NotesError, NotesResult, ReleaseFailure, ViewCacheConfig};
use once_cell::sync::Lazy;

use super::view_key::ViewKey;
use crate::{Container, Resource};

/// Process-wide cache, built on first access.
static GLOBAL: Lazy<ViewCache> = Lazy::new(ViewCache::default);

type ViewMap = HashMap<ViewKey, Arc<dyn Resource>>;

/// Everything the cache mutex guards.
#[derive(Default)]
struct CacheState {
    views: ViewMap,
    /// Duplicate handles whose release failed during reconciliation. They are
    /// retried by the next `release_all`.
    pending_release: Vec<Arc<dyn Resource>>,
}

/// Statistics about view cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewCacheStats {
    /// Requests served from the cache.
    pub hits: u64,
    /// Requests that had to ask the container.
    pub misses: u64,
    /// Successful opens.
    pub opens: u64,
    /// Canonical-name keys added next to a requested key.
    pub aliases_registered: u64,
    /// Keys currently filed.
    pub entry_count: u64,
}

impl ViewCacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Outcome of a successful bulk release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// Keys removed from the cache.
    pub keys_dropped: usize,
    /// Distinct handles released.
    pub released: usize,
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    opens: AtomicU64,
    aliases: AtomicU64,
}

/// Cache of opened views keyed by (container identity, view name).
///
/// Every handle is filed under the name it was requested by and under its
/// canonical name, so a view requested by alias and later by canonical name
/// (or the other way round) is opened once and shared.
///
/// # Locking
///
/// One mutex guards the map. `get` holds it across lookup, open and insert,
/// and `release_all` holds it across drain and release, so a handle is never
/// released while it is being filed and never returned after it was released.
/// Opens of different views therefore serialize; the store's own open is a
/// bounded synchronous call.
///
/// # Example
///
/// ```ignore
/// let cache = ViewCache::global();
/// if let Some(view) = cache.get(&database, "($All)")? {
///     // use view, never call view.release() directly
/// }
/// cache.release_all()?;
/// ```
pub struct ViewCache {
    state: Mutex<CacheState>,
    config: ViewCacheConfig,
    counters: Counters,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::new(ViewCacheConfig::default())
    }
}

impl fmt::Debug for ViewCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewCache")
            .field("entries", &self.len())
            .field("config", &self.config)
            .finish()
    }
}

impl ViewCache {
    /// Create a new, empty view cache.
    pub fn new(config: ViewCacheConfig) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            config,
            counters: Counters::default(),
        }
    }

    /// The process-wide cache. Exactly one instance is ever built, even when
    /// many threads race for the first access.
    pub fn global() -> &'static ViewCache {
        &GLOBAL
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &ViewCacheConfig {
        &self.config
    }

    /// Acquire the state, recovering from a poisoned lock. Every critical
    /// section leaves the state consistent between statements.
    fn lock(&self) -> MutexGuard<'_, CacheState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("View cache lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Number of keys filed (a view may be filed under two keys).
    pub fn len(&self) -> usize {
        self.lock().views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().views.is_empty()
    }

    /// Number of duplicate handles waiting for a retried release.
    pub fn pending_release(&self) -> usize {
        self.lock().pending_release.len()
    }

    /// Whether a handle is filed under exactly this container id and name.
    pub fn contains(&self, container_id: &str, view_name: &str) -> bool {
        self.lock()
            .views
            .contains_key(&ViewKey::new(container_id, view_name))
    }

    /// Get cache statistics.
    pub fn stats(&self) -> ViewCacheStats {
        ViewCacheStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            opens: self.counters.opens.load(Ordering::Relaxed),
            aliases_registered: self.counters.aliases.load(Ordering::Relaxed),
            entry_count: self.len() as u64,
        }
    }

    /// Get a view by name or alias, opening and caching it on first request.
    ///
    /// # Returns
    ///
    /// - `Ok(None)` if the container is not open; the container is not asked
    ///   to open anything.
    /// - `Ok(Some(view))` with the shared handle otherwise.
    /// - `Err(CacheError::OpenFailed)` if the container could not open the
    ///   view. Nothing is cached in that case.
    ///
    /// The returned handle is owned by the cache. Do not release it.
    pub fn get<C>(&self, container: &C, view_name: &str) -> NotesResult<Option<Arc<dyn Resource>>>
    where
        C: Container + ?Sized,
    {
        if !container.is_open() {
            tracing::debug!(view = view_name, "Container not open, skipping view lookup");
            return Ok(None);
        }

        let key = ViewKey::new(container.identity(), view_name);
        let mut state = self.lock();

        if let Some(view) = state.views.get(&key).cloned() {
            self.counters.hits.fetch_add(1, Ordering::Relaxed);
            self.register_canonical(&mut state.views, &key, &view);
            return Ok(Some(view));
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        let opened = container
            .open_resource(view_name)
            .map_err(|e| open_failed(&key, e))?;
        self.counters.opens.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            container = key.container_id(),
            view = view_name,
            canonical = %opened.canonical_name(),
            "Opened view"
        );

        let view = self.reconcile(&mut state, &key, opened);
        state.views.insert(key.clone(), Arc::clone(&view));
        self.register_canonical(&mut state.views, &key, &view);
        Ok(Some(view))
    }

    /// If `opened` turns out to be a view already cached under its canonical
    /// name, release the fresh handle and share the cached one. A duplicate
    /// that fails to release stays owned by the cache until `release_all`.
    fn reconcile(
        &self,
        state: &mut CacheState,
        key: &ViewKey,
        opened: Arc<dyn Resource>,
    ) -> Arc<dyn Resource> {
        if !self.config.reconcile_duplicate_opens {
            return opened;
        }
        let canonical = key.sibling(opened.canonical_name());
        if canonical == *key {
            return opened;
        }
        let existing = match state.views.get(&canonical) {
            Some(existing) if !Arc::ptr_eq(existing, &opened) => Arc::clone(existing),
            _ => return opened,
        };
        if let Err(e) = opened.release() {
            tracing::warn!(
                container = key.container_id(),
                view = canonical.view_name(),
                error = %e,
                "Failed to release duplicate view handle, deferring to release_all"
            );
            state.pending_release.push(opened);
        }
        existing
    }

    /// Make sure `view` is also filed under its canonical name.
    fn register_canonical(&self, views: &mut ViewMap, key: &ViewKey, view: &Arc<dyn Resource>) {
        if !self.config.register_canonical_alias {
            return;
        }
        let canonical = key.sibling(view.canonical_name());
        if views.contains_key(&canonical) {
            return;
        }
        tracing::debug!(
            container = key.container_id(),
            alias = key.view_name(),
            canonical = canonical.view_name(),
            "Registered canonical view name"
        );
        views.insert(canonical, Arc::clone(view));
        self.counters.aliases.fetch_add(1, Ordering::Relaxed);
    }

    /// Release every cached view and empty the cache.
    ///
    /// Each distinct handle is released once, even when it is filed under two
    /// keys. Duplicates whose earlier release failed are retried here. A
    /// failing release does not stop the others; all failures are reported
    /// together in [`CacheError::ReleaseFailed`], and the cache is empty
    /// either way. Calling this on an empty cache is a no-op.
    pub fn release_all(&self) -> NotesResult<ReleaseSummary> {
        let mut state = self.lock();
        let keys_dropped = state.views.len();

        let mut seen = HashSet::new();
        let mut distinct = Vec::new();
        let pending = std::mem::take(&mut state.pending_release);
        for view in state.views.drain().map(|(_, view)| view).chain(pending) {
            if seen.insert(Arc::as_ptr(&view) as *const ()) {
                distinct.push(view);
            }
        }

        let mut released = 0;
        let mut failures = Vec::new();
        for view in &distinct {
            match view.release() {
                Ok(()) => released += 1,
                Err(e) => {
                    let resource = view.canonical_name();
                    tracing::warn!(view = %resource, error = %e, "Failed to release view");
                    failures.push(ReleaseFailure {
                        resource,
                        reason: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            keys_dropped,
            released,
            failed = failures.len(),
            "Released cached views"
        );

        if failures.is_empty() {
            Ok(ReleaseSummary {
                keys_dropped,
                released,
            })
        } else {
            Err(CacheError::ReleaseFailed { failures }.into())
        }
    }
}

fn open_failed(key: &ViewKey, err: NotesError) -> NotesError {
    match err {
        NotesError::Cache(CacheError::OpenFailed { .. }) => err,
        other => CacheError::OpenFailed {
            container: key.container_id().to_string(),
            resource: key.view_name().to_string(),
            reason: other.to_string(),
        }
        .into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MockContainer, MockResource};
    use std::sync::Barrier;
    use std::thread;
    use std::time::Duration;

    fn same(a: &Arc<dyn Resource>, b: &Arc<dyn Resource>) -> bool {
        Arc::ptr_eq(a, b)
    }

    #[test]
    fn test_get_opens_once_and_shares_handle() {
        let cache = ViewCache::default();
        let db = MockContainer::new().with_view("Main", &[]);

        let first = cache.get(&db, "Main").unwrap().unwrap();
        let second = cache.get(&db, "Main").unwrap().unwrap();

        assert!(same(&first, &second));
        assert_eq!(db.open_calls(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_alias_then_canonical_shares_handle() {
        let cache = ViewCache::default();
        let db = MockContainer::new().with_view("Main", &["Alias"]);

        let by_alias = cache.get(&db, "Alias").unwrap().unwrap();
        assert!(cache.contains(&db.identity(), "Alias"));
        assert!(cache.contains(&db.identity(), "Main"));

        let by_name = cache.get(&db, "Main").unwrap().unwrap();
        assert!(same(&by_alias, &by_name));
        assert_eq!(db.open_calls(), 1);
        assert_eq!(cache.stats().aliases_registered, 1);
    }

    #[test]
    fn test_canonical_then_alias_reconciles_duplicate() {
        let cache = ViewCache::default();
        let db = MockContainer::new().with_view("Main", &["Alias"]);

        let by_name = cache.get(&db, "Main").unwrap().unwrap();
        let by_alias = cache.get(&db, "Alias").unwrap().unwrap();

        assert!(same(&by_name, &by_alias));
        // The alias had to be opened to learn its canonical name.
        assert_eq!(db.open_calls(), 2);
        let opened = db.opened();
        assert!(!opened[0].is_released());
        assert_eq!(opened[1].release_count(), 1);

        // Both names are now hits.
        cache.get(&db, "Alias").unwrap().unwrap();
        cache.get(&db, "Main").unwrap().unwrap();
        assert_eq!(db.open_calls(), 2);
    }

    #[test]
    fn test_reconcile_disabled_keeps_both_handles() {
        let cache = ViewCache::new(ViewCacheConfig::new().with_reconcile(false));
        let db = MockContainer::new().with_view("Main", &["Alias"]);

        let by_name = cache.get(&db, "Main").unwrap().unwrap();
        let by_alias = cache.get(&db, "Alias").unwrap().unwrap();

        assert!(!same(&by_name, &by_alias));
        // Canonical slot keeps the first handle.
        let again = cache.get(&db, "Main").unwrap().unwrap();
        assert!(same(&by_name, &again));
    }

    #[test]
    fn test_canonical_alias_disabled() {
        let cache = ViewCache::new(ViewCacheConfig::new().with_canonical_alias(false));
        let db = MockContainer::new().with_view("Main", &["Alias"]);

        cache.get(&db, "Alias").unwrap().unwrap();
        assert!(!cache.contains(&db.identity(), "Main"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_case_variant_request_joins_canonical() {
        let cache = ViewCache::default();
        let db = MockContainer::new().with_view("ByDate", &[]);

        let exact = cache.get(&db, "ByDate").unwrap().unwrap();
        let lower = cache.get(&db, "bydate").unwrap().unwrap();

        assert!(same(&exact, &lower));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_not_open_container_returns_none_without_open() {
        let cache = ViewCache::default();
        let db = MockContainer::new().with_view("Main", &[]);
        db.set_open(false);

        assert!(cache.get(&db, "Main").unwrap().is_none());
        assert_eq!(db.open_calls(), 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_open_failure_propagates_and_caches_nothing() {
        let cache = ViewCache::default();
        let db = MockContainer::with_replica_id("85257A1B0049C9FE");

        let err = cache.get(&db, "Missing").unwrap_err();
        match err {
            NotesError::Cache(CacheError::OpenFailed {
                container,
                resource,
                reason,
            }) => {
                assert_eq!(container, "85257A1B0049C9FE");
                assert_eq!(resource, "Missing");
                assert!(reason.contains("not found"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(cache.is_empty());

        // No negative caching.
        let _ = cache.get(&db, "Missing");
        assert_eq!(db.open_calls(), 2);
    }

    #[test]
    fn test_release_all_then_reopen() {
        let cache = ViewCache::default();
        let db = MockContainer::new().with_view("Main", &["Alias"]);

        let before = cache.get(&db, "Alias").unwrap().unwrap();
        let summary = cache.release_all().unwrap();
        assert_eq!(
            summary,
            ReleaseSummary {
                keys_dropped: 2,
                released: 1
            }
        );
        assert!(cache.is_empty());
        assert_eq!(db.opened()[0].release_count(), 1);

        let after = cache.get(&db, "Alias").unwrap().unwrap();
        assert!(!same(&before, &after));
        assert_eq!(db.open_calls(), 2);
    }

    #[test]
    fn test_release_all_on_empty_cache() {
        let cache = ViewCache::default();
        assert_eq!(cache.release_all().unwrap(), ReleaseSummary::default());
        assert_eq!(cache.release_all().unwrap(), ReleaseSummary::default());
    }

    #[test]
    fn test_release_all_best_effort() {
        let cache = ViewCache::default();
        let db = MockContainer::new()
            .with_view("A", &[])
            .with_view("B", &[])
            .with_view("C", &[]);

        for name in ["A", "B", "C"] {
            cache.get(&db, name).unwrap().unwrap();
        }
        let opened = db.opened();
        opened[1].fail_releases(true);

        let err = cache.release_all().unwrap_err();
        match err {
            NotesError::Cache(CacheError::ReleaseFailed { failures }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].resource, "B");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(opened[0].release_count(), 1);
        assert_eq!(opened[2].release_count(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_failed_duplicate_release_is_retried() {
        let cache = ViewCache::default();
        let db = MockContainer::new().with_view("Main", &["Alias"]);

        let by_name = cache.get(&db, "Main").unwrap().unwrap();
        db.fail_releases(true);
        let by_alias = cache.get(&db, "Alias").unwrap().unwrap();
        assert!(same(&by_name, &by_alias));
        assert_eq!(cache.pending_release(), 1);

        let duplicate = Arc::clone(&db.opened()[1]);
        assert!(!duplicate.is_released());
        duplicate.fail_releases(false);

        let summary = cache.release_all().unwrap();
        assert_eq!(
            summary,
            ReleaseSummary {
                keys_dropped: 2,
                released: 2
            }
        );
        assert_eq!(duplicate.release_count(), 1);
        assert_eq!(db.opened()[0].release_count(), 1);
        assert_eq!(cache.pending_release(), 0);
    }

    #[test]
    fn test_failed_duplicate_release_is_reported() {
        let cache = ViewCache::default();
        let db = MockContainer::new().with_view("Main", &["Alias"]);

        cache.get(&db, "Main").unwrap().unwrap();
        db.fail_releases(true);
        cache.get(&db, "Alias").unwrap().unwrap();

        let err = cache.release_all().unwrap_err();
        match err {
            NotesError::Cache(CacheError::ReleaseFailed { failures }) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].resource, "Main");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(db.opened()[0].release_count(), 1);
        assert!(cache.is_empty());
        assert_eq!(cache.pending_release(), 0);
    }

    #[test]
    fn test_containers_are_isolated() {
        let cache = ViewCache::default();
        let db1 = MockContainer::with_replica_id("AAAA").with_view("Main", &[]);
        let db2 = MockContainer::with_replica_id("BBBB").with_view("Main", &[]);

        let v1 = cache.get(&db1, "Main").unwrap().unwrap();
        let v2 = cache.get(&db2, "Main").unwrap().unwrap();

        assert!(!same(&v1, &v2));
        assert_eq!(db1.open_calls(), 1);
        assert_eq!(db2.open_calls(), 1);
    }

    #[test]
    fn test_stats_track_hits_and_misses() {
        let cache = ViewCache::default();
        let db = MockContainer::new().with_view("Main", &[]);

        cache.get(&db, "Main").unwrap();
        cache.get(&db, "Main").unwrap();
        cache.get(&db, "Main").unwrap();

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.opens, 1);
        assert_eq!(stats.entry_count, 1);
        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < 0.001);
        assert!((ViewCacheStats::default().hit_rate() - 0.0).abs() < 0.001);
    }

    #[test]
    fn test_concurrent_get_opens_once() {
        const THREADS: usize = 16;
        let cache = Arc::new(ViewCache::default());
        let db = Arc::new(
            MockContainer::new()
                .with_view("Main", &[])
                .with_open_delay(Duration::from_millis(20)),
        );
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let db = Arc::clone(&db);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    cache.get(db.as_ref(), "Main").unwrap().unwrap()
                })
            })
            .collect();

        let views: Vec<Arc<dyn Resource>> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(db.open_calls(), 1);
        assert!(views.iter().all(|v| same(v, &views[0])));
    }

    #[test]
    fn test_concurrent_get_and_release_never_leaks() {
        let cache = Arc::new(ViewCache::default());
        let db = Arc::new(MockContainer::new().with_view("Main", &["Alias"]));

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let cache = Arc::clone(&cache);
                let db = Arc::clone(&db);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let name = if i % 2 == 0 { "Main" } else { "Alias" };
                        cache.get(db.as_ref(), name).unwrap().unwrap();
                    }
                })
            })
            .collect();
        let releaser = {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..20 {
                    cache.release_all().unwrap();
                }
            })
        };

        for w in workers {
            w.join().unwrap();
        }
        releaser.join().unwrap();
        cache.release_all().unwrap();

        // Every handle ever opened was released exactly once.
        let opened = db.opened();
        assert!(!opened.is_empty());
        assert!(opened.iter().all(|v| v.release_count() == 1));
    }

    #[test]
    fn test_global_is_single_instance() {
        let handles: Vec<_> = (0..8)
            .map(|_| thread::spawn(|| ViewCache::global() as *const ViewCache as usize))
            .collect();
        let addrs: Vec<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(addrs.iter().all(|a| *a == addrs[0]));
    }

    #[test]
    fn test_foreign_resource_handles() {
        struct Fixed(Arc<MockResource>);
        impl Container for Fixed {
            fn is_open(&self) -> bool {
                true
            }
            fn identity(&self) -> String {
                "FIXED".to_string()
            }
            fn open_resource(&self, _name: &str) -> NotesResult<Arc<dyn Resource>> {
                Ok(self.0.clone())
            }
        }

        let cache = ViewCache::default();
        let view = Arc::new(MockResource::new("Main"));
        let container = Fixed(Arc::clone(&view));

        cache.get(&container, "Alias").unwrap().unwrap();
        cache.release_all().unwrap();
        assert_eq!(view.release_count(), 1);
    }
}
