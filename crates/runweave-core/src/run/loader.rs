//! Hierarchical location loading with bounded caching.
//!
//! Resolving a deep routine call (nested subroutine references) is a
//! recursive, store-hitting operation that would otherwise repeat on every
//! step of every run. [`RunContextLoader`] fronts the injected
//! [`LocationStore`] with two independent [`BoundedCache`]s -- one per
//! object family -- and notifies a host-supplied listener after every cache
//! mutation so the contents can be persisted for warm starts.

use std::future::Future;

use tokio::sync::Mutex;
use uuid::Uuid;

use runweave_types::config::CacheSettings;
use runweave_types::error::LoaderError;
use runweave_types::location::{Location, LocationData, LocationKind, VersionObject};

use super::cache::{BoundedCache, ByteSized};

impl ByteSized for VersionObject {
    /// Exact serialized size: what the object costs to persist or re-fetch.
    fn byte_size(&self) -> usize {
        serde_json::to_string(self).map(|s| s.len()).unwrap_or(0)
    }
}

/// Storage port for hierarchical version lookups.
///
/// The single point of actual I/O against the backing store; never called
/// when the cache already holds the answer. "Nothing at this location" is
/// `Ok(None)`; connectivity faults are `Err`.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait LocationStore: Send + Sync {
    fn fetch_location(
        &self,
        location: &Location,
    ) -> impl Future<Output = Result<Option<LocationData>, LoaderError>> + Send;
}

/// Host hook invoked after every cache mutation with the new contents.
///
/// Advisory: intended for best-effort persistence, not correctness.
pub type CacheChangeListener = Box<dyn Fn(LoaderSnapshot) + Send + Sync>;

/// Cloned contents of both caches, in recency order (least-recently-used
/// first), keyed implicitly by each object's own id.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LoaderSnapshot {
    pub routines: Vec<VersionObject>,
    pub projects: Vec<VersionObject>,
}

/// Resolves locations to version objects through two family caches.
///
/// Shared across all runs in a process; concurrent `load_location` calls
/// for different locations proceed in parallel apart from the brief cache
/// lock. Duplicate concurrent fetches for the same location are possible
/// and harmless -- cache writes are upserts.
pub struct RunContextLoader<S: LocationStore> {
    store: S,
    routines: Mutex<BoundedCache<Uuid, VersionObject>>,
    projects: Mutex<BoundedCache<Uuid, VersionObject>>,
    on_change: Option<CacheChangeListener>,
}

impl<S: LocationStore> RunContextLoader<S> {
    pub fn new(store: S, settings: CacheSettings) -> Self {
        Self {
            store,
            routines: Mutex::new(BoundedCache::new(
                settings.routines.max_entries,
                settings.routines.max_bytes,
            )),
            projects: Mutex::new(BoundedCache::new(
                settings.projects.max_entries,
                settings.projects.max_bytes,
            )),
            on_change: None,
        }
    }

    /// Attach the persistence hook fired after every cache mutation.
    pub fn with_change_listener(
        mut self,
        listener: impl Fn(LoaderSnapshot) + Send + Sync + 'static,
    ) -> Self {
        self.on_change = Some(Box::new(listener));
        self
    }

    /// Resolve one location.
    ///
    /// Cache hit (object and, when named, subroutine both resident)
    /// returns without touching the store. On a miss the fetched object
    /// and subroutine are cached under their own ids and the change
    /// listener fires. `Ok(None)` when nothing exists at the location.
    pub async fn load_location(
        &self,
        location: &Location,
    ) -> Result<Option<LocationData>, LoaderError> {
        let cache = self.cache_for(location.kind);

        {
            let mut cache = cache.lock().await;
            if let Some(object) = cache.get(&location.object_id).cloned() {
                match location.subroutine_id {
                    None => {
                        tracing::trace!(object_id = %location.object_id, "loader cache hit");
                        return Ok(Some(LocationData {
                            object,
                            subroutine: None,
                        }));
                    }
                    Some(subroutine_id) => {
                        if let Some(subroutine) = cache.get(&subroutine_id).cloned() {
                            tracing::trace!(
                                object_id = %location.object_id,
                                subroutine_id = %subroutine_id,
                                "loader cache hit"
                            );
                            return Ok(Some(LocationData {
                                object,
                                subroutine: Some(subroutine),
                            }));
                        }
                        // Object resident but subroutine not: treat as a miss.
                    }
                }
            }
        }

        let Some(data) = self.store.fetch_location(location).await? else {
            tracing::debug!(
                object_id = %location.object_id,
                kind = ?location.kind,
                "nothing at location"
            );
            return Ok(None);
        };

        {
            let mut cache = cache.lock().await;
            cache.insert(data.object.id, data.object.clone());
            if let Some(subroutine) = &data.subroutine {
                cache.insert(subroutine.id, subroutine.clone());
            }
        }
        self.notify_change().await;

        Ok(Some(data))
    }

    /// Resolve a descent stack sequentially, in array order.
    ///
    /// Non-short-circuiting over misses: a location that resolves to
    /// nothing does not stop resolution of later locations (the walk still
    /// warms the cache for sibling branches), but the overall result is
    /// `Ok(None)` when the stack is empty or any step missed. Store faults
    /// do short-circuit as `Err`.
    pub async fn load_location_stack(
        &self,
        stack: &[Location],
    ) -> Result<Option<LocationData>, LoaderError> {
        if stack.is_empty() {
            return Ok(None);
        }

        let mut last = None;
        let mut any_missing = false;
        for location in stack {
            match self.load_location(location).await? {
                Some(data) => last = Some(data),
                None => {
                    tracing::debug!(
                        object_id = %location.object_id,
                        "location in stack failed to resolve"
                    );
                    any_missing = true;
                }
            }
        }

        if any_missing { Ok(None) } else { Ok(last) }
    }

    /// Cloned contents of both caches, for persistence.
    pub async fn snapshot(&self) -> LoaderSnapshot {
        let routines = {
            let cache = self.routines.lock().await;
            cache.entries().map(|(_, v)| v.clone()).collect()
        };
        let projects = {
            let cache = self.projects.lock().await;
            cache.entries().map(|(_, v)| v.clone()).collect()
        };
        LoaderSnapshot { routines, projects }
    }

    /// Warm-start the caches from a persisted snapshot.
    ///
    /// Entries are inserted through the normal bounded path, so the
    /// configured limits still hold; the change listener does not fire
    /// (restoring is not new information to persist).
    pub async fn restore(&self, snapshot: LoaderSnapshot) {
        let restored = snapshot.routines.len() + snapshot.projects.len();
        {
            let mut cache = self.routines.lock().await;
            for object in snapshot.routines {
                cache.insert(object.id, object);
            }
        }
        {
            let mut cache = self.projects.lock().await;
            for object in snapshot.projects {
                cache.insert(object.id, object);
            }
        }
        tracing::debug!(restored, "loader caches warm-started from snapshot");
    }

    fn cache_for(&self, kind: LocationKind) -> &Mutex<BoundedCache<Uuid, VersionObject>> {
        match kind {
            LocationKind::Routine => &self.routines,
            LocationKind::Project => &self.projects,
        }
    }

    async fn notify_change(&self) {
        let Some(listener) = &self.on_change else {
            return;
        };
        listener(self.snapshot().await);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// In-memory store that counts fetches.
    struct MemoryStore {
        objects: HashMap<Uuid, VersionObject>,
        fetches: AtomicUsize,
    }

    impl MemoryStore {
        fn new(objects: impl IntoIterator<Item = VersionObject>) -> Self {
            Self {
                objects: objects.into_iter().map(|o| (o.id, o)).collect(),
                fetches: AtomicUsize::new(0),
            }
        }

        fn fetch_count(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    impl LocationStore for MemoryStore {
        async fn fetch_location(
            &self,
            location: &Location,
        ) -> Result<Option<LocationData>, LoaderError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let Some(object) = self.objects.get(&location.object_id).cloned() else {
                return Ok(None);
            };
            let subroutine = location
                .subroutine_id
                .and_then(|id| self.objects.get(&id).cloned());
            Ok(Some(LocationData { object, subroutine }))
        }
    }

    /// Store that always faults.
    struct BrokenStore;

    impl LocationStore for BrokenStore {
        async fn fetch_location(
            &self,
            _location: &Location,
        ) -> Result<Option<LocationData>, LoaderError> {
            Err(LoaderError::Store("connection refused".to_string()))
        }
    }

    fn object(kind: LocationKind, name: &str) -> VersionObject {
        VersionObject {
            id: Uuid::now_v7(),
            root_id: Uuid::now_v7(),
            kind,
            name: name.to_string(),
            version_label: "1.0.0".to_string(),
            complexity: 1,
            children: vec![],
            payload: json!({"nodes": []}),
            updated_at: Utc::now(),
        }
    }

    fn loader_with(
        objects: Vec<VersionObject>,
        settings: CacheSettings,
    ) -> RunContextLoader<Arc<MemoryStore>> {
        RunContextLoader::new(Arc::new(MemoryStore::new(objects)), settings)
    }

    impl LocationStore for Arc<MemoryStore> {
        async fn fetch_location(
            &self,
            location: &Location,
        ) -> Result<Option<LocationData>, LoaderError> {
            self.as_ref().fetch_location(location).await
        }
    }

    #[tokio::test]
    async fn second_load_hits_cache_without_fetch() {
        let routine = object(LocationKind::Routine, "pipeline");
        let location = Location::routine(routine.id);
        let store = Arc::new(MemoryStore::new(vec![routine.clone()]));
        let loader = RunContextLoader::new(Arc::clone(&store), CacheSettings::default());

        let first = loader.load_location(&location).await.unwrap().unwrap();
        assert_eq!(first.object, routine);
        assert_eq!(store.fetch_count(), 1);

        let second = loader.load_location(&location).await.unwrap().unwrap();
        assert_eq!(second.object, routine);
        assert_eq!(store.fetch_count(), 1, "cache hit must not re-fetch");
    }

    #[tokio::test]
    async fn missing_location_is_none_not_error() {
        let loader = loader_with(vec![], CacheSettings::default());
        let result = loader
            .load_location(&Location::routine(Uuid::now_v7()))
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn subroutine_is_cached_under_its_own_id() {
        let sub = object(LocationKind::Routine, "leaf");
        let mut parent = object(LocationKind::Routine, "parent");
        parent.children.push(sub.id);

        let store = Arc::new(MemoryStore::new(vec![parent.clone(), sub.clone()]));
        let loader = RunContextLoader::new(Arc::clone(&store), CacheSettings::default());

        let location = Location::routine(parent.id).with_subroutine(sub.id);
        let data = loader.load_location(&location).await.unwrap().unwrap();
        assert_eq!(data.subroutine.as_ref(), Some(&sub));
        assert_eq!(store.fetch_count(), 1);

        // The subroutine is now addressable directly, without a fetch.
        let direct = loader
            .load_location(&Location::routine(sub.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(direct.object, sub);
        assert_eq!(store.fetch_count(), 1);
    }

    #[tokio::test]
    async fn families_use_independent_caches() {
        let routine = object(LocationKind::Routine, "r");
        let project = object(LocationKind::Project, "p");
        let store = Arc::new(MemoryStore::new(vec![routine.clone(), project.clone()]));
        let loader = RunContextLoader::new(Arc::clone(&store), CacheSettings::default());

        loader
            .load_location(&Location::routine(routine.id))
            .await
            .unwrap();
        loader
            .load_location(&Location::project(project.id))
            .await
            .unwrap();

        let snapshot = loader.snapshot().await;
        assert_eq!(snapshot.routines.len(), 1);
        assert_eq!(snapshot.projects.len(), 1);
        assert_eq!(snapshot.routines[0].id, routine.id);
        assert_eq!(snapshot.projects[0].id, project.id);
    }

    #[tokio::test]
    async fn byte_budget_eviction_causes_refetch() {
        let a = object(LocationKind::Routine, "a");
        let b = object(LocationKind::Routine, "b");
        let c = object(LocationKind::Routine, "c");

        // Room for two objects of this shape, not three.
        let max_bytes = a.byte_size() + b.byte_size() + c.byte_size() / 2;
        let settings = CacheSettings {
            routines: runweave_types::config::CacheLimits {
                max_entries: 100,
                max_bytes,
            },
            ..Default::default()
        };

        let store = Arc::new(MemoryStore::new(vec![a.clone(), b.clone(), c.clone()]));
        let loader = RunContextLoader::new(Arc::clone(&store), settings);

        loader.load_location(&Location::routine(a.id)).await.unwrap();
        loader.load_location(&Location::routine(b.id)).await.unwrap();
        loader.load_location(&Location::routine(c.id)).await.unwrap();
        assert_eq!(store.fetch_count(), 3);

        // "a" was least recently used and should have been evicted.
        loader.load_location(&Location::routine(a.id)).await.unwrap();
        assert_eq!(store.fetch_count(), 4, "evicted entry must re-fetch");

        // "c" stayed resident through it all.
        loader.load_location(&Location::routine(c.id)).await.unwrap();
        assert_eq!(store.fetch_count(), 4);
    }

    #[tokio::test]
    async fn stack_returns_last_location_and_warms_cache() {
        let root = object(LocationKind::Routine, "root");
        let mid = object(LocationKind::Routine, "mid");
        let leaf = object(LocationKind::Routine, "leaf");
        let store = Arc::new(MemoryStore::new(vec![
            root.clone(),
            mid.clone(),
            leaf.clone(),
        ]));
        let loader = RunContextLoader::new(Arc::clone(&store), CacheSettings::default());

        let stack = vec![
            Location::routine(root.id).with_subroutine(mid.id),
            Location::routine(mid.id).with_subroutine(leaf.id),
            Location::routine(leaf.id),
        ];

        let data = loader.load_location_stack(&stack).await.unwrap().unwrap();
        assert_eq!(data.object, leaf);

        // All three resolved objects are now cached: re-walking the stack
        // costs no fetches.
        let before = store.fetch_count();
        loader.load_location_stack(&stack).await.unwrap();
        assert_eq!(store.fetch_count(), before);
    }

    #[tokio::test]
    async fn empty_stack_resolves_to_none() {
        let loader = loader_with(vec![], CacheSettings::default());
        assert!(loader.load_location_stack(&[]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stack_with_missing_step_is_none_but_still_warms_later_steps() {
        let root = object(LocationKind::Routine, "root");
        let leaf = object(LocationKind::Routine, "leaf");
        let store = Arc::new(MemoryStore::new(vec![root.clone(), leaf.clone()]));
        let loader = RunContextLoader::new(Arc::clone(&store), CacheSettings::default());

        let stack = vec![
            Location::routine(root.id),
            Location::routine(Uuid::now_v7()), // nothing here
            Location::routine(leaf.id),
        ];

        let result = loader.load_location_stack(&stack).await.unwrap();
        assert!(result.is_none());

        // The walk did not stop at the gap: the leaf is cached.
        let before = store.fetch_count();
        loader.load_location(&Location::routine(leaf.id)).await.unwrap();
        assert_eq!(store.fetch_count(), before);
    }

    #[tokio::test]
    async fn store_fault_propagates_as_error() {
        let loader = RunContextLoader::new(BrokenStore, CacheSettings::default());

        let result = loader.load_location(&Location::routine(Uuid::now_v7())).await;
        assert!(matches!(result, Err(LoaderError::Store(_))));

        let result = loader
            .load_location_stack(&[Location::routine(Uuid::now_v7())])
            .await;
        assert!(matches!(result, Err(LoaderError::Store(_))));
    }

    #[tokio::test]
    async fn change_listener_fires_per_mutation_with_contents() {
        let a = object(LocationKind::Routine, "a");
        let b = object(LocationKind::Project, "b");
        let store = Arc::new(MemoryStore::new(vec![a.clone(), b.clone()]));

        let snapshots: Arc<std::sync::Mutex<Vec<LoaderSnapshot>>> =
            Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&snapshots);

        let loader = RunContextLoader::new(Arc::clone(&store), CacheSettings::default())
            .with_change_listener(move |snapshot| {
                sink.lock().unwrap().push(snapshot);
            });

        loader.load_location(&Location::routine(a.id)).await.unwrap();
        loader.load_location(&Location::project(b.id)).await.unwrap();
        // Cache hit: no mutation, no notification.
        loader.load_location(&Location::routine(a.id)).await.unwrap();

        let snapshots = snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 2);
        assert_eq!(snapshots[0].routines.len(), 1);
        assert_eq!(snapshots[0].projects.len(), 0);
        assert_eq!(snapshots[1].projects.len(), 1);
    }

    #[tokio::test]
    async fn restore_warm_starts_without_fetching() {
        let routine = object(LocationKind::Routine, "warm");
        let snapshot = LoaderSnapshot {
            routines: vec![routine.clone()],
            projects: vec![],
        };

        // Fresh process: store is empty, only the snapshot knows the object.
        let store = Arc::new(MemoryStore::new(vec![]));
        let loader = RunContextLoader::new(Arc::clone(&store), CacheSettings::default());
        loader.restore(snapshot).await;

        let data = loader
            .load_location(&Location::routine(routine.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(data.object, routine);
        assert_eq!(store.fetch_count(), 0);
    }

    #[tokio::test]
    async fn snapshot_roundtrips_through_serde() {
        let snapshot = LoaderSnapshot {
            routines: vec![object(LocationKind::Routine, "r")],
            projects: vec![object(LocationKind::Project, "p")],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: LoaderSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }
}
