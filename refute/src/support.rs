//! Process-scoped support services: the compute-if-absent context cache and
//! the lazily loaded service registry.
//!
//! Both are explicit values injected into their consumers rather than hidden
//! statics, and both guard their state with a single mutual-exclusion lock.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// A concurrent compute-if-absent cache.
///
/// One lock guards the whole map; resolution is check-then-insert under that
/// lock, so concurrent first access for the same key performs exactly one
/// computation and every caller observes the shared result.
pub struct ContextCache<K, V> {
    entries: Mutex<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash + Clone, V> ContextCache<K, V> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Return the cached value for `key`, computing it on first access.
    pub fn resolve(&self, key: K, create: impl FnOnce() -> V) -> Arc<V> {
        let mut entries = self.entries.lock().unwrap();
        if let Some(existing) = entries.get(&key) {
            return existing.clone();
        }
        let value = Arc::new(create());
        entries.insert(key, value.clone());
        value
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl<K: Eq + Hash + Clone, V> Default for ContextCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Display context resolved per parameter type, cached by `TypeId`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeContext {
    /// The type's display name
    pub type_name: &'static str,
}

/// Failure to load a set of optional services.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceLoadError {
    /// What went wrong
    pub message: String,
}

impl ServiceLoadError {
    /// Create a load error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ServiceLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cannot load services: {}", self.message)
    }
}

impl std::error::Error for ServiceLoadError {}

/// A lazily loaded list of optional services.
///
/// The loader runs at most once, under the registry's lock. A failing
/// loader is logged and degrades the registry to an empty, cached service
/// list — optional extensions must never be fatal.
pub struct ServiceRegistry<S> {
    loader: Box<dyn Fn() -> Result<Vec<S>, ServiceLoadError> + Send + Sync>,
    services: Mutex<Option<Arc<Vec<S>>>>,
}

impl<S> ServiceRegistry<S> {
    /// Create a registry with the given loader.
    pub fn new(loader: impl Fn() -> Result<Vec<S>, ServiceLoadError> + Send + Sync + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            services: Mutex::new(None),
        }
    }

    /// A registry that never provides any services.
    pub fn empty() -> Self {
        Self::new(|| Ok(Vec::new()))
    }

    /// The loaded services, loading them on first access.
    pub fn services(&self) -> Arc<Vec<S>> {
        let mut slot = self.services.lock().unwrap();
        if let Some(loaded) = &*slot {
            return loaded.clone();
        }
        let loaded = match (self.loader)() {
            Ok(services) => Arc::new(services),
            Err(error) => {
                log::warn!("{}", error);
                Arc::new(Vec::new())
            }
        };
        *slot = Some(loaded.clone());
        loaded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::TypeId;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_resolve_computes_once_per_key() {
        let cache: ContextCache<&str, String> = ContextCache::new();
        let computations = AtomicUsize::new(0);

        let first = cache.resolve("a", || {
            computations.fetch_add(1, Ordering::SeqCst);
            "value-a".to_string()
        });
        let second = cache.resolve("a", || {
            computations.fetch_add(1, Ordering::SeqCst);
            "value-a-again".to_string()
        });

        assert_eq!(*first, "value-a");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(computations.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_first_access_populates_once() {
        let cache: Arc<ContextCache<u32, u32>> = Arc::new(ContextCache::new());
        let computations = Arc::new(AtomicUsize::new(0));

        crossbeam::thread::scope(|scope| {
            for _ in 0..8 {
                let cache = cache.clone();
                let computations = computations.clone();
                scope.spawn(move |_| {
                    for _ in 0..100 {
                        let value = cache.resolve(1, || {
                            computations.fetch_add(1, Ordering::SeqCst);
                            99
                        });
                        assert_eq!(*value, 99);
                    }
                });
            }
        })
        .unwrap();

        assert_eq!(computations.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_type_contexts_by_type_id() {
        let cache: ContextCache<TypeId, TypeContext> = ContextCache::new();
        let context = cache.resolve(TypeId::of::<i64>(), || TypeContext {
            type_name: std::any::type_name::<i64>(),
        });
        assert_eq!(context.type_name, "i64");
    }

    #[test]
    fn test_service_registry_loads_lazily_and_once() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let registry = ServiceRegistry::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["reporter-a", "reporter-b"])
        });
        assert_eq!(loads.load(Ordering::SeqCst), 0);
        assert_eq!(registry.services().len(), 2);
        assert_eq!(registry.services().len(), 2);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failing_loader_degrades_to_no_services() {
        let loads = Arc::new(AtomicUsize::new(0));
        let counter = loads.clone();
        let registry: ServiceRegistry<&str> = ServiceRegistry::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(ServiceLoadError::new("descriptor file is corrupt"))
        });
        assert!(registry.services().is_empty());
        // the failure is cached; the loader does not run again
        assert!(registry.services().is_empty());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_service_access_is_safe() {
        let registry: Arc<ServiceRegistry<u32>> =
            Arc::new(ServiceRegistry::new(|| Ok(vec![1, 2, 3])));
        crossbeam::thread::scope(|scope| {
            for _ in 0..4 {
                let registry = registry.clone();
                scope.spawn(move |_| {
                    for _ in 0..100 {
                        assert_eq!(registry.services().len(), 3);
                    }
                });
            }
        })
        .unwrap();
    }
}
