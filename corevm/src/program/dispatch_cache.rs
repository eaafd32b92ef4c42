//! Global virtual-dispatch cache
//!
//! Maps `(concrete class id, encoded-name suffix)` to the method that
//! resolves for that pair, memoizing the linear walk up the class's parent
//! chain and interfaces. Classes are immutable after loading, so entries
//! never need invalidation. Lives as a field on the threaded `Runtime`
//! context rather than a process singleton.

use std::collections::HashMap;
use std::sync::Mutex;

use super::class::ClassId;
use super::method::MethodId;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    concrete_class: ClassId,
    dispatch_key: String,
}

#[derive(Default)]
pub struct DispatchCache {
    inner: Mutex<HashMap<CacheKey, (ClassId, MethodId)>>,
}

impl std::fmt::Debug for DispatchCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchCache").finish_non_exhaustive()
    }
}

impl DispatchCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, concrete_class: ClassId, dispatch_key: &str) -> Option<(ClassId, MethodId)> {
        let key = CacheKey {
            concrete_class,
            dispatch_key: dispatch_key.to_string(),
        };
        self.inner.lock().unwrap().get(&key).copied()
    }

    pub fn install(&self, concrete_class: ClassId, dispatch_key: &str, resolved: (ClassId, MethodId)) {
        let key = CacheKey {
            concrete_class,
            dispatch_key: dispatch_key.to_string(),
        };
        self.inner.lock().unwrap().insert(key, resolved);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caches_resolution() {
        let cache = DispatchCache::new();
        assert!(cache.get(1, "area:").is_none());
        cache.install(1, "area:", (2, 5));
        assert_eq!(cache.get(1, "area:"), Some((2, 5)));
    }
}
