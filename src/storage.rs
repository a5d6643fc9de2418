use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;

type Slot<V> = Arc<OnceCell<Arc<V>>>;

/// Process-lifetime memoization keyed by game identifier.
///
/// Each key owns a `OnceCell`: the first caller runs the loader while
/// concurrent callers for the same key wait on it instead of loading again.
/// A value is only published when the loader succeeds, so a failed or
/// cancelled load leaves the slot empty for the next caller.
pub struct MemoryCache<V> {
    slots: Mutex<HashMap<String, Slot<V>>>,
}

impl<V> Default for MemoryCache<V> {
    fn default() -> Self {
        MemoryCache::new()
    }
}

impl<V> MemoryCache<V> {
    pub fn new() -> MemoryCache<V> {
        MemoryCache {
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<Arc<V>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(key).and_then(|slot| slot.get().cloned())
    }

    pub async fn get_or_try_insert_with<E, F, Fut>(&self, key: &str, loader: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        // Scoped so the lock is released before awaiting the load
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.entry(key.to_string()).or_default().clone()
        };

        let value = slot
            .get_or_try_init(move || async move { loader().await.map(Arc::new) })
            .await?
            .clone();
        Ok(value)
    }

    /// Number of published entries.
    pub fn len(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.values().filter(|slot| slot.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
