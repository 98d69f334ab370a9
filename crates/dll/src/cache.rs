use std::collections::BTreeMap;
use std::rc::Rc;

/// Lazily built values, constructed at most once per key.
///
/// Values are shared: a handle returned by [`load`](Self::load) stays valid
/// after the entry is discarded. Single-threaded by construction.
#[derive(Debug)]
pub struct ResourceCache<K, V> {
    entries: BTreeMap<K, Rc<V>>,
}

impl<K: Ord, V> Default for ResourceCache<K, V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<K: Ord, V> ResourceCache<K, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached value for `key`, building it with `factory` on first use.
    /// A failing factory caches nothing, so the load may be retried.
    pub fn load<E>(&mut self, key: K, factory: impl FnOnce() -> Result<V, E>) -> Result<Rc<V>, E> {
        if let Some(value) = self.entries.get(&key) {
            return Ok(Rc::clone(value));
        }
        let value = Rc::new(factory()?);
        self.entries.insert(key, Rc::clone(&value));
        Ok(value)
    }

    pub fn get(&self, key: &K) -> Option<Rc<V>> {
        self.entries.get(key).cloned()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop the cache's reference. Outstanding handles keep the value alive.
    pub fn discard(&mut self, key: &K) -> Option<Rc<V>> {
        self.entries.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
