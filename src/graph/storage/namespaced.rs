//! Namespace-partitioned concurrent map.
//!
//! A directory of independent key -> value maps, one per namespace. The
//! directory sits behind a `parking_lot::RwLock` and is write-locked only to
//! create a namespace or to tear everything down. Each namespace is a
//! `DashMap`, so operations on different keys of the same namespace proceed
//! in parallel.

use crate::graph::types::ANY_TYPE;
use dashmap::DashMap;
use parking_lot::RwLock;
use rustc_hash::{FxBuildHasher, FxHashMap};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

type Namespace<V> = Arc<DashMap<String, V, FxBuildHasher>>;

/// Two-level concurrent map: namespace -> (key -> value).
pub struct NamespacedMap<V> {
    namespaces: RwLock<FxHashMap<String, Namespace<V>>>,
    /// Shard count for each namespace's `DashMap`; `None` uses the dashmap default.
    shard_amount: Option<usize>,
    closed: AtomicBool,
}

impl<V: Clone> NamespacedMap<V> {
    pub fn new() -> Self {
        Self::with_shard_amount(None)
    }

    /// `shard_amount` must be a power of two greater than 1 when given.
    pub fn with_shard_amount(shard_amount: Option<usize>) -> Self {
        NamespacedMap {
            namespaces: RwLock::new(FxHashMap::default()),
            shard_amount,
            closed: AtomicBool::new(false),
        }
    }

    fn new_namespace(&self) -> Namespace<V> {
        let map = match self.shard_amount {
            Some(shards) => {
                DashMap::with_capacity_and_hasher_and_shard_amount(0, FxBuildHasher, shards)
            }
            None => DashMap::with_hasher(FxBuildHasher),
        };
        Arc::new(map)
    }

    /// Runs `f` on the namespace, creating it first if needed.
    fn with_namespace_or_create<R>(
        &self,
        namespace: &str,
        f: impl FnOnce(&DashMap<String, V, FxBuildHasher>) -> R,
    ) -> R {
        {
            let dir = self.namespaces.read();
            if let Some(map) = dir.get(namespace) {
                return f(&**map);
            }
        }
        let mut dir = self.namespaces.write();
        let map = dir
            .entry(namespace.to_string())
            .or_insert_with(|| self.new_namespace());
        f(&**map)
    }

    /// Runs `f` on the namespace if it exists.
    fn with_namespace<R>(
        &self,
        namespace: &str,
        f: impl FnOnce(&DashMap<String, V, FxBuildHasher>) -> R,
    ) -> Option<R> {
        let dir = self.namespaces.read();
        dir.get(namespace).map(|map| f(&**map))
    }

    /// Insert or overwrite `key` in `namespace`.
    pub fn set(&self, namespace: &str, key: impl Into<String>, value: V) {
        let key = key.into();
        self.with_namespace_or_create(namespace, |map| {
            map.insert(key, value);
        });
    }

    pub fn get(&self, namespace: &str, key: &str) -> Option<V> {
        self.with_namespace(namespace, |map| map.get(key).map(|entry| entry.value().clone()))
            .flatten()
    }

    /// Remove `key`; returns the removed value, `None` if it was absent.
    pub fn delete(&self, namespace: &str, key: &str) -> Option<V> {
        self.with_namespace(namespace, |map| map.remove(key).map(|(_, value)| value))
            .flatten()
    }

    pub fn exists(&self, namespace: &str, key: &str) -> bool {
        self.with_namespace(namespace, |map| map.contains_key(key))
            .unwrap_or(false)
    }

    /// Borrow a value under its shard lock.
    pub fn read<R>(&self, namespace: &str, key: &str, f: impl FnOnce(&V) -> R) -> Option<R> {
        self.with_namespace(namespace, |map| map.get(key).map(|entry| f(entry.value())))
            .flatten()
    }

    /// Mutate an existing value in place; `None` if the key is absent.
    pub fn update<R>(&self, namespace: &str, key: &str, f: impl FnOnce(&mut V) -> R) -> Option<R> {
        self.with_namespace(namespace, |map| {
            map.get_mut(key).map(|mut entry| f(entry.value_mut()))
        })
        .flatten()
    }

    /// Mutate the value at `key`, inserting `default()` first if it is absent.
    /// Atomic with respect to other operations on the same key.
    pub fn upsert<R>(
        &self,
        namespace: &str,
        key: &str,
        default: impl FnOnce() -> V,
        f: impl FnOnce(&mut V) -> R,
    ) -> R {
        self.with_namespace_or_create(namespace, |map| {
            let mut entry = map.entry(key.to_string()).or_insert_with(default);
            f(entry.value_mut())
        })
    }

    /// Remove `key` only if `predicate` holds for its current value.
    pub fn remove_if(
        &self,
        namespace: &str,
        key: &str,
        predicate: impl FnOnce(&V) -> bool,
    ) -> Option<V> {
        self.with_namespace(namespace, |map| {
            map.remove_if(key, |_, value| predicate(value)).map(|(_, value)| value)
        })
        .flatten()
    }

    /// Number of entries in `namespace` (0 if it does not exist).
    pub fn len(&self, namespace: &str) -> usize {
        self.with_namespace(namespace, |map| map.len()).unwrap_or(0)
    }

    /// Number of entries across all namespaces.
    pub fn total_len(&self) -> usize {
        self.namespaces.read().values().map(|map| map.len()).sum()
    }

    /// Every namespace created so far, including ones whose entries have
    /// since been deleted.
    pub fn namespaces(&self) -> Vec<String> {
        self.namespaces.read().keys().cloned().collect()
    }

    /// Call `f(key, value)` for each entry of `namespace`, or of every
    /// namespace when it is [`ANY_TYPE`]. Stops as soon as `f` returns false.
    ///
    /// Entries are read one namespace at a time into a buffer and no lock is
    /// held while `f` runs, so `f` may write to this map. Writes that race
    /// with the iteration may or may not be observed.
    pub fn range(&self, namespace: &str, mut f: impl FnMut(&str, &V) -> bool) {
        let selected: Vec<Namespace<V>> = {
            let dir = self.namespaces.read();
            if namespace == ANY_TYPE {
                dir.values().cloned().collect()
            } else {
                dir.get(namespace).cloned().into_iter().collect()
            }
        };
        for map in selected {
            for (key, value) in &buffered(&map) {
                if !f(key, value) {
                    return;
                }
            }
        }
    }

    /// Owned copy of every entry in `namespace`.
    pub fn copy(&self, namespace: &str) -> HashMap<String, V> {
        self.filter(namespace, |_, _| true)
    }

    /// Same as [`copy`](Self::copy): the namespace as a plain map.
    pub fn to_map(&self, namespace: &str) -> HashMap<String, V> {
        self.copy(namespace)
    }

    /// Entries of `namespace` accepted by `predicate`.
    ///
    /// Like [`range`](Self::range), the namespace is copied out first and
    /// `predicate` runs with no lock held, so it may write to this map.
    pub fn filter(
        &self,
        namespace: &str,
        mut predicate: impl FnMut(&str, &V) -> bool,
    ) -> HashMap<String, V> {
        let selected = self.namespaces.read().get(namespace).cloned();
        let Some(map) = selected else {
            return HashMap::new();
        };
        buffered(&map)
            .into_iter()
            .filter(|(key, value)| predicate(key, value))
            .collect()
    }

    /// Entries of both namespaces; on a shared key the value from
    /// `namespace2` wins.
    pub fn union(&self, namespace1: &str, namespace2: &str) -> HashMap<String, V> {
        let dir = self.namespaces.read();
        let mut out = HashMap::new();
        for name in [namespace1, namespace2] {
            if let Some(map) = dir.get(name) {
                for entry in map.iter() {
                    out.insert(entry.key().clone(), entry.value().clone());
                }
            }
        }
        out
    }

    /// Entries of `namespace1` whose key is also present in `namespace2`.
    pub fn intersection(&self, namespace1: &str, namespace2: &str) -> HashMap<String, V> {
        let dir = self.namespaces.read();
        let (Some(first), Some(second)) = (dir.get(namespace1), dir.get(namespace2)) else {
            return HashMap::new();
        };
        let mut out = HashMap::new();
        for entry in first.iter() {
            // Avoid locking the same shard twice when both names are equal.
            if Arc::ptr_eq(first, second) || second.contains_key(entry.key()) {
                out.insert(entry.key().clone(), entry.value().clone());
            }
        }
        out
    }

    /// Insert or overwrite every entry of `entries` into `namespace`.
    pub fn set_all(&self, namespace: &str, entries: impl IntoIterator<Item = (String, V)>) {
        self.with_namespace_or_create(namespace, |map| {
            for (key, value) in entries {
                map.insert(key, value);
            }
        });
    }

    /// Remove every entry of `namespace`; the namespace itself remains.
    pub fn clear(&self, namespace: &str) {
        self.with_namespace(namespace, |map| map.clear());
    }

    /// Drop every namespace. Only the first call has an effect; returns
    /// whether this call performed the teardown.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::AcqRel) {
            return false;
        }
        let mut dir = self.namespaces.write();
        for map in dir.values() {
            map.clear();
        }
        dir.clear();
        true
    }
}

/// Owned copy of a namespace's entries, taken shard by shard.
fn buffered<V: Clone>(map: &DashMap<String, V, FxBuildHasher>) -> Vec<(String, V)> {
    map.iter()
        .map(|entry| (entry.key().clone(), entry.value().clone()))
        .collect()
}

impl<V: Clone> Default for NamespacedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for NamespacedMap<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let dir = self.namespaces.read();
        let mut out = f.debug_map();
        for (name, map) in dir.iter() {
            out.entry(name, &map.len());
        }
        out.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn seeded() -> NamespacedMap<i64> {
        let map = NamespacedMap::new();
        map.set("user", "a", 1);
        map.set("user", "b", 2);
        map.set("dog", "b", 20);
        map.set("dog", "c", 30);
        map
    }

    #[test]
    fn test_set_get_overwrite() {
        let map = NamespacedMap::new();
        assert_eq!(map.get("user", "a"), None);

        map.set("user", "a", 1);
        map.set("user", "a", 2);
        assert_eq!(map.get("user", "a"), Some(2));
        assert_eq!(map.len("user"), 1);
        assert!(map.exists("user", "a"));
        assert!(!map.exists("user", "z"));
        assert!(!map.exists("missing", "a"));
    }

    #[test]
    fn test_delete_is_idempotent_and_keeps_namespace() {
        let map = seeded();
        assert_eq!(map.delete("user", "a"), Some(1));
        assert_eq!(map.delete("user", "a"), None);
        assert_eq!(map.delete("nope", "a"), None);

        map.delete("user", "b");
        assert_eq!(map.len("user"), 0);
        assert!(map.namespaces().contains(&"user".to_string()));
    }

    #[test]
    fn test_range_namespace_and_wildcard() {
        let map = seeded();

        let mut seen = HashSet::new();
        map.range("dog", |k, v| {
            seen.insert((k.to_string(), *v));
            true
        });
        assert_eq!(seen, HashSet::from([("b".to_string(), 20), ("c".to_string(), 30)]));

        let mut total = 0;
        map.range(ANY_TYPE, |_, v| {
            total += v;
            true
        });
        assert_eq!(total, 53);

        let mut calls = 0;
        map.range("missing", |_, _| {
            calls += 1;
            true
        });
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_range_early_stop_spans_namespaces() {
        let map = seeded();
        let mut calls = 0;
        map.range(ANY_TYPE, |_, _| {
            calls += 1;
            false
        });
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_range_callback_may_mutate() {
        let map = seeded();
        map.range("user", |k, _| {
            map.delete("user", k);
            map.set("user", format!("{}-moved", k), 0);
            true
        });
        assert!(!map.exists("user", "a"));
        assert!(map.exists("user", "a-moved"));
    }

    #[test]
    fn test_filter_predicate_may_mutate() {
        let map = seeded();
        let kept = map.filter("user", |k, v| {
            map.set("audit", k, *v);
            map.delete("user", k);
            *v > 1
        });

        assert_eq!(kept, HashMap::from([("b".to_string(), 2)]));
        assert_eq!(map.len("user"), 0);
        assert_eq!(map.len("audit"), 2);
        assert!(map.filter("missing", |_, _| true).is_empty());
    }

    #[test]
    fn test_update_upsert_remove_if() {
        let map: NamespacedMap<Vec<i64>> = NamespacedMap::new();
        assert_eq!(map.update("n", "k", |v| v.push(1)), None);

        let len = map.upsert("n", "k", Vec::new, |v| {
            v.push(1);
            v.len()
        });
        assert_eq!(len, 1);
        map.upsert("n", "k", Vec::new, |v| v.push(2));
        assert_eq!(map.read("n", "k", |v| v.clone()), Some(vec![1, 2]));

        assert_eq!(map.update("n", "k", |v| v.pop()), Some(Some(2)));
        assert_eq!(map.remove_if("n", "k", |v| v.is_empty()), None);
        assert_eq!(map.remove_if("n", "k", |v| v.len() == 1), Some(vec![1]));
        assert!(!map.exists("n", "k"));
    }

    #[test]
    fn test_bulk_operations() {
        let map = seeded();

        let users = HashMap::from([("a".to_string(), 1), ("b".to_string(), 2)]);
        assert_eq!(map.copy("user"), users);
        assert_eq!(map.to_map("dog").len(), 2);
        assert!(map.copy("missing").is_empty());

        let big = map.filter("dog", |_, v| *v > 25);
        assert_eq!(big, HashMap::from([("c".to_string(), 30)]));

        let union = map.union("user", "dog");
        assert_eq!(union.len(), 3);
        assert_eq!(union["b"], 20);
        assert_eq!(union["a"], 1);

        let both = map.intersection("user", "dog");
        assert_eq!(both, HashMap::from([("b".to_string(), 2)]));
        assert!(map.intersection("user", "missing").is_empty());
        assert_eq!(map.intersection("user", "user").len(), 2);
    }

    #[test]
    fn test_set_all_and_clear() {
        let map = seeded();
        map.set_all("user", [("b".to_string(), 200), ("z".to_string(), 26)]);
        assert_eq!(map.get("user", "a"), Some(1));
        assert_eq!(map.get("user", "b"), Some(200));
        assert_eq!(map.len("user"), 3);

        map.set_all("cat", [("x".to_string(), 9)]);
        assert_eq!(map.get("cat", "x"), Some(9));

        map.clear("user");
        assert_eq!(map.len("user"), 0);
        assert_eq!(map.len("dog"), 2);
        map.clear("missing");
    }

    #[test]
    fn test_close_is_idempotent() {
        let map = seeded();
        assert_eq!(map.total_len(), 4);
        assert!(map.close());
        assert_eq!(map.total_len(), 0);
        assert!(map.namespaces().is_empty());

        map.set("user", "a", 1);
        assert!(!map.close());
        assert_eq!(map.get("user", "a"), Some(1));
    }

    #[test]
    fn test_custom_shard_amount() {
        let map = NamespacedMap::with_shard_amount(Some(4));
        for i in 0..100 {
            map.set("n", i.to_string(), i);
        }
        assert_eq!(map.len("n"), 100);
    }

    #[test]
    fn test_concurrent_writers() {
        let map: NamespacedMap<usize> = NamespacedMap::new();
        std::thread::scope(|s| {
            for t in 0..8 {
                let map = &map;
                s.spawn(move || {
                    for i in 0..500 {
                        map.set(&format!("ns{}", t % 3), format!("{}-{}", t, i), i);
                        map.upsert("counter", "hits", || 0, |v| *v += 1);
                    }
                });
            }
        });
        assert_eq!(map.total_len(), 8 * 500 + 1);
        assert_eq!(map.get("counter", "hits"), Some(8 * 500));
        assert_eq!(map.namespaces().len(), 4);
    }
}
