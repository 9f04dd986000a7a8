//! The nested-counter primitive the `Context` aggregator is built on.
//!
//! The distilled implementation parameterizes this over a nesting depth `L`;
//! in practice only depth 1 (`key -> set<code>`) and depth 2
//! (`key -> subkey -> set<code>`) are ever instantiated, so those are the
//! two concrete types kept here rather than a single generic "N-level" type
//! (SPEC_FULL.md §9).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// `key -> set<code>`. Missing keys read back as an empty set; writes
/// auto-vivify the intermediate entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Store1<K: Ord, V: Ord> {
    map: BTreeMap<K, BTreeSet<V>>,
}

impl<K: Ord, V: Ord> Default for Store1<K, V> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, V: Ord + Clone> Store1<K, V> {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        self.map.entry(key).or_default().insert(value);
    }

    pub fn get(&self, key: &K) -> BTreeSet<V> {
        self.map.get(key).cloned().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &BTreeSet<V>)> {
        self.map.iter()
    }

    /// Recursive merge: union of the value sets at matching keys.
    pub fn merge(&mut self, other: &Self) {
        for (key, values) in &other.map {
            self.map
                .entry(key.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
    }
}

/// `key -> subkey -> set<code>`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Store2<K: Ord, K2: Ord, V: Ord> {
    map: BTreeMap<K, Store1<K2, V>>,
}

impl<K: Ord, K2: Ord, V: Ord> Default for Store2<K, K2, V> {
    fn default() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }
}

impl<K: Ord + Clone, K2: Ord + Clone, V: Ord + Clone> Store2<K, K2, V> {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, subkey: K2, value: V) {
        self.map.entry(key).or_default().insert(subkey, value);
    }

    pub fn get(&self, key: &K) -> Store1<K2, V> {
        self.map.get(key).cloned().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Store1<K2, V>)> {
        self.map.iter()
    }

    pub fn merge(&mut self, other: &Self) {
        for (key, sub) in &other.map {
            self.map.entry(key.clone()).or_default().merge(sub);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store1_auto_vivifies_and_unions() {
        let mut s: Store1<String, String> = Store1::new();
        assert!(s.get(&"missing".to_string()).is_empty());
        s.insert("foo".to_string(), "a.c:1".to_string());
        s.insert("foo".to_string(), "a.c:2".to_string());
        assert_eq!(s.get(&"foo".to_string()).len(), 2);
    }

    #[test]
    fn store1_merge_is_set_union() {
        let mut a: Store1<&str, &str> = Store1::new();
        a.insert("k", "x");
        let mut b: Store1<&str, &str> = Store1::new();
        b.insert("k", "y");
        a.merge(&b);
        assert_eq!(a.get(&"k").len(), 2);
    }

    #[test]
    fn store2_missing_intermediate_reads_empty() {
        let s: Store2<&str, &str, &str> = Store2::new();
        assert!(s.get(&"k").get(&"sub").is_empty());
    }

    #[test]
    fn store2_merge_unions_leaves() {
        let mut a: Store2<&str, &str, &str> = Store2::new();
        a.insert("k", "v", "site1");
        let mut b: Store2<&str, &str, &str> = Store2::new();
        b.insert("k", "v", "site2");
        a.merge(&b);
        assert_eq!(a.get(&"k").get(&"v").len(), 2);
    }
}
