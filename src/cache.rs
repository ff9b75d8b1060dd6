//! Request-scoped record cache.
//!
//! One `RecordCache` lives for exactly one request or one batch render and is
//! passed by `&mut` into every reference pass. It memoizes store lookups keyed
//! by `(operation, scope, argument)`, including negative results, so a path or
//! identifier that failed to resolve is never queried again in the same scope.

use std::any::Any;
use std::collections::HashMap;

/// Identity of one memoized lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Argument of the lookup, e.g. a full path or an identifier.
    pub argument: String,
    /// Lookup name, e.g. `find_parent` or `issue`.
    pub operation: &'static str,
    /// What the argument is relative to, e.g. `project:10`.
    pub scope: String,
}

impl CacheKey {
    /// Build a key from its three parts.
    pub fn new(operation: &'static str, scope: impl Into<String>, argument: impl Into<String>) -> Self {
        return Self {
            argument: argument.into(),
            operation,
            scope: scope.into(),
        };
    }
}

/// Outcome of consulting the cache.
#[derive(Debug, PartialEq, Eq)]
pub enum Cached<'a, T> {
    /// Looked up before and found.
    Found(&'a T),
    /// Never looked up in this scope.
    Missing,
    /// Looked up before and known not to exist.
    NotFound,
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Lookups answered from the cache, positive or negative.
    pub hits: usize,
    /// Lookups that had to go to the store.
    pub misses: usize,
}

/// Heterogeneous memo of store results for one request.
#[derive(Default)]
pub struct RecordCache {
    /// `None` records a negative result.
    entries: HashMap<CacheKey, Option<Box<dyn Any>>>,
    /// Running counters, updated by `get`.
    stats: CacheStats,
}

impl std::fmt::Debug for RecordCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return f
            .debug_struct("RecordCache")
            .field("entries", &self.entries.len())
            .field("stats", &self.stats)
            .finish();
    }
}

impl RecordCache {
    /// Consult the cache and count the outcome.
    ///
    /// An entry stored under a different type than `T` reads as `Missing`.
    pub fn get<T: 'static>(&mut self, key: &CacheKey) -> Cached<'_, T> {
        let outcome = match self.entries.get(key) {
            None => Cached::Missing,
            Some(None) => Cached::NotFound,
            Some(Some(value)) => value.downcast_ref::<T>().map_or(Cached::Missing, Cached::Found),
        };
        match outcome {
            Cached::Missing => self.stats.misses = self.stats.misses.saturating_add(1),
            Cached::Found(_) | Cached::NotFound => self.stats.hits = self.stats.hits.saturating_add(1),
        }
        return outcome;
    }

    /// Whether `key` has been stored, positive or negative. Not counted.
    pub fn contains(&self, key: &CacheKey) -> bool {
        return self.entries.contains_key(key);
    }

    /// Store the result of a lookup. `None` records "does not exist".
    pub fn insert<T: 'static>(&mut self, key: CacheKey, value: Option<T>) {
        self.entries.insert(key, value.map(|v| return Box::new(v) as Box<dyn Any>));
    }

    /// Number of memoized lookups.
    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    /// Whether nothing has been memoized yet.
    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Create an empty cache for a new request.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Counters accumulated since creation.
    pub const fn stats(&self) -> CacheStats {
        return self.stats;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_negative_results() {
        let mut cache = RecordCache::new();
        let key = CacheKey::new("find_parent", "project", "nope/nope");

        assert_eq!(cache.get::<String>(&key), Cached::Missing);
        cache.insert::<String>(key.clone(), None);
        assert_eq!(cache.get::<String>(&key), Cached::NotFound);

        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1 });
    }

    #[test]
    fn returns_stored_values_by_type() {
        let mut cache = RecordCache::new();
        let key = CacheKey::new("issue", "project:1", "42");
        cache.insert(key.clone(), Some(42_u64));

        assert_eq!(cache.get::<u64>(&key), Cached::Found(&42));
        assert_eq!(cache.get::<String>(&key), Cached::Missing);
    }
}
