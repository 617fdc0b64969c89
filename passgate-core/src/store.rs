//! In-memory expiring key-value store
//!
//! Backs both the credential store and the session store. Entries carry an
//! absolute expiry; expired entries are invisible to every read and are
//! physically removed by [`ExpiringStore::purge_expired`].

use dashmap::mapref::entry::Entry as MapEntry;
use dashmap::DashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Stored value with expiration
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Thread-safe expiring store keyed by `K`
pub struct ExpiringStore<K, V> {
    entries: DashMap<K, Entry<V>>,
    default_ttl: Duration,
}

impl<K, V> ExpiringStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a store whose entries live for `default_ttl` unless told otherwise
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            default_ttl,
        }
    }

    /// Default lifetime applied when `set` is called with a zero TTL
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn expiry(&self, ttl: Duration) -> Instant {
        let ttl = if ttl.is_zero() { self.default_ttl } else { ttl };
        Instant::now() + ttl
    }

    /// Get a copy of a live value
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let entry = self.entries.get(key)?;
        entry
            .is_live(Instant::now())
            .then(|| entry.value.clone())
    }

    /// Insert or replace a value. A zero `ttl` means the store default.
    pub fn set(&self, key: K, value: V, ttl: Duration) {
        let expires_at = self.expiry(ttl);
        self.entries.insert(key, Entry { value, expires_at });
    }

    /// Insert only when no live value exists for `key`.
    ///
    /// Returns `false` (and leaves the store untouched) when the key is taken.
    pub fn insert_if_absent(&self, key: K, value: V, ttl: Duration) -> bool {
        let expires_at = self.expiry(ttl);
        match self.entries.entry(key) {
            MapEntry::Occupied(mut occupied) => {
                if occupied.get().is_live(Instant::now()) {
                    return false;
                }
                occupied.insert(Entry { value, expires_at });
                true
            }
            MapEntry::Vacant(vacant) => {
                vacant.insert(Entry { value, expires_at });
                true
            }
        }
    }

    /// Remove and return a live value
    pub fn take<Q>(&self, key: &Q) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let (_, entry) = self.entries.remove(key)?;
        entry.is_live(Instant::now()).then_some(entry.value)
    }

    /// Remove and return a live value only when `predicate` accepts it.
    ///
    /// The check and the removal happen under the entry's write lock; a
    /// rejected value stays in place with its lifetime untouched.
    pub fn take_if<Q, F>(&self, key: &Q, predicate: F) -> Option<V>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        F: FnOnce(&V) -> bool,
    {
        let now = Instant::now();
        let (_, entry) = self
            .entries
            .remove_if(key, |_, entry| entry.is_live(now) && predicate(&entry.value))?;
        Some(entry.value)
    }

    /// Run `f` against a live value while holding the entry's write lock.
    ///
    /// `f` returns `(changed, output)`. When `changed` is true the entry's
    /// lifetime is reset to the store default. Returns `None` if the key is
    /// absent or expired.
    pub fn update<Q, R, F>(&self, key: &Q, f: F) -> Option<R>
    where
        K: std::borrow::Borrow<Q>,
        Q: Eq + Hash + ?Sized,
        F: FnOnce(&mut V) -> (bool, R),
    {
        let mut entry = self.entries.get_mut(key)?;
        if !entry.is_live(Instant::now()) {
            return None;
        }
        let (changed, output) = f(&mut entry.value);
        if changed {
            entry.expires_at = Instant::now() + self.default_ttl;
        }
        Some(output)
    }

    /// Remove expired entries (called periodically)
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> std::fmt::Debug for ExpiringStore<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExpiringStore")
            .field("entries", &self.entries.len())
            .field("default_ttl", &self.default_ttl)
            .finish()
    }
}
