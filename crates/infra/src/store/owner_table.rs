use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{PoisonError, RwLock};

use stockroom_core::Owner;

use super::{StoreError, StoreResult};

fn poisoned<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Backend("in-memory table lock poisoned".to_string())
}

/// Owner-partitioned in-memory table for tests/dev.
///
/// Each method takes the lock once, so check-then-write sequences inside a
/// single call are atomic.
#[derive(Debug)]
pub struct OwnerTable<K, V> {
    inner: RwLock<HashMap<(Owner, K), V>>,
}

impl<K, V> OwnerTable<K, V> {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for OwnerTable<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> OwnerTable<K, V>
where
    K: Clone + Eq + Hash,
    V: Clone,
{
    pub fn get(&self, owner: &Owner, key: &K) -> StoreResult<Option<V>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.get(&(owner.clone(), key.clone())).cloned())
    }

    pub fn list(&self, owner: &Owner) -> StoreResult<Vec<V>> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map
            .iter()
            .filter_map(|((o, _k), v)| if o == owner { Some(v.clone()) } else { None })
            .collect())
    }

    pub fn count(&self, owner: &Owner) -> StoreResult<u64> {
        let map = self.inner.read().map_err(poisoned)?;
        Ok(map.keys().filter(|(o, _k)| o == owner).count() as u64)
    }

    /// Insert under a new key. `Duplicate` if the key exists or any of the
    /// owner's current values satisfies `clashes`.
    pub fn insert_unique(
        &self,
        owner: &Owner,
        key: K,
        value: V,
        clashes: impl Fn(&V) -> bool,
    ) -> StoreResult<V> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let composite = (owner.clone(), key);
        if map.contains_key(&composite)
            || map.iter().any(|((o, _k), v)| o == owner && clashes(v))
        {
            return Err(StoreError::Duplicate);
        }
        map.insert(composite, value.clone());
        Ok(value)
    }

    /// Compute a replacement from the stored value and write it back.
    /// `NotFound` if the key is absent; errors from `replace` abort the write.
    pub fn replace_with(
        &self,
        owner: &Owner,
        key: &K,
        replace: impl FnOnce(&V) -> StoreResult<V>,
    ) -> StoreResult<V> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let slot = map
            .get_mut(&(owner.clone(), key.clone()))
            .ok_or(StoreError::NotFound)?;
        let next = replace(slot)?;
        *slot = next.clone();
        Ok(next)
    }

    pub fn remove(&self, owner: &Owner, key: &K) -> StoreResult<bool> {
        let mut map = self.inner.write().map_err(poisoned)?;
        Ok(map.remove(&(owner.clone(), key.clone())).is_some())
    }

    /// Remove every record of an owner.
    pub fn clear_owner(&self, owner: &Owner) -> StoreResult<u64> {
        let mut map = self.inner.write().map_err(poisoned)?;
        let before = map.len();
        map.retain(|(o, _k), _v| o != owner);
        Ok((before - map.len()) as u64)
    }
}
