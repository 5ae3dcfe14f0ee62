//! Key/value map whose every access is serialized through one lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use parking_lot::Mutex;

/// Map shared by any number of concurrent writers.
///
/// Every method takes the lock internally and releases it before returning,
/// including on unwind. The backing store is never handed out by reference;
/// readers get clones. Writers to the same key are ordered by lock
/// acquisition, so the last writer to acquire the lock wins.
///
/// A zero-value map is usable without a constructor call, which makes
/// `static` maps possible:
///
/// ```
/// use coolthings_collections::GuardedMap;
///
/// static SEEN: GuardedMap = GuardedMap::new();
///
/// SEEN.insert(1, 10);
/// assert_eq!(SEEN.len(), 1);
/// ```
pub struct GuardedMap<K = i64, V = i64> {
	/// Created on first insert, under the lock.
	entries: Mutex<Option<HashMap<K, V>>>,
}

impl<K, V> GuardedMap<K, V> {
	/// Creates an empty map. Allocates nothing until the first insert.
	pub const fn new() -> Self {
		Self {
			entries: parking_lot::const_mutex(None),
		}
	}

	/// Number of distinct keys at the moment the lock was taken.
	pub fn len(&self) -> usize {
		self.entries.lock().as_ref().map_or(0, HashMap::len)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

impl<K, V> GuardedMap<K, V>
where
	K: Eq + Hash,
{
	/// Inserts `value` under `key`, silently replacing any previous value.
	pub fn insert(&self, key: K, value: V) {
		let mut entries = self.entries.lock();
		entries.get_or_insert_with(HashMap::new).insert(key, value);
	}

	pub fn contains_key<Q>(&self, key: &Q) -> bool
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
	{
		self.entries.lock().as_ref().is_some_and(|map| map.contains_key(key))
	}

	/// Returns a clone of the value stored under `key`.
	pub fn get<Q>(&self, key: &Q) -> Option<V>
	where
		K: Borrow<Q>,
		Q: Eq + Hash + ?Sized,
		V: Clone,
	{
		self.entries.lock().as_ref().and_then(|map| map.get(key).cloned())
	}

	/// Copies the current contents out under the lock.
	///
	/// The copy is detached from later writes, which makes it a safe source for
	/// [`crate::iterate`] while writers keep going.
	pub fn snapshot(&self) -> HashMap<K, V>
	where
		K: Clone,
		V: Clone,
	{
		self.entries.lock().clone().unwrap_or_default()
	}
}

impl<K, V> Default for GuardedMap<K, V> {
	fn default() -> Self {
		Self::new()
	}
}

impl<K, V> fmt::Debug for GuardedMap<K, V> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("GuardedMap").field("len", &self.len()).finish_non_exhaustive()
	}
}
