//! Open-addressing hash table, grounded on `original_source/src/table/table.c`.
//!
//! Re-architected per SPEC_FULL.md §4.6/§3.7: a flat `Vec<u8>` of control
//! bytes (`EMPTY`/`REMOVED`/`OCCUPIED(h2)`) parallel to a slot array,
//! instead of the source's `element_ptr` + caller-supplied `cmp_func`. Keys
//! are anything hashable-as-bytes (`AsRef<[u8]> + Eq`) rather than raw
//! `(ptr, key_size)` pairs, since Rust has an owning container to put them
//! in.

use crate::hash::hash64;

const CTL_EMPTY: u8 = 0x00;
const CTL_REMOVED: u8 = 0x01;
const CTL_OCCUPIED_BIT: u8 = 0x80;

const LF_MAX_NUM: usize = 85;
const LF_MIN_NUM: usize = 50;
const LF_DEN: usize = 100;

fn h2(hash: u64) -> u8 {
	CTL_OCCUPIED_BIT | ((hash >> 57) as u8 & 0x7f)
}

fn is_occupied(ctl: u8) -> bool {
	ctl & CTL_OCCUPIED_BIT != 0
}

/// An open-addressing hash table with linear probing and tombstone reuse.
pub struct Table<K, V> {
	control: Vec<u8>,
	slots: Vec<Option<(K, V)>>,
	len: usize,
	deleted: usize,
	seed: u64,
}

impl<K: AsRef<[u8]> + Eq, V> Table<K, V> {
	pub fn new(min_capacity: usize) -> Self {
		Self::with_seed(min_capacity, 0x9E37_79B9_7F4A_7C15)
	}

	/// Construction with an explicit seed, for deterministic tests. The
	/// source seeds `clod_hash64` from the control array's address; here
	/// the seed is chosen once at creation instead (DESIGN.md).
	pub fn with_seed(min_capacity: usize, seed: u64) -> Self {
		let capacity = min_capacity.max(1).next_power_of_two().max(8);
		Table {
			control: vec![CTL_EMPTY; capacity],
			slots: (0..capacity).map(|_| None).collect(),
			len: 0,
			deleted: 0,
			seed,
		}
	}

	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	fn capacity(&self) -> usize {
		self.control.len()
	}

	fn hash_of(&self, key: &[u8]) -> u64 {
		hash64(self.seed, key)
	}

	/// Probes for `key`. Returns `Ok(index)` if occupied by an equal key,
	/// `Err(index)` of the first empty/removed slot usable for insertion.
	fn probe(&self, key: &K) -> Result<usize, usize> {
		let hash = self.hash_of(key.as_ref());
		let mask = self.capacity() - 1;
		let mut index = (hash as usize) & mask;
		let want = h2(hash);
		let mut first_free = None;
		for _ in 0..self.capacity() {
			let ctl = self.control[index];
			if ctl == CTL_EMPTY {
				return Err(first_free.unwrap_or(index));
			}
			if ctl == CTL_REMOVED {
				if first_free.is_none() {
					first_free = Some(index);
				}
			} else if ctl == want {
				if let Some((k, _)) = &self.slots[index] {
					if k == key {
						return Ok(index);
					}
				}
			}
			index = (index + 1) & mask;
		}
		Err(first_free.unwrap_or(index))
	}

	fn load_factor_num(&self) -> usize {
		(self.len + self.deleted) * LF_DEN
	}

	fn maybe_rebuild(&mut self) {
		if self.load_factor_num() >= LF_MAX_NUM * self.capacity() {
			self.rebuild((self.len * LF_DEN / LF_MIN_NUM).max(self.capacity()));
		}
	}

	fn rebuild(&mut self, min_capacity: usize) {
		let new_capacity = min_capacity.max(8).next_power_of_two();
		let old_slots = std::mem::replace(&mut self.slots, (0..new_capacity).map(|_| None).collect());
		self.control = vec![CTL_EMPTY; new_capacity];
		self.deleted = 0;
		self.len = 0;
		for entry in old_slots.into_iter().flatten() {
			self.insert_new(entry.0, entry.1);
		}
	}

	fn insert_new(&mut self, key: K, value: V) {
		let hash = self.hash_of(key.as_ref());
		let mask = self.capacity() - 1;
		let mut index = (hash as usize) & mask;
		loop {
			if !is_occupied(self.control[index]) {
				self.control[index] = h2(hash);
				self.slots[index] = Some((key, value));
				self.len += 1;
				return;
			}
			index = (index + 1) & mask;
		}
	}

	/// `add`: returns `None` if the key was newly inserted, `Some(&V)` of
	/// the existing value on collision (the input is dropped by the
	/// caller, mirroring "returns the existing stored element").
	pub fn add(&mut self, key: K, value: V) -> Option<&V> {
		self.maybe_rebuild();
		match self.probe(&key) {
			Ok(index) => self.slots[index].as_ref().map(|(_, v)| v),
			Err(index) => {
				let hash = self.hash_of(key.as_ref());
				self.control[index] = h2(hash);
				self.slots[index] = Some((key, value));
				self.len += 1;
				None
			}
		}
	}

	/// `set`: upsert, returning the previous value if one existed.
	pub fn set(&mut self, key: K, value: V) -> Option<V> {
		self.maybe_rebuild();
		match self.probe(&key) {
			Ok(index) => self.slots[index].replace((key, value)).map(|(_, v)| v),
			Err(index) => {
				let hash = self.hash_of(key.as_ref());
				self.control[index] = h2(hash);
				self.slots[index] = Some((key, value));
				self.len += 1;
				None
			}
		}
	}

	pub fn get(&self, key: &K) -> Option<&V> {
		match self.probe(key) {
			Ok(index) => self.slots[index].as_ref().map(|(_, v)| v),
			Err(_) => None,
		}
	}

	pub fn del(&mut self, key: &K) -> Option<V> {
		match self.probe(key) {
			Ok(index) => {
				self.control[index] = CTL_REMOVED;
				self.len -= 1;
				self.deleted += 1;
				self.slots[index].take().map(|(_, v)| v)
			}
			Err(_) => None,
		}
	}

	/// Non-mutating iteration, starting from a rotating cursor so repeated
	/// calls after deletions don't always begin scanning the same region.
	pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
		let capacity = self.capacity();
		let start = if capacity == 0 { 0 } else { (self.seed as usize) % capacity };
		(0..capacity)
			.map(move |i| (start + i) % capacity)
			.filter_map(move |i| self.slots[i].as_ref())
			.map(|(k, v)| (k, v))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn add_returns_none_then_existing_on_collision() {
		let mut t: Table<String, i32> = Table::new(4);
		assert!(t.add("a".to_string(), 1).is_none());
		assert_eq!(t.add("a".to_string(), 2), Some(&1));
		assert_eq!(t.get(&"a".to_string()), Some(&1));
	}

	#[test]
	fn set_replaces_and_returns_previous() {
		let mut t: Table<String, i32> = Table::new(4);
		assert_eq!(t.set("a".to_string(), 1), None);
		assert_eq!(t.set("a".to_string(), 2), Some(1));
		assert_eq!(t.get(&"a".to_string()), Some(&2));
	}

	#[test]
	fn del_removes_and_get_then_fails() {
		let mut t: Table<String, i32> = Table::new(4);
		t.set("a".to_string(), 1);
		assert_eq!(t.del(&"a".to_string()), Some(1));
		assert_eq!(t.get(&"a".to_string()), None);
		assert_eq!(t.del(&"a".to_string()), None);
	}

	#[test]
	fn rebuild_preserves_all_entries_under_load() {
		let mut t: Table<String, i32> = Table::new(4);
		for i in 0..200 {
			t.set(format!("key{i}"), i);
		}
		assert_eq!(t.len(), 200);
		for i in 0..200 {
			assert_eq!(t.get(&format!("key{i}")), Some(&i));
		}
	}

	#[test]
	fn iter_visits_every_occupied_slot_exactly_once() {
		let mut t: Table<String, i32> = Table::new(8);
		for i in 0..20 {
			t.set(format!("key{i}"), i);
		}
		let mut seen: Vec<i32> = t.iter().map(|(_, v)| *v).collect();
		seen.sort_unstable();
		assert_eq!(seen, (0..20).collect::<Vec<_>>());
	}
}
