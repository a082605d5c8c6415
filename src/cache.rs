//! Set-associative cache with structural hashing and pluggable eviction.
//!
//! Models a hardware-style cache: fixed capacity, partitioned into
//! `size / slots` independent sets of `slots` entries each. A key maps to
//! exactly one set; within the set, entries are verified by *tag* rather
//! than by stored key.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                      SetAssociativeCache<V>                          │
//! │                                                                      │
//! │   set_num = hash(key) % sets                                         │
//! │   tag     = pair_hash(hash(key), hash(value))                        │
//! │                                                                      │
//! │   sets: Vec<Vec<Entry>>          Entry { tag: u64, value: V }        │
//! │   ┌──────────────────────────┐                                       │
//! │   │ set 0: [E] [E]           │   put ──► free slot? append           │
//! │   │ set 1: [E]               │            full? policy picks victim  │
//! │   │ set 2: [E] [E]           │   get ──► scan set, recompute tag     │
//! │   │ set 3:                   │            per entry, compare         │
//! │   └──────────────────────────┘                                       │
//! │                                                                      │
//! │   policy: ReplacementPolicy   hits / misses: u64                     │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The tag binds a specific key/value *pairing*: the same key stored with
//! two different values produces two different tags, and `put` performs no
//! deduplication, so both entries may coexist in a set. `get` verifies an
//! entry by recomputing `pair_hash(hash(key), hash(entry.value))` and
//! comparing it to the stored tag, which is how a bucket holds
//! differently-valued entries without retaining raw keys.
//!
//! ## Operations
//!
//! | Operation | Cost (per set)  | Counter effect        |
//! |-----------|-----------------|-----------------------|
//! | `put`     | O(slots)        | none                  |
//! | `get`     | O(slots) hashes | hit or miss           |
//! | `update`  | O(slots) hashes | hit or miss (as `get`)|
//! | `remove`  | O(slots) hashes | none                  |
//! | `clear`   | O(size)         | both reset to zero    |
//!
//! FIFO victim selection additionally scans the cache-wide queue; see the
//! [`policy`](crate::policy) module.
//!
//! ## Example Usage
//!
//! ```
//! use waycache::cache::SetAssociativeCache;
//! use waycache::policy::PolicyKind;
//!
//! let mut cache = SetAssociativeCache::try_new(2, 8, PolicyKind::Lru).unwrap();
//!
//! cache.put("alpha", 1).unwrap();
//! cache.put("beta", 2).unwrap();
//!
//! assert_eq!(cache.get("alpha").unwrap(), Some(&1));
//! assert_eq!(cache.get("gamma").unwrap(), None);
//! assert_eq!(cache.hits(), 1);
//! assert_eq!(cache.misses(), 1);
//! ```
//!
//! ## Thread Safety
//!
//! Not thread-safe. `put`/`update`/`remove` mutate a set's entry list and
//! the policy bookkeeping as one unit, so concurrent callers need external
//! synchronization around whole operations. Under FIFO the queue spans all
//! sets, so a cache-wide lock is required there even if sets are otherwise
//! locked independently.

use log::{debug, trace};

use crate::error::{ConfigError, HashError};
use crate::hash::{pair_hash, CanonicalHash};
use crate::policy::{PolicyKind, ReplacementPolicy};

/// One stored entry: a tag binding the key/value pairing, and the value.
#[derive(Debug)]
struct Entry<V> {
    tag: u64,
    value: V,
}

/// A fixed-capacity set-associative key/value cache.
///
/// Keys are borrowed per operation and never stored; any `K: CanonicalHash`
/// works, including unsized types like `str`. Values must themselves be
/// canonically hashable because `get` re-derives each entry's tag from the
/// stored value.
///
/// # Type Parameters
///
/// - `V`: Value type, must implement [`CanonicalHash`]
///
/// # Example
///
/// ```
/// use waycache::cache::SetAssociativeCache;
/// use waycache::policy::PolicyKind;
///
/// let mut cache = SetAssociativeCache::try_new(2, 8, PolicyKind::from_name("fifo")).unwrap();
/// cache.put(&1u64, "one".to_string()).unwrap();
/// assert_eq!(cache.get(&1u64).unwrap(), Some(&"one".to_string()));
/// ```
pub struct SetAssociativeCache<V> {
    /// `sets` bounded entry lists, each holding at most `slots` entries.
    sets: Vec<Vec<Entry<V>>>,
    slots: usize,
    policy: ReplacementPolicy,
    hits: u64,
    misses: u64,
}

impl<V: CanonicalHash> SetAssociativeCache<V> {
    /// Creates a cache with `slots`-way sets and `size` total capacity.
    ///
    /// `size` must be a positive multiple of `slots`; the set count is
    /// `size / slots`. A non-multiple is rejected here rather than
    /// silently truncating usable capacity.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when `slots == 0`, `size == 0`, or
    /// `size % slots != 0`.
    ///
    /// # Example
    ///
    /// ```
    /// use waycache::cache::SetAssociativeCache;
    /// use waycache::policy::PolicyKind;
    ///
    /// let cache = SetAssociativeCache::<i32>::try_new(2, 8, PolicyKind::Lru).unwrap();
    /// assert_eq!(cache.slots(), 2);
    /// assert_eq!(cache.sets(), 4);
    /// assert_eq!(cache.capacity(), 8);
    ///
    /// assert!(SetAssociativeCache::<i32>::try_new(3, 8, PolicyKind::Lru).is_err());
    /// ```
    pub fn try_new(slots: usize, size: usize, kind: PolicyKind) -> Result<Self, ConfigError> {
        if slots == 0 {
            return Err(ConfigError::new("slots must be > 0"));
        }
        if size == 0 {
            return Err(ConfigError::new("size must be > 0"));
        }
        if size % slots != 0 {
            return Err(ConfigError::new(format!(
                "size ({}) must be a multiple of slots ({})",
                size, slots
            )));
        }

        let sets = size / slots;
        debug!(
            "new cache: slots={}, size={}, sets={}, policy={}",
            slots,
            size,
            sets,
            kind.name()
        );
        Ok(Self {
            sets: (0..sets).map(|_| Vec::with_capacity(slots)).collect(),
            slots,
            policy: ReplacementPolicy::new(kind, sets),
            hits: 0,
            misses: 0,
        })
    }

    /// Stores `value` under `key`, evicting per policy if the set is full.
    ///
    /// No deduplication is performed: putting an already-present key with a
    /// new value adds a second entry (distinct tag) rather than replacing
    /// the first. Use [`update`](Self::update) to replace in place.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the key or value cannot be canonically
    /// hashed; the cache is unchanged in that case.
    pub fn put<K>(&mut self, key: &K, value: V) -> Result<(), HashError>
    where
        K: CanonicalHash + ?Sized,
    {
        let key_hash = key.canonical_hash()?;
        let tag = pair_hash(key_hash, value.canonical_hash()?);
        let set_num = self.set_num(key_hash);

        if self.sets[set_num].len() < self.slots {
            trace!("put: append tag {:#018x} to set {}", tag, set_num);
            self.sets[set_num].push(Entry { tag, value });
            self.policy.on_insert(set_num, tag);
        } else {
            let tags: Vec<u64> = self.sets[set_num].iter().map(|e| e.tag).collect();
            let victim = self.policy.select_victim(set_num, &tags);
            let old_tag = self.sets[set_num][victim].tag;
            debug!(
                "put: evict slot {} (tag {:#018x}) of set {} for tag {:#018x}",
                victim, old_tag, set_num, tag
            );
            self.sets[set_num][victim] = Entry { tag, value };
            self.policy.on_replace(set_num, old_tag, tag);
        }

        #[cfg(debug_assertions)]
        self.validate_invariants();
        Ok(())
    }

    /// Looks up `key`, counting a hit or a miss.
    ///
    /// Scans the key's set, recomputing each entry's candidate tag from the
    /// stored value. A match counts a hit and refreshes the policy's access
    /// bookkeeping; scanning the whole set without a match counts a miss.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the key or a scanned value cannot be
    /// hashed; counters are untouched in that case.
    pub fn get<K>(&mut self, key: &K) -> Result<Option<&V>, HashError>
    where
        K: CanonicalHash + ?Sized,
    {
        let key_hash = key.canonical_hash()?;
        let set_num = self.set_num(key_hash);

        match self.scan(set_num, key_hash)? {
            Some((slot, tag)) => {
                self.hits += 1;
                self.policy.on_access(set_num, tag);
                Ok(Some(&self.sets[set_num][slot].value))
            },
            None => {
                self.misses += 1;
                Ok(None)
            },
        }
    }

    /// Replaces the value stored under `key`, returning the set index.
    ///
    /// Locates the entry with the same scan as [`get`](Self::get),
    /// including its hit/miss counting and access bookkeeping; an update is
    /// deliberately also a lookup. On a match the entry's value and tag are
    /// overwritten in place and `Ok(Some(set_index))` is returned. A
    /// missing key yields `Ok(None)`, a sentinel disjoint from every valid
    /// set index.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the key, a scanned value, or the new value
    /// cannot be hashed.
    pub fn update<K>(&mut self, key: &K, new_value: V) -> Result<Option<usize>, HashError>
    where
        K: CanonicalHash + ?Sized,
    {
        let key_hash = key.canonical_hash()?;
        let set_num = self.set_num(key_hash);

        let Some((slot, old_tag)) = self.scan(set_num, key_hash)? else {
            self.misses += 1;
            return Ok(None);
        };
        self.hits += 1;
        self.policy.on_access(set_num, old_tag);

        let new_tag = pair_hash(key_hash, new_value.canonical_hash()?);
        trace!(
            "update: set {} slot {} tag {:#018x} -> {:#018x}",
            set_num,
            slot,
            old_tag,
            new_tag
        );
        self.sets[set_num][slot] = Entry {
            tag: new_tag,
            value: new_value,
        };
        self.policy.on_replace(set_num, old_tag, new_tag);
        Ok(Some(set_num))
    }

    /// Removes the entry stored under `key` and returns its value.
    ///
    /// Scans like [`get`](Self::get) but touches neither counter, whether
    /// or not the key is present. A missing key yields `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the key or a scanned value cannot be
    /// hashed; the cache is unchanged in that case.
    pub fn remove<K>(&mut self, key: &K) -> Result<Option<V>, HashError>
    where
        K: CanonicalHash + ?Sized,
    {
        let key_hash = key.canonical_hash()?;
        let set_num = self.set_num(key_hash);

        let Some((slot, tag)) = self.scan(set_num, key_hash)? else {
            return Ok(None);
        };
        trace!("remove: set {} slot {} tag {:#018x}", set_num, slot, tag);
        self.policy.on_remove(set_num, tag);
        let entry = self.sets[set_num].remove(slot);

        #[cfg(debug_assertions)]
        self.validate_invariants();
        Ok(Some(entry.value))
    }

    /// Empties every set, wipes the policy bookkeeping, and zeroes both
    /// counters.
    pub fn clear(&mut self) {
        debug!("clear: dropping {} entries", self.len());
        for set in &mut self.sets {
            set.clear();
        }
        self.policy.clear();
        self.hits = 0;
        self.misses = 0;
    }

    /// Finds the slot holding `key` in `set_num`, verifying by tag.
    ///
    /// Returns the slot index and the stored tag of the first entry whose
    /// recomputed candidate tag matches.
    fn scan(&self, set_num: usize, key_hash: u64) -> Result<Option<(usize, u64)>, HashError> {
        for (slot, entry) in self.sets[set_num].iter().enumerate() {
            let candidate = pair_hash(key_hash, entry.value.canonical_hash()?);
            if candidate == entry.tag {
                return Ok(Some((slot, entry.tag)));
            }
        }
        Ok(None)
    }

    #[inline]
    fn set_num(&self, key_hash: u64) -> usize {
        (key_hash % self.sets.len() as u64) as usize
    }

    /// Validates that no set has outgrown its slot bound.
    ///
    /// Only runs when debug assertions are enabled.
    #[cfg(debug_assertions)]
    fn validate_invariants(&self) {
        for (i, set) in self.sets.iter().enumerate() {
            debug_assert!(
                set.len() <= self.slots,
                "set {} holds {} entries, bound is {}",
                i,
                set.len(),
                self.slots
            );
        }
    }
}

impl<V> SetAssociativeCache<V> {
    /// Returns the number of cache hits since construction or [`clear`](Self::clear).
    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    /// Returns the number of cache misses since construction or [`clear`](Self::clear).
    #[inline]
    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Returns the number of entries currently stored across all sets.
    #[inline]
    pub fn len(&self) -> usize {
        self.sets.iter().map(Vec::len).sum()
    }

    /// Returns `true` if no set holds any entry.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sets.iter().all(Vec::is_empty)
    }

    /// Returns the total capacity (`slots * sets`).
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots * self.sets.len()
    }

    /// Returns the associativity: entries per set.
    #[inline]
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Returns the number of independent sets.
    #[inline]
    pub fn sets(&self) -> usize {
        self.sets.len()
    }

    /// Returns which replacement policy the cache was built with.
    #[inline]
    pub fn policy_kind(&self) -> PolicyKind {
        self.policy.kind()
    }
}

impl<V> std::fmt::Debug for SetAssociativeCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetAssociativeCache")
            .field("slots", &self.slots)
            .field("sets", &self.sets.len())
            .field("policy", &self.policy.kind())
            .field("len", &self.len())
            .field("hits", &self.hits)
            .field("misses", &self.misses)
            .finish_non_exhaustive()
    }
}
