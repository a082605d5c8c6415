//! Replacement policies for victim selection within a cache set.
//!
//! A policy owns the bookkeeping needed to pick which entry of a full set
//! to evict. The cache drives it through a fixed set of transitions, one
//! per mutation, so the bookkeeping stays consistent with the stored
//! entries without the policy ever seeing keys or values — only tags.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                      ReplacementPolicy variants                      │
//! │                                                                      │
//! │   Lru / Mru ──► RecencyState                                         │
//! │                 per-set FxHashMap<tag, stamp> + one logical clock    │
//! │                 victim = min stamp (LRU) / max stamp (MRU)           │
//! │                                                                      │
//! │   Fifo      ──► FifoState                                            │
//! │                 ONE global VecDeque<tag>, shared by every set;       │
//! │                 victim = first queued tag that lives in this set     │
//! │                 (other sets' tags are skipped, not popped)           │
//! │                                                                      │
//! │   Fixed     ──► stateless; victim = slot 0                          │
//! │                                                                      │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transition Table
//!
//! | Variant | `select_victim`          | `on_insert` | `on_access` | `on_replace(old,new)`  | `on_remove` |
//! |---------|--------------------------|-------------|-------------|------------------------|-------------|
//! | LRU     | min stamp in set         | stamp `tag` | re-stamp    | drop `old`, stamp `new`| drop stamp  |
//! | MRU     | max stamp in set         | stamp `tag` | re-stamp    | drop `old`, stamp `new`| drop stamp  |
//! | FIFO    | head-scan global queue   | push tail   | no-op       | push `new` to tail     | no-op       |
//! | Fixed   | slot 0                   | no-op       | no-op       | no-op                  | no-op       |
//!
//! Ties in the LRU/MRU stamp comparison break toward the first slot
//! encountered. The FIFO queue is deliberately cache-wide rather than
//! per-set: removed or replaced tags stay queued until a victim scan walks
//! past them, so unrelated sets share scan cost. This mirrors the modeled
//! hardware bookkeeping and is kept as-is.
//!
//! ## Cost
//!
//! LRU/MRU/Fixed select in O(slots). FIFO selection is O(queue length) in
//! the worst case, and the queue grows with every insertion cache-wide.

use std::collections::VecDeque;

use log::trace;
use rustc_hash::FxHashMap;

// ---------------------------------------------------------------------------
// PolicyKind
// ---------------------------------------------------------------------------

/// The closed set of replacement policies a cache can be built with.
///
/// # Example
///
/// ```
/// use waycache::policy::PolicyKind;
///
/// assert_eq!(PolicyKind::from_name("mru"), PolicyKind::Mru);
/// // Unrecognized names silently select the fixed-slot fallback.
/// assert_eq!(PolicyKind::from_name("belady"), PolicyKind::Fixed);
/// assert_eq!(PolicyKind::default(), PolicyKind::Lru);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Least Recently Used: evict the entry with the oldest access stamp.
    Lru,
    /// Most Recently Used: evict the entry with the newest access stamp.
    Mru,
    /// First In, First Out: evict in global insertion order.
    Fifo,
    /// Fixed-slot fallback: always evict slot 0. Selected for any
    /// unrecognized policy name; an extension point, not a real policy.
    Fixed,
}

impl PolicyKind {
    /// Resolves a policy by name: `"lru"`, `"mru"`, or `"fifo"`.
    ///
    /// Any other name falls back to [`PolicyKind::Fixed`].
    pub fn from_name(name: &str) -> Self {
        match name {
            "lru" => PolicyKind::Lru,
            "mru" => PolicyKind::Mru,
            "fifo" => PolicyKind::Fifo,
            _ => PolicyKind::Fixed,
        }
    }

    /// Returns the canonical lowercase name of the policy.
    pub fn name(&self) -> &'static str {
        match self {
            PolicyKind::Lru => "lru",
            PolicyKind::Mru => "mru",
            PolicyKind::Fifo => "fifo",
            PolicyKind::Fixed => "fixed",
        }
    }
}

impl Default for PolicyKind {
    /// LRU is the default policy.
    fn default() -> Self {
        PolicyKind::Lru
    }
}

impl From<&str> for PolicyKind {
    fn from(name: &str) -> Self {
        PolicyKind::from_name(name)
    }
}

// ---------------------------------------------------------------------------
// Per-variant bookkeeping
// ---------------------------------------------------------------------------

/// Recency bookkeeping shared by LRU and MRU.
///
/// One stamp map per set, plus a single monotonically increasing logical
/// clock. The clock only needs to order accesses, so a plain counter
/// replaces wall time.
#[derive(Debug)]
pub struct RecencyState {
    stamps: Vec<FxHashMap<u64, u64>>,
    clock: u64,
}

impl RecencyState {
    fn new(sets: usize) -> Self {
        Self {
            stamps: (0..sets).map(|_| FxHashMap::default()).collect(),
            clock: 0,
        }
    }

    /// Records `tag` as touched now.
    #[inline]
    fn touch(&mut self, set_num: usize, tag: u64) {
        self.clock += 1;
        self.stamps[set_num].insert(tag, self.clock);
    }

    #[inline]
    fn forget(&mut self, set_num: usize, tag: u64) {
        self.stamps[set_num].remove(&tag);
    }

    #[inline]
    fn stamp(&self, set_num: usize, tag: u64) -> Option<u64> {
        self.stamps[set_num].get(&tag).copied()
    }

    fn clear(&mut self) {
        for map in &mut self.stamps {
            map.clear();
        }
        self.clock = 0;
    }
}

/// FIFO bookkeeping: one insertion-ordered queue of tags for the whole
/// cache, not one per set.
#[derive(Debug, Default)]
pub struct FifoState {
    queue: VecDeque<u64>,
}

impl FifoState {
    /// Pops the first queued tag that belongs to this set and returns its
    /// slot index. Tags belonging to other sets are skipped in place.
    fn pop_victim(&mut self, tags: &[u64]) -> Option<usize> {
        let pos = self.queue.iter().position(|tag| tags.contains(tag))?;
        let tag = self.queue.remove(pos)?;
        tags.iter().position(|&t| t == tag)
    }
}

// ---------------------------------------------------------------------------
// ReplacementPolicy
// ---------------------------------------------------------------------------

/// A replacement policy with its per-variant bookkeeping.
///
/// Dispatch is a `match` over the variant; each arm owns exactly the state
/// its algorithm needs. The cache calls one transition per mutation:
/// `on_insert` after an append, `on_access` after a verified `get`,
/// `on_replace` after an overwrite, `on_remove` after a deletion.
///
/// # Example
///
/// ```
/// use waycache::policy::{PolicyKind, ReplacementPolicy};
///
/// let mut policy = ReplacementPolicy::new(PolicyKind::Lru, 1);
/// policy.on_insert(0, 10);
/// policy.on_insert(0, 20);
/// policy.on_access(0, 10); // 10 is now the most recent
///
/// // Least recently touched tag (20) sits at slot index 1.
/// assert_eq!(policy.select_victim(0, &[10, 20]), 1);
/// ```
#[derive(Debug)]
pub enum ReplacementPolicy {
    /// Least Recently Used.
    Lru(RecencyState),
    /// Most Recently Used.
    Mru(RecencyState),
    /// First In, First Out over a cache-wide queue.
    Fifo(FifoState),
    /// Fixed-slot fallback.
    Fixed,
}

impl ReplacementPolicy {
    /// Creates the bookkeeping for `kind` across `sets` independent sets.
    pub fn new(kind: PolicyKind, sets: usize) -> Self {
        match kind {
            PolicyKind::Lru => ReplacementPolicy::Lru(RecencyState::new(sets)),
            PolicyKind::Mru => ReplacementPolicy::Mru(RecencyState::new(sets)),
            PolicyKind::Fifo => ReplacementPolicy::Fifo(FifoState::default()),
            PolicyKind::Fixed => ReplacementPolicy::Fixed,
        }
    }

    /// Returns which policy variant this is.
    pub fn kind(&self) -> PolicyKind {
        match self {
            ReplacementPolicy::Lru(_) => PolicyKind::Lru,
            ReplacementPolicy::Mru(_) => PolicyKind::Mru,
            ReplacementPolicy::Fifo(_) => PolicyKind::Fifo,
            ReplacementPolicy::Fixed => PolicyKind::Fixed,
        }
    }

    /// Chooses the slot to evict from a full set.
    ///
    /// `tags` holds the set's entry tags in slot order. Takes `&mut self`
    /// because FIFO consumes the chosen tag from its queue. Ties break
    /// toward the first slot encountered; a FIFO queue with no tag for
    /// this set falls back to slot 0.
    pub fn select_victim(&mut self, set_num: usize, tags: &[u64]) -> usize {
        debug_assert!(!tags.is_empty(), "victim selection on an empty set");
        let victim = match self {
            ReplacementPolicy::Lru(state) => {
                let mut victim = 0;
                let mut best = u64::MAX;
                for (i, &tag) in tags.iter().enumerate() {
                    let stamp = state.stamp(set_num, tag).unwrap_or(0);
                    if stamp < best {
                        best = stamp;
                        victim = i;
                    }
                }
                victim
            },
            ReplacementPolicy::Mru(state) => {
                let mut victim = 0;
                let mut best = 0;
                for (i, &tag) in tags.iter().enumerate() {
                    let stamp = state.stamp(set_num, tag).unwrap_or(0);
                    if stamp > best {
                        best = stamp;
                        victim = i;
                    }
                }
                victim
            },
            ReplacementPolicy::Fifo(state) => state.pop_victim(tags).unwrap_or(0),
            ReplacementPolicy::Fixed => 0,
        };
        trace!("select_victim(set={}) -> slot {}", set_num, victim);
        victim
    }

    /// Transition after an entry is appended to a set with free capacity.
    pub fn on_insert(&mut self, set_num: usize, tag: u64) {
        match self {
            ReplacementPolicy::Lru(state) | ReplacementPolicy::Mru(state) => {
                state.touch(set_num, tag);
            },
            ReplacementPolicy::Fifo(state) => state.queue.push_back(tag),
            ReplacementPolicy::Fixed => {},
        }
    }

    /// Transition after a `get` verifies an entry. Access never reorders
    /// the FIFO queue.
    pub fn on_access(&mut self, set_num: usize, tag: u64) {
        match self {
            ReplacementPolicy::Lru(state) | ReplacementPolicy::Mru(state) => {
                state.touch(set_num, tag);
            },
            ReplacementPolicy::Fifo(_) | ReplacementPolicy::Fixed => {},
        }
    }

    /// Transition after an entry's tag changes in place (eviction overwrite
    /// or value update).
    ///
    /// Under FIFO only the new tag is queued; the old one stays until a
    /// victim scan walks past it.
    pub fn on_replace(&mut self, set_num: usize, old_tag: u64, new_tag: u64) {
        match self {
            ReplacementPolicy::Lru(state) | ReplacementPolicy::Mru(state) => {
                state.forget(set_num, old_tag);
                state.touch(set_num, new_tag);
            },
            ReplacementPolicy::Fifo(state) => state.queue.push_back(new_tag),
            ReplacementPolicy::Fixed => {},
        }
    }

    /// Transition after an entry is deleted. FIFO leaves the tag queued.
    pub fn on_remove(&mut self, set_num: usize, tag: u64) {
        match self {
            ReplacementPolicy::Lru(state) | ReplacementPolicy::Mru(state) => {
                state.forget(set_num, tag);
            },
            ReplacementPolicy::Fifo(_) | ReplacementPolicy::Fixed => {},
        }
    }

    /// Wipes all bookkeeping: every stamp map, the queue, and the clock.
    pub fn clear(&mut self) {
        match self {
            ReplacementPolicy::Lru(state) | ReplacementPolicy::Mru(state) => state.clear(),
            ReplacementPolicy::Fifo(state) => state.queue.clear(),
            ReplacementPolicy::Fixed => {},
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // ==============================================
    // PolicyKind Resolution
    // ==============================================

    mod kind_resolution {
        use super::*;

        #[test]
        fn known_names_resolve() {
            assert_eq!(PolicyKind::from_name("lru"), PolicyKind::Lru);
            assert_eq!(PolicyKind::from_name("mru"), PolicyKind::Mru);
            assert_eq!(PolicyKind::from_name("fifo"), PolicyKind::Fifo);
        }

        #[test]
        fn unknown_names_fall_back_to_fixed() {
            assert_eq!(PolicyKind::from_name("lfu"), PolicyKind::Fixed);
            assert_eq!(PolicyKind::from_name(""), PolicyKind::Fixed);
            assert_eq!(PolicyKind::from_name("LRU"), PolicyKind::Fixed);
        }

        #[test]
        fn default_is_lru() {
            assert_eq!(PolicyKind::default(), PolicyKind::Lru);
        }

        #[test]
        fn name_round_trips_for_real_policies() {
            for kind in [PolicyKind::Lru, PolicyKind::Mru, PolicyKind::Fifo] {
                assert_eq!(PolicyKind::from_name(kind.name()), kind);
            }
        }

        #[test]
        fn from_str_matches_from_name() {
            assert_eq!(PolicyKind::from("fifo"), PolicyKind::Fifo);
            assert_eq!(PolicyKind::from("nonsense"), PolicyKind::Fixed);
        }

        #[test]
        fn new_policy_reports_its_kind() {
            for kind in [
                PolicyKind::Lru,
                PolicyKind::Mru,
                PolicyKind::Fifo,
                PolicyKind::Fixed,
            ] {
                assert_eq!(ReplacementPolicy::new(kind, 4).kind(), kind);
            }
        }
    }

    // ==============================================
    // LRU Selection
    // ==============================================

    mod lru_selection {
        use super::*;

        #[test]
        fn selects_least_recently_inserted() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Lru, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);
            policy.on_insert(0, 30);

            assert_eq!(policy.select_victim(0, &[10, 20, 30]), 0);
        }

        #[test]
        fn access_protects_a_tag() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Lru, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);
            policy.on_access(0, 10);

            // 20 is now the least recently touched.
            assert_eq!(policy.select_victim(0, &[10, 20]), 1);
        }

        #[test]
        fn replace_drops_old_stamp_and_stamps_new() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Lru, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);
            policy.on_replace(0, 10, 30);

            // 20 is now the oldest surviving stamp; 30 is freshest.
            assert_eq!(policy.select_victim(0, &[30, 20]), 1);
        }

        #[test]
        fn sets_are_independent() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Lru, 2);
            policy.on_insert(0, 10);
            policy.on_insert(1, 20);
            policy.on_insert(0, 30);
            policy.on_access(0, 10);

            // Set 0 ordering is unaffected by set 1 traffic.
            assert_eq!(policy.select_victim(0, &[10, 30]), 1);
        }
    }

    // ==============================================
    // MRU Selection
    // ==============================================

    mod mru_selection {
        use super::*;

        #[test]
        fn selects_most_recently_inserted() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Mru, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);
            policy.on_insert(0, 30);

            assert_eq!(policy.select_victim(0, &[10, 20, 30]), 2);
        }

        #[test]
        fn access_exposes_a_tag() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Mru, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);
            policy.on_access(0, 10);

            // 10 is now the most recently touched.
            assert_eq!(policy.select_victim(0, &[10, 20]), 0);
        }

        #[test]
        fn remove_drops_the_stamp() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Mru, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);
            policy.on_remove(0, 20);

            // With 20 forgotten, 10 carries the only (and maximum) stamp.
            assert_eq!(policy.select_victim(0, &[10, 20]), 0);
        }
    }

    // ==============================================
    // FIFO Selection
    // ==============================================

    mod fifo_selection {
        use super::*;

        #[test]
        fn selects_in_insertion_order() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Fifo, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);

            assert_eq!(policy.select_victim(0, &[10, 20]), 0);
            // 10 was consumed; 20 is next.
            assert_eq!(policy.select_victim(0, &[20, 30]), 0);
        }

        #[test]
        fn access_does_not_reorder() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Fifo, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);
            policy.on_access(0, 10);
            policy.on_access(0, 10);

            assert_eq!(policy.select_victim(0, &[10, 20]), 0);
        }

        #[test]
        fn skips_tags_from_other_sets() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Fifo, 2);
            policy.on_insert(0, 10);
            policy.on_insert(1, 20);
            policy.on_insert(1, 30);

            // Head tag 10 belongs to set 0; it must be skipped, not popped.
            assert_eq!(policy.select_victim(1, &[20, 30]), 0);
            // 10 is still queued and is chosen for set 0.
            assert_eq!(policy.select_victim(0, &[10, 40]), 0);
        }

        #[test]
        fn replace_queues_only_the_new_tag() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Fifo, 1);
            policy.on_insert(0, 10);
            policy.on_replace(0, 10, 20);

            // Stale 10 sits at the head but no longer lives in the set.
            assert_eq!(policy.select_victim(0, &[20]), 0);
        }

        #[test]
        fn empty_queue_falls_back_to_slot_zero() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Fifo, 1);
            assert_eq!(policy.select_victim(0, &[10, 20]), 0);
        }
    }

    // ==============================================
    // Fixed Fallback and Clear
    // ==============================================

    mod fixed_and_clear {
        use super::*;

        #[test]
        fn fixed_always_selects_slot_zero() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Fixed, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);
            policy.on_access(0, 20);

            assert_eq!(policy.select_victim(0, &[10, 20]), 0);
            assert_eq!(policy.select_victim(0, &[20, 10]), 0);
        }

        #[test]
        fn clear_wipes_recency_state() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Lru, 1);
            policy.on_insert(0, 10);
            policy.on_insert(0, 20);
            policy.clear();

            policy.on_insert(0, 20);
            policy.on_insert(0, 10);

            // Post-clear insertion order decides, not the pre-clear stamps.
            assert_eq!(policy.select_victim(0, &[10, 20]), 1);
        }

        #[test]
        fn clear_wipes_the_fifo_queue() {
            let mut policy = ReplacementPolicy::new(PolicyKind::Fifo, 1);
            policy.on_insert(0, 10);
            policy.clear();

            policy.on_insert(0, 20);
            policy.on_insert(0, 10);

            assert_eq!(policy.select_victim(0, &[10, 20]), 1);
        }
    }
}
