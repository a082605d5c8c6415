//! Canonical structural hashing for cache keys and values.
//!
//! The cache never stores raw keys. It stores a *tag* derived from the
//! hashes of the key and the value, so both sides of an entry must reduce
//! to a deterministic 64-bit hash. This module defines that reduction.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                     CanonicalHash reduction                        │
//! │                                                                    │
//! │   primitive          ──► FxHasher over the raw value               │
//! │   ordered sequence   ──► child hashes, in order  ──► FxHasher      │
//! │   unordered set/map  ──► child hashes, wrapping-sum (commutative)  │
//! │   user-defined type  ──► its own impl (std Hash fallback)          │
//! │                                                                    │
//! │   tag = pair_hash(hash(key), hash(value))                          │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reduction Rules
//!
//! | Shape                | Reduction                  | Order-sensitive |
//! |----------------------|----------------------------|-----------------|
//! | integers, bool, char | direct hash                | -               |
//! | `str` / `String`     | direct hash (agree)        | -               |
//! | `f32` / `f64`        | bit hash, `-0.0` → `0.0`   | -               |
//! | tuples, `Vec`, `[T]` | [`combine_ordered`]        | yes             |
//! | `HashSet`/`BTreeSet` | [`combine_unordered`]      | no              |
//! | `HashMap`/`BTreeMap` | unordered over entry pairs | no              |
//!
//! ## Contract
//!
//! Equal inputs (per the type's own `==`) yield equal hashes. Determinism
//! holds across runs: the reducer is [`FxHasher`], which carries no random
//! seed. There is no collision-resistance requirement.
//!
//! ## Failure
//!
//! Hashing is fallible. A NaN float has no equality-consistent hash, and a
//! structure nested deeper than [`MAX_DEPTH`] cannot be normalized (this is
//! the guard that turns a cyclic or degenerate user structure into a
//! [`HashError`] instead of a stack overflow). A failure aborts only the
//! enclosing cache operation.
//!
//! ## Example Usage
//!
//! ```
//! use waycache::hash::CanonicalHash;
//!
//! // Ordered sequences are order-sensitive
//! let a = vec![1u64, 2, 3].canonical_hash().unwrap();
//! let b = vec![3u64, 2, 1].canonical_hash().unwrap();
//! assert_ne!(a, b);
//!
//! // Equal values always agree
//! assert_eq!(a, vec![1u64, 2, 3].canonical_hash().unwrap());
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::hash::{Hash, Hasher};

use rustc_hash::FxHasher;

use crate::error::HashError;

/// Maximum nesting depth the hasher will normalize before giving up.
pub const MAX_DEPTH: usize = 64;

/// A type that can be reduced to a deterministic structural hash.
///
/// Implementations for containers recurse into their children through
/// [`canonical_hash_at`](CanonicalHash::canonical_hash_at), threading a
/// depth counter checked by [`descend`]. User-defined types with an
/// equality-consistent [`std::hash::Hash`] can delegate to [`hash_value`]:
///
/// ```
/// use waycache::error::HashError;
/// use waycache::hash::{hash_value, CanonicalHash};
///
/// #[derive(Hash, PartialEq, Eq)]
/// struct UserId(u64);
///
/// impl CanonicalHash for UserId {
///     fn canonical_hash_at(&self, _depth: usize) -> Result<u64, HashError> {
///         Ok(hash_value(self))
///     }
/// }
///
/// assert_eq!(
///     UserId(7).canonical_hash().unwrap(),
///     UserId(7).canonical_hash().unwrap(),
/// );
/// ```
pub trait CanonicalHash {
    /// Computes the structural hash of `self`.
    #[inline]
    fn canonical_hash(&self) -> Result<u64, HashError> {
        self.canonical_hash_at(0)
    }

    /// Depth-tracked hash used by recursive container implementations.
    ///
    /// `depth` is the current nesting level; implementations that recurse
    /// must pass `descend(depth)?` to their children.
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError>;
}

/// Checks the nesting depth and returns the depth for child reductions.
///
/// Errors once [`MAX_DEPTH`] is reached.
#[inline]
pub fn descend(depth: usize) -> Result<usize, HashError> {
    if depth >= MAX_DEPTH {
        Err(HashError::new(
            "structure nested too deeply to normalize for hashing",
        ))
    } else {
        Ok(depth + 1)
    }
}

/// Hashes a value through its `std::hash::Hash` impl with a seed-free hasher.
///
/// This is the fallback for user-defined types: whatever equality the type
/// provides, its `Hash` impl is required (by the `Hash` contract) to agree
/// with it, which is exactly the guarantee the cache needs.
#[inline]
pub fn hash_value<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = FxHasher::default();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Order-sensitive reduction over child hashes.
///
/// Feeds each child hash, then the element count, into a fresh hasher.
pub fn combine_ordered<I>(children: I) -> Result<u64, HashError>
where
    I: IntoIterator<Item = Result<u64, HashError>>,
{
    let mut hasher = FxHasher::default();
    let mut len = 0u64;
    for child in children {
        hasher.write_u64(child?);
        len += 1;
    }
    hasher.write_u64(len);
    Ok(hasher.finish())
}

/// Order-insensitive reduction over child hashes.
///
/// Child hashes are combined with a commutative wrapping sum, so any
/// iteration order of an unordered collection produces the same result.
pub fn combine_unordered<I>(children: I) -> Result<u64, HashError>
where
    I: IntoIterator<Item = Result<u64, HashError>>,
{
    let mut sum = 0u64;
    let mut len = 0u64;
    for child in children {
        sum = sum.wrapping_add(child?);
        len += 1;
    }
    let mut hasher = FxHasher::default();
    hasher.write_u64(sum);
    hasher.write_u64(len);
    Ok(hasher.finish())
}

/// Combines two hashes into one, order-sensitively.
///
/// The cache's entry tag is `pair_hash(hash(key), hash(value))`, binding a
/// specific key/value pairing rather than the key alone.
#[inline]
pub fn pair_hash(a: u64, b: u64) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write_u64(a);
    hasher.write_u64(b);
    hasher.finish()
}

// ---------------------------------------------------------------------------
// Primitive implementations
// ---------------------------------------------------------------------------

macro_rules! impl_canonical_primitive {
    ($($t:ty),* $(,)?) => {$(
        impl CanonicalHash for $t {
            #[inline]
            fn canonical_hash_at(&self, _depth: usize) -> Result<u64, HashError> {
                Ok(hash_value(self))
            }
        }
    )*};
}

impl_canonical_primitive!(
    u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, bool, char, (), str, String,
);

impl CanonicalHash for f64 {
    /// NaN compares unequal to itself, so it has no equality-consistent
    /// hash; `-0.0` and `0.0` compare equal, so they must hash alike.
    fn canonical_hash_at(&self, _depth: usize) -> Result<u64, HashError> {
        if self.is_nan() {
            return Err(HashError::new("NaN has no canonical hash"));
        }
        let bits = if *self == 0.0 { 0.0f64.to_bits() } else { self.to_bits() };
        Ok(hash_value(&bits))
    }
}

impl CanonicalHash for f32 {
    fn canonical_hash_at(&self, _depth: usize) -> Result<u64, HashError> {
        if self.is_nan() {
            return Err(HashError::new("NaN has no canonical hash"));
        }
        let bits = if *self == 0.0 { 0.0f32.to_bits() } else { self.to_bits() };
        Ok(hash_value(&bits))
    }
}

// ---------------------------------------------------------------------------
// Delegating implementations
// ---------------------------------------------------------------------------

impl<T: CanonicalHash + ?Sized> CanonicalHash for &T {
    #[inline]
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        (**self).canonical_hash_at(depth)
    }
}

impl<T: CanonicalHash + ?Sized> CanonicalHash for Box<T> {
    #[inline]
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        (**self).canonical_hash_at(depth)
    }
}

impl<T: CanonicalHash> CanonicalHash for Option<T> {
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        match self {
            None => Ok(pair_hash(0, 0)),
            Some(value) => {
                let depth = descend(depth)?;
                Ok(pair_hash(1, value.canonical_hash_at(depth)?))
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Ordered sequences
// ---------------------------------------------------------------------------

impl<T: CanonicalHash> CanonicalHash for [T] {
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        let depth = descend(depth)?;
        combine_ordered(self.iter().map(|item| item.canonical_hash_at(depth)))
    }
}

impl<T: CanonicalHash, const N: usize> CanonicalHash for [T; N] {
    #[inline]
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        self.as_slice().canonical_hash_at(depth)
    }
}

impl<T: CanonicalHash> CanonicalHash for Vec<T> {
    #[inline]
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        self.as_slice().canonical_hash_at(depth)
    }
}

impl<T: CanonicalHash> CanonicalHash for VecDeque<T> {
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        let depth = descend(depth)?;
        combine_ordered(self.iter().map(|item| item.canonical_hash_at(depth)))
    }
}

macro_rules! impl_canonical_tuple {
    ($($name:ident : $idx:tt),+) => {
        impl<$($name: CanonicalHash),+> CanonicalHash for ($($name,)+) {
            fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
                let depth = descend(depth)?;
                combine_ordered([$(self.$idx.canonical_hash_at(depth)),+])
            }
        }
    };
}

impl_canonical_tuple!(A: 0);
impl_canonical_tuple!(A: 0, B: 1);
impl_canonical_tuple!(A: 0, B: 1, C: 2);
impl_canonical_tuple!(A: 0, B: 1, C: 2, D: 3);

// ---------------------------------------------------------------------------
// Unordered collections and mappings
// ---------------------------------------------------------------------------

impl<T: CanonicalHash, S> CanonicalHash for HashSet<T, S> {
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        let depth = descend(depth)?;
        combine_unordered(self.iter().map(|item| item.canonical_hash_at(depth)))
    }
}

impl<T: CanonicalHash> CanonicalHash for BTreeSet<T> {
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        let depth = descend(depth)?;
        combine_unordered(self.iter().map(|item| item.canonical_hash_at(depth)))
    }
}

impl<K: CanonicalHash, V: CanonicalHash, S> CanonicalHash for HashMap<K, V, S> {
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        let depth = descend(depth)?;
        combine_unordered(self.iter().map(|(k, v)| -> Result<u64, HashError> {
            Ok(pair_hash(
                k.canonical_hash_at(depth)?,
                v.canonical_hash_at(depth)?,
            ))
        }))
    }
}

impl<K: CanonicalHash, V: CanonicalHash> CanonicalHash for BTreeMap<K, V> {
    fn canonical_hash_at(&self, depth: usize) -> Result<u64, HashError> {
        let depth = descend(depth)?;
        combine_unordered(self.iter().map(|(k, v)| -> Result<u64, HashError> {
            Ok(pair_hash(
                k.canonical_hash_at(depth)?,
                v.canonical_hash_at(depth)?,
            ))
        }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
