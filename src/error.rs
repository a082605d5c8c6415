//! Error types for the waycache library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when cache geometry parameters are invalid
//!   (zero slots, zero size, size not a multiple of slots).
//! - [`HashError`]: Returned when a key or value cannot be reduced to a
//!   canonical hash (e.g. a NaN float or a structure nested past the
//!   normalization depth limit).
//!
//! ## Example Usage
//!
//! ```
//! use waycache::cache::SetAssociativeCache;
//! use waycache::error::ConfigError;
//! use waycache::policy::PolicyKind;
//!
//! // Fallible constructor for user-configurable geometry
//! let cache: Result<SetAssociativeCache<i32>, ConfigError> =
//!     SetAssociativeCache::try_new(2, 8, PolicyKind::Lru);
//! assert!(cache.is_ok());
//!
//! // A size that is not a multiple of slots is caught without panicking
//! let bad = SetAssociativeCache::<i32>::try_new(3, 8, PolicyKind::Lru);
//! assert!(bad.is_err());
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache geometry parameters are invalid.
///
/// Produced by [`SetAssociativeCache::try_new`](crate::cache::SetAssociativeCache::try_new).
/// Carries a human-readable description of which parameter failed validation.
///
/// # Example
///
/// ```
/// use waycache::cache::SetAssociativeCache;
/// use waycache::policy::PolicyKind;
///
/// let err = SetAssociativeCache::<u64>::try_new(0, 8, PolicyKind::Lru).unwrap_err();
/// assert!(err.to_string().contains("slots"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    /// Creates a new `ConfigError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// HashError
// ---------------------------------------------------------------------------

/// Error returned when a key or value cannot be canonically hashed.
///
/// Produced by [`CanonicalHash`](crate::hash::CanonicalHash) implementations
/// and surfaced by the cache operations that hash keys and values. A hash
/// failure aborts only the enclosing operation; the cache instance and its
/// existing entries are untouched.
///
/// # Example
///
/// ```
/// use waycache::hash::CanonicalHash;
///
/// let err = f64::NAN.canonical_hash().unwrap_err();
/// assert!(err.to_string().contains("NaN"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashError(String);

impl HashError {
    /// Creates a new `HashError` with the given description.
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    /// Returns the error description.
    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for HashError {}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
