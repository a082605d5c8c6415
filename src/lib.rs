//! waycache: a set-associative cache with structural hashing and pluggable
//! replacement policies.
//!
//! See `DESIGN.md` for internal architecture and invariants.

pub mod cache;
pub mod error;
pub mod hash;
pub mod policy;
pub mod prelude;
