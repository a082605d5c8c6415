pub use crate::cache::SetAssociativeCache;
pub use crate::error::{ConfigError, HashError};
pub use crate::hash::CanonicalHash;
pub use crate::policy::{PolicyKind, ReplacementPolicy};
