//! ENS name resolution subsystem.
//!
//! # Data Flow
//! ```text
//! name or address
//!     → format validation (no network for malformed input)
//!     → cache.rs (direction-tagged keys, read-path TTL eviction)
//!     → resolver.rs (single-flight lookup via ENS registry contracts)
//! ```
//!
//! # Constraints
//! - A cached "not found" is a valid value and is not re-queried before TTL
//! - Transient lookup failures follow the configured [`FailurePolicy`]

pub mod cache;
pub mod namehash;
pub mod resolver;

pub use cache::{CacheLookup, CacheStats, CachedValue, ResolutionCache};
pub use namehash::{namehash, reverse_node};
pub use resolver::{EnsLookup, EnsResolver, FailurePolicy, NameLookup, ResolveError};
