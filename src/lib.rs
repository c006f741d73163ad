//! A bounded, persistent, sync/async memoization cache.
//!
//! Results are organized as a two-level bank: function name, then one
//! ordered entry per distinct call. Calls are canonicalized into stable
//! keys, so argument order quirks (keyword order, map pair order) never
//! split the cache.
//!
//! # Features
//! - **Canonical call keys**: positional and keyword arguments normalize to
//!   one stable, hashable key per logical call.
//! - **Bounded by construction**: function-count, total-memory, and
//!   per-function memory ceilings, enforced by LRU or FIFO eviction.
//! - **Sync & Async**: both blocking and non-blocking `async` handles over
//!   the same shared bank; conversion is zero-cost.
//! - **Persistence**: save and load the whole bank across five formats,
//!   from raw bincode to human-readable JSON/YAML.
//! - **Usage accounting**: exact per-function hit/miss counters.

// Public modules that form the API
pub mod config;
pub mod error;
pub mod estimator;
pub mod handles;
pub mod invoke;
pub mod key;
pub mod literal;
pub mod persist;
pub mod policy;
pub mod reporter;
pub mod value;

// Internal, crate-only modules
mod eviction;
mod store;

// Re-export the primary user-facing types for convenience
pub use config::{BankConfig, CacheBankBuilder, KIB, MIB};
pub use error::{Error, LoadError, SaveError};
pub use estimator::estimate_value;
pub use handles::sync::CacheBank;
pub use invoke::{Callable, FnCallable, Memoized, PartialCallable};
pub use key::{make_key, CallKey};
pub use literal::{parse_key, render_key, LiteralError};
pub use persist::{BankFormat, DEFAULT_COMPRESSION};
pub use policy::RecencyPolicy;
pub use reporter::{FuncStats, UsageReport};
pub use value::Value;

#[cfg(feature = "tokio")]
pub use handles::futures::AsyncCacheBank;
#[cfg(feature = "tokio")]
pub use invoke::{AsyncCallable, AsyncFnCallable, AsyncMemoized};
