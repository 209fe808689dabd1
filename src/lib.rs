//! Dynamic configuration client backed by a remote key-value store.
//!
//! Settings resolve through four tiers: a TTL cache, the backend, the process
//! environment and finally a caller supplied default. A background long-poll
//! loop clears the cache and notifies subscribers whenever the watched prefix
//! changes, and keeps probing the backend while it is unreachable.

mod cache;
mod client;
mod config;
mod env_source;
mod errors;
mod gateway;
mod watch;

pub use cache::*;
pub use client::*;
pub use config::*;
pub use env_source::*;
pub use errors::*;
pub use gateway::*;
pub use watch::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub(crate) mod test_utils;
