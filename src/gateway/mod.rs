//! Remote key-value backend abstraction.
//!
//! The client never assumes a transport: anything offering point reads, prefix
//! listing with a long-poll wait on a monotonically increasing change index,
//! and a cheap liveness probe can back it. [`ConsulGateway`] is the bundled
//! HTTP implementation.

mod consul;
pub use consul::*;


use std::time::Duration;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::GatewayError;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

/// Single key/value pair returned by a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPair {
    /// Full backend key, including the listed prefix
    pub key: String,
    pub value: Vec<u8>,
}

impl KvPair {
    pub fn new(
        key: impl Into<String>,
        value: impl AsRef<[u8]>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.as_ref().to_vec(),
        }
    }
}

/// Result of a prefix listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<KvPair>,
    /// Backend change index at the time the listing was served
    pub index: u64,
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Point read of a fully qualified key.
    ///
    /// # Returns
    /// * `Ok(Some(value))` if the key exists
    /// * `Ok(None)` if it does not
    /// * `Err(_)` on transport failures
    async fn get(
        &self,
        key: &str,
    ) -> GatewayResult<Option<Vec<u8>>>;

    /// Lists every key under `prefix`.
    ///
    /// When `wait_index` is non-zero the backend holds the request until its
    /// change index moves past `wait_index` or `wait_timeout` elapses, then
    /// answers with the current entries and index.
    async fn list(
        &self,
        prefix: &str,
        wait_index: u64,
        wait_timeout: Duration,
    ) -> GatewayResult<Listing>;

    /// Lightweight liveness probe
    async fn ping(&self) -> GatewayResult<()>;
}
