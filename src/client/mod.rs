//! Settings client: the API applications consume.
//!
//! - [`ConfigClient`] - layered setting lookup and change watching
//! - [`ClientBuilder`] - explicit construction with injectable gateway and
//!   environment source
//!
//! # Basic Usage
//! ```no_run
//! use kv_settings::{ClientConfig, ConfigClient};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let config = ClientConfig::load(None).unwrap();
//!     let client = ConfigClient::connect(config).await.unwrap();
//!
//!     let pool_size = client.get_setting_int("DB_POOL_SIZE", 10).await;
//!     println!("pool size: {pool_size}");
//!
//!     client.on_config_change(|keys| println!("changed: {keys:?}"));
//!     client.watch_config();
//! }
//! ```

mod builder;
mod coerce;

pub use builder::*;
pub use coerce::*;


use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::AvailabilityState;
use crate::BackendGateway;
use crate::CacheStore;
use crate::CallbackRegistry;
use crate::ClientConfig;
use crate::EnvSource;
use crate::GatewayError;
use crate::GatewayResult;
use crate::watch::Watcher;
use crate::WatchPhase;

/// Dynamic configuration client
///
/// Resolves settings through cache -> backend -> environment -> default and
/// keeps the cache fresh with a background watch loop. Cheap to clone; all
/// clones share the same cache, subscribers and watch loop.
///
/// Created through [`builder()`](ConfigClient::builder) or
/// [`connect()`](ConfigClient::connect)
#[derive(Clone)]
pub struct ConfigClient {
    pub(super) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) config: ClientConfig,
    /// `None` when the backend is disabled
    pub(crate) gateway: Option<Arc<dyn BackendGateway>>,
    pub(crate) env: Arc<dyn EnvSource>,
    pub(crate) cache: Arc<CacheStore>,
    pub(crate) callbacks: Arc<CallbackRegistry>,
    pub(crate) state: Arc<AvailabilityState>,
    pub(crate) watch: Mutex<Option<WatchHandle>>,
}

pub(crate) struct WatchHandle {
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        // Last clone gone: the loop would otherwise outlive every consumer
        if let Some(handle) = self.watch.get_mut().take() {
            handle.shutdown.cancel();
        }
    }
}

impl ConfigClient {
    /// Start building a client from `config`
    pub fn builder(config: ClientConfig) -> ClientBuilder {
        ClientBuilder::new(config)
    }

    /// Build a client with the bundled HTTP gateway and probe the backend once.
    ///
    /// An unreachable backend is not an error: the client starts unavailable
    /// and serves environment values and defaults until it recovers.
    pub async fn connect(config: ClientConfig) -> crate::Result<Self> {
        ClientBuilder::new(config).connect().await
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Resolve `key`, falling back through cache, backend, environment and
    /// finally `default_value`
    pub async fn get_setting(
        &self,
        key: &str,
        default_value: &str,
    ) -> String {
        let inner = &self.inner;

        // 1. Cache
        if let Some(value) = inner.cache.get(key) {
            return value;
        }

        // 2. Backend
        if let Some(gateway) = inner.gateway.as_ref().filter(|_| inner.state.is_available()) {
            let full_key = format!("{}/{}", inner.config.namespace(), key);
            match self.fetch(gateway.as_ref(), &full_key).await {
                Ok(Some(bytes)) if !bytes.is_empty() => {
                    let value = String::from_utf8_lossy(&bytes).into_owned();
                    inner.cache.set(key, value.clone(), inner.config.ttl());
                    return value;
                }
                Ok(_) => {
                    debug!(key = %full_key, "setting not found in backend");
                }
                Err(e) => {
                    warn!("Failed to get key {} from backend: {}", full_key, e);
                    if inner.state.mark_unavailable() {
                        warn!("Backend marked unavailable, falling back to environment");
                    }
                }
            }
        }

        // 3. Environment
        if let Some(value) = inner.env.lookup(key).filter(|v| !v.is_empty()) {
            return value;
        }

        // 4. Default
        default_value.to_string()
    }

    /// Integer setting; missing or non-numeric values yield `default_value`
    pub async fn get_setting_int(
        &self,
        key: &str,
        default_value: i64,
    ) -> i64 {
        let raw = self.get_setting(key, "").await;
        parse_int(&raw).unwrap_or(default_value)
    }

    /// Boolean setting; missing or unrecognised values yield `default_value`
    pub async fn get_setting_bool(
        &self,
        key: &str,
        default_value: bool,
    ) -> bool {
        let raw = self.get_setting(key, "").await;
        parse_bool(&raw).unwrap_or(default_value)
    }

    /// Register a subscriber invoked with the changed keys (relative to the
    /// base path) every time the watch loop detects a change
    pub fn on_config_change<F>(
        &self,
        subscriber: F,
    ) where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.inner.callbacks.register(subscriber);
    }

    /// Start the background watch loop.
    ///
    /// Returns false without side effects when the loop is already running,
    /// the backend is disabled, or no tokio runtime is available.
    pub fn watch_config(&self) -> bool {
        let inner = &self.inner;
        let Some(gateway) = inner.gateway.clone() else {
            warn!("Backend disabled, configuration watch not started");
            return false;
        };
        let Ok(runtime) = Handle::try_current() else {
            error!("watch_config called outside of a tokio runtime");
            return false;
        };

        let mut slot = inner.watch.lock();
        if slot.as_ref().is_some_and(|h| !h.task.is_finished()) {
            info!("Config watch already running");
            return false;
        }

        let shutdown = CancellationToken::new();
        let watcher = Watcher {
            gateway,
            cache: inner.cache.clone(),
            callbacks: inner.callbacks.clone(),
            state: inner.state.clone(),
            prefix: inner.config.namespace().to_string(),
            wait_timeout: inner.config.watch.wait_timeout(),
            retry_interval: inner.config.watch.retry_interval(),
            request_timeout: inner.config.request_timeout(),
            shutdown: shutdown.clone(),
        };
        let task = runtime.spawn(watcher.run());
        *slot = Some(WatchHandle { shutdown, task });
        true
    }

    /// Stop the watch loop. Safe from any thread, idempotent, never waits for
    /// the loop to exit.
    pub fn stop_watch(&self) {
        let Some(handle) = self.inner.watch.lock().take() else {
            return;
        };

        handle.shutdown.cancel();
        self.inner.state.stop();
        info!("Stopped watching configuration changes");
    }

    pub fn is_watching(&self) -> bool {
        self.inner
            .watch
            .lock()
            .as_ref()
            .is_some_and(|h| !h.task.is_finished())
    }

    pub fn is_available(&self) -> bool {
        self.inner.state.is_available()
    }

    pub fn watch_phase(&self) -> WatchPhase {
        self.inner.state.phase()
    }

    /// Drop every cached value and, if the backend is currently marked
    /// unavailable, probe it once more
    pub async fn refresh_cache(&self) {
        let inner = &self.inner;
        inner.cache.clear();

        let Some(gateway) = inner.gateway.as_ref() else {
            return;
        };
        if inner.state.is_available() {
            return;
        }

        let probe = match timeout(inner.config.request_timeout(), gateway.ping()).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(inner.config.request_timeout())),
        };
        match probe {
            Ok(()) => {
                inner.state.restore();
                info!("Backend connection restored");
            }
            Err(e) => debug!("Backend still unreachable: {}", e),
        }
    }

    async fn fetch(
        &self,
        gateway: &dyn BackendGateway,
        full_key: &str,
    ) -> GatewayResult<Option<Vec<u8>>> {
        let limit = self.inner.config.request_timeout();
        match timeout(limit, gateway.get(full_key)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(limit)),
        }
    }
}
