use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;
use tracing::warn;

use super::ClientInner;
use super::ConfigClient;
use crate::AvailabilityState;
use crate::BackendGateway;
use crate::CacheStore;
use crate::CallbackRegistry;
use crate::ClientConfig;
use crate::ConsulGateway;
use crate::EnvSource;
use crate::ProcessEnv;
use crate::Result;

pub struct ClientBuilder {
    config: ClientConfig,
    gateway: Option<Arc<dyn BackendGateway>>,
    env: Arc<dyn EnvSource>,
}

impl ClientBuilder {
    /// Create a new builder reading the process environment as third tier
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            gateway: None,
            env: Arc::new(ProcessEnv),
        }
    }

    /// Use a custom backend instead of the bundled HTTP gateway.
    ///
    /// Ignored when the configuration disables the backend.
    pub fn gateway(
        mut self,
        gateway: Arc<dyn BackendGateway>,
    ) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Replace the environment lookup used after cache and backend
    pub fn env_source(
        mut self,
        env: Arc<dyn EnvSource>,
    ) -> Self {
        self.env = env;
        self
    }

    /// Build without contacting the backend.
    ///
    /// The backend is assumed available if one was supplied; the first failed
    /// request flips that.
    pub fn build(mut self) -> Result<ConfigClient> {
        self.config.validate()?;
        let gateway = if self.config.enabled { self.gateway.take() } else { None };
        let available = gateway.is_some();
        Ok(self.assemble(gateway, available))
    }

    /// Build and probe the backend once, creating the bundled HTTP gateway
    /// when none was supplied.
    pub async fn connect(self) -> Result<ConfigClient> {
        self.config.validate()?;

        if !self.config.enabled {
            info!("Backend is disabled via configuration");
            return Ok(self.assemble(None, false));
        }

        let gateway: Arc<dyn BackendGateway> = match self.gateway.clone() {
            Some(gateway) => gateway,
            None => Arc::new(ConsulGateway::new(&self.config)?),
        };

        let endpoint = self.config.endpoint();
        let available = match tokio::time::timeout(self.config.request_timeout(), gateway.ping()).await {
            Ok(Ok(())) => {
                info!("Backend connected successfully at {}", endpoint);
                true
            }
            Ok(Err(e)) => {
                warn!(
                    "Backend is not reachable at {} - falling back to environment variables: {}",
                    endpoint, e
                );
                false
            }
            Err(_) => {
                warn!(
                    "Backend probe at {} timed out - falling back to environment variables",
                    endpoint
                );
                false
            }
        };

        Ok(self.assemble(Some(gateway), available))
    }

    fn assemble(
        self,
        gateway: Option<Arc<dyn BackendGateway>>,
        available: bool,
    ) -> ConfigClient {
        let callbacks = CallbackRegistry::new(self.config.watch.max_concurrent_callbacks);
        ConfigClient {
            inner: Arc::new(ClientInner {
                config: self.config,
                gateway,
                env: self.env,
                cache: Arc::new(CacheStore::new()),
                callbacks: Arc::new(callbacks),
                state: Arc::new(AvailabilityState::new(available)),
                watch: Mutex::new(None),
            }),
        }
    }
}
