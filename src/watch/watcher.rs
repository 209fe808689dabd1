use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::AvailabilityState;
use super::CallbackRegistry;
use super::WatchPhase;
use crate::BackendGateway;
use crate::CacheStore;
use crate::GatewayError;
use crate::KvPair;
use crate::Listing;

/// Background long-poll loop.
///
/// ```text
/// Idle --start--> Polling --list error--> Reconnecting --ping ok--> Polling
///                    ^  |                     |  ^
///                    +--+ same index          +--+ ping failed, wait retry_interval
/// any --stop--> Stopped
/// ```
pub(crate) struct Watcher {
    pub(crate) gateway: Arc<dyn BackendGateway>,
    pub(crate) cache: Arc<CacheStore>,
    pub(crate) callbacks: Arc<CallbackRegistry>,
    pub(crate) state: Arc<AvailabilityState>,
    /// Listed prefix, without trailing slash
    pub(crate) prefix: String,
    pub(crate) wait_timeout: Duration,
    pub(crate) retry_interval: Duration,
    /// Bound for probes on top of the long-poll hold
    pub(crate) request_timeout: Duration,
    pub(crate) shutdown: CancellationToken,
}

impl Watcher {
    pub(crate) async fn run(self) {
        info!(prefix = %self.prefix, "Started watching configuration changes");

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            let snapshot = self.state.snapshot();
            if !snapshot.available {
                self.enter(WatchPhase::Reconnecting);
                if !self.reconnect().await {
                    break;
                }
                continue;
            }

            self.enter(WatchPhase::Polling);
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = self.poll(snapshot.last_index) => result,
            };

            match result {
                Ok(listing) => self.apply(snapshot.last_index, listing),
                Err(e) => {
                    warn!("Error watching configuration: {}", e);
                    self.state.mark_unavailable();
                    self.enter(WatchPhase::Reconnecting);
                    if !self.pause().await {
                        break;
                    }
                }
            }
        }

        debug!(prefix = %self.prefix, "watch loop exited");
    }

    fn enter(
        &self,
        phase: WatchPhase,
    ) {
        self.state.transition(phase, &self.shutdown);
    }

    async fn poll(
        &self,
        wait_index: u64,
    ) -> Result<Listing, GatewayError> {
        let limit = self.wait_timeout + self.request_timeout;
        match timeout(limit, self.gateway.list(&self.prefix, wait_index, self.wait_timeout)).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout(limit)),
        }
    }

    /// One liveness probe, followed by a pause if it failed.
    /// Returns false when shutdown was requested meanwhile.
    async fn reconnect(&self) -> bool {
        let probe = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return false,
            probe = timeout(self.request_timeout, self.gateway.ping()) => probe,
        };

        match probe {
            Ok(Ok(())) => {
                self.state.restore();
                info!("Backend connection restored");
                true
            }
            Ok(Err(e)) => {
                debug!("Backend still unreachable: {}", e);
                self.pause().await
            }
            Err(_) => {
                debug!("Backend probe timed out after {:?}", self.request_timeout);
                self.pause().await
            }
        }
    }

    async fn pause(&self) -> bool {
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            _ = sleep(self.retry_interval) => true,
        }
    }

    fn apply(
        &self,
        last_index: u64,
        listing: Listing,
    ) {
        if listing.index == last_index {
            return;
        }

        if last_index == 0 {
            debug!(index = listing.index, "baseline index established");
        } else {
            let changed = changed_keys(&self.prefix, &listing.entries);
            info!(
                from = last_index,
                to = listing.index,
                keys = changed.len(),
                "Configuration changed, refreshing cache"
            );
            self.cache.clear();
            self.callbacks.notify(changed);
        }
        self.state.record_index(listing.index);
    }
}

/// Keys under `prefix` with `prefix/` stripped; the prefix entry itself and
/// keys outside it are skipped.
pub(crate) fn changed_keys(
    prefix: &str,
    entries: &[KvPair],
) -> Vec<String> {
    entries
        .iter()
        .filter_map(|pair| pair.key.strip_prefix(prefix)?.strip_prefix('/'))
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect()
}
