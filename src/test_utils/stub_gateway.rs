use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::BackendGateway;
use crate::GatewayError;
use crate::GatewayResult;
use crate::KvPair;
use crate::Listing;

pub(crate) fn unreachable_error() -> GatewayError {
    GatewayError::Unreachable {
        source: "stub: connection refused".into(),
    }
}

pub(crate) fn listing(
    index: u64,
    entries: &[(&str, &str)],
) -> Listing {
    Listing {
        entries: entries.iter().map(|(k, v)| KvPair::new(*k, v)).collect(),
        index,
    }
}

/// Scripted gateway for driving the watch loop.
///
/// `list` pops scripted results; once the script is exhausted it behaves like
/// an idle long-poll, holding for `wait_timeout` and returning the last index.
/// `ping` pops scripted outcomes and succeeds once they run out.
#[derive(Default)]
pub(crate) struct StubGateway {
    values: Mutex<HashMap<String, String>>,
    lists: Mutex<VecDeque<GatewayResult<Listing>>>,
    pings: Mutex<VecDeque<bool>>,
    idle_index: AtomicU64,
    wait_indexes: Mutex<Vec<u64>>,
    pub(crate) get_calls: AtomicUsize,
    pub(crate) list_calls: AtomicUsize,
    pub(crate) ping_calls: AtomicUsize,
}

impl StubGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_value(
        self,
        key: &str,
        value: &str,
    ) -> Self {
        self.values.lock().insert(key.to_string(), value.to_string());
        self
    }

    pub(crate) fn push_list(
        &self,
        result: GatewayResult<Listing>,
    ) {
        self.lists.lock().push_back(result);
    }

    pub(crate) fn push_pings(
        &self,
        outcomes: &[bool],
    ) {
        self.pings.lock().extend(outcomes.iter().copied());
    }

    /// `wait_index` arguments seen by `list`, in call order
    pub(crate) fn wait_indexes(&self) -> Vec<u64> {
        self.wait_indexes.lock().clone()
    }
}

#[async_trait]
impl BackendGateway for StubGateway {
    async fn get(
        &self,
        key: &str,
    ) -> GatewayResult<Option<Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.values.lock().get(key).map(|v| v.clone().into_bytes()))
    }

    async fn list(
        &self,
        _prefix: &str,
        wait_index: u64,
        wait_timeout: Duration,
    ) -> GatewayResult<Listing> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.wait_indexes.lock().push(wait_index);

        let scripted = self.lists.lock().pop_front();
        match scripted {
            Some(Ok(listing)) => {
                self.idle_index.store(listing.index, Ordering::SeqCst);
                Ok(listing)
            }
            Some(Err(e)) => Err(e),
            None => {
                tokio::time::sleep(wait_timeout).await;
                Ok(Listing {
                    entries: Vec::new(),
                    index: self.idle_index.load(Ordering::SeqCst),
                })
            }
        }
    }

    async fn ping(&self) -> GatewayResult<()> {
        self.ping_calls.fetch_add(1, Ordering::SeqCst);
        match self.pings.lock().pop_front() {
            Some(false) => Err(unreachable_error()),
            _ => Ok(()),
        }
    }
}
