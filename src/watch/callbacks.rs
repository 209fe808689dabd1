use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::Semaphore;
use tokio::task::spawn_blocking;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::warn;

/// Change subscriber; receives the changed keys relative to the base path
pub type Subscriber = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Ordered list of change subscribers.
///
/// Guarded by its own lock, independent of the cache. Dispatch is
/// fire-and-forget: each subscriber runs on the blocking pool, bounded by a
/// semaphore, and a supervisor task reaps the results so panics are logged
/// and counted instead of reaching the watch loop.
pub struct CallbackRegistry {
    subscribers: RwLock<Vec<Subscriber>>,
    permits: Arc<Semaphore>,
    failed: Arc<AtomicU64>,
}

impl CallbackRegistry {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            failed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn register<F>(
        &self,
        subscriber: F,
    ) where
        F: Fn(&[String]) + Send + Sync + 'static,
    {
        self.subscribers.write().push(Arc::new(subscriber));
    }

    pub fn len(&self) -> usize {
        self.subscribers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Subscriber invocations that panicked so far
    pub fn failed_count(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    /// Spawns one invocation per registered subscriber and returns
    /// immediately with the number dispatched.
    ///
    /// Must be called from within a tokio runtime.
    pub fn notify(
        &self,
        changed_keys: Vec<String>,
    ) -> usize {
        let subscribers = self.subscribers.read().clone();
        if subscribers.is_empty() {
            return 0;
        }

        let keys: Arc<[String]> = changed_keys.into();
        let count = subscribers.len();
        let mut tasks = JoinSet::new();
        for subscriber in subscribers {
            let keys = keys.clone();
            let permits = self.permits.clone();
            tasks.spawn(async move {
                let permit = permits.acquire_owned().await;
                // Subscribers are sync and may block; keep them off the async workers
                spawn_blocking(move || {
                    let _permit = permit;
                    subscriber(&keys[..]);
                })
                .await
            });
        }

        let failed = self.failed.clone();
        tokio::spawn(async move {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) | Ok(Err(e)) = result {
                    failed.fetch_add(1, Ordering::Relaxed);
                    warn!("config change subscriber failed: {}", e);
                }
            }
        });

        debug!(subscribers = count, "change notification dispatched");
        count
    }
}
