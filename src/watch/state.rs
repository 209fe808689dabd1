use std::fmt;

use arc_swap::ArcSwap;
use tokio_util::sync::CancellationToken;

/// Lifecycle of the background watch loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchPhase {
    /// Never started
    Idle,
    /// Long-polling the backend
    Polling,
    /// Backend unreachable, probing on a fixed interval
    Reconnecting,
    /// Stopped on request; may be started again
    Stopped,
}

/// Point-in-time view of backend availability and watch progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AvailabilitySnapshot {
    pub available: bool,
    /// Last observed backend change index; 0 means no baseline yet
    pub last_index: u64,
    pub phase: WatchPhase,
}

/// Shared availability state.
///
/// All fields live in one snapshot swapped atomically, so readers never see
/// `available` and `last_index` from different transitions. Every mutation
/// goes through one of the named transitions below.
pub struct AvailabilityState {
    inner: ArcSwap<AvailabilitySnapshot>,
}

impl fmt::Debug for AvailabilityState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_tuple("AvailabilityState").field(&self.snapshot()).finish()
    }
}

impl AvailabilityState {
    pub fn new(available: bool) -> Self {
        Self {
            inner: ArcSwap::from_pointee(AvailabilitySnapshot {
                available,
                last_index: 0,
                phase: WatchPhase::Idle,
            }),
        }
    }

    pub fn snapshot(&self) -> AvailabilitySnapshot {
        **self.inner.load()
    }

    pub fn is_available(&self) -> bool {
        self.inner.load().available
    }

    pub fn last_index(&self) -> u64 {
        self.inner.load().last_index
    }

    pub fn phase(&self) -> WatchPhase {
        self.inner.load().phase
    }

    /// Applies `f` atomically and returns the snapshot it replaced
    fn update(
        &self,
        f: impl Fn(&mut AvailabilitySnapshot),
    ) -> AvailabilitySnapshot {
        let previous = self.inner.rcu(|current| {
            let mut next = **current;
            f(&mut next);
            next
        });
        *previous
    }

    /// Backend failed a request. Returns true if it was available before.
    pub fn mark_unavailable(&self) -> bool {
        self.update(|s| s.available = false).available
    }

    /// Backend answered a probe again. The index space is not guaranteed
    /// continuous across reconnects, so the baseline is dropped too.
    pub fn restore(&self) {
        self.update(|s| {
            s.available = true;
            s.last_index = 0;
        });
    }

    pub fn record_index(
        &self,
        index: u64,
    ) {
        self.update(|s| s.last_index = index);
    }

    /// Phase change issued by a watch loop. Ignored once `owner` is cancelled
    /// so a loop that is winding down cannot overwrite `Stopped` or the phase
    /// of its successor.
    pub(crate) fn transition(
        &self,
        phase: WatchPhase,
        owner: &CancellationToken,
    ) {
        self.update(|s| {
            if !owner.is_cancelled() {
                s.phase = phase;
            }
        });
    }

    pub(crate) fn stop(&self) {
        self.update(|s| s.phase = WatchPhase::Stopped);
    }
}
