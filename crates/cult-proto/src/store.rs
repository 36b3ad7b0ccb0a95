//! StatusStore — the single "latest status" value behind the view.
//!
//! Exactly one [`StatusPublisher`] exists per store; the poller owns it.
//! Readers hold cheap [`StatusStore`] clones and either peek at
//! [`StatusStore::latest`] or await changes through a watch receiver.
//!
//! Overlapping polls can complete out of order, so every publish carries the
//! issue sequence number of its fetch.  A completion older than the last
//! applied one is dropped: the most recently *issued* fetch wins.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::debug;

use crate::status::StationStatus;

pub type Snapshot = Option<Arc<StationStatus>>;

#[derive(Debug, Clone)]
pub struct StatusStore {
    rx: watch::Receiver<Snapshot>,
}

#[derive(Debug)]
pub struct StatusPublisher {
    tx: watch::Sender<Snapshot>,
    /// Sequence of the snapshot currently held; 0 = nothing applied yet.
    applied_seq: u64,
}

impl StatusStore {
    pub fn new() -> (StatusPublisher, StatusStore) {
        let (tx, rx) = watch::channel(None);
        (
            StatusPublisher { tx, applied_seq: 0 },
            StatusStore { rx },
        )
    }

    pub fn latest(&self) -> Snapshot {
        self.rx.borrow().clone()
    }

    /// The receiver starts with the current value marked as seen.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        let mut rx = self.rx.clone();
        rx.mark_unchanged();
        rx
    }
}

impl StatusPublisher {
    /// Replace the snapshot wholesale.  Returns `false` when `seq` is not
    /// newer than the snapshot already held.
    pub fn publish(&mut self, seq: u64, status: StationStatus) -> bool {
        if seq <= self.applied_seq {
            debug!(
                "[store] dropping stale snapshot seq={} (holding seq={})",
                seq, self.applied_seq
            );
            return false;
        }
        self.applied_seq = seq;
        self.tx.send_replace(Some(Arc::new(status)));
        true
    }

    pub fn applied_seq(&self) -> u64 {
        self.applied_seq
    }
}
