//! PollScheduler — fetch the status once immediately, then on a fixed
//! interval, until the returned [`PollHandle`] is cancelled or dropped.
//!
//! ```text
//!   interval tick ──► seq += 1 ──► spawn fetch(seq)
//!                                     │
//!                                     ├── cancelled?  → drop result
//!                                     ├── Err(e)      → warn!, store untouched
//!                                     └── Ok(status)  → publisher.publish(seq, status)
//! ```
//!
//! Fetches are not serialised: a slow request may still be in flight when
//! the next tick fires.  The store's sequence guard keeps the newest issued
//! result.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::StatusSource;
use crate::store::StatusPublisher;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Keeps the poll loop alive.  Dropping it cancels the timer and every
/// in-flight fetch.
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl PollHandle {
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for the timer task to exit.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub struct PollScheduler;

impl PollScheduler {
    /// Start polling `source` every `period`, first fetch at t=0.
    pub fn spawn<S: StatusSource>(
        source: Arc<S>,
        publisher: StatusPublisher,
        period: Duration,
    ) -> PollHandle {
        let token = CancellationToken::new();
        let publisher = Arc::new(Mutex::new(publisher));
        let loop_token = token.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut seq = 0u64;
            info!("[poll] started, every {}s", period.as_secs());

            loop {
                tokio::select! {
                    _ = loop_token.cancelled() => break,
                    _ = ticker.tick() => {
                        seq += 1;
                        tokio::spawn(fetch_once(
                            seq,
                            Arc::clone(&source),
                            Arc::clone(&publisher),
                            loop_token.clone(),
                        ));
                    }
                }
            }
            info!("[poll] stopped after {} fetches", seq);
        });

        PollHandle {
            token,
            task: Some(task),
        }
    }
}

async fn fetch_once<S: StatusSource>(
    seq: u64,
    source: Arc<S>,
    publisher: Arc<Mutex<StatusPublisher>>,
    token: CancellationToken,
) {
    debug!("[poll] fetch #{} issued", seq);
    // a result ready in the same instant as the cancel goes on to the
    // liveness check below
    let result = tokio::select! {
        biased;
        r = source.fetch_status() => r,
        _ = token.cancelled() => {
            debug!("[poll] fetch #{} abandoned", seq);
            return;
        }
    };

    match result {
        Ok(status) => {
            let mut publisher = publisher.lock().await;
            // the view may have gone away while we waited on the lock
            if token.is_cancelled() {
                debug!("[poll] fetch #{} finished after cancel, dropped", seq);
                return;
            }
            let title = status.current_track.title.clone();
            if publisher.publish(seq, status) {
                info!("[poll] fetch #{}: now playing {:?}", seq, title);
            }
        }
        Err(e) => {
            warn!("[poll] fetch #{} failed ({}): {}", seq, e.kind(), e);
        }
    }
}
