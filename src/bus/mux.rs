//! Frame multiplexer: one reader, many filtered subscribers.
//!
//! A [`Mux`] owns a [`Bus`] for reception and runs a single background
//! task that reads frames and fans them out to subscribers. This keeps the
//! bus with exactly one receiver (preserving wire order on the input side)
//! while letting request/response protocols such as the SDO client coexist
//! with passive observers.
//!
//! Sending is not proxied: callers keep sending on their own handle to the
//! same bus.
//!
//! Dispatch never blocks the reader. A subscriber whose queue is full has
//! that frame dropped — latency matters more than completeness here.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Notify, RwLock};

use crate::bus::Bus;
use crate::core::filter::FrameFilter;
use crate::core::frame::Frame;

struct Entry {
    filter: FrameFilter,
    tx: mpsc::Sender<Frame>,
}

struct Shared {
    subs: RwLock<HashMap<u64, Entry>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    shutdown: Notify,
}

impl Shared {
    async fn shut_down(&self) {
        self.closed.store(true, Ordering::SeqCst);
        // Dropping the senders closes every subscriber queue.
        self.subs.write().await.clear();
    }
}

/// Multiplexes frames from a [`Bus`] to any number of filtered subscribers.
pub struct Mux {
    shared: Arc<Shared>,
}

impl Mux {
    /// Create a multiplexer bound to the given bus and start its reader
    /// task. The mux is the sole receiver of `bus` from now until close.
    pub fn new(bus: Arc<dyn Bus>) -> Self {
        let shared = Arc::new(Shared {
            subs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        });
        tokio::spawn(run_reader(Arc::clone(&shared), bus));
        Mux { shared }
    }

    /// Register a subscriber.
    ///
    /// Frames accepted by `filter` are delivered to the returned
    /// [`Subscription`] in arrival order, through a queue of `buffer`
    /// slots (clamped to at least 1). Use [`FrameFilter::any`] to receive
    /// everything.
    pub async fn subscribe(&self, filter: FrameFilter, buffer: usize) -> Subscription {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        {
            let mut subs = self.shared.subs.write().await;
            // Checked under the lock so a concurrent close cannot strand
            // the entry. After close, tx is dropped instead, making the
            // subscription observably closed.
            if !self.shared.closed.load(Ordering::SeqCst) {
                subs.insert(id, Entry { filter, tx });
            }
        }
        Subscription {
            id,
            rx,
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stop the reader task and close all subscriber queues. Idempotent.
    pub async fn close(&self) {
        if self.shared.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.shutdown.notify_one();
        self.shared.shut_down().await;
    }
}

async fn run_reader(shared: Arc<Shared>, bus: Arc<dyn Bus>) {
    loop {
        let frame = tokio::select! {
            _ = shared.shutdown.notified() => break,
            received = bus.recv() => match received {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::debug!(error = %e, "mux reader stopping");
                    break;
                }
            },
        };

        let mut stale = Vec::new();
        {
            let subs = shared.subs.read().await;
            for (id, entry) in subs.iter() {
                if !entry.filter.matches(&frame) {
                    continue;
                }
                match entry.tx.try_send(frame) {
                    Ok(()) => {}
                    // Queue full: drop for this subscriber only.
                    Err(TrySendError::Full(_)) => {}
                    // Subscription dropped without explicit cancel; reap it.
                    Err(TrySendError::Closed(_)) => stale.push(*id),
                }
            }
        }
        if !stale.is_empty() {
            let mut subs = shared.subs.write().await;
            for id in stale {
                subs.remove(&id);
            }
        }
    }
    // Upstream closure and explicit close propagate identically.
    shared.shut_down().await;
}

/// A live subscription to a [`Mux`].
///
/// The subscription ends on [`cancel`](Subscription::cancel), on mux close,
/// or when it is dropped; all three close the queue.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<Frame>,
    shared: Arc<Shared>,
}

impl Subscription {
    /// Receive the next matching frame, or `None` once the subscription is
    /// cancelled or the mux has closed.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    /// Remove the subscription and close its queue. Idempotent.
    pub async fn cancel(&mut self) {
        self.shared.subs.write().await.remove(&self.id);
        self.rx.close();
    }
}
