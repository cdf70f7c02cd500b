//! In-memory broadcast bus for tests and simulations.
//!
//! Multiple endpoints opened from the same [`LoopbackBus`] exchange frames:
//! a send on one endpoint is delivered to every *other* currently open
//! endpoint through its bounded queue. Delivery blocks while an open
//! target's queue is full and skips targets that closed mid-send.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, RwLock};

use crate::bus::Bus;
use crate::core::error::{CanError, Result};
use crate::core::frame::Frame;

/// Capacity of each endpoint's receive queue.
pub const ENDPOINT_QUEUE_CAPACITY: usize = 64;

struct State {
    closed: bool,
    next_id: u64,
    endpoints: HashMap<u64, mpsc::Sender<Frame>>,
}

struct Shared {
    state: RwLock<State>,
}

/// An in-memory CAN bus connecting any number of endpoints.
pub struct LoopbackBus {
    shared: Arc<Shared>,
}

impl LoopbackBus {
    /// Create a new loopback bus with no endpoints.
    pub fn new() -> Self {
        LoopbackBus {
            shared: Arc::new(Shared {
                state: RwLock::new(State {
                    closed: false,
                    next_id: 0,
                    endpoints: HashMap::new(),
                }),
            }),
        }
    }

    /// Open a new endpoint attached to the bus.
    ///
    /// Opening on a closed bus succeeds but yields an endpoint that is
    /// already closed.
    pub async fn open(&self) -> LoopbackEndpoint {
        let (tx, rx) = mpsc::channel(ENDPOINT_QUEUE_CAPACITY);
        let mut state = self.shared.state.write().await;
        let dead = state.closed;
        let id = state.next_id;
        if !dead {
            state.next_id += 1;
            state.endpoints.insert(id, tx);
        }
        LoopbackEndpoint {
            id,
            shared: Arc::clone(&self.shared),
            rx: Mutex::new(rx),
            dead: AtomicBool::new(dead),
        }
    }

    /// Close the bus and detach all endpoints. Idempotent.
    pub async fn close(&self) {
        let mut state = self.shared.state.write().await;
        if state.closed {
            return;
        }
        state.closed = true;
        // Dropping the senders closes every endpoint queue.
        state.endpoints.clear();
    }
}

impl Default for LoopbackBus {
    fn default() -> Self {
        Self::new()
    }
}

/// One endpoint of a [`LoopbackBus`].
pub struct LoopbackEndpoint {
    id: u64,
    shared: Arc<Shared>,
    rx: Mutex<mpsc::Receiver<Frame>>,
    dead: AtomicBool,
}

#[async_trait]
impl Bus for LoopbackEndpoint {
    /// Broadcast the frame to all other endpoints on the same bus.
    async fn send(&self, frame: Frame) -> Result<()> {
        frame.validate()?;
        if self.dead.load(Ordering::SeqCst) {
            return Err(CanError::Closed);
        }
        // Snapshot the targets under the lock, deliver outside it.
        let targets: Vec<mpsc::Sender<Frame>> = {
            let state = self.shared.state.read().await;
            if state.closed {
                return Err(CanError::Closed);
            }
            state
                .endpoints
                .iter()
                .filter(|(id, _)| **id != self.id)
                .map(|(_, tx)| tx.clone())
                .collect()
        };
        for tx in targets {
            // Waits while the target queue is full; a target that closed
            // mid-send fails the send and counts as skipped.
            let _ = tx.send(frame).await;
        }
        Ok(())
    }

    /// Wait for the next frame.
    ///
    /// Frames queued before the endpoint closed are drained first; after
    /// that the closed sentinel is returned.
    async fn recv(&self) -> Result<Frame> {
        let mut rx = self.rx.lock().await;
        rx.recv().await.ok_or(CanError::Closed)
    }

    /// Detach the endpoint from the bus. Idempotent.
    async fn close(&self) -> Result<()> {
        if self.dead.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let mut state = self.shared.state.write().await;
        state.endpoints.remove(&self.id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_to_all_other_endpoints() {
        let bus = LoopbackBus::new();
        let a = bus.open().await;
        let b = bus.open().await;
        let c = bus.open().await;

        let frame = Frame::new(0x321, b"hello").unwrap();
        a.send(frame).await.unwrap();

        assert_eq!(b.recv().await.unwrap(), frame);
        assert_eq!(c.recv().await.unwrap(), frame);
    }

    #[tokio::test]
    async fn test_sender_does_not_receive_own_frame() {
        let bus = LoopbackBus::new();
        let a = bus.open().await;
        let b = bus.open().await;

        a.send(Frame::new(0x100, &[1]).unwrap()).await.unwrap();
        b.send(Frame::new(0x200, &[2]).unwrap()).await.unwrap();

        // a only sees b's frame, not its own
        assert_eq!(a.recv().await.unwrap().id, 0x200);
        assert_eq!(b.recv().await.unwrap().id, 0x100);
    }

    #[tokio::test]
    async fn test_closed_endpoint_is_skipped() {
        let bus = LoopbackBus::new();
        let a = bus.open().await;
        let b = bus.open().await;
        let c = bus.open().await;

        c.close().await.unwrap();
        a.send(Frame::new(0x100, &[]).unwrap()).await.unwrap();

        assert_eq!(b.recv().await.unwrap().id, 0x100);
        assert!(matches!(c.recv().await, Err(CanError::Closed)));
    }

    #[tokio::test]
    async fn test_send_validates_first() {
        let bus = LoopbackBus::new();
        let a = bus.open().await;
        let bad = Frame {
            id: 0x800,
            ..Frame::default()
        };
        assert!(matches!(
            a.send(bad).await,
            Err(CanError::InvalidId { .. })
        ));
    }

    #[tokio::test]
    async fn test_endpoint_close_is_idempotent() {
        let bus = LoopbackBus::new();
        let a = bus.open().await;
        a.close().await.unwrap();
        a.close().await.unwrap();
        assert!(matches!(
            a.send(Frame::new(0x1, &[]).unwrap()).await,
            Err(CanError::Closed)
        ));
        assert!(matches!(a.recv().await, Err(CanError::Closed)));
    }

    #[tokio::test]
    async fn test_bus_close_closes_all_endpoints() {
        let bus = LoopbackBus::new();
        let a = bus.open().await;
        let b = bus.open().await;

        bus.close().await;
        bus.close().await; // idempotent

        assert!(matches!(b.recv().await, Err(CanError::Closed)));
        assert!(matches!(
            a.send(Frame::new(0x1, &[]).unwrap()).await,
            Err(CanError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_open_on_closed_bus_yields_closed_endpoint() {
        let bus = LoopbackBus::new();
        bus.close().await;
        let a = bus.open().await;
        assert!(matches!(a.recv().await, Err(CanError::Closed)));
        assert!(matches!(
            a.send(Frame::new(0x1, &[]).unwrap()).await,
            Err(CanError::Closed)
        ));
    }

    #[tokio::test]
    async fn test_queued_frames_drain_before_closed() {
        let bus = LoopbackBus::new();
        let a = bus.open().await;
        let b = bus.open().await;

        a.send(Frame::new(0x111, &[7]).unwrap()).await.unwrap();
        b.close().await.unwrap();

        // the frame delivered before close is still readable
        assert_eq!(b.recv().await.unwrap().id, 0x111);
        assert!(matches!(b.recv().await, Err(CanError::Closed)));
    }
}
