//! SYNC frames and the periodic SYNC producer.
//!
//! A SYNC frame is transmitted on the fixed id 0x080 with either no payload
//! or a single counter byte (1..=240 in CiA 301; modulo-128 here, matching
//! common device behavior).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::bus::Bus;
use crate::canopen::ids::{cobid, parse_cobid, FunctionCode, NodeId};
use crate::core::error::{CanError, Result};
use crate::core::frame::Frame;

/// Build a SYNC frame, with an optional counter byte.
pub fn sync_frame(counter: Option<u8>) -> Frame {
    let mut frame = Frame {
        id: cobid(FunctionCode::Sync, NodeId::BROADCAST),
        extended: false,
        rtr: false,
        len: 0,
        data: [0; 8],
    };
    if let Some(counter) = counter {
        frame.len = 1;
        frame.data[0] = counter;
    }
    frame
}

/// Decode a SYNC frame, returning the counter byte if present.
pub fn parse_sync(frame: &Frame) -> Result<Option<u8>> {
    let (fc, _) = parse_cobid(frame.id)?;
    if fc != FunctionCode::Sync {
        return Err(CanError::malformed(format!(
            "not a SYNC frame (id=0x{:X})",
            frame.id
        )));
    }
    match frame.len {
        0 => Ok(None),
        1 => Ok(Some(frame.data[0])),
        n => Err(CanError::malformed(format!("SYNC length {n} invalid"))),
    }
}

/// Periodically transmits SYNC frames on a bus.
///
/// With the counter enabled, a modulo-128 counter byte is included and
/// advanced on every transmission.
pub struct SyncProducer {
    bus: Arc<dyn Bus>,
    period: Duration,
    with_counter: bool,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyncProducer {
    /// Create a producer; it stays idle until [`start`](Self::start).
    pub fn new(bus: Arc<dyn Bus>, period: Duration, with_counter: bool) -> Self {
        SyncProducer {
            bus,
            period,
            with_counter,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Launch the background transmit task. Calling start again while
    /// running has no effect.
    pub fn start(&mut self) {
        if self.handle.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);
        let bus = Arc::clone(&self.bus);
        let running = Arc::clone(&self.running);
        let with_counter = self.with_counter;
        let period = self.period;
        self.handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick fires immediately; skip it so the first SYNC
            // goes out one full period after start
            interval.tick().await;
            let mut counter: u8 = 0;
            loop {
                interval.tick().await;
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                let frame = if with_counter {
                    let f = sync_frame(Some(counter));
                    counter = (counter + 1) & 0x7F;
                    f
                } else {
                    sync_frame(None)
                };
                if let Err(e) = bus.send(frame).await {
                    tracing::warn!(error = %e, "sync transmit failed");
                    if e.is_closed() {
                        break;
                    }
                }
            }
        }));
    }

    /// Stop the transmit task and wait for it to finish.
    pub async fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }
}
