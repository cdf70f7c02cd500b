//! Bus decorator that traces send/receive activity.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::Level;

use crate::bus::Bus;
use crate::core::error::Result;
use crate::core::frame::Frame;

/// Wraps a [`Bus`] and logs frames through [`tracing`].
///
/// Reads and writes are logged at the configured level; failures are always
/// logged at `ERROR`. `close` is forwarded without logging.
pub struct LoggedBus {
    inner: Arc<dyn Bus>,
    level: Level,
    log_reads: bool,
    log_writes: bool,
}

impl LoggedBus {
    /// Wrap `inner`, logging both directions at `DEBUG`.
    pub fn new(inner: Arc<dyn Bus>) -> Self {
        LoggedBus {
            inner,
            level: Level::DEBUG,
            log_reads: true,
            log_writes: true,
        }
    }

    /// Set the level used for successful operations.
    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    /// Enable or disable receive logging.
    #[must_use]
    pub fn with_reads(mut self, enabled: bool) -> Self {
        self.log_reads = enabled;
        self
    }

    /// Enable or disable send logging.
    #[must_use]
    pub fn with_writes(mut self, enabled: bool) -> Self {
        self.log_writes = enabled;
        self
    }

    fn log_frame(&self, op: &'static str, frame: &Frame) {
        if self.level == Level::TRACE {
            tracing::trace!(id = frame.id, len = frame.len, frame = %frame, "{op}");
        } else if self.level == Level::DEBUG {
            tracing::debug!(id = frame.id, len = frame.len, frame = %frame, "{op}");
        } else if self.level == Level::INFO {
            tracing::info!(id = frame.id, len = frame.len, frame = %frame, "{op}");
        } else if self.level == Level::WARN {
            tracing::warn!(id = frame.id, len = frame.len, frame = %frame, "{op}");
        } else {
            tracing::error!(id = frame.id, len = frame.len, frame = %frame, "{op}");
        }
    }
}

#[async_trait]
impl Bus for LoggedBus {
    async fn send(&self, frame: Frame) -> Result<()> {
        if self.log_writes {
            self.log_frame("can send", &frame);
        }
        let result = self.inner.send(frame).await;
        if self.log_writes {
            if let Err(e) = &result {
                tracing::error!(id = frame.id, error = %e, "can send failed");
            }
        }
        result
    }

    async fn recv(&self) -> Result<Frame> {
        let result = self.inner.recv().await;
        if self.log_reads {
            match &result {
                Ok(frame) => self.log_frame("can receive", frame),
                Err(e) => tracing::error!(error = %e, "can receive failed"),
            }
        }
        result
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
