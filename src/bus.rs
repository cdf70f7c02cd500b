//! Bus abstraction and its implementations.
//!
//! A [`Bus`] is a bidirectional CAN frame channel: send one frame, receive
//! the next frame, close. Implementations must be safe for concurrent use
//! from independent senders and receivers; in the protocol path the
//! [`Mux`] is the sole receiver of its bus.
//!
//! Provided implementations:
//! - [`LoopbackBus`] — in-memory broadcast bus for tests and simulations
//! - [`SocketCanBus`] — Linux SocketCAN driver (Linux only)
//! - [`LoggedBus`] — decorator that traces send/receive activity

use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::frame::Frame;

#[cfg(target_os = "linux")]
pub mod iface;
pub mod logged;
pub mod loopback;
pub mod mux;
#[cfg(target_os = "linux")]
pub mod socketcan;

pub use logged::LoggedBus;
pub use loopback::{LoopbackBus, LoopbackEndpoint};
pub use mux::{Mux, Subscription};
#[cfg(target_os = "linux")]
pub use socketcan::SocketCanBus;

/// A CAN bus connection which can send and receive frames.
///
/// Contracts:
/// - `send` validates the frame before transmission; validation errors are
///   returned without side effects. It may block until the frame is queued.
/// - `recv` blocks until a frame is available or the bus is closed.
/// - `close` is idempotent. After close, both `send` and `recv` fail with
///   [`CanError::Closed`](crate::CanError::Closed).
#[async_trait]
pub trait Bus: Send + Sync {
    /// Transmit a frame.
    async fn send(&self, frame: Frame) -> Result<()>;

    /// Retrieve the next available frame.
    async fn recv(&self) -> Result<Frame>;

    /// Release resources. Idempotent.
    async fn close(&self) -> Result<()>;
}
