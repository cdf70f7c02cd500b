//! # canlink
//!
//! CAN bus communication for Rust, with a practical CANopen (CiA 301)
//! subset layered on top.
//!
//! ## Features
//!
//! - **Portable frame model**: classical CAN frames with the 16-byte
//!   `struct can_frame` binary codec
//! - **Bus abstraction**: one [`Bus`] trait over loopback, SocketCAN, and
//!   decorated transports
//! - **Fan-out**: a [`Mux`] distributes frames from a single receiver to
//!   any number of filtered subscribers without blocking each other
//! - **CANopen services**: COB-ID mapping, NMT/heartbeat/EMCY/SYNC codecs,
//!   and a synchronous-feeling SDO client with expedited and segmented
//!   transfers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::time::Duration;
//! use canlink::{Mux, SocketCanBus};
//! use canlink::canopen::{NodeId, SdoClient};
//!
//! let bus = Arc::new(SocketCanBus::open("can0")?);
//! let mux = Arc::new(Mux::new(Arc::clone(&bus) as _));
//!
//! let mut client = SdoClient::new(bus, NodeId(0x22), mux, Duration::from_millis(500))?;
//! let device_type = client.read_u32(0x1000, 0x00).await?;
//! ```
//!
//! The SDO engine requires a [`Mux`]; routing responses through it keeps
//! the bus with exactly one receiver, so heartbeat consumers, EMCY loggers
//! and SDO transfers can share one interface.

pub mod bus;
pub mod canopen;
pub mod core;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::bus::{Bus, LoggedBus, LoopbackBus, Mux, Subscription};
    #[cfg(target_os = "linux")]
    pub use crate::bus::SocketCanBus;
    pub use crate::canopen::{
        cobid, parse_cobid, FunctionCode, NodeId, SdoAbort, SdoClient,
    };
    pub use crate::core::{CanError, Frame, FrameFilter, Result};
}

// Re-export the core types at the crate root for convenience.
pub use crate::bus::{Bus, LoggedBus, LoopbackBus, Mux, Subscription};
#[cfg(target_os = "linux")]
pub use crate::bus::SocketCanBus;
pub use crate::core::error::{CanError, Result};
pub use crate::core::filter::FrameFilter;
pub use crate::core::frame::Frame;
