//! Linux SocketCAN driver.
//!
//! [`SocketCanBus`] implements [`Bus`] over a raw CAN socket bound to a
//! network interface such as `can0` or `vcan0`. The socket runs in
//! non-blocking mode; `WouldBlock` outcomes are retried after a short
//! polling sleep so that blocked operations remain cancellable and observe
//! close promptly.
//!
//! The interface must be configured and up first, see [`crate::bus::iface`].

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use socketcan::{
    CanDataFrame, CanFrame, CanRemoteFrame, CanSocket, EmbeddedFrame, ExtendedId, Frame as _, Id,
    Socket, StandardId,
};
use tokio::time::sleep;

use crate::bus::Bus;
use crate::core::error::{CanError, Result};
use crate::core::frame::{Frame, CAN_EFF_MASK, CAN_SFF_MASK};

const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A [`Bus`] over a Linux SocketCAN interface.
pub struct SocketCanBus {
    socket: CanSocket,
    closed: AtomicBool,
}

impl SocketCanBus {
    /// Open a raw CAN socket bound to the named interface.
    pub fn open(interface: &str) -> Result<Self> {
        let socket = CanSocket::open(interface)?;
        socket.set_nonblocking(true)?;
        tracing::debug!(interface, "socketcan bus opened");
        Ok(SocketCanBus {
            socket,
            closed: AtomicBool::new(false),
        })
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CanError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl Bus for SocketCanBus {
    async fn send(&self, frame: Frame) -> Result<()> {
        frame.validate()?;
        let raw = to_socketcan(&frame)?;
        loop {
            self.check_open()?;
            match self.socket.write_frame(&raw) {
                Ok(()) => return Ok(()),
                Err(e) if would_block(&e) => sleep(POLL_INTERVAL).await,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn recv(&self) -> Result<Frame> {
        loop {
            self.check_open()?;
            match self.socket.read_frame() {
                // Error frames are skipped on input.
                Ok(raw) => match from_socketcan(&raw) {
                    Some(frame) => return Ok(frame),
                    None => continue,
                },
                Err(e) if would_block(&e) => sleep(POLL_INTERVAL).await,
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn would_block(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}

fn to_socketcan(frame: &Frame) -> Result<CanFrame> {
    let invalid_id = || CanError::InvalidId {
        id: frame.id,
        extended: frame.extended,
    };
    let id: Id = if frame.extended {
        Id::Extended(ExtendedId::new(frame.id).ok_or_else(invalid_id)?)
    } else {
        Id::Standard(StandardId::new(frame.id as u16).ok_or_else(invalid_id)?)
    };
    if frame.rtr {
        CanRemoteFrame::new_remote(id, frame.len as usize)
            .map(CanFrame::Remote)
            .ok_or(CanError::InvalidLength(frame.len as usize))
    } else {
        CanDataFrame::new(id, frame.payload())
            .map(CanFrame::Data)
            .ok_or(CanError::InvalidLength(frame.len as usize))
    }
}

fn from_socketcan(raw: &CanFrame) -> Option<Frame> {
    match raw {
        CanFrame::Data(f) => {
            let mut data = [0u8; 8];
            let payload = f.data();
            data[..payload.len().min(8)].copy_from_slice(&payload[..payload.len().min(8)]);
            Some(Frame {
                id: masked_id(f.raw_id(), f.is_extended()),
                extended: f.is_extended(),
                rtr: false,
                len: payload.len().min(8) as u8,
                data,
            })
        }
        CanFrame::Remote(f) => Some(Frame {
            id: masked_id(f.raw_id(), f.is_extended()),
            extended: f.is_extended(),
            rtr: true,
            len: f.dlc().min(8) as u8,
            data: [0; 8],
        }),
        CanFrame::Error(_) => None,
    }
}

fn masked_id(raw: u32, extended: bool) -> u32 {
    raw & if extended { CAN_EFF_MASK } else { CAN_SFF_MASK }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_conversion_roundtrip() {
        let frame = Frame::new(0x123, &[0xDE, 0xAD, 0xBE]).unwrap();
        let raw = to_socketcan(&frame).unwrap();
        assert_eq!(from_socketcan(&raw), Some(frame));

        let frame = Frame::new(0x1ABC_DEFF, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let raw = to_socketcan(&frame).unwrap();
        assert_eq!(from_socketcan(&raw), Some(frame));
    }

    #[test]
    fn test_remote_frame_conversion() {
        let frame = Frame::remote(0x456, 4).unwrap();
        let raw = to_socketcan(&frame).unwrap();
        let back = from_socketcan(&raw).unwrap();
        assert!(back.rtr);
        assert_eq!(back.id, 0x456);
        assert_eq!(back.len, 4);
    }
}
