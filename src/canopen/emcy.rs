//! Emergency (EMCY) frames.
//!
//! An EMCY frame carries 8 bytes on `0x080 + node`: error code
//! (little-endian u16), error register, and 5 manufacturer-specific bytes.

use serde::{Deserialize, Serialize};

use crate::canopen::ids::{cobid, parse_cobid, FunctionCode, NodeId};
use crate::core::error::{CanError, Result};
use crate::core::frame::Frame;

/// Payload of an emergency message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EmcyMessage {
    /// CiA 301 error code.
    pub error_code: u16,
    /// Error register (object 0x1001).
    pub error_register: u8,
    /// Manufacturer-specific error field.
    pub manufacturer: [u8; 5],
}

/// Build an EMCY frame for `node`.
pub fn emcy(node: NodeId, message: &EmcyMessage) -> Result<Frame> {
    node.validate()?;
    let mut frame = Frame {
        id: cobid(FunctionCode::Emcy, node),
        extended: false,
        rtr: false,
        len: 8,
        data: [0; 8],
    };
    frame.data[0..2].copy_from_slice(&message.error_code.to_le_bytes());
    frame.data[2] = message.error_register;
    frame.data[3..8].copy_from_slice(&message.manufacturer);
    Ok(frame)
}

/// Decode an EMCY frame into its source node and payload.
pub fn parse_emcy(frame: &Frame) -> Result<(NodeId, EmcyMessage)> {
    if frame.len < 8 {
        return Err(CanError::malformed(format!(
            "emcy too short: {}",
            frame.len
        )));
    }
    let (fc, node) = parse_cobid(frame.id)?;
    if fc != FunctionCode::Emcy {
        return Err(CanError::malformed(format!(
            "not an emcy frame (id=0x{:X})",
            frame.id
        )));
    }
    let mut manufacturer = [0u8; 5];
    manufacturer.copy_from_slice(&frame.data[3..8]);
    Ok((
        node,
        EmcyMessage {
            error_code: u16::from_le_bytes([frame.data[0], frame.data[1]]),
            error_register: frame.data[2],
            manufacturer,
        },
    ))
}
