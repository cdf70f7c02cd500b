//! Classical CAN frame type and its binary codec.
//!
//! [`Frame`] models a CAN 2.0A/2.0B frame: standard (11-bit) or extended
//! (29-bit) identifier, data or remote (RTR) frame, 0..=8 data bytes.
//! CAN FD fields are intentionally not modeled.
//!
//! The binary codec speaks the Linux `struct can_frame` layout (16 bytes,
//! little-endian identifier with flag bits), which doubles as a portable
//! capture/transport format.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{CanError, Result};

/// Identifier flag: extended frame format (29-bit id).
pub const CAN_EFF_FLAG: u32 = 0x8000_0000;
/// Identifier flag: remote transmission request.
pub const CAN_RTR_FLAG: u32 = 0x4000_0000;
/// Identifier flag: error frame. Ignored on input, zero on output.
pub const CAN_ERR_FLAG: u32 = 0x2000_0000;

/// Highest valid standard (11-bit) identifier.
pub const CAN_SFF_MASK: u32 = 0x7FF;
/// Highest valid extended (29-bit) identifier.
pub const CAN_EFF_MASK: u32 = 0x1FFF_FFFF;

/// Size of the marshaled frame in bytes.
pub const WIRE_SIZE: usize = 16;

/// A classical CAN frame.
///
/// Frames are plain values: cheap to copy, comparable, and immutable from a
/// consumer's point of view once marshaled or unmarshaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Frame {
    /// 11-bit (standard) or 29-bit (extended) identifier.
    pub id: u32,
    /// True for the 29-bit extended frame format.
    pub extended: bool,
    /// Remote transmission request.
    pub rtr: bool,
    /// Number of significant bytes in `data`, 0..=8.
    pub len: u8,
    /// Payload buffer; only the first `len` bytes are meaningful.
    pub data: [u8; 8],
}

impl Frame {
    /// Build a validated data frame, selecting the extended format
    /// automatically when the identifier exceeds the standard range.
    pub fn new(id: u32, data: &[u8]) -> Result<Self> {
        if data.len() > 8 {
            return Err(CanError::InvalidLength(data.len()));
        }
        let mut frame = Frame {
            id,
            extended: id > CAN_SFF_MASK,
            rtr: false,
            len: data.len() as u8,
            data: [0; 8],
        };
        frame.data[..data.len()].copy_from_slice(data);
        frame.validate()?;
        Ok(frame)
    }

    /// Build a validated remote (RTR) frame requesting `len` bytes.
    pub fn remote(id: u32, len: u8) -> Result<Self> {
        let frame = Frame {
            id,
            extended: id > CAN_SFF_MASK,
            rtr: true,
            len,
            data: [0; 8],
        };
        frame.validate()?;
        Ok(frame)
    }

    /// Check the frame invariants: `len <= 8` and the identifier within the
    /// range of its format.
    pub fn validate(&self) -> Result<()> {
        if self.len > 8 {
            return Err(CanError::InvalidLength(self.len as usize));
        }
        let limit = if self.extended { CAN_EFF_MASK } else { CAN_SFF_MASK };
        if self.id > limit {
            return Err(CanError::InvalidId {
                id: self.id,
                extended: self.extended,
            });
        }
        Ok(())
    }

    /// The significant payload bytes.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Encode to the 16-byte `struct can_frame` layout.
    ///
    /// Layout (little-endian):
    /// - bytes 0..4: identifier with EFF/RTR flags OR'd into the high bits
    /// - byte 4: data length code
    /// - bytes 5..8: reserved, zero
    /// - bytes 8..16: payload
    pub fn to_bytes(&self) -> Result<[u8; WIRE_SIZE]> {
        self.validate()?;
        let mut id = self.id;
        if self.extended {
            id |= CAN_EFF_FLAG;
        }
        if self.rtr {
            id |= CAN_RTR_FLAG;
        }
        let mut buf = [0u8; WIRE_SIZE];
        buf[0..4].copy_from_slice(&id.to_le_bytes());
        buf[4] = self.len;
        buf[8..16].copy_from_slice(&self.data);
        Ok(buf)
    }

    /// Decode from the 16-byte `struct can_frame` layout.
    ///
    /// The identifier field is masked to 29 or 11 bits depending on the EFF
    /// flag; the error-frame flag and the reserved bytes are ignored.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        if buf.len() < WIRE_SIZE {
            return Err(CanError::malformed(format!(
                "need {} bytes, got {}",
                WIRE_SIZE,
                buf.len()
            )));
        }
        let raw = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let extended = raw & CAN_EFF_FLAG != 0;
        let mut frame = Frame {
            id: raw & if extended { CAN_EFF_MASK } else { CAN_SFF_MASK },
            extended,
            rtr: raw & CAN_RTR_FLAG != 0,
            len: buf[4],
            data: [0; 8],
        };
        frame.data.copy_from_slice(&buf[8..16]);
        frame.validate()?;
        Ok(frame)
    }
}

impl fmt::Display for Frame {
    /// Renders `"<HEXID> [<len>] BB BB …"`; RTR frames show the literal
    /// `RTR` instead of data bytes.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:X} [{}]", self.id, self.len)?;
        if self.rtr {
            return write!(f, " RTR");
        }
        for byte in self.payload() {
            write!(f, " {:02X}", byte)?;
        }
        Ok(())
    }
}
