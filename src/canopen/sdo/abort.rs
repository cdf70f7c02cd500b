//! SDO abort frames and the CiA 301 abort-code table.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::canopen::ids::{cobid, parse_cobid, FunctionCode, NodeId};
use crate::canopen::sdo::frames::{index_of, subindex_of, CS_ABORT};
use crate::core::error::Result;
use crate::core::frame::Frame;

/// A transfer aborted by the SDO server.
///
/// The display form includes the CiA 301 description when the code is a
/// known one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("sdo abort 0x{code:08X} at {index:04X}:{subindex:02X}: {}", describe(.code))]
pub struct SdoAbort {
    pub index: u16,
    pub subindex: u8,
    pub code: u32,
}

impl SdoAbort {
    /// Human-readable description of the abort code, if known.
    pub fn description(&self) -> Option<&'static str> {
        ABORT_DESCRIPTIONS.get(&self.code).copied()
    }
}

fn describe(code: &u32) -> &'static str {
    ABORT_DESCRIPTIONS
        .get(code)
        .copied()
        .unwrap_or("unknown abort code")
}

static ABORT_DESCRIPTIONS: Lazy<HashMap<u32, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (0x0503_0000, "toggle bit not alternated"),
        (0x0504_0000, "SDO protocol timeout"),
        (0x0504_0001, "command specifier invalid or unknown"),
        (0x0601_0000, "unsupported access to object"),
        (0x0601_0001, "attempt to read a write-only object"),
        (0x0601_0002, "attempt to write a read-only object"),
        (0x0602_0000, "object does not exist"),
        (0x0604_0041, "object cannot be mapped to PDO"),
        (0x0604_0042, "PDO length exceeded"),
        (0x0604_0043, "general parameter incompatibility"),
        (0x0604_0047, "internal incompatibility in device"),
        (0x0606_0000, "hardware error"),
        (0x0607_0010, "data type does not match (length)"),
        (0x0607_0012, "data type does not match (length too high)"),
        (0x0607_0013, "data type does not match (length too low)"),
        (0x0609_0011, "sub-index does not exist"),
        (0x0609_0030, "value range exceeded (min)"),
        (0x0609_0031, "value range exceeded (max)"),
        (0x0609_0036, "invalid value for parameter"),
        (0x0800_0000, "general error"),
        (0x0800_0020, "data cannot be transferred/stored"),
        (0x0800_0021, "local control"),
        (0x0800_0022, "device state"),
        (0x0800_0023, "OD dynamic generation fails"),
    ])
});

/// Build a server-to-client abort frame, as an SDO server or simulator
/// would send it.
pub fn abort_frame(node: NodeId, index: u16, subindex: u8, code: u32) -> Result<Frame> {
    node.validate()?;
    let mut frame = Frame {
        id: cobid(FunctionCode::SdoTx, node),
        extended: false,
        rtr: false,
        len: 8,
        data: [0; 8],
    };
    frame.data[0] = CS_ABORT << 5;
    frame.data[1..3].copy_from_slice(&index.to_le_bytes());
    frame.data[3] = subindex;
    frame.data[4..8].copy_from_slice(&code.to_le_bytes());
    Ok(frame)
}

/// Decode a server-to-client abort, returning the sending node and the
/// abort details; `None` if the frame is not an SDO abort.
pub fn parse_abort(frame: &Frame) -> Option<(NodeId, SdoAbort)> {
    let (fc, node) = parse_cobid(frame.id).ok()?;
    if fc != FunctionCode::SdoTx || frame.len != 8 {
        return None;
    }
    if frame.data[0] >> 5 != CS_ABORT {
        return None;
    }
    Some((
        node,
        SdoAbort {
            index: index_of(frame),
            subindex: subindex_of(frame),
            code: u32::from_le_bytes([frame.data[4], frame.data[5], frame.data[6], frame.data[7]]),
        },
    ))
}
