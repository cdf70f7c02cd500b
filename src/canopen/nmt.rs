//! NMT (network management) service frames.
//!
//! An NMT command frame is broadcast on id 0x000 with two payload bytes:
//! the command specifier and the target node (0 addresses all nodes).

use serde::{Deserialize, Serialize};

use crate::canopen::ids::{cobid, FunctionCode, NodeId};
use crate::core::error::{CanError, Result};
use crate::core::frame::Frame;

/// NMT command specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum NmtCommand {
    Start = 0x01,
    Stop = 0x02,
    EnterPreOperational = 0x80,
    ResetNode = 0x81,
    ResetCommunication = 0x82,
}

impl TryFrom<u8> for NmtCommand {
    type Error = CanError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            0x01 => Ok(NmtCommand::Start),
            0x02 => Ok(NmtCommand::Stop),
            0x80 => Ok(NmtCommand::EnterPreOperational),
            0x81 => Ok(NmtCommand::ResetNode),
            0x82 => Ok(NmtCommand::ResetCommunication),
            _ => Err(CanError::malformed(format!(
                "unknown NMT command 0x{raw:02X}"
            ))),
        }
    }
}

/// Node states as reported by heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum NmtState {
    Bootup = 0x00,
    Stopped = 0x04,
    Operational = 0x05,
    PreOperational = 0x7F,
}

impl TryFrom<u8> for NmtState {
    type Error = CanError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            0x00 => Ok(NmtState::Bootup),
            0x04 => Ok(NmtState::Stopped),
            0x05 => Ok(NmtState::Operational),
            0x7F => Ok(NmtState::PreOperational),
            _ => Err(CanError::malformed(format!("unknown NMT state 0x{raw:02X}"))),
        }
    }
}

/// Build an NMT command frame. Target node 0 addresses every node.
pub fn build_nmt(command: NmtCommand, target: NodeId) -> Frame {
    let mut frame = Frame {
        id: cobid(FunctionCode::Nmt, NodeId::BROADCAST),
        extended: false,
        rtr: false,
        len: 2,
        data: [0; 8],
    };
    frame.data[0] = command as u8;
    frame.data[1] = target.raw();
    frame
}

/// Decode an NMT command frame into its command and target node.
pub fn parse_nmt(frame: &Frame) -> Result<(NmtCommand, NodeId)> {
    if frame.id != cobid(FunctionCode::Nmt, NodeId::BROADCAST) || frame.extended {
        return Err(CanError::malformed(format!(
            "not an NMT frame (id=0x{:X})",
            frame.id
        )));
    }
    if frame.len < 2 {
        return Err(CanError::malformed(format!(
            "NMT frame too short: {}",
            frame.len
        )));
    }
    Ok((NmtCommand::try_from(frame.data[0])?, NodeId(frame.data[1])))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_parse() {
        let frame = build_nmt(NmtCommand::Start, NodeId::BROADCAST);
        assert_eq!(frame.id, 0x000);
        assert_eq!(frame.len, 2);
        assert_eq!(frame.payload(), &[0x01, 0x00]);

        let (command, target) = parse_nmt(&frame).unwrap();
        assert_eq!(command, NmtCommand::Start);
        assert_eq!(target, NodeId::BROADCAST);
    }

    #[test]
    fn test_targeted_reset() {
        let frame = build_nmt(NmtCommand::ResetNode, NodeId(0x2A));
        assert_eq!(frame.payload(), &[0x81, 0x2A]);
        let (command, target) = parse_nmt(&frame).unwrap();
        assert_eq!(command, NmtCommand::ResetNode);
        assert_eq!(target, NodeId(0x2A));
    }

    #[test]
    fn test_parse_rejects_bad_frames() {
        let wrong_id = Frame::new(0x081, &[0x01, 0x00]).unwrap();
        assert!(parse_nmt(&wrong_id).is_err());

        let short = Frame::new(0x000, &[0x01]).unwrap();
        assert!(parse_nmt(&short).is_err());

        let unknown = Frame::new(0x000, &[0x7E, 0x00]).unwrap();
        assert!(parse_nmt(&unknown).is_err());
    }
}
