//! NMT error control (heartbeat) frames.
//!
//! A heartbeat is a single state byte transmitted on `0x700 + node`.

use crate::canopen::ids::{cobid, parse_cobid, FunctionCode, NodeId};
use crate::canopen::nmt::NmtState;
use crate::core::error::{CanError, Result};
use crate::core::frame::Frame;

/// Build a heartbeat frame announcing `state` for `node`.
pub fn heartbeat(node: NodeId, state: NmtState) -> Result<Frame> {
    node.validate()?;
    let mut frame = Frame {
        id: cobid(FunctionCode::NmtErrCtrl, node),
        extended: false,
        rtr: false,
        len: 1,
        data: [0; 8],
    };
    frame.data[0] = state as u8;
    Ok(frame)
}

/// Decode a heartbeat frame into its source node and state.
pub fn parse_heartbeat(frame: &Frame) -> Result<(NodeId, NmtState)> {
    if frame.len < 1 {
        return Err(CanError::malformed(format!(
            "heartbeat too short: {}",
            frame.len
        )));
    }
    let (fc, node) = parse_cobid(frame.id)?;
    if fc != FunctionCode::NmtErrCtrl {
        return Err(CanError::malformed(format!(
            "not a heartbeat frame (id=0x{:X})",
            frame.id
        )));
    }
    Ok((node, NmtState::try_from(frame.data[0])?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_and_parse() {
        let frame = heartbeat(NodeId(10), NmtState::Operational).unwrap();
        assert_eq!(frame.id, 0x70A);
        assert_eq!(frame.len, 1);
        assert_eq!(frame.data[0], 0x05);

        let (node, state) = parse_heartbeat(&frame).unwrap();
        assert_eq!(node, NodeId(10));
        assert_eq!(state, NmtState::Operational);
    }

    #[test]
    fn test_bootup() {
        let frame = heartbeat(NodeId(1), NmtState::Bootup).unwrap();
        assert_eq!(frame.data[0], 0x00);
        let (_, state) = parse_heartbeat(&frame).unwrap();
        assert_eq!(state, NmtState::Bootup);
    }

    #[test]
    fn test_invalid_node_rejected() {
        assert!(heartbeat(NodeId::BROADCAST, NmtState::Operational).is_err());
        assert!(heartbeat(NodeId(128), NmtState::Operational).is_err());
    }

    #[test]
    fn test_parse_rejects_non_heartbeat() {
        let frame = Frame::new(0x085, &[0x05]).unwrap();
        assert!(parse_heartbeat(&frame).is_err());

        let short = Frame::new(0x70A, &[]).unwrap();
        assert!(parse_heartbeat(&short).is_err());
    }
}
