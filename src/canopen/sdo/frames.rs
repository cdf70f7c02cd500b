//! SDO command-byte encoding and frame builders.
//!
//! Every SDO frame is 8 bytes. Byte 0 is the command byte; initiate frames
//! carry index (u16 little-endian) and subindex in bytes 1..4, segment
//! frames carry payload in bytes 1..8.
//!
//! Two expedited command-byte layouts coexist in the field:
//!
//! - the sized layout `[ccs:3][t:1][e:1][s:1][n:2]` — e bit 3, s bit 2,
//!   n in bits 1..0 (0x2C/0x2D/0x2E/0x2F for 4/3/2/1 download bytes);
//! - the legacy layout with n in bits 3..2, e bit 1, s bit 0
//!   (0x23/0x27/0x2B/0x2F).
//!
//! Writers pick one via [`ExpeditedEncoding`]; readers accept either.
//! Segment frames are identical in both layouts: toggle bit 4, unused-byte
//! count in bits 3..1, continuation-end flag in bit 0.

use serde::{Deserialize, Serialize};

use crate::canopen::ids::{cobid, FunctionCode, NodeId};
use crate::core::error::{CanError, Result};
use crate::core::frame::Frame;

// Client command specifiers (requests).
pub(crate) const CCS_DOWNLOAD_SEGMENT: u8 = 0;
pub(crate) const CCS_DOWNLOAD_INITIATE: u8 = 1;
pub(crate) const CCS_UPLOAD_INITIATE: u8 = 2;
pub(crate) const CCS_UPLOAD_SEGMENT: u8 = 3;

// Server command specifiers (responses).
pub(crate) const SCS_UPLOAD_SEGMENT: u8 = 0;
pub(crate) const SCS_DOWNLOAD_SEGMENT: u8 = 1;
pub(crate) const SCS_UPLOAD_INITIATE: u8 = 2;
pub(crate) const SCS_DOWNLOAD_INITIATE: u8 = 3;

// Abort, same specifier in both directions.
pub(crate) const CS_ABORT: u8 = 4;

/// Maximum payload of an expedited transfer.
pub(crate) const EXPEDITED_MAX: usize = 4;
/// Maximum payload of one segment.
pub(crate) const SEGMENT_MAX: usize = 7;

/// Which expedited command-byte layout the client writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpeditedEncoding {
    /// `[ccs:3][t:1][e:1][s:1][n:2]`: 0x2C/0x2D/0x2E/0x2F.
    #[default]
    Sized,
    /// Widely deployed CiA field layout: 0x23/0x27/0x2B/0x2F.
    Legacy,
}

/// Command specifier (upper 3 bits of the command byte).
#[inline]
pub(crate) fn command_specifier(frame: &Frame) -> u8 {
    frame.data[0] >> 5
}

/// Toggle bit of a segment command byte.
#[inline]
pub(crate) fn toggle_bit(frame: &Frame) -> bool {
    frame.data[0] & 0x10 != 0
}

/// Index field of an initiate or abort frame.
#[inline]
pub(crate) fn index_of(frame: &Frame) -> u16 {
    u16::from_le_bytes([frame.data[1], frame.data[2]])
}

/// Subindex field of an initiate or abort frame.
#[inline]
pub(crate) fn subindex_of(frame: &Frame) -> u8 {
    frame.data[3]
}

fn request_frame(node: NodeId) -> Frame {
    Frame {
        id: cobid(FunctionCode::SdoRx, node),
        extended: false,
        rtr: false,
        len: 8,
        data: [0; 8],
    }
}

fn put_multiplexer(frame: &mut Frame, index: u16, subindex: u8) {
    frame.data[1..3].copy_from_slice(&index.to_le_bytes());
    frame.data[3] = subindex;
}

/// Build a client expedited download request (write of 1..=4 bytes).
///
/// Zero-length payloads are rejected: the 2-bit unused-byte count cannot
/// express `n = 4`, so an empty expedited transfer has no valid encoding.
pub(crate) fn expedited_download(
    node: NodeId,
    index: u16,
    subindex: u8,
    data: &[u8],
    encoding: ExpeditedEncoding,
) -> Result<Frame> {
    node.validate()?;
    if data.is_empty() || data.len() > EXPEDITED_MAX {
        return Err(CanError::protocol(format!(
            "expedited download requires 1..={EXPEDITED_MAX} bytes, got {}",
            data.len()
        )));
    }
    let n = (EXPEDITED_MAX - data.len()) as u8;
    let cmd = match encoding {
        ExpeditedEncoding::Sized => (CCS_DOWNLOAD_INITIATE << 5) | 1 << 3 | 1 << 2 | (n & 0x3),
        ExpeditedEncoding::Legacy => (CCS_DOWNLOAD_INITIATE << 5) | ((n & 0x3) << 2) | 1 << 1 | 1,
    };
    let mut frame = request_frame(node);
    frame.data[0] = cmd;
    put_multiplexer(&mut frame, index, subindex);
    frame.data[4..4 + data.len()].copy_from_slice(data);
    Ok(frame)
}

/// Build a client segmented download initiate with the total size declared
/// in bytes 4..8.
pub(crate) fn download_initiate_segmented(
    node: NodeId,
    index: u16,
    subindex: u8,
    total: u32,
) -> Result<Frame> {
    node.validate()?;
    let mut frame = request_frame(node);
    frame.data[0] = (CCS_DOWNLOAD_INITIATE << 5) | 1 << 2; // e=0, s=1
    put_multiplexer(&mut frame, index, subindex);
    frame.data[4..8].copy_from_slice(&total.to_le_bytes());
    Ok(frame)
}

/// Build one download segment carrying up to 7 payload bytes.
pub(crate) fn download_segment(
    node: NodeId,
    payload: &[u8],
    toggle: bool,
    last: bool,
) -> Result<Frame> {
    node.validate()?;
    if payload.is_empty() || payload.len() > SEGMENT_MAX {
        return Err(CanError::protocol(format!(
            "segment payload must be 1..={SEGMENT_MAX} bytes, got {}",
            payload.len()
        )));
    }
    let mut cmd = CCS_DOWNLOAD_SEGMENT << 5;
    if toggle {
        cmd |= 1 << 4;
    }
    if last {
        let n = (SEGMENT_MAX - payload.len()) as u8;
        cmd |= 1; // c=1
        cmd |= (n & 0x7) << 1;
    }
    let mut frame = request_frame(node);
    frame.data[0] = cmd;
    frame.data[1..1 + payload.len()].copy_from_slice(payload);
    Ok(frame)
}

/// Build a client upload initiate request (read).
pub(crate) fn upload_request(node: NodeId, index: u16, subindex: u8) -> Result<Frame> {
    node.validate()?;
    let mut frame = request_frame(node);
    frame.data[0] = CCS_UPLOAD_INITIATE << 5;
    put_multiplexer(&mut frame, index, subindex);
    Ok(frame)
}

/// Build a client upload segment request carrying the toggle bit.
pub(crate) fn upload_segment_request(node: NodeId, toggle: bool) -> Result<Frame> {
    node.validate()?;
    let mut frame = request_frame(node);
    let mut cmd = CCS_UPLOAD_SEGMENT << 5;
    if toggle {
        cmd |= 1 << 4;
    }
    frame.data[0] = cmd;
    Ok(frame)
}

/// Decode the expedited bits of an initiate command byte, accepting both
/// layouts. Returns the payload length (0..=4) and whether the size was
/// indicated, or `None` for a non-expedited (segmented) initiate.
///
/// Bytes with e and s set straddle the layouts (the legacy n field overlaps
/// the sized layout's e bit), so e+s are tested together per layout; where
/// both layouts match (0x.F) they agree on the payload length.
pub(crate) fn expedited_payload_len(cmd: u8) -> Option<(usize, bool)> {
    if cmd & 0x0C == 0x0C {
        // sized layout, size indicated: n in bits 1..0
        Some((EXPEDITED_MAX - (cmd & 0x3) as usize, true))
    } else if cmd & 0x03 == 0x03 {
        // legacy layout, size indicated: n in bits 3..2
        Some((EXPEDITED_MAX - ((cmd >> 2) & 0x3) as usize, true))
    } else if cmd & 0x08 != 0 || cmd & 0x02 != 0 {
        // expedited, size not indicated: all 4 data bytes are returned
        Some((EXPEDITED_MAX, false))
    } else {
        None
    }
}

/// Whether a segmented initiate response declares its total size in bytes
/// 4..8. Accepts the s bit of either layout.
#[inline]
pub(crate) fn segmented_size_indicated(cmd: u8) -> bool {
    cmd & 0x04 != 0 || cmd & 0x01 != 0
}

/// Split an upload segment response into its payload bytes and the
/// continuation-end flag.
pub(crate) fn upload_segment_data(frame: &Frame) -> Result<(&[u8], bool)> {
    let cmd = frame.data[0];
    let last = cmd & 0x01 != 0;
    let unused = if last { ((cmd >> 1) & 0x7) as usize } else { 0 };
    let end = 8 - unused;
    if end < 1 {
        return Err(CanError::protocol(format!(
            "invalid segment length (cmd=0x{cmd:02X})"
        )));
    }
    Ok((&frame.data[1..end], last))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expedited_download_sized_encoding() {
        // 4 bytes to node 0x23 at 0x2000:01
        let frame = expedited_download(
            NodeId(0x23),
            0x2000,
            0x01,
            &[0xDE, 0xAD, 0xBE, 0xEF],
            ExpeditedEncoding::Sized,
        )
        .unwrap();
        assert_eq!(frame.id, 0x623);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data[0], 0x2C);
        assert_eq!(&frame.data[1..4], &[0x00, 0x20, 0x01]);
        assert_eq!(&frame.data[4..8], &[0xDE, 0xAD, 0xBE, 0xEF]);

        for (len, cmd) in [(4usize, 0x2C), (3, 0x2D), (2, 0x2E), (1, 0x2F)] {
            let frame = expedited_download(
                NodeId(1),
                0x1000,
                0,
                &[0xAA; 4][..len],
                ExpeditedEncoding::Sized,
            )
            .unwrap();
            assert_eq!(frame.data[0], cmd, "len={len}");
        }
    }

    #[test]
    fn test_expedited_download_legacy_encoding() {
        for (len, cmd) in [(4usize, 0x23), (3, 0x27), (2, 0x2B), (1, 0x2F)] {
            let frame = expedited_download(
                NodeId(1),
                0x1000,
                0,
                &[0xAA; 4][..len],
                ExpeditedEncoding::Legacy,
            )
            .unwrap();
            assert_eq!(frame.data[0], cmd, "len={len}");
        }
    }

    #[test]
    fn test_expedited_download_rejects_bad_lengths() {
        let err = expedited_download(NodeId(1), 0, 0, &[0; 5], ExpeditedEncoding::Sized);
        assert!(matches!(err, Err(CanError::Protocol(_))));

        let err = expedited_download(NodeId(1), 0, 0, &[], ExpeditedEncoding::Sized);
        assert!(matches!(err, Err(CanError::Protocol(_))));
        let err = expedited_download(NodeId(1), 0, 0, &[], ExpeditedEncoding::Legacy);
        assert!(matches!(err, Err(CanError::Protocol(_))));
    }

    #[test]
    fn test_expedited_payload_len_accepts_both_layouts() {
        // sized layout upload responses (SCS=2)
        assert_eq!(expedited_payload_len(0x4C), Some((4, true)));
        assert_eq!(expedited_payload_len(0x4D), Some((3, true)));
        assert_eq!(expedited_payload_len(0x4E), Some((2, true)));
        assert_eq!(expedited_payload_len(0x4F), Some((1, true)));
        // legacy layout
        assert_eq!(expedited_payload_len(0x43), Some((4, true)));
        assert_eq!(expedited_payload_len(0x47), Some((3, true)));
        assert_eq!(expedited_payload_len(0x4B), Some((2, true)));
        // expedited without size indication returns the full 4 bytes
        assert_eq!(expedited_payload_len(0x48), Some((4, false)));
        assert_eq!(expedited_payload_len(0x42), Some((4, false)));
        // segmented initiate in either layout is not expedited
        assert_eq!(expedited_payload_len(0x40), None);
        assert_eq!(expedited_payload_len(0x41), None);
        assert_eq!(expedited_payload_len(0x44), None);
    }

    #[test]
    fn test_download_segment_command_bytes() {
        // 11-byte transfer: 7 + 4, toggles 0 then 1, final n = 3
        let first = download_segment(NodeId(1), &[0; 7], false, false).unwrap();
        assert_eq!(first.data[0], 0x00);

        let last = download_segment(NodeId(1), &[0; 4], true, true).unwrap();
        // toggle bit 4, n=3 in bits 3..1, c=1
        assert_eq!(last.data[0], 0x10 | (3 << 1) | 1);
    }

    #[test]
    fn test_download_initiate_segmented_layout() {
        let frame = download_initiate_segmented(NodeId(0x33), 0x3000, 0x02, 11).unwrap();
        assert_eq!(frame.id, 0x633);
        assert_eq!(frame.data[0], 0x24); // ccs=1, e=0, s=1
        assert_eq!(&frame.data[1..4], &[0x00, 0x30, 0x02]);
        assert_eq!(&frame.data[4..8], &11u32.to_le_bytes());
    }

    #[test]
    fn test_upload_requests() {
        let frame = upload_request(NodeId(0x23), 0x1018, 0x00).unwrap();
        assert_eq!(frame.id, 0x623);
        assert_eq!(frame.data[0], 0x40);
        assert_eq!(&frame.data[1..4], &[0x18, 0x10, 0x00]);

        let seg0 = upload_segment_request(NodeId(0x23), false).unwrap();
        assert_eq!(seg0.data[0], 0x60);
        let seg1 = upload_segment_request(NodeId(0x23), true).unwrap();
        assert_eq!(seg1.data[0], 0x70);
    }

    #[test]
    fn test_upload_segment_data() {
        // middle segment: full 7 bytes, c=0
        let mut frame = Frame::new(0x5A3, &[0x00, 1, 2, 3, 4, 5, 6, 7]).unwrap();
        let (data, last) = upload_segment_data(&frame).unwrap();
        assert_eq!(data, &[1, 2, 3, 4, 5, 6, 7]);
        assert!(!last);

        // final segment: 5 bytes, c=1, n=2
        frame.data[0] = 0x10 | (2 << 1) | 1;
        let (data, last) = upload_segment_data(&frame).unwrap();
        assert_eq!(data, &[1, 2, 3, 4, 5]);
        assert!(last);
    }

    #[test]
    fn test_builders_validate_node() {
        assert!(expedited_download(NodeId(0), 0, 0, &[], ExpeditedEncoding::Sized).is_err());
        assert!(upload_request(NodeId(200), 0, 0).is_err());
        assert!(download_segment(NodeId(0), &[0], false, false).is_err());
    }
}
