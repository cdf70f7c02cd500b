//! Ready-made frame filters for CANopen services.
//!
//! All filters additionally require the standard (11-bit) identifier
//! format, since CANopen services live in the standard id space.

use crate::canopen::ids::{cobid, FunctionCode, NodeId};
use crate::core::filter::FrameFilter;

// Function-code base mask: the upper 4 bits of an 11-bit identifier.
const BASE_MASK: u32 = 0x780;

fn service(fc: FunctionCode, node: NodeId) -> FrameFilter {
    FrameFilter::standard_only().and(FrameFilter::id(cobid(fc, node)))
}

fn service_any(fc: FunctionCode) -> FrameFilter {
    FrameFilter::standard_only().and(FrameFilter::mask(fc.base() as u32, BASE_MASK))
}

/// NMT command frames (id 0x000).
pub fn nmt() -> FrameFilter {
    service(FunctionCode::Nmt, NodeId::BROADCAST)
}

/// SYNC frames (id 0x080).
pub fn sync() -> FrameFilter {
    service(FunctionCode::Sync, NodeId::BROADCAST)
}

/// TIME frames (id 0x100).
pub fn time() -> FrameFilter {
    service(FunctionCode::Time, NodeId::BROADCAST)
}

/// Heartbeats from any node (0x700..0x77F).
pub fn heartbeat_any() -> FrameFilter {
    service_any(FunctionCode::NmtErrCtrl)
}

/// Heartbeat from one node.
pub fn heartbeat(node: NodeId) -> FrameFilter {
    service(FunctionCode::NmtErrCtrl, node)
}

/// Emergency messages from any node (0x080..0x0FF).
pub fn emcy_any() -> FrameFilter {
    service_any(FunctionCode::Emcy)
}

/// Emergency messages from one node.
pub fn emcy(node: NodeId) -> FrameFilter {
    service(FunctionCode::Emcy, node)
}

/// SDO requests (client to server) for any node.
pub fn sdo_request_any() -> FrameFilter {
    service_any(FunctionCode::SdoRx)
}

/// SDO requests addressed to one node.
pub fn sdo_request(node: NodeId) -> FrameFilter {
    service(FunctionCode::SdoRx, node)
}

/// SDO responses (server to client) from any node.
pub fn sdo_response_any() -> FrameFilter {
    service_any(FunctionCode::SdoTx)
}

/// SDO responses from one node.
pub fn sdo_response(node: NodeId) -> FrameFilter {
    service(FunctionCode::SdoTx, node)
}

pub fn tpdo1_any() -> FrameFilter {
    service_any(FunctionCode::Tpdo1)
}

pub fn tpdo2_any() -> FrameFilter {
    service_any(FunctionCode::Tpdo2)
}

pub fn tpdo3_any() -> FrameFilter {
    service_any(FunctionCode::Tpdo3)
}

pub fn tpdo4_any() -> FrameFilter {
    service_any(FunctionCode::Tpdo4)
}

pub fn rpdo1_any() -> FrameFilter {
    service_any(FunctionCode::Rpdo1)
}

pub fn rpdo2_any() -> FrameFilter {
    service_any(FunctionCode::Rpdo2)
}

pub fn rpdo3_any() -> FrameFilter {
    service_any(FunctionCode::Rpdo3)
}

pub fn rpdo4_any() -> FrameFilter {
    service_any(FunctionCode::Rpdo4)
}

pub fn tpdo1(node: NodeId) -> FrameFilter {
    service(FunctionCode::Tpdo1, node)
}

pub fn tpdo2(node: NodeId) -> FrameFilter {
    service(FunctionCode::Tpdo2, node)
}

pub fn tpdo3(node: NodeId) -> FrameFilter {
    service(FunctionCode::Tpdo3, node)
}

pub fn tpdo4(node: NodeId) -> FrameFilter {
    service(FunctionCode::Tpdo4, node)
}

pub fn rpdo1(node: NodeId) -> FrameFilter {
    service(FunctionCode::Rpdo1, node)
}

pub fn rpdo2(node: NodeId) -> FrameFilter {
    service(FunctionCode::Rpdo2, node)
}

pub fn rpdo3(node: NodeId) -> FrameFilter {
    service(FunctionCode::Rpdo3, node)
}

pub fn rpdo4(node: NodeId) -> FrameFilter {
    service(FunctionCode::Rpdo4, node)
}
