//! CANopen identifiers: node ids, function codes, and COB-ID mapping.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::error::{CanError, Result};

/// A CANopen node identifier.
///
/// Valid device addresses are 1..=127; 0 is the broadcast address used by
/// NMT and the fixed-id services. Validation happens at the points that
/// require a concrete device (heartbeat, EMCY, SDO), not at construction.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct NodeId(pub u8);

impl NodeId {
    /// The broadcast address.
    pub const BROADCAST: NodeId = NodeId(0);

    /// Check that the node id addresses a concrete device (1..=127).
    pub fn validate(self) -> Result<()> {
        if self.0 < 1 || self.0 > 127 {
            return Err(CanError::InvalidNodeId(self.0));
        }
        Ok(())
    }

    /// The raw address byte.
    #[inline]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl From<u8> for NodeId {
    fn from(raw: u8) -> Self {
        NodeId(raw)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// CANopen function codes with their COB-ID bases per CiA 301.
///
/// SYNC and EMCY share the 0x080 base (SYNC is the fixed id 0x080 itself,
/// EMCY adds the node id), so the base lives in [`base`](Self::base) rather
/// than in enum discriminants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FunctionCode {
    /// Network management, broadcast id 0x000.
    Nmt,
    /// Synchronization object, fixed id 0x080.
    Sync,
    /// Time stamp object, fixed id 0x100.
    Time,
    /// Emergency, 0x080 + node.
    Emcy,
    Tpdo1,
    Rpdo1,
    Tpdo2,
    Rpdo2,
    Tpdo3,
    Rpdo3,
    Tpdo4,
    Rpdo4,
    /// SDO server to client, 0x580 + node.
    SdoTx,
    /// SDO client to server, 0x600 + node.
    SdoRx,
    /// NMT error control (heartbeat, node guarding), 0x700 + node.
    NmtErrCtrl,
}

impl FunctionCode {
    /// The COB-ID base of this function code.
    pub const fn base(self) -> u16 {
        match self {
            FunctionCode::Nmt => 0x000,
            FunctionCode::Sync => 0x080,
            FunctionCode::Time => 0x100,
            FunctionCode::Emcy => 0x080,
            FunctionCode::Tpdo1 => 0x180,
            FunctionCode::Rpdo1 => 0x200,
            FunctionCode::Tpdo2 => 0x280,
            FunctionCode::Rpdo2 => 0x300,
            FunctionCode::Tpdo3 => 0x380,
            FunctionCode::Rpdo3 => 0x400,
            FunctionCode::Tpdo4 => 0x480,
            FunctionCode::Rpdo4 => 0x500,
            FunctionCode::SdoTx => 0x580,
            FunctionCode::SdoRx => 0x600,
            FunctionCode::NmtErrCtrl => 0x700,
        }
    }

    /// Whether the COB-ID is fixed regardless of node id.
    ///
    /// Only NMT and TIME are treated as fixed here. SYNC shares its base
    /// with EMCY, so it goes through the node-addition path with node 0 to
    /// keep the mapping unambiguous.
    pub const fn is_fixed(self) -> bool {
        matches!(self, FunctionCode::Nmt | FunctionCode::Time)
    }
}

/// Compose the 11-bit CAN identifier for a function code and node id.
///
/// For fixed function codes the node id is ignored.
pub fn cobid(fc: FunctionCode, node: NodeId) -> u32 {
    if fc.is_fixed() {
        fc.base() as u32
    } else {
        (fc.base() + node.0 as u16) as u32
    }
}

/// Infer the function code and node id from an 11-bit identifier.
///
/// Fixed ids match exactly (0x080 itself parses as SYNC, not EMCY of node
/// 0); everything else maps by base range with the node id as offset.
/// Identifiers above 0x7FF or outside every CANopen base range are
/// rejected.
pub fn parse_cobid(id: u32) -> Result<(FunctionCode, NodeId)> {
    if id > 0x7FF {
        return Err(CanError::InvalidId {
            id,
            extended: false,
        });
    }
    let u = id as u16;
    let (fc, base) = match u {
        0x000 => return Ok((FunctionCode::Nmt, NodeId::BROADCAST)),
        0x080 => return Ok((FunctionCode::Sync, NodeId::BROADCAST)),
        0x100 => return Ok((FunctionCode::Time, NodeId::BROADCAST)),
        0x080..=0x0FF => (FunctionCode::Emcy, 0x080),
        0x180..=0x1FF => (FunctionCode::Tpdo1, 0x180),
        0x200..=0x27F => (FunctionCode::Rpdo1, 0x200),
        0x280..=0x2FF => (FunctionCode::Tpdo2, 0x280),
        0x300..=0x37F => (FunctionCode::Rpdo2, 0x300),
        0x380..=0x3FF => (FunctionCode::Tpdo3, 0x380),
        0x400..=0x47F => (FunctionCode::Rpdo3, 0x400),
        0x480..=0x4FF => (FunctionCode::Tpdo4, 0x480),
        0x500..=0x57F => (FunctionCode::Rpdo4, 0x500),
        0x580..=0x5FF => (FunctionCode::SdoTx, 0x580),
        0x600..=0x67F => (FunctionCode::SdoRx, 0x600),
        0x700..=0x77F => (FunctionCode::NmtErrCtrl, 0x700),
        _ => {
            return Err(CanError::malformed(format!(
                "id 0x{id:X} not in CANopen base ranges"
            )))
        }
    };
    Ok((fc, NodeId((u - base) as u8)))
}
