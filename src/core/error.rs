//! Crate-wide error type.
//!
//! A single [`CanError`] enum covers the whole surface: frame validation,
//! CANopen protocol violations, SDO aborts, the closed sentinel, and
//! transport I/O. Higher layers match on the variant they care about and
//! propagate the rest with `?`.

use thiserror::Error;

use crate::canopen::sdo::SdoAbort;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CanError>;

/// Errors produced by the CAN and CANopen layers.
#[derive(Debug, Error)]
pub enum CanError {
    /// Identifier out of range for its frame format (11-bit standard or
    /// 29-bit extended).
    #[error("invalid CAN identifier 0x{id:X} (extended={extended})")]
    InvalidId { id: u32, extended: bool },

    /// Data length above the classical CAN limit of 8 bytes.
    #[error("invalid data length {0} (max 8)")]
    InvalidLength(usize),

    /// Node identifier outside 1..=127.
    #[error("invalid node id {0} (valid 1..127)")]
    InvalidNodeId(u8),

    /// A frame or payload could not be decoded.
    #[error("malformed frame: {0}")]
    Malformed(String),

    /// A peer violated the SDO protocol (unexpected specifier, mismatched
    /// index/subindex, invalid segment).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Transfer length disagreed with the declared or required size.
    #[error("size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// The SDO server aborted the transfer.
    #[error(transparent)]
    Abort(#[from] SdoAbort),

    /// The bus, endpoint, or subscription is closed, or a wait timed out.
    ///
    /// Timeout and upstream closure share this sentinel on purpose: both end
    /// the current call the same way and callers are not expected to
    /// distinguish them.
    #[error("closed")]
    Closed,

    /// Transport-level I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CanError {
    /// Build a [`CanError::Malformed`] from anything stringly.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::Malformed(msg.into())
    }

    /// Build a [`CanError::Protocol`] from anything stringly.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Check for the closed sentinel.
    #[inline]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}
