//! CANopen (CiA 301) application layer: identifiers, service codecs, and
//! the SDO client.
//!
//! This is a practical subset, not a full CANopen master: there is no
//! object dictionary, PDO scheduler, or LSS. What it covers:
//!
//! - COB-ID composition and parsing ([`cobid`], [`parse_cobid`])
//! - NMT, heartbeat, EMCY and SYNC frame build/parse helpers
//! - ready-made [`filters`] for subscribing to services through a
//!   [`Mux`](crate::bus::Mux)
//! - the [`SdoClient`] for reading and writing object-dictionary entries
//!   on remote nodes, expedited and segmented

pub mod emcy;
pub mod filters;
pub mod heartbeat;
pub mod ids;
pub mod nmt;
pub mod sdo;
pub mod sync;

pub use emcy::{emcy, parse_emcy, EmcyMessage};
pub use heartbeat::{heartbeat, parse_heartbeat};
pub use ids::{cobid, parse_cobid, FunctionCode, NodeId};
pub use nmt::{build_nmt, parse_nmt, NmtCommand, NmtState};
pub use sdo::{ExpeditedEncoding, SdoAbort, SdoClient};
pub use sync::{parse_sync, sync_frame, SyncProducer};
