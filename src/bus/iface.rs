//! CAN interface configuration via `ip link`.
//!
//! Bringing an interface up or down and setting bitrate require
//! CAP_NET_ADMIN; without it these calls fail with a permission error from
//! the `ip` tool. Typical usage:
//!
//! ```rust,ignore
//! use canlink::bus::iface::{iface_up, IfaceConfig};
//!
//! iface_up("can0", &IfaceConfig::bitrate(500_000))?;
//! ```

use std::io;
use std::process::Command;

use serde::{Deserialize, Serialize};

use crate::core::error::{CanError, Result};

// IFNAMSIZ on Linux.
const MAX_IFACE_NAME: usize = 16;

/// Parameters applied when bringing a CAN interface up.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IfaceConfig {
    /// Bitrate in bits per second (e.g. 500_000).
    pub bitrate: u32,

    /// Automatic bus-off restart delay in milliseconds.
    #[serde(default)]
    pub restart_ms: Option<u32>,

    /// Transmit queue length.
    #[serde(default)]
    pub txqueuelen: Option<u32>,
}

impl IfaceConfig {
    /// Config with only a bitrate set.
    pub fn bitrate(bitrate: u32) -> Self {
        IfaceConfig {
            bitrate,
            restart_ms: None,
            txqueuelen: None,
        }
    }
}

/// Configure and bring up a CAN interface.
///
/// Runs the equivalent of:
/// `ip link set <dev> down`,
/// `ip link set <dev> type can bitrate <rate> [restart-ms <ms>]`,
/// `ip link set <dev> txqueuelen <n>` (if set),
/// `ip link set <dev> up`.
pub fn iface_up(name: &str, config: &IfaceConfig) -> Result<()> {
    validate_name(name)?;
    run_ip(&["link", "set", name, "down"])?;

    let bitrate = config.bitrate.to_string();
    let mut args = vec!["link", "set", name, "type", "can", "bitrate", bitrate.as_str()];
    let restart;
    if let Some(ms) = config.restart_ms {
        restart = ms.to_string();
        args.push("restart-ms");
        args.push(restart.as_str());
    }
    run_ip(&args)?;

    if let Some(qlen) = config.txqueuelen {
        let qlen = qlen.to_string();
        run_ip(&["link", "set", name, "txqueuelen", qlen.as_str()])?;
    }

    run_ip(&["link", "set", name, "up"])?;
    tracing::info!(interface = name, bitrate = config.bitrate, "interface up");
    Ok(())
}

/// Bring a CAN interface down.
pub fn iface_down(name: &str) -> Result<()> {
    validate_name(name)?;
    run_ip(&["link", "set", name, "down"])?;
    tracing::info!(interface = name, "interface down");
    Ok(())
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() >= MAX_IFACE_NAME {
        return Err(CanError::malformed(format!(
            "invalid interface name {name:?}"
        )));
    }
    Ok(())
}

fn run_ip(args: &[&str]) -> Result<()> {
    let output = Command::new("ip").args(args).output()?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(CanError::Io(io::Error::other(format!(
            "ip {}: {}",
            args.join(" "),
            stderr.trim()
        ))));
    }
    Ok(())
}
