//! Command handlers for the CLI application.
//!
//! This module organizes command handlers by category:
//! - `query`: Read-only commands (info, version, uptime, list-effects, list-keycodes)
//! - `security`: Lock state commands (unlock, lock)
//! - `lighting`: LED, effect and preset commands
//! - `keymap`: Keycode commands (key get/set/get-all/watch, reset-keymap)

pub mod keymap;
pub mod lighting;
pub mod query;
pub mod security;

use anyhow::Context;
use pikbd_keyboard::Keyboard;
use pikbd_transport::{HidDiscovery, PacketFilter, PrinterConfig};

/// Result type for command handlers
pub type CommandResult = anyhow::Result<()>;

/// Open the first compatible keyboard and run the session handshake.
/// If `printer_config` is Some, the transport is wrapped with the report
/// monitor before the session sees it.
pub async fn open_keyboard(printer_config: Option<PrinterConfig>) -> anyhow::Result<Keyboard> {
    let discovery = match printer_config {
        Some(config) => HidDiscovery::with_printer_config(config),
        None => HidDiscovery::new(),
    };
    let transport = discovery.open(None).context("failed to open the keyboard")?;
    Keyboard::open(transport)
        .await
        .context("keyboard handshake failed")
}

/// Create printer config from CLI flags
pub fn create_printer_config(
    monitor: bool,
    hex: bool,
    filter: Option<&str>,
) -> anyhow::Result<Option<PrinterConfig>> {
    if !monitor {
        return Ok(None);
    }

    let filter = match filter {
        Some(f) => f
            .parse::<PacketFilter>()
            .map_err(|e| anyhow::anyhow!("{e}"))?,
        None => PacketFilter::All,
    };

    Ok(Some(
        PrinterConfig::default().with_hex(hex).with_filter(filter),
    ))
}
