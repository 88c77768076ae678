//! PrinterTransport middleware for monitoring transport traffic
//!
//! Wraps any Transport implementation and prints every request and response
//! passing through it, decoded to command names where possible.
//!
//! # Example
//!
//! ```ignore
//! use pikbd_transport::{HidDiscovery, PrinterConfig};
//!
//! let discovery = HidDiscovery::with_printer_config(PrinterConfig::default().with_hex(true));
//! let transport = discovery.open(None)?;
//! // All exchanges are now printed to stderr
//! ```

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use crossterm::style::Stylize;

use crate::error::TransportError;
use crate::protocol;
use crate::types::TransportDeviceInfo;
use crate::Transport;

/// Packet filter for selective display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PacketFilter {
    #[default]
    All,
    /// Only exchanges whose command byte matches
    Cmd(u8),
}

impl FromStr for PacketFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            s if s.starts_with("cmd=") || s.starts_with("0x") => {
                let hex_str = s.strip_prefix("cmd=").unwrap_or(s);
                let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
                u8::from_str_radix(hex_str, 16)
                    .map(Self::Cmd)
                    .map_err(|e| format!("Invalid command byte: {}", e))
            }
            _ => Err(format!("Unknown filter: {}", s)),
        }
    }
}

/// Configuration for the PrinterTransport
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Show the raw wire bytes alongside decoded output
    pub show_hex: bool,
    /// Filter for selective display
    pub filter: PacketFilter,
}

impl PrinterConfig {
    /// Create config with hex output setting
    pub fn with_hex(mut self, show: bool) -> Self {
        self.show_hex = show;
        self
    }

    /// Create config with filter
    pub fn with_filter(mut self, filter: PacketFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Transport middleware that prints all requests and responses
pub struct PrinterTransport {
    inner: Arc<dyn Transport>,
    config: PrinterConfig,
}

impl PrinterTransport {
    /// Wrap a transport with printing middleware
    pub fn wrap(transport: Arc<dyn Transport>, config: PrinterConfig) -> Arc<dyn Transport> {
        Arc::new(Self {
            inner: transport,
            config,
        })
    }

    fn should_show(&self, opcode: u8) -> bool {
        match self.config.filter {
            PacketFilter::All => true,
            PacketFilter::Cmd(c) => c == opcode,
        }
    }

    /// Decode the command name from a framed request (report ID at byte 0)
    fn request_name(wire: &[u8]) -> (u8, &'static str) {
        let opcode = wire.get(1).copied().unwrap_or(0);
        let sub = if protocol::has_sub_command(opcode) {
            wire.get(2).copied()
        } else {
            None
        };
        (opcode, protocol::command_name(opcode, sub))
    }

    fn print_request(&self, name: &'static str, wire: &[u8]) {
        let body = &wire[1.min(wire.len())..];
        let end = body.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        eprintln!(
            "{} {}  {} {:02x?}",
            ">>>".cyan(),
            "CMD".cyan().bold(),
            name.yellow(),
            &body[..end]
        );
        if self.config.show_hex {
            eprintln!("    {}  {:02x?}", "HEX".dim(), wire);
        }
    }

    fn print_response(&self, name: &'static str, report: &[u8]) {
        let end = report.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        eprintln!(
            "{} {}  {} {:02x?}",
            "<<<".green(),
            "RSP".green().bold(),
            name.yellow(),
            &report[..end]
        );
        if self.config.show_hex {
            eprintln!("    {}  {:02x?}", "HEX".dim(), report);
        }
    }
}

#[async_trait]
impl Transport for PrinterTransport {
    async fn exchange(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let (opcode, name) = Self::request_name(request);
        let show = self.should_show(opcode);
        if show {
            self.print_request(name, request);
        }
        let response = self.inner.exchange(request).await?;
        if show {
            self.print_response(name, &response);
        }
        Ok(response)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        self.inner.device_info()
    }

    async fn close(&self) -> Result<(), TransportError> {
        self.inner.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_filter_parse() {
        assert_eq!(PacketFilter::from_str("all").unwrap(), PacketFilter::All);
        assert_eq!(
            PacketFilter::from_str("cmd=0xfc").unwrap(),
            PacketFilter::Cmd(0xfc)
        );
        assert_eq!(
            PacketFilter::from_str("0xfe").unwrap(),
            PacketFilter::Cmd(0xfe)
        );
        assert!(PacketFilter::from_str("bogus").is_err());
    }

    #[test]
    fn test_request_name_resolves_sub_commands() {
        // frame: [report_id, opcode, sub, ...]
        let wire = [0x00, 0xFC, 0x05, 0x07];
        let (opcode, name) = PrinterTransport::request_name(&wire);
        assert_eq!(opcode, 0xFC);
        assert_eq!(name, "GET_PRESET");

        let wire = [0x00, 0x04, 0x00, 0x02, 0x03];
        let (_, name) = PrinterTransport::request_name(&wire);
        assert_eq!(name, "DYNAMIC_KEYMAP_GET_KEYCODE");
    }
}
