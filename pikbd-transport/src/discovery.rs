//! Device discovery for Raspberry Pi keyboards

use std::sync::Arc;

use hidapi::HidApi;
use tracing::{debug, info};

use crate::error::TransportError;
use crate::hid::HidTransport;
use crate::printer::{PrinterConfig, PrinterTransport};
use crate::protocol::device;
use crate::types::{DiscoveredDevice, TransportDeviceInfo};
use crate::Transport;

/// HID device discovery for Pi 500 and Pi 500+ keyboards
///
/// Keyboards enumerate several HID interfaces; only the Vial config
/// interface (vendor usage page 0xFF60, usage 0x61, serial
/// `vial:f64c2b3c`) accepts config reports.
pub struct HidDiscovery {
    /// Optional printer config for monitoring mode; transports opened via
    /// [`HidDiscovery::open`] are wrapped automatically
    printer_config: Option<PrinterConfig>,
}

impl Default for HidDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl HidDiscovery {
    pub fn new() -> Self {
        Self {
            printer_config: None,
        }
    }

    /// Create with printer config for monitoring mode
    pub fn with_printer_config(config: PrinterConfig) -> Self {
        Self {
            printer_config: Some(config),
        }
    }

    /// Check if this is the Vial config interface of a supported keyboard
    fn is_vial_interface(device_info: &hidapi::DeviceInfo) -> bool {
        device_info.serial_number() == Some(device::VIAL_SERIAL)
            && device_info.usage_page() == device::USAGE_PAGE
            && device_info.usage() == device::USAGE
    }

    /// List compatible keyboards
    ///
    /// Fails with [`TransportError::DeviceNotFound`] when no Raspberry Pi
    /// keyboard is attached at all, and [`TransportError::NotCompatible`]
    /// when keyboards exist but none exposes the Vial config interface.
    pub fn list_devices(&self) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let api = HidApi::new().map_err(TransportError::from)?;
        self.scan(&api)
    }

    fn scan(&self, api: &HidApi) -> Result<Vec<DiscoveredDevice>, TransportError> {
        let mut pi_interfaces = 0usize;
        let mut devices = Vec::new();

        for device_info in api.device_list() {
            let vid = device_info.vendor_id();
            let pid = device_info.product_id();

            if vid != device::VENDOR_ID || !device::is_supported_pid(pid) {
                continue;
            }
            pi_interfaces += 1;

            if !Self::is_vial_interface(device_info) {
                continue;
            }

            let path = device_info.path().to_string_lossy().to_string();
            let serial = device_info.serial_number().map(|s| s.to_string());
            let product_name = device_info.product_string().map(|s| s.to_string());

            debug!(
                "Found keyboard: VID={:04X} PID={:04X} product={:?} path={}",
                vid, pid, product_name, path
            );

            devices.push(DiscoveredDevice {
                info: TransportDeviceInfo {
                    vid,
                    pid,
                    device_path: path,
                    serial,
                    product_name,
                },
            });
        }

        if devices.is_empty() {
            return Err(if pi_interfaces > 0 {
                TransportError::NotCompatible(
                    "the keyboard is not running Vial-capable firmware; \
                     update the keyboard firmware to continue"
                        .into(),
                )
            } else {
                TransportError::DeviceNotFound("no Raspberry Pi keyboard detected".into())
            });
        }

        Ok(devices)
    }

    /// Open a keyboard's config interface and drain its stale reports
    ///
    /// With `path = None` the first compatible keyboard is used.
    pub fn open(&self, path: Option<&str>) -> Result<Arc<dyn Transport>, TransportError> {
        let api = HidApi::new().map_err(TransportError::from)?;
        let devices = self.scan(&api)?;

        let chosen = match path {
            Some(p) => devices
                .iter()
                .find(|d| d.info.device_path == p)
                .ok_or_else(|| {
                    TransportError::DeviceNotFound(format!("no compatible keyboard at {}", p))
                })?,
            None => {
                if devices.len() > 1 {
                    info!("Multiple keyboards found, using the first compatible one");
                }
                &devices[0]
            }
        };

        let entry = api
            .device_list()
            .find(|d| {
                Self::is_vial_interface(d)
                    && d.path().to_string_lossy() == chosen.info.device_path
            })
            .ok_or_else(|| TransportError::DeviceNotFound(chosen.info.device_path.clone()))?;

        let device = entry.open_device(&api).map_err(TransportError::from)?;
        let transport = HidTransport::new(device, chosen.info.clone());

        let drained = transport.drain_input()?;
        if drained > 0 {
            debug!("Drained {} stale reports at open", drained);
        }

        let transport: Arc<dyn Transport> = Arc::new(transport);
        Ok(match &self.printer_config {
            Some(config) => PrinterTransport::wrap(transport, config.clone()),
            None => transport,
        })
    }
}
