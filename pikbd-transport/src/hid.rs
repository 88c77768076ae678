//! HID transport implementation for direct USB connection

use async_trait::async_trait;
use hidapi::HidDevice;
use parking_lot::Mutex;
use tracing::debug;

use crate::error::TransportError;
use crate::protocol::{timing, REPORT_SIZE};
use crate::types::TransportDeviceInfo;
use crate::Transport;

/// HID transport for the keyboard's Vial config interface
///
/// hidapi calls block, so the device handle sits behind a mutex and each
/// exchange holds it for the full write-then-read cycle.
pub struct HidTransport {
    device: Mutex<HidDevice>,
    info: TransportDeviceInfo,
}

impl HidTransport {
    pub fn new(device: HidDevice, info: TransportDeviceInfo) -> Self {
        Self {
            device: Mutex::new(device),
            info,
        }
    }

    /// Discard reports left in the device buffer by a previous client
    ///
    /// Reads with a short timeout until the buffer is empty. Returns the
    /// number of reports thrown away.
    pub fn drain_input(&self) -> Result<usize, TransportError> {
        let device = self.device.lock();
        let mut drained = 0;
        loop {
            let mut buf = [0u8; REPORT_SIZE];
            let read = device.read_timeout(&mut buf, timing::DRAIN_TIMEOUT_MS)?;
            if read == 0 {
                return Ok(drained);
            }
            drained += 1;
        }
    }
}

#[async_trait]
impl Transport for HidTransport {
    async fn exchange(&self, request: &[u8]) -> Result<Vec<u8>, TransportError> {
        let device = self.device.lock();

        debug!("TX {:02X?}", &request[..request.len().min(10)]);
        let written = device.write(request)?;
        if written != request.len() {
            return Err(TransportError::ShortWrite {
                written,
                expected: request.len(),
            });
        }

        let mut buf = vec![0u8; REPORT_SIZE];
        let read = device.read_timeout(&mut buf, timing::EXCHANGE_TIMEOUT_MS)?;
        if read == 0 {
            return Err(TransportError::Timeout);
        }
        buf.truncate(read);
        debug!("RX {:02X?}", &buf[..buf.len().min(10)]);
        Ok(buf)
    }

    fn device_info(&self) -> &TransportDeviceInfo {
        &self.info
    }

    async fn close(&self) -> Result<(), TransportError> {
        // HidDevice closes on drop
        Ok(())
    }
}
