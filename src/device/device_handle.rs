use std::time::Duration;

use crate::error::Result;
use log::info;
use rusb::{Context, UsbContext};

use super::KNOWN_DEVICES;

#[derive(Debug)]
pub struct DeviceHandle {
    handle: rusb::DeviceHandle<Context>,
}

impl DeviceHandle {
    /// Opens the `index`-th attached device with a known vendor/product id.
    pub fn open(index: usize) -> Result<Self> {
        let context = Context::new()?;
        let handle = DeviceHandle::open_device(&context, index)?;
        Ok(DeviceHandle { handle })
    }

    fn open_device<T: UsbContext>(context: &T, index: usize) -> Result<rusb::DeviceHandle<T>> {
        let mut matching = Vec::new();
        for found in context.devices()?.iter() {
            let desc = found.device_descriptor()?;
            if let Some(known) = KNOWN_DEVICES
                .iter()
                .find(|d| d.vid == desc.vendor_id() && d.pid == desc.product_id())
            {
                matching.push((found, known.description));
            }
        }
        match matching.into_iter().nth(index) {
            Some((device, description)) => {
                info!("Opening {} (device {})", description, index);
                Ok(device.open()?)
            }
            None => Err(rusb::Error::NoDevice.into()),
        }
    }

    pub fn claim_interface(&mut self, iface: u8) -> Result<()> {
        Ok(self.handle.claim_interface(iface)?)
    }

    pub fn reset(&mut self) -> Result<()> {
        Ok(self.handle.reset()?)
    }

    pub fn read_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize> {
        Ok(self
            .handle
            .read_control(request_type, request, value, index, buf, timeout)?)
    }

    pub fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        buf: &[u8],
        timeout: Duration,
    ) -> Result<usize> {
        Ok(self
            .handle
            .write_control(request_type, request, value, index, buf, timeout)?)
    }
}
