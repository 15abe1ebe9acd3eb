//! RTL2832U control transfers, and the tuner services built on them.
//!
//! The demodulator exposes its register blocks through vendor control
//! requests. Tuner I2C traffic goes through the IIC block, and the I2C
//! repeater and GPIO lines are plain demodulator registers.
pub mod constants;
pub use constants::*;
pub mod device_handle;
#[cfg(test)]
pub(crate) mod mock_device_handle;

#[cfg(not(test))]
use device_handle::DeviceHandle;
#[cfg(test)]
use mock_device_handle::MockDeviceHandle as DeviceHandle;

use crate::bus::I2cBus;
use crate::error::Result;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, error, warn};


/// Register access width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    U8,
    U16,
}

impl Width {
    fn len(self) -> usize {
        match self {
            Width::U8 => 1,
            Width::U16 => 2,
        }
    }
}

#[derive(Debug)]
pub struct Device {
    handle: DeviceHandle,
}

impl Device {
    pub fn new(index: usize) -> Result<Device> {
        Ok(Device {
            handle: DeviceHandle::open(index)?,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_handle(handle: DeviceHandle) -> Device {
        Device { handle }
    }

    pub fn claim_interface(&mut self, iface: u8) -> Result<()> {
        self.handle.claim_interface(iface)
    }

    /// Dummy write; a device that rejects it is reset.
    pub fn test_write(&mut self) -> Result<()> {
        if let Err(e) = self.write_reg(BLOCK_USB, USB_SYSCTL, 0x09, Width::U8) {
            warn!("Dummy write failed ({}), resetting device", e);
            self.handle.reset()?;
        }
        Ok(())
    }

    /// Soft reset, bit 3 of demod register 0x01.
    pub fn reset_demod(&self) -> Result<()> {
        self.demod_write_reg(1, 0x01, 0x14, Width::U8)?;
        self.demod_write_reg(1, 0x01, 0x10, Width::U8)
    }

    pub fn read_reg(&self, block: u16, addr: u16, width: Width) -> Result<u16> {
        let mut data: [u8; 2] = [0, 0];
        let index: u16 = block << 8;
        self.handle.read_control(
            CTRL_IN,
            0,
            addr,
            index,
            &mut data[..width.len()],
            CTRL_TIMEOUT,
        )?;
        // Registers read back little endian but are written big endian
        Ok(LittleEndian::read_u16(&data))
    }

    pub fn write_reg(&self, block: u16, addr: u16, val: u16, width: Width) -> Result<usize> {
        let data: [u8; 2] = val.to_be_bytes();
        let data_slice = match width {
            Width::U8 => &data[1..2],
            Width::U16 => &data[..],
        };
        let index = (block << 8) | 0x10;
        self.handle
            .write_control(CTRL_OUT, 0, addr, index, data_slice, CTRL_TIMEOUT)
    }

    pub fn demod_read_reg(&self, page: u16, addr: u16) -> Result<u8> {
        let mut data = [0_u8];
        match self.handle.read_control(
            CTRL_IN,
            0,
            (addr << 8) | 0x20,
            page,
            &mut data,
            CTRL_TIMEOUT,
        ) {
            Ok(_) => Ok(data[0]),
            Err(e) => {
                error!(
                    "demod_read_reg failed: {} page: {:#04x} addr: {:#04x}",
                    e, page, addr
                );
                Err(e)
            }
        }
    }

    /// Writes a demod register, then reads page 0x0a register 0x01 as the
    /// demodulator requires after every write.
    pub fn demod_write_reg(&self, page: u16, addr: u16, val: u16, width: Width) -> Result<()> {
        let index = 0x10 | page;
        let value = (addr << 8) | 0x20;
        let data: [u8; 2] = val.to_be_bytes();
        let data_slice = match width {
            Width::U8 => &data[1..2],
            Width::U16 => &data[..],
        };

        if let Err(e) = self
            .handle
            .write_control(CTRL_OUT, 0, value, index, data_slice, CTRL_TIMEOUT)
        {
            error!(
                "demod_write_reg failed: {} page: {:#04x} addr: {:#04x} val: {:#04x}",
                e, page, addr, val
            );
            return Err(e);
        }

        self.demod_read_reg(0x0a, 0x01)?;
        Ok(())
    }

    pub fn read_array(&self, block: u16, addr: u16, arr: &mut [u8]) -> Result<usize> {
        let index: u16 = block << 8;
        self.handle
            .read_control(CTRL_IN, 0, addr, index, arr, CTRL_TIMEOUT)
    }

    pub fn write_array(&self, block: u16, addr: u16, arr: &[u8]) -> Result<usize> {
        let index: u16 = (block << 8) | 0x10;
        self.handle
            .write_control(CTRL_OUT, 0, addr, index, arr, CTRL_TIMEOUT)
    }
}

impl I2cBus for Device {
    fn i2c_write(&self, addr: u8, buf: &[u8]) -> Result<usize> {
        self.write_array(BLOCK_IIC, addr.into(), buf)
    }

    fn i2c_read(&self, addr: u8, buf: &mut [u8]) -> Result<usize> {
        self.read_array(BLOCK_IIC, addr.into(), buf)
    }

    fn set_i2c_repeater(&self, enable: bool) -> Result<()> {
        debug!("i2c repeater {}", if enable { "on" } else { "off" });
        let val = if enable { 0x18 } else { 0x10 };
        self.demod_write_reg(1, 0x01, val, Width::U8)
    }

    fn set_gpio_output(&self, gpio: u8) -> Result<()> {
        let bit: u16 = 1 << gpio;
        let r = self.read_reg(BLOCK_SYS, GPD, Width::U8)?;
        self.write_reg(BLOCK_SYS, GPD, r & !bit, Width::U8)?;
        let r = self.read_reg(BLOCK_SYS, GPOE, Width::U8)?;
        self.write_reg(BLOCK_SYS, GPOE, r | bit, Width::U8)?;
        Ok(())
    }

    fn set_gpio_bit(&self, gpio: u8, on: bool) -> Result<()> {
        let bit: u16 = 1 << gpio;
        let r = self.read_reg(BLOCK_SYS, GPO, Width::U8)?;
        let r = if on { r | bit } else { r & !bit };
        self.write_reg(BLOCK_SYS, GPO, r, Width::U8)?;
        Ok(())
    }
}
