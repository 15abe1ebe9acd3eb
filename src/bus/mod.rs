//! I2C transport to the tuner and the repeater discipline around it.
//!
//! Tuner chips sit behind the demodulator's I2C repeater. Every logical
//! transaction is bracketed by a [`Repeater`] guard obtained from
//! [`TunerBus::repeater`]; guards nest, and only the outermost one touches
//! the physical repeater switch.
use std::cell::Cell;

use log::{debug, error};

use crate::error::{Result, TransportError, TunerError};

#[cfg(test)]
pub(crate) mod mock_bus;
#[cfg(test)]
pub(crate) mod sim;

/// Raw services the owning demodulator exposes to tuner drivers.
///
/// Addresses are the 8-bit shifted form used on the RTL2832 IIC block.
pub trait I2cBus {
    /// Writes `buf` to the device at `addr`, returning the bytes transferred.
    fn i2c_write(&self, addr: u8, buf: &[u8]) -> Result<usize>;
    /// Reads `buf.len()` bytes from the device at `addr`.
    fn i2c_read(&self, addr: u8, buf: &mut [u8]) -> Result<usize>;
    fn set_i2c_repeater(&self, enable: bool) -> Result<()>;
    fn set_gpio_output(&self, gpio: u8) -> Result<()>;
    fn set_gpio_bit(&self, gpio: u8, on: bool) -> Result<()>;
}

/// An [`I2cBus`] plus the repeater nesting depth.
#[derive(Debug)]
pub struct TunerBus<B> {
    bus: B,
    depth: Cell<usize>,
}

/// Keeps the I2C repeater enabled while alive.
#[must_use = "the repeater is disabled again as soon as the guard is dropped"]
#[derive(Debug)]
pub struct Repeater<'a, B: I2cBus> {
    owner: &'a TunerBus<B>,
}

impl<B: I2cBus> TunerBus<B> {
    pub fn new(bus: B) -> TunerBus<B> {
        TunerBus {
            bus,
            depth: Cell::new(0),
        }
    }

    pub fn inner(&self) -> &B {
        &self.bus
    }

    pub fn inner_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    pub fn depth(&self) -> usize {
        self.depth.get()
    }

    /// Enables the repeater if no guard is outstanding, and returns a guard.
    ///
    /// On failure no guard exists and the depth is unchanged.
    pub fn repeater(&self) -> Result<Repeater<'_, B>> {
        let depth = self.depth.get();
        if depth == 0 {
            self.bus.set_i2c_repeater(true)?;
        }
        self.depth.set(depth + 1);
        Ok(Repeater { owner: self })
    }

    pub fn set_gpio_output(&self, gpio: u8) -> Result<()> {
        self.bus.set_gpio_output(gpio)
    }

    pub fn set_gpio_bit(&self, gpio: u8, on: bool) -> Result<()> {
        self.bus.set_gpio_bit(gpio, on)
    }

    /// Writes a raw message. Anything short of the full buffer is an error.
    pub fn write(&self, addr: u8, buf: &[u8]) -> Result<()> {
        let n = self
            .bus
            .i2c_write(addr, buf)
            .map_err(|e| transport(addr, e))?;
        check_len(addr, buf.len(), n)
    }

    /// Reads a raw message. Anything short of the full buffer is an error.
    pub fn read(&self, addr: u8, buf: &mut [u8]) -> Result<()> {
        let n = self
            .bus
            .i2c_read(addr, buf)
            .map_err(|e| transport(addr, e))?;
        check_len(addr, buf.len(), n)
    }

    pub fn write_reg(&self, addr: u8, reg: u8, val: u8) -> Result<()> {
        debug!("i2c {:#04x} write {:#04x} = {:#04x}", addr, reg, val);
        self.write(addr, &[reg, val])
    }

    /// Writes consecutive registers starting at `reg` in one message.
    pub fn write_array(&self, addr: u8, reg: u8, vals: &[u8]) -> Result<()> {
        debug!("i2c {:#04x} write {:#04x} = {:02x?}", addr, reg, vals);
        let mut buf = Vec::with_capacity(vals.len() + 1);
        buf.push(reg);
        buf.extend_from_slice(vals);
        self.write(addr, &buf)
    }

    pub fn read_reg(&self, addr: u8, reg: u8) -> Result<u8> {
        let mut data = [0_u8];
        self.read_regs(addr, reg, &mut data)?;
        Ok(data[0])
    }

    /// Sets the register pointer to `reg` and reads `buf.len()` bytes from it.
    pub fn read_regs(&self, addr: u8, reg: u8, buf: &mut [u8]) -> Result<()> {
        self.write(addr, &[reg])?;
        self.read(addr, buf)?;
        debug!("i2c {:#04x} read {:#04x} = {:02x?}", addr, reg, buf);
        Ok(())
    }
}

impl<'a, B: I2cBus> Drop for Repeater<'a, B> {
    fn drop(&mut self) {
        let depth = self.owner.depth.get().saturating_sub(1);
        self.owner.depth.set(depth);
        if depth == 0 {
            if let Err(e) = self.owner.bus.set_i2c_repeater(false) {
                error!("Failed to disable i2c repeater: {}", e);
            }
        }
    }
}

fn check_len(addr: u8, expected: usize, actual: usize) -> Result<()> {
    match actual {
        0 => Err(TransportError::Nak { addr }.into()),
        n if n < expected => Err(TransportError::Short {
            addr,
            expected,
            actual: n,
        }
        .into()),
        _ => Ok(()),
    }
}

fn transport(addr: u8, err: TunerError) -> TunerError {
    match err {
        TunerError::Usb(source) => TransportError::Usb { addr, source }.into(),
        other => other,
    }
}
