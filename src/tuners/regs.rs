//! Register bit-field helpers shared by the tuner drivers.
use crate::bus::{I2cBus, TunerBus};
use crate::error::Result;

/// Bits `lsb..=msb` of register `reg`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub reg: u8,
    pub msb: u8,
    pub lsb: u8,
}

impl Field {
    pub const fn new(reg: u8, msb: u8, lsb: u8) -> Field {
        Field { reg, msb, lsb }
    }

    pub const fn mask(&self) -> u8 {
        let high = ((1_u16 << (self.msb + 1)) - 1) as u8;
        let low = ((1_u16 << self.lsb) - 1) as u8;
        high & !low
    }

    pub const fn extract(&self, byte: u8) -> u8 {
        (byte & self.mask()) >> self.lsb
    }

    /// Replaces the field's bits in `byte`, leaving the rest untouched.
    pub const fn insert(&self, byte: u8, val: u8) -> u8 {
        (byte & !self.mask()) | ((val << self.lsb) & self.mask())
    }
}

pub fn read_field<B: I2cBus>(bus: &TunerBus<B>, addr: u8, field: Field) -> Result<u8> {
    Ok(field.extract(bus.read_reg(addr, field.reg)?))
}

/// Read-modify-write of one field. Nothing is written if the read fails.
pub fn write_field<B: I2cBus>(bus: &TunerBus<B>, addr: u8, field: Field, val: u8) -> Result<()> {
    let current = bus.read_reg(addr, field.reg)?;
    bus.write_reg(addr, field.reg, field.insert(current, val))
}

/// Sets the `mask` bits of `reg` to `val`, skipping the write when they
/// already hold it. `val` is pre-shifted.
pub fn set_mask<B: I2cBus>(bus: &TunerBus<B>, addr: u8, reg: u8, mask: u8, val: u8) -> Result<()> {
    let current = bus.read_reg(addr, reg)?;
    if current & mask == val {
        return Ok(());
    }
    bus.write_reg(addr, reg, (current & !mask) | (val & mask))
}

/// Read-modify-write with explicit and/or masks: `(reg & and) | or`.
pub fn update_reg<B: I2cBus>(bus: &TunerBus<B>, addr: u8, reg: u8, and: u8, or: u8) -> Result<()> {
    let current = bus.read_reg(addr, reg)?;
    bus.write_reg(addr, reg, (current & and) | or)
}
