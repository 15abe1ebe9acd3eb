//! Fitipower FC0012 driver.
use log::debug;

use super::bandwidth::BandwidthPlan;
use super::gain::{self, entry, GainTable};
use super::regs::{write_field, Field};
use super::synth::{self, FcPlan, MHZ};
use super::{check_bandwidth, check_frequency, Range, Tuner, TunerInfo, TunerParams, TunerState};
use crate::bus::{I2cBus, TunerBus};
use crate::error::Result;

pub const ID: &str = "fc0012";
const ADDR: u8 = 0xc6;

pub const TUNER_INFO: TunerInfo = TunerInfo {
    id: ID,
    name: "Fitipower FC0012",
    i2c_addr: ADDR,
    check_addr: 0x00,
    check_val: 0xa1,
};

/// GPIO wired to the tuner's reset line.
const RESET_GPIO: u8 = 5;

pub const DEFAULT_BANDWIDTH: u32 = 8 * MHZ;
const BANDWIDTHS: [u32; 3] = [6 * MHZ, 7 * MHZ, 8 * MHZ];

// The vendor driver only names these low, middle and high
const GAINS: GainTable = GainTable::new(&[entry(0, 0), entry(5, 1), entry(10, 2)]);
const LNA_GAIN: Field = Field::new(0x13, 4, 3);

const INIT: [(u8, u8); 23] = [
    (0x01, 0x05),
    (0x02, 0x10),
    (0x03, 0x00),
    (0x04, 0x00),
    (0x05, 0x0f),
    // Divider 2, VCO slow
    (0x06, 0x00),
    // 28.8 MHz crystal
    (0x07, 0x20),
    (0x08, 0xff),
    (0x09, 0x6e),
    (0x0a, 0xb8),
    (0x0b, 0x82),
    // AGC up-down mode
    (0x0c, 0xfc),
    (0x0d, 0x02),
    (0x0e, 0x00),
    (0x0f, 0x00),
    (0x10, 0x00),
    (0x11, 0x00),
    (0x12, 0x1f),
    (0x14, 0x00),
    // LNA compensation
    (0x15, 0x04),
    // The chip only settles after these are written a second time
    (0x0d, 0x02),
    (0x11, 0x00),
    (0x15, 0x04),
];

const REG_VCO: u8 = 0x06;
const REG_VCO_CAL: u8 = 0x0e;
const VCO_CAL_TRIGGER: u8 = 0x80;
const VCO_SPEED_HIGH: u8 = 0x08;

/// Pulses the tuner reset line. Needed before the chip answers a probe.
pub fn reset<B: I2cBus>(bus: &TunerBus<B>) -> Result<()> {
    bus.set_gpio_output(RESET_GPIO)?;
    bus.set_gpio_bit(RESET_GPIO, true)?;
    bus.set_gpio_bit(RESET_GPIO, false)
}

/// Low-pass filter bits 7..6 of register 0x06 for a 6, 7 or 8 MHz channel.
pub(crate) fn bandwidth_bits(reg6: u8, bw: u32) -> u8 {
    match bw / MHZ {
        6 => reg6 | 0x80,
        7 => (reg6 & !0x80) | 0x40,
        _ => reg6 & !0xc0,
    }
}

/// Starts a VCO calibration and returns the resulting VCO code.
pub(crate) fn calibrate_vco<B: I2cBus>(bus: &TunerBus<B>, addr: u8) -> Result<u8> {
    bus.write_reg(addr, REG_VCO_CAL, VCO_CAL_TRIGGER)?;
    bus.write_reg(addr, REG_VCO_CAL, 0x00)?;
    bus.write_reg(addr, REG_VCO_CAL, 0x00)?;
    Ok(bus.read_reg(addr, REG_VCO_CAL)? & 0x3f)
}

pub(crate) fn recalibrate_vco<B: I2cBus>(bus: &TunerBus<B>, addr: u8, reg6: u8) -> Result<()> {
    bus.write_reg(addr, REG_VCO, reg6)?;
    bus.write_reg(addr, REG_VCO_CAL, VCO_CAL_TRIGGER)?;
    bus.write_reg(addr, REG_VCO_CAL, 0x00)
}

#[derive(Debug)]
pub struct Fc0012 {
    state: TunerState,
    /// Divider words last programmed, reused when only the filter changes.
    plan: Option<FcPlan>,
}

impl Fc0012 {
    pub fn new(xtal: u32) -> Fc0012 {
        Fc0012 {
            state: TunerState::new(xtal, DEFAULT_BANDWIDTH),
            plan: None,
        }
    }

    fn program<B: I2cBus>(&self, bus: &TunerBus<B>, plan: &FcPlan, bw: u32) -> Result<()> {
        let mut regs = plan.regs;
        regs[5] = bandwidth_bits(regs[5], bw);
        debug!(
            "FC0012 {} kHz multi {} xdiv {} xin {:#06x}",
            plan.requested_khz, plan.divider.multi, plan.xdiv, plan.xin
        );
        for (reg, val) in (0x01..).zip(regs) {
            bus.write_reg(ADDR, reg, val)?;
        }

        let vco = calibrate_vco(bus, ADDR)?;
        if vco > 0x3c {
            debug!("FC0012 VCO code {:#04x}, recalibrating", vco);
            recalibrate_vco(bus, ADDR, regs[5] | VCO_SPEED_HIGH)?;
        }
        Ok(())
    }
}

impl Tuner for Fc0012 {
    fn info(&self) -> &'static TunerInfo {
        &TUNER_INFO
    }

    fn state(&self) -> &TunerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut TunerState {
        &mut self.state
    }

    fn initialise<B: I2cBus>(&mut self, bus: &TunerBus<B>, _params: &TunerParams) -> Result<()> {
        let _repeater = bus.repeater()?;
        for (reg, val) in INIT {
            bus.write_reg(ADDR, reg, val)?;
        }
        debug!("FC0012 initialised, bandwidth {} Hz", self.state.bandwidth);
        Ok(())
    }

    fn set_frequency<B: I2cBus>(&mut self, bus: &TunerBus<B>, freq: u32) -> Result<u32> {
        check_frequency(self.frequency_range(), freq)?;
        let plan = synth::fc0012_plan(freq, self.state.xtal)?;

        let _repeater = bus.repeater()?;
        self.program(bus, &plan, self.state.bandwidth)?;
        self.state.freq = plan.actual_hz;
        self.plan = Some(plan);
        Ok(plan.actual_hz)
    }

    fn set_bandwidth<B: I2cBus>(&mut self, bus: &TunerBus<B>, bw: u32) -> Result<u32> {
        check_bandwidth(self.bandwidth_range(), bw)?;
        let achieved = match BandwidthPlan::select(&BANDWIDTHS, bw) {
            Some(plan) => plan.achieved,
            None => DEFAULT_BANDWIDTH,
        };

        // The filter bits are only programmed along with a frequency
        if let Some(plan) = self.plan {
            let _repeater = bus.repeater()?;
            self.program(bus, &plan, achieved)?;
        }
        self.state.bandwidth = achieved;
        Ok(achieved)
    }

    fn set_gain<B: I2cBus>(&mut self, bus: &TunerBus<B>, gain: f64) -> Result<()> {
        let entry = GAINS.lookup(gain::tenths(gain))?;
        let _repeater = bus.repeater()?;
        write_field(bus, ADDR, LNA_GAIN, entry.code)?;
        self.state.gain = entry.gain;
        Ok(())
    }

    fn bandwidth_values(&self) -> Vec<u32> {
        BANDWIDTHS.to_vec()
    }

    fn gain_values(&self) -> Vec<f64> {
        GAINS.values()
    }

    fn gain_range(&self) -> Range<f64> {
        GAINS.range()
    }
}

#[cfg(test)]
#[path = "fc0012_test.rs"]
mod fc0012_test;
