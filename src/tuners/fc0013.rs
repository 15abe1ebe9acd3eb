//! Fitipower FC0013 driver.
//!
//! Shares the FC0012 synthesizer layout but adds band switching: a tracking
//! filter for VHF, and separate UHF and GPS inputs selected in register 0x14.
use log::debug;

use super::bandwidth::BandwidthPlan;
use super::fc0012::{bandwidth_bits, calibrate_vco, recalibrate_vco};
use super::gain::{self, entry, GainTable};
use super::regs::{update_reg, write_field, Field};
use super::synth::{self, FcPlan, MHZ};
use super::{check_bandwidth, check_frequency, Range, Tuner, TunerInfo, TunerParams, TunerState};
use crate::bus::{I2cBus, TunerBus};
use crate::error::Result;

pub const ID: &str = "fc0013";
const ADDR: u8 = 0xc6;

pub const TUNER_INFO: TunerInfo = TunerInfo {
    id: ID,
    name: "Fitipower FC0013",
    i2c_addr: ADDR,
    check_addr: 0x00,
    check_val: 0xa3,
};

pub const DEFAULT_BANDWIDTH: u32 = 8 * MHZ;
const BANDWIDTHS: [u32; 3] = [6 * MHZ, 7 * MHZ, 8 * MHZ];

const GAINS: GainTable = GainTable::new(&[
    entry(-63, 0x00),
    entry(71, 0x08),
    entry(191, 0x11),
    entry(197, 0x10),
]);
const LNA_GAIN: Field = Field::new(0x14, 4, 0);

const INIT: [(u8, u8); 21] = [
    (0x01, 0x09),
    (0x02, 0x16),
    (0x03, 0x00),
    (0x04, 0x00),
    (0x05, 0x17),
    (0x06, 0x02),
    // 28.8 MHz crystal
    (0x07, 0x2a),
    (0x08, 0xff),
    // Loop through on
    (0x09, 0x6f),
    (0x0a, 0xb8),
    (0x0b, 0x82),
    // Up-down AGC
    (0x0c, 0xfe),
    // AGC not forced
    (0x0d, 0x01),
    (0x0e, 0x00),
    (0x0f, 0x00),
    (0x10, 0x00),
    (0x11, 0x00),
    (0x12, 0x00),
    (0x13, 0x00),
    // High LNA gain
    (0x14, 0x50),
    (0x15, 0x01),
];

const REG_VHF_TRACK: u8 = 0x1d;
const VHF_TRACK_MASK: u8 = 0xe3;
const REG_FILTER: u8 = 0x07;
const VHF_FILTER_EN: u8 = 0x10;
const REG_BAND: u8 = 0x14;
const BAND_MASK: u8 = 0x1f;
const BAND_UHF: u8 = 0x40;
const BAND_GPS: u8 = 0x20;
const REG_MULTI64: u8 = 0x11;
const MULTI64_EN: u8 = 0x04;

const VHF_MAX_KHZ: u32 = 300_000;
const UHF_MAX_KHZ: u32 = 862_000;

/// Upper edge in kHz and tracking filter code for each VHF segment.
const VHF_TRACKS: [(u32, u8); 6] = [
    (177_500, 0x1c),
    (184_500, 0x18),
    (191_500, 0x14),
    (198_500, 0x10),
    (205_500, 0x0c),
    (219_500, 0x08),
];

fn vhf_track_code(freq_khz: u32) -> u8 {
    VHF_TRACKS
        .iter()
        .find(|(edge, _)| freq_khz <= *edge)
        .map(|(_, code)| *code)
        .unwrap_or(0x04)
}

fn vhf_filter_on<B: I2cBus>(bus: &TunerBus<B>) -> Result<()> {
    update_reg(bus, ADDR, REG_FILTER, 0xff, VHF_FILTER_EN)?;
    // Disables UHF and GPS
    update_reg(bus, ADDR, REG_BAND, BAND_MASK, 0x00)
}

#[derive(Debug)]
pub struct Fc0013 {
    state: TunerState,
    /// Divider words last programmed, reused when only the filter changes.
    plan: Option<FcPlan>,
}

impl Fc0013 {
    pub fn new(xtal: u32) -> Fc0013 {
        Fc0013 {
            state: TunerState::new(xtal, DEFAULT_BANDWIDTH),
            plan: None,
        }
    }

    fn select_band<B: I2cBus>(&self, bus: &TunerBus<B>, freq_khz: u32) -> Result<()> {
        update_reg(bus, ADDR, REG_VHF_TRACK, VHF_TRACK_MASK, 0x1c)?;

        if freq_khz < VHF_MAX_KHZ {
            update_reg(
                bus,
                ADDR,
                REG_VHF_TRACK,
                VHF_TRACK_MASK,
                vhf_track_code(freq_khz),
            )?;
            vhf_filter_on(bus)?;
            vhf_filter_on(bus)
        } else {
            let band = if freq_khz <= UHF_MAX_KHZ {
                BAND_UHF
            } else {
                BAND_GPS
            };
            update_reg(bus, ADDR, REG_FILTER, !VHF_FILTER_EN, 0x00)?;
            update_reg(bus, ADDR, REG_BAND, BAND_MASK, band)
        }
    }

    fn program<B: I2cBus>(&self, bus: &TunerBus<B>, plan: &FcPlan, bw: u32) -> Result<()> {
        self.select_band(bus, plan.requested_khz)?;

        let mut regs = plan.regs;
        regs[5] = bandwidth_bits(regs[5], bw);
        regs[4] |= 0x07;
        debug!(
            "FC0013 {} kHz multi {} xdiv {} xin {:#06x}{}",
            plan.requested_khz,
            plan.divider.multi,
            plan.xdiv,
            plan.xin,
            if plan.halved { " (halved)" } else { "" }
        );
        for (reg, val) in (0x01..).zip(regs) {
            bus.write_reg(ADDR, reg, val)?;
        }

        if plan.divider.multi == 64 {
            update_reg(bus, ADDR, REG_MULTI64, 0xff, MULTI64_EN)?;
        } else {
            update_reg(bus, ADDR, REG_MULTI64, !MULTI64_EN, 0x00)?;
        }

        let vco = calibrate_vco(bus, ADDR)?;
        if vco > 0x3c {
            debug!("FC0013 VCO code {:#04x}, recalibrating", vco);
            recalibrate_vco(bus, ADDR, regs[5] & !0x08)?;
        }
        Ok(())
    }
}

impl Tuner for Fc0013 {
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
        debug!("FC0013 initialised, bandwidth {} Hz", self.state.bandwidth);
        Ok(())
    }

    fn set_frequency<B: I2cBus>(&mut self, bus: &TunerBus<B>, freq: u32) -> Result<u32> {
        check_frequency(self.frequency_range(), freq)?;
        let plan = synth::fc0013_plan(freq, self.state.xtal)?;

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
#[path = "fc0013_test.rs"]
mod fc0013_test;
