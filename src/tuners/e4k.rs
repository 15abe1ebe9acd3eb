//! Elonics E4000 driver in the osmocom style: named registers, field
//! writes and a closed form PLL planner.
use log::{debug, info};

use super::bandwidth::closest_index;
use super::gain::{self, entry, GainTable, ModeCriteria, Stage, StageGains, Thresholds};
use super::regs::{set_mask, Field};
use super::synth::{self, E4K_FLO_MAX, E4K_FLO_MIN, MHZ};
use super::{
    check_bandwidth, check_frequency, GainMode, Range, Tuner, TunerInfo, TunerParams, TunerState,
};
use crate::bus::{I2cBus, TunerBus};
use crate::error::{NotSupported, Quantity, RangeError, Result};

pub const ID: &str = "e4k";
const ADDR: u8 = 0xc8;

pub const TUNER_INFO: TunerInfo = TunerInfo {
    id: ID,
    name: "Elonics E4000",
    i2c_addr: ADDR,
    check_addr: 0x02,
    check_val: 0x40,
};

pub const DEFAULT_BANDWIDTH: u32 = 8 * MHZ;

const REG_MASTER1: u8 = 0x00;
const REG_CLK_INP: u8 = 0x05;
const REG_REF_CLK: u8 = 0x06;
const REG_SYNTH1: u8 = 0x07;
const REG_SYNTH3: u8 = 0x09;
const REG_SYNTH4: u8 = 0x0a;
const REG_SYNTH5: u8 = 0x0b;
const REG_SYNTH7: u8 = 0x0d;
const REG_FILT1: u8 = 0x10;
const REG_FILT3: u8 = 0x12;
const REG_GAIN1: u8 = 0x14;
const REG_GAIN2: u8 = 0x15;
const REG_AGC1: u8 = 0x1a;
const REG_AGC4: u8 = 0x1d;
const REG_AGC5: u8 = 0x1e;
const REG_AGC6: u8 = 0x1f;
const REG_AGC7: u8 = 0x20;
const REG_AGC8: u8 = 0x21;
const REG_DC1: u8 = 0x29;
const REG_DC2: u8 = 0x2a;
const REG_DC3: u8 = 0x2b;
const REG_DC4: u8 = 0x2c;
const REG_DC5: u8 = 0x2d;
const REG_DC7: u8 = 0x2f;
const REG_DCTIME1: u8 = 0x70;
const REG_DCTIME2: u8 = 0x71;
const REG_BIAS: u8 = 0x78;
const REG_CLKOUT_PWDN: u8 = 0x7a;

const MASTER1_RESET: u8 = 0x01;
const MASTER1_NORM_STBY: u8 = 0x02;
const MASTER1_POR_DET: u8 = 0x04;
const AGC1_MOD_MASK: u8 = 0x0f;
const AGC_MOD_SERIAL: u8 = 0x00;
const AGC_MOD_IF_SERIAL_LNA_AUTON: u8 = 0x09;
const AGC7_MIX_GAIN_AUTO: u8 = 0x01;
const AGC8_SENS_LIN_AUTO: u8 = 0x01;
const DC5_RANGE_DET_EN: u8 = 0x04;
const FILT3_DISABLE: u8 = 0x20;

const MAGIC_INIT: [(u8, u8); 8] = [
    (0x7e, 0x01),
    (0x7f, 0xfe),
    (0x82, 0x00),
    (0x86, 0x50),
    (0x87, 0x20),
    (0x88, 0x01),
    (0x9f, 0x7f),
    (0xa0, 0x07),
];

const GAINS: GainTable = GainTable::new(&[
    entry(-50, 2),
    entry(-25, 3),
    entry(0, 4),
    entry(25, 5),
    entry(50, 6),
    entry(75, 7),
    entry(100, 8),
    entry(125, 9),
    entry(150, 10),
    entry(175, 11),
    entry(200, 12),
    entry(225, 13),
    entry(250, 14),
    entry(300, 15),
]);

const GAIN_MODES: [(GainMode, &str); 3] = [
    (GainMode::Sensitive, "sensitive"),
    (GainMode::Normal, "nominal"),
    (GainMode::Linear, "linear"),
];

const STAGES: [Stage; 9] = [
    Stage::new(
        "LNA",
        Field::new(REG_GAIN1, 3, 0),
        StageGains::Banded(&[
            [-50, -50],
            [-25, -25],
            [-50, -50],
            [-25, -25],
            [0, 0],
            [25, 25],
            [50, 50],
            [75, 75],
            [100, 100],
            [125, 125],
            [150, 150],
            [175, 175],
            [200, 200],
            [225, 250],
            [250, 280],
            [250, 280],
        ]),
    ),
    Stage::new(
        "LNA add",
        Field::new(0x24, 2, 0),
        StageGains::Flat(&[0, 0, 0, 0, 0, 20, 0, 70]),
    ),
    Stage::new(
        "Mixer",
        Field::new(REG_GAIN2, 0, 0),
        StageGains::Banded(&[[90, 40], [170, 120]]),
    ),
    Stage::new("IF1", Field::new(0x16, 0, 0), StageGains::Flat(&[-30, 60])),
    Stage::new("IF2", Field::new(0x16, 2, 1), StageGains::Flat(&[0, 30, 60, 90])),
    Stage::new("IF3", Field::new(0x16, 4, 3), StageGains::Flat(&[0, 30, 60, 90])),
    Stage::new("IF4", Field::new(0x16, 6, 5), StageGains::Flat(&[0, 10, 20, 20])),
    Stage::new(
        "IF5",
        Field::new(0x17, 2, 0),
        StageGains::Flat(&[0, 30, 60, 90, 120, 120, 120, 120]),
    ),
    Stage::new(
        "IF6",
        Field::new(0x17, 5, 3),
        StageGains::Flat(&[0, 30, 60, 90, 120, 120, 120, 120]),
    ),
];

// Same figures as the vendor driver; not yet measured on this chip revision
const CRITERIA: ModeCriteria = ModeCriteria {
    stages: &STAGES,
    reference_power: -100,
    thresholds: Thresholds {
        sensitive_to_normal: -650,
        normal_to_sensitive: -750,
        normal_to_linear: -400,
        linear_to_normal: -500,
    },
    uhf_from: 300 * MHZ,
};

/// IF stage gain settings in dB, stages 1 to 6.
const IF_STAGES: [(Field, &[i8]); 6] = [
    (Field::new(0x16, 0, 0), &[-3, 6]),
    (Field::new(0x16, 2, 1), &[0, 3, 6, 9]),
    (Field::new(0x16, 4, 3), &[0, 3, 6, 9]),
    (Field::new(0x16, 6, 5), &[0, 1, 2, 2]),
    (Field::new(0x17, 2, 0), &[3, 6, 9, 12, 15, 15, 15, 15]),
    (Field::new(0x17, 5, 3), &[3, 6, 9, 12, 15, 15, 15, 15]),
];

/// Mixer gain, IF stage 1 gain and the LUT register they calibrate.
const DC_GAIN_COMBOS: [(i8, i8, u8); 4] = [(4, -3, 0x50), (4, 6, 0x51), (12, -3, 0x52), (12, 6, 0x53)];

struct IfFilter {
    field: Field,
    widths: &'static [u32],
}

const MIX_FILTER: IfFilter = IfFilter {
    field: Field::new(0x11, 7, 4),
    widths: &[
        27_000_000, 27_000_000, 27_000_000, 27_000_000, 27_000_000, 27_000_000, 27_000_000,
        27_000_000, 4_600_000, 4_200_000, 3_800_000, 3_400_000, 3_300_000, 2_700_000, 2_300_000,
        1_900_000,
    ],
};

const RC_FILTER: IfFilter = IfFilter {
    field: Field::new(0x11, 3, 0),
    widths: &[
        21_400_000, 21_000_000, 17_600_000, 14_700_000, 12_400_000, 10_600_000, 9_000_000,
        7_700_000, 6_400_000, 5_300_000, 4_400_000, 3_400_000, 2_600_000, 1_800_000, 1_200_000,
        1_000_000,
    ],
};

const CHANNEL_FILTER: IfFilter = IfFilter {
    field: Field::new(REG_FILT3, 4, 0),
    widths: &[
        5_500_000, 5_300_000, 5_000_000, 4_800_000, 4_600_000, 4_400_000, 4_300_000, 4_100_000,
        3_900_000, 3_800_000, 3_700_000, 3_600_000, 3_400_000, 3_300_000, 3_200_000, 3_100_000,
        3_000_000, 2_950_000, 2_900_000, 2_800_000, 2_750_000, 2_700_000, 2_600_000, 2_550_000,
        2_500_000, 2_450_000, 2_400_000, 2_300_000, 2_280_000, 2_240_000, 2_200_000, 2_150_000,
    ],
};

const RF_FILTER_UHF: [u32; 16] = [
    360, 380, 405, 425, 450, 475, 505, 540, 575, 615, 670, 720, 760, 840, 890, 970,
];
const RF_FILTER_L: [u32; 16] = [
    1300, 1320, 1360, 1410, 1445, 1460, 1490, 1530, 1560, 1590, 1640, 1660, 1680, 1700, 1720,
    1750,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Band {
    Vhf2 = 0,
    Vhf3 = 1,
    Uhf = 2,
    L = 3,
}

impl Band {
    fn for_flo(flo: u32) -> Band {
        if flo < 139 * MHZ {
            Band::Vhf2
        } else if flo < 350 * MHZ {
            Band::Vhf3
        } else if flo < 1135 * MHZ {
            Band::Uhf
        } else {
            Band::L
        }
    }

    /// 4-bit RF filter index for `flo` within this band.
    fn rf_filter(self, flo: u32) -> u8 {
        let nearest = |centers: &[u32]| {
            let centers: Vec<u32> = centers.iter().map(|c| c * MHZ).collect();
            closest_index(&centers, flo).unwrap_or(0) as u8
        };
        match self {
            Band::Vhf2 if flo < 268 * MHZ => 0,
            Band::Vhf3 if flo < 509 * MHZ => 0,
            Band::Vhf2 | Band::Vhf3 => 8,
            Band::Uhf => nearest(&RF_FILTER_UHF),
            Band::L => nearest(&RF_FILTER_L),
        }
    }
}

fn if_gain_set<B: I2cBus>(bus: &TunerBus<B>, stage: usize, value: i8) -> Result<()> {
    let (field, gains) = IF_STAGES[stage - 1];
    let index = match gains.iter().position(|g| *g == value) {
        Some(index) => index as u8,
        None => return Err(RangeError::new(Quantity::Gain, value).into()),
    };
    set_mask(bus, ADDR, field.reg, field.mask(), index << field.lsb)
}

fn mixer_gain_set<B: I2cBus>(bus: &TunerBus<B>, value: i8) -> Result<()> {
    let bit = match value {
        4 => 0,
        12 => 1,
        _ => return Err(RangeError::new(Quantity::Gain, value).into()),
    };
    set_mask(bus, ADDR, REG_GAIN2, 1, bit)
}

/// Programs the filter entry nearest `bw`, returning its width.
fn if_filter_set<B: I2cBus>(bus: &TunerBus<B>, filter: &IfFilter, bw: u32) -> Result<u32> {
    let index = closest_index(filter.widths, bw).unwrap_or(0);
    let field = filter.field;
    set_mask(bus, ADDR, field.reg, field.mask(), (index as u8) << field.lsb)?;
    Ok(filter.widths[index])
}

/// Calibrates the DC offset LUT for every mixer / IF1 gain combination.
fn dc_offset_gen_table<B: I2cBus>(bus: &TunerBus<B>) -> Result<()> {
    set_mask(bus, ADDR, REG_AGC7, AGC7_MIX_GAIN_AUTO, 0)?;
    set_mask(bus, ADDR, REG_AGC1, AGC1_MOD_MASK, AGC_MOD_SERIAL)?;
    for (stage, gain) in (2..=6).zip([9, 9, 2, 15, 15]) {
        if_gain_set(bus, stage, gain)?;
    }

    for (i, &(mixer, if1, reg)) in DC_GAIN_COMBOS.iter().enumerate() {
        mixer_gain_set(bus, mixer)?;
        if_gain_set(bus, 1, if1)?;

        set_mask(bus, ADDR, REG_DC5, DC5_RANGE_DET_EN, DC5_RANGE_DET_EN)?;
        bus.write_reg(ADDR, REG_DC1, 0x01)?;

        let offs_i = bus.read_reg(ADDR, REG_DC2)? & 0x3f;
        let offs_q = bus.read_reg(ADDR, REG_DC3)? & 0x3f;
        let range = bus.read_reg(ADDR, REG_DC4)?;
        let range_i = range & 0x3;
        let range_q = (range >> 4) & 0x3;
        debug!(
            "DC table {} I={}/{}, Q={}/{}",
            i, range_i, offs_i, range_q, offs_q
        );

        bus.write_reg(ADDR, reg, offs_q | (range_q << 6))?;
        bus.write_reg(ADDR, reg + 0x10, offs_i | (range_i << 6))?;
    }
    Ok(())
}

#[derive(Debug)]
pub struct E4k {
    state: TunerState,
}

impl E4k {
    pub fn new(xtal: u32) -> E4k {
        E4k {
            state: TunerState::new(xtal, DEFAULT_BANDWIDTH),
        }
    }
}

impl Tuner for E4k {
    fn info(&self) -> &'static TunerInfo {
        &TUNER_INFO
    }

    fn state(&self) -> &TunerState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut TunerState {
        &mut self.state
    }

    fn initialise<B: I2cBus>(&mut self, bus: &TunerBus<B>, params: &TunerParams) -> Result<()> {
        let _repeater = bus.repeater()?;

        // Wakes the interface; the chip never acknowledges it
        if let Err(e) = bus.read_reg(ADDR, REG_MASTER1) {
            debug!("E4K dummy read: {}", e);
        }

        bus.write_reg(
            ADDR,
            REG_MASTER1,
            MASTER1_RESET | MASTER1_NORM_STBY | MASTER1_POR_DET,
        )?;
        bus.write_reg(ADDR, REG_CLK_INP, 0x00)?;
        bus.write_reg(ADDR, REG_REF_CLK, 0x00)?;
        bus.write_reg(ADDR, REG_CLKOUT_PWDN, 0x96)?;
        for (reg, val) in MAGIC_INIT {
            bus.write_reg(ADDR, reg, val)?;
        }

        // Common mode voltage 850 mV
        set_mask(bus, ADDR, REG_DC7, 0x07, 4)?;

        dc_offset_gen_table(bus)?;

        if params.dc_offset_loop {
            bus.write_reg(ADDR, REG_DCTIME1, 0x01)?;
            bus.write_reg(ADDR, REG_DCTIME2, 0x01)?;
        }

        // LNA thresholds and loop rate
        bus.write_reg(ADDR, REG_AGC4, 0x10)?;
        bus.write_reg(ADDR, REG_AGC5, 0x04)?;
        bus.write_reg(ADDR, REG_AGC6, 0x1a)?;

        if !params.manual_gain {
            set_mask(bus, ADDR, REG_AGC1, AGC1_MOD_MASK, AGC_MOD_IF_SERIAL_LNA_AUTON)?;
            set_mask(bus, ADDR, REG_AGC7, AGC7_MIX_GAIN_AUTO, AGC7_MIX_GAIN_AUTO)?;
        }

        set_mask(bus, ADDR, REG_AGC8, 0x01, AGC8_SENS_LIN_AUTO)?;

        for (stage, gain) in (1..=6).zip([6, 3, 3, 1, 9, 9]) {
            if_gain_set(bus, stage, gain)?;
        }

        if_filter_set(bus, &MIX_FILTER, 1_900_000)?;
        if_filter_set(bus, &RC_FILTER, 1_000_000)?;
        if_filter_set(bus, &CHANNEL_FILTER, 2_150_000)?;
        set_mask(bus, ADDR, REG_FILT3, FILT3_DISABLE, 0)?;

        self.set_bandwidth(bus, self.state.bandwidth)?;
        Ok(())
    }

    fn set_frequency<B: I2cBus>(&mut self, bus: &TunerBus<B>, freq: u32) -> Result<u32> {
        check_frequency(self.frequency_range(), freq)?;
        let plan = synth::e4k_plan(self.state.xtal, freq)?;
        let band = Band::for_flo(plan.flo);
        let rf_filter = band.rf_filter(plan.flo);
        debug!(
            "E4K flo {} R={} Z={} X={} band {:?} filter {}",
            plan.flo, plan.r, plan.z, plan.x, band, rf_filter
        );

        let _repeater = bus.repeater()?;
        bus.write_reg(ADDR, REG_SYNTH7, plan.synth7())?;
        bus.write_reg(ADDR, REG_SYNTH3, plan.z)?;
        bus.write_reg(ADDR, REG_SYNTH4, (plan.x & 0xff) as u8)?;
        bus.write_reg(ADDR, REG_SYNTH5, (plan.x >> 8) as u8)?;

        bus.write_reg(ADDR, REG_BIAS, if band == Band::L { 0 } else { 3 })?;
        set_mask(bus, ADDR, REG_SYNTH1, 0x06, (band as u8) << 1)?;
        set_mask(bus, ADDR, REG_FILT1, 0x0f, rf_filter)?;

        self.state.freq = plan.flo;
        Ok(plan.flo)
    }

    fn set_bandwidth<B: I2cBus>(&mut self, bus: &TunerBus<B>, bw: u32) -> Result<u32> {
        check_bandwidth(Range::undefined(), bw)?;
        let _repeater = bus.repeater()?;
        let achieved = if_filter_set(bus, &CHANNEL_FILTER, bw)?;
        self.state.bandwidth = achieved;
        Ok(achieved)
    }

    fn set_gain<B: I2cBus>(&mut self, bus: &TunerBus<B>, gain: f64) -> Result<()> {
        let entry = GAINS.lookup(gain::tenths(gain))?;

        let _repeater = bus.repeater()?;
        let current = bus.read_reg(ADDR, REG_GAIN1)?;
        bus.write_reg(ADDR, REG_GAIN1, entry.code | (current & !0x0f))?;
        self.state.gain = entry.gain;
        if self.state.auto_gain_mode {
            gain::mode_kept_on_failed_evaluation(self.update_gain_mode(bus))?;
        }
        Ok(())
    }

    fn set_gain_mode<B: I2cBus>(&mut self, _bus: &TunerBus<B>, mode: GainMode) -> Result<()> {
        self.state.gain_mode = match mode {
            GainMode::Default | GainMode::Sensitive => GainMode::Sensitive,
            GainMode::Normal | GainMode::Linear => mode,
            other => return Err(NotSupported::GainMode(other).into()),
        };
        Ok(())
    }

    fn set_auto_gain_mode<B: I2cBus>(&mut self, bus: &TunerBus<B>, on: bool) -> Result<()> {
        let _repeater = bus.repeater()?;
        if on {
            self.update_gain_mode(bus)?;
        }
        self.state.auto_gain_mode = on;
        info!("Auto gain mode {}", if on { "enabled" } else { "disabled" });
        Ok(())
    }

    fn calc_appropriate_gain_mode<B: I2cBus>(&self, bus: &TunerBus<B>) -> Result<Option<GainMode>> {
        let _repeater = bus.repeater()?;
        gain::suggest_mode(bus, ADDR, &CRITERIA, self.state.freq, self.state.gain_mode)
    }

    fn frequency_range(&self) -> Range<u32> {
        Range::new(E4K_FLO_MIN, E4K_FLO_MAX)
    }

    fn bandwidth_values(&self) -> Vec<u32> {
        let mut values = CHANNEL_FILTER.widths.to_vec();
        values.reverse();
        values
    }

    fn gain_values(&self) -> Vec<f64> {
        GAINS.values()
    }

    fn gain_range(&self) -> Range<f64> {
        GAINS.range()
    }

    fn gain_modes(&self) -> &'static [(GainMode, &'static str)] {
        &GAIN_MODES
    }
}

#[cfg(test)]
#[path = "e4k_test.rs"]
mod e4k_test;
