//! Elonics E4000 driver using the vendor register sequences.
use log::{info, warn};

use super::bandwidth::closest_index;
use super::gain::{self, entry, GainTable, ModeCriteria, Stage, StageGains, Thresholds};
use super::regs::Field;
use super::synth::{self, KHZ, MHZ};
use super::{
    check_bandwidth, check_frequency, GainMode, Range, Tuner, TunerInfo, TunerParams, TunerState,
};
use crate::bus::{I2cBus, TunerBus};
use crate::error::{NotSupported, Result};

pub const ID: &str = "e4000";
const ADDR: u8 = 0xc8;

pub const TUNER_INFO: TunerInfo = TunerInfo {
    id: ID,
    name: "Elonics E4000",
    i2c_addr: ADDR,
    check_addr: 0x02,
    check_val: 0x40,
};

pub const DEFAULT_BANDWIDTH: u32 = 8 * MHZ;

/// LNA gain codes, register 0x14 bits 3..0.
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
        Field::new(0x14, 3, 0),
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
        Field::new(0x15, 0, 0),
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

// TODO: thresholds are carried over from bench tuning and want validation on hardware
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

/// IF filter: (IF bandwidth in kHz, reg 0x11, reg 0x12)
const IF_FILTERS: [(u32, u8, u8); 32] = [
    (2150, 253, 31),
    (2200, 253, 30),
    (2240, 252, 29),
    (2280, 252, 28),
    (2300, 252, 27),
    (2400, 252, 26),
    (2450, 252, 25),
    (2500, 252, 24),
    (2550, 252, 23),
    (2600, 252, 22),
    (2700, 252, 21),
    (2750, 252, 20),
    (2800, 252, 19),
    (2900, 251, 18),
    (2950, 251, 17),
    (3000, 251, 16),
    (3100, 251, 15),
    (3200, 250, 14),
    (3300, 250, 13),
    (3400, 249, 12),
    (3600, 249, 11),
    (3700, 249, 10),
    (3800, 248, 9),
    (3900, 248, 8),
    (4100, 248, 7),
    (4300, 247, 6),
    (4400, 247, 5),
    (4600, 247, 4),
    (4800, 246, 3),
    (5000, 246, 2),
    (5300, 245, 1),
    (5500, 245, 0),
];

/// Mode dependent filter trim: (IF bandwidth ceiling in kHz, sensitive, linear, nominal)
const MODE_FILTERS: [(u32, [u8; 2], [u8; 2], [u8; 2]); 4] = [
    (2500, [0xfc, 0x17], [0xfe, 0x19], [0xfc, 0x17]),
    (3000, [0xfb, 0x0f], [0xfd, 0x11], [0xfb, 0x0f]),
    (3500, [0xf9, 0x0b], [0xfb, 0x0d], [0xf9, 0x0b]),
    (4000, [0xf8, 0x07], [0xfa, 0x0a], [0xf8, 0x07]),
];

/// Spur avoidance: (upper frequency in kHz, reg 0x05, reg 0x07)
const SPUR_BANDS: [(u32, u8, u8); 41] = [
    (82_900, 0, 1),
    (89_900, 3, 9),
    (111_700, 0, 1),
    (118_700, 3, 1),
    (140_500, 0, 3),
    (147_500, 3, 11),
    (169_300, 0, 3),
    (176_300, 3, 11),
    (198_100, 0, 3),
    (205_100, 3, 19),
    (226_900, 0, 3),
    (233_900, 3, 3),
    (350_000, 0, 3),
    (485_600, 0, 5),
    (493_600, 3, 5),
    (514_400, 0, 5),
    (522_400, 3, 5),
    (543_200, 0, 5),
    (551_200, 3, 13),
    (572_000, 0, 5),
    (580_000, 3, 13),
    (600_800, 0, 5),
    (608_800, 3, 13),
    (629_600, 0, 5),
    (637_600, 3, 13),
    (658_400, 0, 5),
    (666_400, 3, 13),
    (687_200, 0, 5),
    (695_200, 3, 13),
    (716_000, 0, 5),
    (724_000, 3, 13),
    (744_800, 0, 5),
    (752_800, 3, 21),
    (773_600, 0, 5),
    (781_600, 3, 21),
    (802_400, 0, 5),
    (810_400, 3, 21),
    (831_200, 0, 5),
    (839_200, 3, 21),
    (860_000, 0, 5),
    (868_000, 3, 21),
];
const SPUR_DEFAULT: (u8, u8) = (0, 7);

/// LNA filter band edges in kHz. The register value is the position
/// within the group.
const LNA_FILTER_LOW: [u32; 16] = [
    370_000, 392_500, 415_000, 437_500, 462_500, 490_000, 522_500, 557_500, 595_000, 642_500,
    695_000, 740_000, 800_000, 865_000, 930_000, 1_000_000,
];
const LNA_FILTER_HIGH: [u32; 15] = [
    1_310_000, 1_340_000, 1_385_000, 1_427_500, 1_452_500, 1_475_000, 1_510_000, 1_545_000,
    1_575_000, 1_615_000, 1_650_000, 1_670_000, 1_690_000, 1_710_000, 1_735_000,
];

fn spur_regs(freq_khz: u32) -> (u8, u8) {
    SPUR_BANDS
        .iter()
        .find(|(limit, _, _)| freq_khz <= *limit)
        .map(|&(_, reg5, reg7)| (reg5, reg7))
        .unwrap_or(SPUR_DEFAULT)
}

fn lna_filter(freq_khz: u32) -> u8 {
    LNA_FILTER_LOW
        .iter()
        .position(|limit| freq_khz <= *limit)
        .or_else(|| LNA_FILTER_HIGH.iter().position(|limit| freq_khz <= *limit))
        .unwrap_or(15) as u8
}

#[derive(Debug)]
pub struct E4000 {
    state: TunerState,
    params: TunerParams,
}

impl E4000 {
    pub fn new(xtal: u32) -> E4000 {
        E4000 {
            state: TunerState::new(xtal, DEFAULT_BANDWIDTH),
            params: TunerParams::default(),
        }
    }

    fn if_bandwidth_khz(&self) -> u32 {
        self.state.bandwidth / KHZ / 2
    }

    fn reset<B: I2cBus>(&self, bus: &TunerBus<B>) -> Result<()> {
        // The first write after power-up is not always acknowledged
        if let Err(e) = bus.write_reg(ADDR, 0x02, 64) {
            warn!("E4000 reset write ignored: {}", e);
        }
        bus.write_reg(ADDR, 0x02, 64)?;
        bus.write_reg(ADDR, 0x09, 0)?;
        bus.write_reg(ADDR, 0x05, 0)?;
        bus.write_reg(ADDR, 0x00, 7)
    }

    fn gain_control_init<B: I2cBus>(&self, bus: &TunerBus<B>) -> Result<()> {
        bus.write_reg(ADDR, 0x1a, 23)?;
        bus.read_reg(ADDR, 0x1b)?;
        bus.write_array(ADDR, 0x1d, &[16, 4, 26, 15, 167])?;
        bus.write_reg(ADDR, 0x86, 81)?;
        let mut min = u8::MAX;
        for _ in 0..4 {
            min = min.min(bus.read_reg(ADDR, 0x1b)?);
            bus.write_reg(ADDR, 0x1f, 26)?;
        }
        min = min.min(bus.read_reg(ADDR, 0x1b)?);
        bus.write_reg(ADDR, 0x1b, min)
    }

    fn gain_manual<B: I2cBus>(&self, bus: &TunerBus<B>) -> Result<()> {
        bus.write_reg(ADDR, 0x1a, 0)?;
        bus.write_reg(ADDR, 0x09, 0)?;
        bus.write_reg(ADDR, 0x05, 0)
    }

    fn gain_freq<B: I2cBus>(&self, bus: &TunerBus<B>, freq_khz: u32) -> Result<()> {
        bus.write_array(ADDR, 0xa3, &[0x10, 0x42, 0x09, 0x21, 0x94])?;
        if freq_khz <= 350_000 {
            bus.write_array(ADDR, 0x9f, &[94, 6])?;
            bus.write_array(ADDR, 0x88, &[0])
        } else {
            bus.write_array(ADDR, 0x9f, &[127, 7])?;
            bus.write_array(ADDR, 0x88, &[1])
        }
    }

    fn freq_band<B: I2cBus>(&self, bus: &TunerBus<B>, freq_khz: u32) -> Result<()> {
        if freq_khz <= 1_000_000 {
            bus.write_reg(ADDR, 0x78, 3)
        } else {
            bus.write_reg(ADDR, 0x07, 7)?;
            bus.write_reg(ADDR, 0x78, 0)
        }
    }

    /// Triggers a DC offset calibration and returns the (I, Q) LUT words.
    fn calibrate_dc<B: I2cBus>(&self, bus: &TunerBus<B>) -> Result<(u8, u8)> {
        bus.write_reg(ADDR, 0x29, 1)?;
        let i_off = bus.read_reg(ADDR, 0x2a)?;
        let q_off = bus.read_reg(ADDR, 0x2b)?;
        let range = bus.read_reg(ADDR, 0x2c)?;
        let mut i_range = range;
        if i_range >= 32 {
            i_range -= 32;
        }
        if i_range >= 16 {
            i_range -= 16;
        }
        let q_range = (range - i_range) / 16;
        Ok((
            i_range.wrapping_mul(64).wrapping_add(i_off),
            q_range.wrapping_mul(64).wrapping_add(q_off),
        ))
    }

    fn dc_offset_lut<B: I2cBus>(&self, bus: &TunerBus<B>) -> Result<()> {
        bus.write_array(ADDR, 0x15, &[0, 126, 36])?;
        let (i, q) = self.calibrate_dc(bus)?;
        bus.write_reg(ADDR, 0x60, i)?;
        bus.write_reg(ADDR, 0x50, q)?;

        bus.write_array(ADDR, 0x15, &[0, 127])?;
        let (i, q) = self.calibrate_dc(bus)?;
        bus.write_reg(ADDR, 0x61, i)?;
        bus.write_reg(ADDR, 0x51, q)?;

        bus.write_reg(ADDR, 0x15, 1)?;
        let (i, q) = self.calibrate_dc(bus)?;
        bus.write_reg(ADDR, 0x63, i)?;
        bus.write_reg(ADDR, 0x53, q)?;

        bus.write_reg(ADDR, 0x16, 126)?;
        let (i, q) = self.calibrate_dc(bus)?;
        bus.write_reg(ADDR, 0x62, i)?;
        bus.write_reg(ADDR, 0x52, q)
    }
}

impl Tuner for E4000 {
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
        self.reset(bus)?;

        // Clock output off
        bus.write_reg(ADDR, 0x06, 0)?;
        bus.write_reg(ADDR, 0x7a, 150)?;

        // Q peak detector
        bus.write_array(ADDR, 0x7e, &[1, 254])?;
        bus.write_reg(ADDR, 0x82, 0)?;
        bus.write_reg(ADDR, 0x24, 5)?;
        bus.write_array(ADDR, 0x87, &[32, 1])?;

        if params.dc_offset_loop {
            bus.write_reg(ADDR, 0x2d, 31)?;
            bus.write_array(ADDR, 0x70, &[1, 1])?;
        }

        self.gain_control_init(bus)?;

        if params.manual_gain {
            self.gain_manual(bus)?;
        }

        self.set_bandwidth(bus, DEFAULT_BANDWIDTH)?;
        self.params = params.clone();
        Ok(())
    }

    fn set_frequency<B: I2cBus>(&mut self, bus: &TunerBus<B>, freq: u32) -> Result<u32> {
        check_frequency(self.frequency_range(), freq)?;
        let plan = synth::e4000_plan(freq, self.state.xtal)?;
        let freq_khz = plan.freq_khz;

        let _repeater = bus.repeater()?;
        if self.params.update_gain_control {
            self.gain_manual(bus)?;
        }
        self.gain_freq(bus, freq_khz)?;

        bus.write_array(ADDR, 0x09, &plan.synth_regs())?;
        let (reg5, reg7) = spur_regs(freq_khz);
        bus.write_reg(ADDR, 0x07, reg7)?;
        bus.write_reg(ADDR, 0x05, reg5)?;

        bus.write_reg(ADDR, 0x10, lna_filter(freq_khz))?;
        self.freq_band(bus, freq_khz)?;

        if self.params.dc_offset_lut {
            self.dc_offset_lut(bus)?;
        }
        if self.params.update_gain_control {
            bus.write_reg(ADDR, 0x1a, 23)?;
        }

        self.state.freq = plan.actual_hz;
        Ok(plan.actual_hz)
    }

    fn set_bandwidth<B: I2cBus>(&mut self, bus: &TunerBus<B>, bw: u32) -> Result<u32> {
        check_bandwidth(self.bandwidth_range(), bw)?;
        let widths: Vec<u32> = IF_FILTERS.iter().map(|f| f.0).collect();
        let index = closest_index(&widths, bw / KHZ / 2).unwrap_or(widths.len() - 1);
        let (if_bw, r11, r12) = IF_FILTERS[index];

        let _repeater = bus.repeater()?;
        bus.write_array(ADDR, 0x11, &[r11, r12])?;
        self.state.bandwidth = 2 * if_bw * KHZ;
        Ok(self.state.bandwidth)
    }

    fn set_gain<B: I2cBus>(&mut self, bus: &TunerBus<B>, gain: f64) -> Result<()> {
        let entry = GAINS.lookup(gain::tenths(gain))?;

        let _repeater = bus.repeater()?;
        let current = bus.read_reg(ADDR, 0x14)?;
        bus.write_reg(ADDR, 0x14, entry.code | (current & !0x0f))?;
        self.state.gain = entry.gain;
        if self.state.auto_gain_mode {
            gain::mode_kept_on_failed_evaluation(self.update_gain_mode(bus))?;
        }
        Ok(())
    }

    fn set_gain_mode<B: I2cBus>(&mut self, bus: &TunerBus<B>, mode: GainMode) -> Result<()> {
        let mode = match mode {
            GainMode::Default | GainMode::Sensitive => GainMode::Sensitive,
            GainMode::Normal | GainMode::Linear => mode,
            other => return Err(NotSupported::GainMode(other).into()),
        };
        let low_band = self.state.freq / KHZ <= 700_000;
        let agc = match (mode, low_band) {
            (GainMode::Sensitive, true) => 0x07,
            (GainMode::Sensitive, false) => 0x05,
            (_, true) => 0x03,
            (_, false) => 0x01,
        };

        let _repeater = bus.repeater()?;
        bus.write_array(ADDR, 0x24, &[agc])?;
        let if_bw = self.if_bandwidth_khz();
        if let Some(&(_, sensitive, linear, nominal)) =
            MODE_FILTERS.iter().find(|f| if_bw <= f.0)
        {
            let regs = match mode {
                GainMode::Sensitive => sensitive,
                GainMode::Linear => linear,
                _ => nominal,
            };
            bus.write_array(ADDR, 0x11, &regs)?;
        }
        self.state.gain_mode = mode;
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

    fn bandwidth_values(&self) -> Vec<u32> {
        IF_FILTERS.iter().map(|f| 2 * f.0 * KHZ).collect()
    }

    fn bandwidth_range(&self) -> Range<u32> {
        Range::undefined()
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
#[path = "e4000_test.rs"]
mod e4000_test;
