//! Rafael Micro R820T driver.
//!
//! The chip has no register readback for control registers, so every write
//! goes through a shadow copy and masked writes are computed against it.
//! Status reads always start at register 0 and come back bit-reversed.
use log::{debug, info, warn};

use super::bandwidth::closest_index;
use super::gain::{self, entry, GainTable};
use super::synth::{self, R82xxPlan, MHZ, R82XX_VCO_POWER_REF};
use super::{
    check_bandwidth, check_frequency, GainMode, Range, Tuner, TunerInfo, TunerParams, TunerState,
};
use crate::bus::{I2cBus, TunerBus};
use crate::error::{NotSupported, Result, TunerError};

pub const ID: &str = "r820t";
const ADDR: u8 = 0x34;

pub const TUNER_INFO: TunerInfo = TunerInfo {
    id: ID,
    name: "Rafael Micro R820T",
    i2c_addr: ADDR,
    check_addr: 0x00,
    check_val: 0x69,
};

/// 3.57 MHz IF for the 6 MHz DVB-T channel.
pub const IF_FREQ: u32 = 3_570_000;
pub const DEFAULT_BANDWIDTH: u32 = 6 * MHZ;

const NUM_REGS: usize = 30;
const REG_SHADOW_START: usize = 5;
const MAX_I2C_MSG_LEN: usize = 8;

const FREQ_MIN: u32 = 24 * MHZ;
const FREQ_MAX: u32 = 1766 * MHZ;

/// Registers 0x05..=0x1f after power on.
const INIT_ARRAY: [u8; 27] = [
    0x83, 0x32, 0x75, 0xc0, 0x40, 0xd6, 0x6c, 0xf5, 0x63, 0x75, 0x68, 0x6c, 0x83, 0x80, 0x00,
    0x0f, 0x00, 0xc0, 0x30, 0x48, 0xcc, 0x60, 0x00, 0x54, 0xae, 0x4a, 0xc0,
];

struct FreqRange {
    freq: u32,       // Start freq, in MHz
    open_d: u8,      // low
    rf_mux_ploy: u8, // R26[7:6]=0 (LPF)  R26[1:0]=2 (low)
    tf_c: u8,        // R27[7:0]  band2,band0
    xtal_cap20p: u8, // R16[1:0]  20pF (10)
    xtal_cap10p: u8,
    xtal_cap0p: u8,
}

const fn range(
    freq: u32,
    open_d: u8,
    rf_mux_ploy: u8,
    tf_c: u8,
    xtal_cap20p: u8,
    xtal_cap10p: u8,
    xtal_cap0p: u8,
) -> FreqRange {
    FreqRange {
        freq,
        open_d,
        rf_mux_ploy,
        tf_c,
        xtal_cap20p,
        xtal_cap10p,
        xtal_cap0p,
    }
}

const FREQ_RANGES: [FreqRange; 21] = [
    range(0, 0x08, 0x02, 0xdf, 0x02, 0x01, 0x00),
    range(50, 0x08, 0x02, 0xbe, 0x02, 0x01, 0x00),
    range(55, 0x08, 0x02, 0x8b, 0x02, 0x01, 0x00),
    range(60, 0x08, 0x02, 0x7b, 0x02, 0x01, 0x00),
    range(65, 0x08, 0x02, 0x69, 0x02, 0x01, 0x00),
    range(70, 0x08, 0x02, 0x58, 0x02, 0x01, 0x00),
    range(75, 0x00, 0x02, 0x44, 0x02, 0x01, 0x00),
    range(80, 0x00, 0x02, 0x44, 0x02, 0x01, 0x00),
    range(90, 0x00, 0x02, 0x34, 0x01, 0x01, 0x00),
    range(100, 0x00, 0x02, 0x34, 0x01, 0x01, 0x00),
    range(110, 0x00, 0x02, 0x24, 0x01, 0x01, 0x00),
    range(120, 0x00, 0x02, 0x24, 0x01, 0x01, 0x00),
    range(140, 0x00, 0x02, 0x14, 0x01, 0x01, 0x00),
    range(180, 0x00, 0x02, 0x13, 0x00, 0x00, 0x00),
    range(220, 0x00, 0x02, 0x13, 0x00, 0x00, 0x00),
    range(250, 0x00, 0x02, 0x11, 0x00, 0x00, 0x00),
    range(280, 0x00, 0x02, 0x00, 0x00, 0x00, 0x00),
    range(310, 0x00, 0x41, 0x00, 0x00, 0x00, 0x00),
    range(450, 0x00, 0x41, 0x00, 0x00, 0x00, 0x00),
    range(588, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00),
    range(650, 0x00, 0x40, 0x00, 0x00, 0x00, 0x00),
];

/// Crystal load capacitance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XtalCap {
    LowCap30p,
    LowCap20p,
    LowCap10p,
    LowCap0p,
    HighCap0p,
}

/// Bandwidth, register 0x0a and 0x0b filter codes and the IF it implies.
struct BandwidthRow {
    bw: u32,
    reg_0a: u8,
    reg_0b: u8,
    if_freq: u32,
}

const fn bw(bw: u32, reg_0a: u8, reg_0b: u8, if_freq: u32) -> BandwidthRow {
    BandwidthRow {
        bw,
        reg_0a,
        reg_0b,
        if_freq,
    }
}

const BANDWIDTHS: [BandwidthRow; 15] = [
    bw(350_000, 0x00, 0xe6, 2_125_000),
    bw(450_000, 0x00, 0xe7, 2_075_000),
    bw(550_000, 0x00, 0xe8, 2_025_000),
    bw(700_000, 0x00, 0xe9, 1_950_000),
    bw(900_000, 0x00, 0xea, 1_850_000),
    bw(1_200_000, 0x00, 0xeb, 1_700_000),
    bw(1_450_000, 0x00, 0xec, 1_575_000),
    bw(1_550_000, 0x00, 0xed, 1_525_000),
    bw(1_600_000, 0x00, 0xee, 1_500_000),
    bw(1_700_000, 0x00, 0xef, 1_450_000),
    bw(2_050_000, 0x00, 0xaf, 1_625_000),
    bw(2_430_000, 0x00, 0x8f, 1_815_000),
    bw(6_000_000, 0x10, 0x6b, 3_570_000),
    bw(7_000_000, 0x10, 0x2a, 4_570_000),
    bw(8_000_000, 0x10, 0x0b, 4_570_000),
];

/// Cumulative LNA + mixer gain. Step `i` sets the LNA to `(i + 1) / 2`
/// and the mixer to `i / 2`.
const GAINS: GainTable = GainTable::new(&[
    entry(0, 0),
    entry(9, 1),
    entry(14, 2),
    entry(27, 3),
    entry(37, 4),
    entry(77, 5),
    entry(87, 6),
    entry(125, 7),
    entry(144, 8),
    entry(157, 9),
    entry(166, 10),
    entry(197, 11),
    entry(207, 12),
    entry(229, 13),
    entry(254, 14),
    entry(280, 15),
    entry(297, 16),
    entry(328, 17),
    entry(338, 18),
    entry(364, 19),
    entry(372, 20),
    entry(386, 21),
    entry(402, 22),
    entry(421, 23),
    entry(434, 24),
    entry(439, 25),
    entry(445, 26),
    entry(480, 27),
    entry(496, 28),
]);

const GAIN_MODES: [(GainMode, &str); 2] = [(GainMode::Manual, "manual"), (GainMode::Agc, "auto")];

/// Filter calibration runs the PLL at this frequency.
const FILT_CAL_LO: u32 = 56 * MHZ;
const FILT_Q: u8 = 0x10;
const HP_COR: u8 = 0x6b;

#[cfg(feature = "rtl_sdr_blog")]
const VCO_CURRENT: (u8, u8) = (0x06, 0xff);
#[cfg(not(feature = "rtl_sdr_blog"))]
const VCO_CURRENT: (u8, u8) = (0x80, 0xe0);

#[derive(Debug)]
pub struct R820t {
    state: TunerState,
    regs: [u8; NUM_REGS],
    int_freq: u32,
    xtal_cap_sel: XtalCap,
    has_lock: bool,
}

impl R820t {
    pub fn new(xtal: u32) -> R820t {
        let mut regs = [0; NUM_REGS];
        regs[..INIT_ARRAY.len()].copy_from_slice(&INIT_ARRAY);
        R820t {
            state: TunerState::new(xtal, DEFAULT_BANDWIDTH),
            regs,
            int_freq: IF_FREQ,
            xtal_cap_sel: XtalCap::HighCap0p,
            has_lock: false,
        }
    }

    pub fn set_xtal_cap(&mut self, cap: XtalCap) {
        self.xtal_cap_sel = cap;
    }

    /// Whether the last PLL programming locked.
    pub fn has_lock(&self) -> bool {
        self.has_lock
    }

    fn set_tv_standard<B: I2cBus>(&mut self, bus: &TunerBus<B>) -> Result<()> {
        // Initial filter cap, version and LNA top
        self.write_reg_mask(bus, 0x0c, 0x00, 0x0f)?;
        self.write_reg_mask(bus, 0x13, 0x49, 0x3f)?;
        self.write_reg_mask(bus, 0x1d, 0x00, 0x38)?;

        let mut cal = 0;
        for _ in 0..2 {
            self.write_reg_mask(bus, 0x0b, HP_COR, 0x60)?;
            self.write_reg_mask(bus, 0x0f, 0x04, 0x04)?;
            self.write_reg_mask(bus, 0x10, 0x00, 0x03)?;

            let plan = synth::r82xx_plan(FILT_CAL_LO, self.state.xtal)?;
            self.set_pll(bus, &plan)?;

            // Start and stop the trigger
            self.write_reg_mask(bus, 0x0b, 0x10, 0x10)?;
            self.write_reg_mask(bus, 0x0b, 0x00, 0x10)?;
            self.write_reg_mask(bus, 0x0f, 0x00, 0x04)?;

            let mut data = [0; 5];
            self.read_reg(bus, &mut data)?;
            cal = data[4] & 0x0f;
            if cal != 0 && cal != 0x0f {
                break;
            }
        }
        if cal == 0x0f {
            cal = 0;
        }
        debug!("R820T filter calibration code {:#04x}", cal);

        self.write_reg_mask(bus, 0x0a, FILT_Q | cal, 0x1f)?;
        self.write_reg_mask(bus, 0x0b, HP_COR, 0xef)?;
        // Image rejection off, filter gain, channel filter extension
        self.write_reg_mask(bus, 0x07, 0x00, 0x80)?;
        self.write_reg_mask(bus, 0x06, 0x10, 0x30)?;
        self.write_reg_mask(bus, 0x1e, 0x60, 0x60)?;
        // Loop through off, no attenuation
        self.write_reg_mask(bus, 0x05, 0x00, 0x80)?;
        self.write_reg_mask(bus, 0x1f, 0x00, 0x80)?;
        self.write_reg_mask(bus, 0x0f, 0x00, 0x80)?;
        // RF poly filter current
        self.write_reg_mask(bus, 0x19, 0x60, 0x60)
    }

    /// DVB-T system frequency selection.
    fn sysfreq_sel<B: I2cBus>(&mut self, bus: &TunerBus<B>) -> Result<()> {
        self.write_reg_mask(bus, 0x1d, 0xe5, 0xc7)?;
        self.write_reg_mask(bus, 0x1c, 0x24, 0xf8)?;
        self.write_regs(bus, 0x0d, &[0x53])?;
        self.write_regs(bus, 0x0e, &[0x75])?;

        self.write_reg_mask(bus, 0x05, 0x00, 0x60)?;
        self.write_reg_mask(bus, 0x06, 0x00, 0x08)?;
        self.write_reg_mask(bus, 0x11, 0x38, 0x38)?;
        self.write_reg_mask(bus, 0x17, 0x30, 0x30)?;
        self.write_reg_mask(bus, 0x0a, 0x40, 0x60)?;

        self.write_reg_mask(bus, 0x1d, 0x00, 0x38)?;
        self.write_reg_mask(bus, 0x1c, 0x00, 0x04)?;
        self.write_reg_mask(bus, 0x06, 0x00, 0x40)?;
        self.write_reg_mask(bus, 0x1a, 0x30, 0x30)?;

        // LNA top and discharge
        self.write_reg_mask(bus, 0x1d, 0x18, 0x38)?;
        self.write_reg_mask(bus, 0x1c, 0x24, 0x04)?;
        self.write_reg_mask(bus, 0x1e, 0x0e, 0x1f)?;
        self.write_reg_mask(bus, 0x1a, 0x20, 0x30)
    }

    // Tuning logic

    fn set_mux<B: I2cBus>(&mut self, bus: &TunerBus<B>, freq: u32) -> Result<()> {
        let freq_mhz = freq / MHZ;
        let range = FREQ_RANGES
            .iter()
            .take_while(|r| r.freq <= freq_mhz)
            .last()
            .unwrap_or(&FREQ_RANGES[0]);

        // Open drain
        self.write_reg_mask(bus, 0x17, range.open_d, 0x08)?;
        // RF mux, polymux
        self.write_reg_mask(bus, 0x1a, range.rf_mux_ploy, 0xc3)?;
        // TF band
        self.write_regs(bus, 0x1b, &[range.tf_c])?;

        // XTAL cap and drive
        let val = match self.xtal_cap_sel {
            XtalCap::LowCap30p | XtalCap::LowCap20p => range.xtal_cap20p | 0x08,
            XtalCap::LowCap10p => range.xtal_cap10p | 0x08,
            XtalCap::HighCap0p => range.xtal_cap0p,
            XtalCap::LowCap0p => range.xtal_cap0p | 0x08,
        };
        self.write_reg_mask(bus, 0x10, val, 0x0b)?;
        self.write_reg_mask(bus, 0x08, 0x00, 0x3f)?;
        self.write_reg_mask(bus, 0x09, 0x00, 0x3f)
    }

    fn set_pll<B: I2cBus>(&mut self, bus: &TunerBus<B>, plan: &R82xxPlan) -> Result<()> {
        // refdiv2 off
        self.write_reg_mask(bus, 0x10, 0x00, 0x10)?;
        // PLL auto-tune 128 kHz
        self.write_reg_mask(bus, 0x1a, 0x00, 0x0c)?;
        let (current, mask) = VCO_CURRENT;
        self.write_reg_mask(bus, 0x12, current, mask)?;

        let mut data = [0; 5];
        self.read_reg(bus, &mut data)?;
        let vco_fine_tune = (data[4] & 0x30) >> 4;
        let div_num = if vco_fine_tune > R82XX_VCO_POWER_REF {
            plan.div_num.saturating_sub(1)
        } else if vco_fine_tune < R82XX_VCO_POWER_REF {
            plan.div_num + 1
        } else {
            plan.div_num
        };
        self.write_reg_mask(bus, 0x10, div_num << 5, 0xe0)?;

        self.write_regs(bus, 0x14, &[plan.ni_si()])?;
        // pw_sdm
        let pw_sdm = if plan.vco_fra == 0 { 0x08 } else { 0x00 };
        self.write_reg_mask(bus, 0x12, pw_sdm, 0x08)?;
        self.write_regs(bus, 0x16, &[(plan.sdm >> 8) as u8])?;
        self.write_regs(bus, 0x15, &[(plan.sdm & 0xff) as u8])?;
        debug!(
            "R820T LO {} Hz mix_div {} nint {} sdm {:#06x}",
            plan.lo_hz, plan.mix_div, plan.nint, plan.sdm
        );

        let mut data = [0; 3];
        for i in 0..2 {
            self.read_reg(bus, &mut data)?;
            if data[2] & 0x40 != 0 {
                break;
            }
            if i == 0 {
                // Didn't lock, increase VCO current
                self.write_reg_mask(bus, 0x12, 0x60, 0xe0)?;
            }
        }
        self.has_lock = data[2] & 0x40 != 0;
        if !self.has_lock {
            warn!("R820T PLL not locked for {} Hz", plan.lo_hz);
            return Err(TunerError::Tuner("PLL not locked".to_string()));
        }

        // PLL auto-tune 8 kHz
        self.write_reg_mask(bus, 0x1a, 0x08, 0x08)
    }

    fn set_manual_gain<B: I2cBus>(&mut self, bus: &TunerBus<B>, step: u8) -> Result<()> {
        // LNA and mixer manual
        self.write_reg_mask(bus, 0x05, 0x10, 0x10)?;
        self.write_reg_mask(bus, 0x07, 0x00, 0x10)?;

        let mut data = [0; 4];
        self.read_reg(bus, &mut data)?;

        // Fixed VGA gain, 16.3 dB
        self.write_reg_mask(bus, 0x0c, 0x08, 0x9f)?;
        self.write_reg_mask(bus, 0x05, (step + 1) / 2, 0x0f)?;
        self.write_reg_mask(bus, 0x07, step / 2, 0x0f)
    }

    fn set_auto_gain<B: I2cBus>(&mut self, bus: &TunerBus<B>) -> Result<()> {
        // LNA and mixer auto
        self.write_reg_mask(bus, 0x05, 0x00, 0x10)?;
        self.write_reg_mask(bus, 0x07, 0x10, 0x10)?;
        // Fixed VGA gain, 26.5 dB
        self.write_reg_mask(bus, 0x0c, 0x0b, 0x9f)
    }

    /// Write register with bit-masked data
    fn write_reg_mask<B: I2cBus>(
        &mut self,
        bus: &TunerBus<B>,
        reg: u8,
        val: u8,
        bit_mask: u8,
    ) -> Result<()> {
        let rc = self.read_cache_reg(reg);
        let applied = (rc & !bit_mask) | (val & bit_mask);
        self.write_regs(bus, reg, &[applied])
    }

    /// Read register data from the shadow copy. `reg` must be a shadowed
    /// register.
    fn read_cache_reg(&self, reg: u8) -> u8 {
        self.regs[reg as usize - REG_SHADOW_START]
    }

    /// Write data to device registers in chunks of `MAX_I2C_MSG_LEN`.
    fn write_regs<B: I2cBus>(&mut self, bus: &TunerBus<B>, reg: u8, val: &[u8]) -> Result<()> {
        let mut reg_index = reg;
        for chunk in val.chunks(MAX_I2C_MSG_LEN - 1) {
            bus.write_array(ADDR, reg_index, chunk)?;
            self.shadow_store(reg_index, chunk);
            reg_index = reg_index.wrapping_add(chunk.len() as u8);
        }
        Ok(())
    }

    /// Reads `buf.len()` status bytes from register 0.
    fn read_reg<B: I2cBus>(&self, bus: &TunerBus<B>, buf: &mut [u8]) -> Result<()> {
        bus.read_regs(ADDR, 0x00, buf)?;
        for byte in buf.iter_mut() {
            *byte = bit_reverse(*byte);
        }
        Ok(())
    }

    fn shadow_store(&mut self, reg: u8, val: &[u8]) {
        let start = reg as usize;
        for (i, byte) in val.iter().enumerate() {
            if let Some(slot) = (start + i)
                .checked_sub(REG_SHADOW_START)
                .and_then(|index| self.regs.get_mut(index))
            {
                *slot = *byte;
            }
        }
    }
}

impl Tuner for R820t {
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
        self.write_regs(bus, REG_SHADOW_START as u8, &INIT_ARRAY)?;
        self.set_tv_standard(bus)?;
        self.sysfreq_sel(bus)?;
        info!("R820T initialised, IF {} Hz", self.int_freq);
        Ok(())
    }

    fn set_frequency<B: I2cBus>(&mut self, bus: &TunerBus<B>, freq: u32) -> Result<u32> {
        check_frequency(self.frequency_range(), freq)?;
        let lo_freq = freq + self.int_freq;
        let plan = synth::r82xx_plan(lo_freq, self.state.xtal)?;

        let _repeater = bus.repeater()?;
        self.set_mux(bus, lo_freq)?;
        self.set_pll(bus, &plan)?;

        let actual = plan.actual_hz.saturating_sub(self.int_freq);
        self.state.freq = actual;
        Ok(actual)
    }

    fn set_bandwidth<B: I2cBus>(&mut self, bus: &TunerBus<B>, bw: u32) -> Result<u32> {
        check_bandwidth(self.bandwidth_range(), bw)?;
        let widths: Vec<u32> = BANDWIDTHS.iter().map(|row| row.bw).collect();
        let row = &BANDWIDTHS[closest_index(&widths, bw).unwrap_or(BANDWIDTHS.len() - 1)];

        let _repeater = bus.repeater()?;
        self.write_reg_mask(bus, 0x0a, row.reg_0a, 0x10)?;
        self.write_reg_mask(bus, 0x0b, row.reg_0b, 0xef)?;
        self.int_freq = row.if_freq;
        self.state.bandwidth = row.bw;
        Ok(row.bw)
    }

    fn set_gain<B: I2cBus>(&mut self, bus: &TunerBus<B>, gain: f64) -> Result<()> {
        let entry = GAINS.lookup(gain::tenths(gain))?;
        let _repeater = bus.repeater()?;
        self.set_manual_gain(bus, entry.code)?;
        self.state.gain = entry.gain;
        self.state.gain_mode = GainMode::Manual;
        Ok(())
    }

    fn set_gain_mode<B: I2cBus>(&mut self, bus: &TunerBus<B>, mode: GainMode) -> Result<()> {
        match mode {
            GainMode::Manual => {
                let step = GAINS.code_for(self.state.gain)?;
                let _repeater = bus.repeater()?;
                self.set_manual_gain(bus, step)?;
            }
            GainMode::Agc | GainMode::Default => {
                let _repeater = bus.repeater()?;
                self.set_auto_gain(bus)?;
            }
            other => return Err(NotSupported::GainMode(other).into()),
        }
        self.state.gain_mode = match mode {
            GainMode::Default => GainMode::Agc,
            other => other,
        };
        Ok(())
    }

    fn if_frequency(&self) -> u32 {
        self.int_freq
    }

    fn frequency_range(&self) -> Range<u32> {
        Range::new(FREQ_MIN, FREQ_MAX)
    }

    fn bandwidth_values(&self) -> Vec<u32> {
        BANDWIDTHS.iter().map(|row| row.bw).collect()
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

fn bit_reverse(byte: u8) -> u8 {
    const LUT: [u8; 16] = [
        0x0, 0x8, 0x4, 0xc, 0x2, 0xa, 0x6, 0xe, 0x1, 0x9, 0x5, 0xd, 0x3, 0xb, 0x7, 0xf,
    ];
    (LUT[(byte & 0xf) as usize] << 4) | LUT[(byte >> 4) as usize]
}

#[cfg(test)]
#[path = "r820t_test.rs"]
mod r820t_test;
