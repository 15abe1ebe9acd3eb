//! Tuner capability interface and driver selection.
pub mod bandwidth;
pub mod e4000;
pub mod e4k;
pub mod fc0012;
pub mod fc0013;
pub mod gain;
pub mod r820t;
pub mod regs;
pub mod synth;

use log::{debug, error, info};

use crate::bus::{I2cBus, TunerBus};
use crate::error::{NotSupported, Result};

pub use e4000::E4000;
pub use e4k::E4k;
pub use fc0012::Fc0012;
pub use fc0013::Fc0013;
pub use r820t::R820t;

pub const DEFAULT_XTAL: u32 = 28_800_000;
/// Period at which an owner should re-evaluate the gain mode in automatic mode.
pub const MODE_UPDATE_WAIT_TIME_MS: u64 = 1000;

/// Probe order. The Elonics entry stands for both E4000 and E4K drivers.
pub const KNOWN_TUNERS: [TunerInfo; 4] = [
    e4000::TUNER_INFO,
    fc0013::TUNER_INFO,
    r820t::TUNER_INFO,
    fc0012::TUNER_INFO,
];

/// Chip identity and how to recognise it on the bus.
#[derive(Debug)]
pub struct TunerInfo {
    pub id: &'static str,
    pub name: &'static str,
    pub i2c_addr: u8,
    pub check_addr: u8,
    pub check_val: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GainMode {
    /// Chip default. The Elonics drivers treat it as `Sensitive`.
    Default,
    Sensitive,
    Normal,
    Linear,
    Manual,
    Agc,
}

/// Which driver claims an Elonics chip found at probe time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElonicsDriver {
    E4000,
    E4k,
}

/// Options handed to a tuner at initialisation.
#[derive(Debug, Clone)]
pub struct TunerParams {
    pub dc_offset_loop: bool,
    pub manual_gain: bool,
    /// E4000: calibrate the DC offset LUT on every retune.
    pub dc_offset_lut: bool,
    /// E4000: switch gain control to manual around each retune.
    pub update_gain_control: bool,
    pub elonics: ElonicsDriver,
}

impl Default for TunerParams {
    fn default() -> Self {
        TunerParams {
            dc_offset_loop: false,
            manual_gain: true,
            dc_offset_lut: true,
            update_gain_control: false,
            elonics: ElonicsDriver::E4000,
        }
    }
}

/// A closed range. `min == max` means undefined, which admits everything.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range<T> {
    pub min: T,
    pub max: T,
}

impl<T: PartialOrd + Copy + Default> Range<T> {
    pub fn new(min: T, max: T) -> Range<T> {
        Range { min, max }
    }

    pub fn undefined() -> Range<T> {
        Range {
            min: T::default(),
            max: T::default(),
        }
    }

    pub fn from_values(values: &[T]) -> Range<T> {
        match (values.first(), values.last()) {
            (Some(first), Some(last)) => Range::new(*first, *last),
            _ => Range::undefined(),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.min != self.max
    }

    pub fn contains(&self, value: T) -> bool {
        !self.is_defined() || (value >= self.min && value <= self.max)
    }
}

/// Values cached by every driver after a successful operation.
#[derive(Debug, Clone, PartialEq)]
pub struct TunerState {
    pub freq: u32,
    pub bandwidth: u32,
    /// Tenths of a dB.
    pub gain: i32,
    pub gain_mode: GainMode,
    pub auto_gain_mode: bool,
    pub xtal: u32,
}

impl TunerState {
    pub fn new(xtal: u32, bandwidth: u32) -> TunerState {
        TunerState {
            freq: 0,
            bandwidth,
            gain: 0,
            gain_mode: GainMode::Default,
            auto_gain_mode: false,
            xtal,
        }
    }
}

/// Operations every tuner driver provides.
///
/// All bus traffic happens under a repeater guard taken by the operation
/// itself. A failed operation leaves the cached state as it was.
pub trait Tuner {
    fn info(&self) -> &'static TunerInfo;
    fn state(&self) -> &TunerState;
    fn state_mut(&mut self) -> &mut TunerState;

    fn initialise<B: I2cBus>(&mut self, bus: &TunerBus<B>, params: &TunerParams) -> Result<()>;
    /// Tunes to `freq` Hz, returning the frequency actually programmed.
    fn set_frequency<B: I2cBus>(&mut self, bus: &TunerBus<B>, freq: u32) -> Result<u32>;
    /// Selects the filter nearest `bw` Hz, returning the bandwidth achieved.
    fn set_bandwidth<B: I2cBus>(&mut self, bus: &TunerBus<B>, bw: u32) -> Result<u32>;
    /// Sets the gain nearest `gain` dB.
    fn set_gain<B: I2cBus>(&mut self, bus: &TunerBus<B>, gain: f64) -> Result<()>;

    fn set_gain_mode<B: I2cBus>(&mut self, _bus: &TunerBus<B>, mode: GainMode) -> Result<()> {
        if mode != GainMode::Default && !self.gain_modes().iter().any(|(m, _)| *m == mode) {
            return Err(NotSupported::GainMode(mode).into());
        }
        self.state_mut().gain_mode = mode;
        Ok(())
    }

    fn set_auto_gain_mode<B: I2cBus>(&mut self, _bus: &TunerBus<B>, on: bool) -> Result<()> {
        self.state_mut().auto_gain_mode = on;
        Ok(())
    }

    /// The mode the current signal conditions call for, if different.
    fn calc_appropriate_gain_mode<B: I2cBus>(&self, _bus: &TunerBus<B>) -> Result<Option<GainMode>> {
        Ok(None)
    }

    /// Evaluates the gain mode and applies a suggested change.
    fn update_gain_mode<B: I2cBus>(&mut self, bus: &TunerBus<B>) -> Result<bool> {
        let _repeater = bus.repeater()?;
        match self.calc_appropriate_gain_mode(bus)? {
            Some(mode) if mode != self.gain_mode() => {
                self.set_gain_mode(bus, mode)?;
                info!("Gain mode: {}", self.gain_mode_name(mode));
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Intermediate frequency the demodulator has to compensate for.
    fn if_frequency(&self) -> u32 {
        0
    }

    fn name(&self) -> &'static str {
        self.info().name
    }

    fn frequency(&self) -> u32 {
        self.state().freq
    }

    fn bandwidth(&self) -> u32 {
        self.state().bandwidth
    }

    fn gain(&self) -> f64 {
        gain::db(self.state().gain)
    }

    fn gain_mode(&self) -> GainMode {
        self.state().gain_mode
    }

    fn auto_gain_mode(&self) -> bool {
        self.state().auto_gain_mode
    }

    fn frequency_range(&self) -> Range<u32> {
        Range::undefined()
    }

    fn bandwidth_values(&self) -> Vec<u32> {
        Vec::new()
    }

    fn bandwidth_range(&self) -> Range<u32> {
        Range::from_values(&self.bandwidth_values())
    }

    fn gain_values(&self) -> Vec<f64> {
        Vec::new()
    }

    fn gain_range(&self) -> Range<f64> {
        Range::from_values(&self.gain_values())
    }

    fn gain_modes(&self) -> &'static [(GainMode, &'static str)] {
        &[]
    }

    fn gain_mode_name(&self, mode: GainMode) -> &'static str {
        self.gain_modes()
            .iter()
            .find(|(m, _)| *m == mode)
            .map(|(_, name)| *name)
            .unwrap_or("default")
    }
}

/// Rejects a zero frequency or one outside a defined range.
pub(crate) fn check_frequency(range: Range<u32>, freq: u32) -> Result<()> {
    if freq == 0 || !range.contains(freq) {
        return Err(crate::error::RangeError::new(crate::error::Quantity::Frequency, freq).into());
    }
    Ok(())
}

pub(crate) fn check_bandwidth(range: Range<u32>, bw: u32) -> Result<()> {
    if bw == 0 || !range.contains(bw) {
        return Err(crate::error::RangeError::new(crate::error::Quantity::Bandwidth, bw).into());
    }
    Ok(())
}

/// The driver selected by probe.
#[derive(Debug)]
pub enum Tuners {
    E4000(E4000),
    E4k(E4k),
    Fc0012(Fc0012),
    Fc0013(Fc0013),
    R820t(R820t),
}

macro_rules! dispatch {
    ($self:ident, $t:ident => $e:expr) => {
        match $self {
            Tuners::E4000($t) => $e,
            Tuners::E4k($t) => $e,
            Tuners::Fc0012($t) => $e,
            Tuners::Fc0013($t) => $e,
            Tuners::R820t($t) => $e,
        }
    };
}

impl Tuners {
    fn for_chip(info: &TunerInfo, params: &TunerParams, xtal: u32) -> Option<Tuners> {
        match info.id {
            e4000::ID => Some(match params.elonics {
                ElonicsDriver::E4000 => Tuners::E4000(E4000::new(xtal)),
                ElonicsDriver::E4k => Tuners::E4k(E4k::new(xtal)),
            }),
            fc0012::ID => Some(Tuners::Fc0012(Fc0012::new(xtal))),
            fc0013::ID => Some(Tuners::Fc0013(Fc0013::new(xtal))),
            r820t::ID => Some(Tuners::R820t(R820t::new(xtal))),
            _ => None,
        }
    }
}

impl Tuner for Tuners {
    fn info(&self) -> &'static TunerInfo {
        dispatch!(self, t => t.info())
    }
    fn state(&self) -> &TunerState {
        dispatch!(self, t => t.state())
    }
    fn state_mut(&mut self) -> &mut TunerState {
        dispatch!(self, t => t.state_mut())
    }
    fn initialise<B: I2cBus>(&mut self, bus: &TunerBus<B>, params: &TunerParams) -> Result<()> {
        dispatch!(self, t => t.initialise(bus, params))
    }
    fn set_frequency<B: I2cBus>(&mut self, bus: &TunerBus<B>, freq: u32) -> Result<u32> {
        dispatch!(self, t => t.set_frequency(bus, freq))
    }
    fn set_bandwidth<B: I2cBus>(&mut self, bus: &TunerBus<B>, bw: u32) -> Result<u32> {
        dispatch!(self, t => t.set_bandwidth(bus, bw))
    }
    fn set_gain<B: I2cBus>(&mut self, bus: &TunerBus<B>, gain: f64) -> Result<()> {
        dispatch!(self, t => t.set_gain(bus, gain))
    }
    fn set_gain_mode<B: I2cBus>(&mut self, bus: &TunerBus<B>, mode: GainMode) -> Result<()> {
        dispatch!(self, t => t.set_gain_mode(bus, mode))
    }
    fn set_auto_gain_mode<B: I2cBus>(&mut self, bus: &TunerBus<B>, on: bool) -> Result<()> {
        dispatch!(self, t => t.set_auto_gain_mode(bus, on))
    }
    fn calc_appropriate_gain_mode<B: I2cBus>(&self, bus: &TunerBus<B>) -> Result<Option<GainMode>> {
        dispatch!(self, t => t.calc_appropriate_gain_mode(bus))
    }
    fn update_gain_mode<B: I2cBus>(&mut self, bus: &TunerBus<B>) -> Result<bool> {
        dispatch!(self, t => t.update_gain_mode(bus))
    }
    fn if_frequency(&self) -> u32 {
        dispatch!(self, t => t.if_frequency())
    }
    fn frequency_range(&self) -> Range<u32> {
        dispatch!(self, t => t.frequency_range())
    }
    fn bandwidth_values(&self) -> Vec<u32> {
        dispatch!(self, t => t.bandwidth_values())
    }
    fn bandwidth_range(&self) -> Range<u32> {
        dispatch!(self, t => t.bandwidth_range())
    }
    fn gain_values(&self) -> Vec<f64> {
        dispatch!(self, t => t.gain_values())
    }
    fn gain_range(&self) -> Range<f64> {
        dispatch!(self, t => t.gain_range())
    }
    fn gain_modes(&self) -> &'static [(GainMode, &'static str)] {
        dispatch!(self, t => t.gain_modes())
    }
}

/// Finds the tuner behind the repeater, trying `KNOWN_TUNERS` in order.
pub fn probe<B: I2cBus>(bus: &TunerBus<B>, params: &TunerParams, xtal: u32) -> Result<Tuners> {
    let _repeater = bus.repeater()?;
    for tuner_info in KNOWN_TUNERS.iter() {
        info!(
            "Probing I2C address {:#04x} checking address {:#04x}",
            tuner_info.i2c_addr, tuner_info.check_addr
        );
        if tuner_info.id == fc0012::ID {
            if let Err(e) = fc0012::reset(bus) {
                error!("FC0012 reset failed, continuing. Err: {}", e);
                continue;
            }
        }
        match bus.read_reg(tuner_info.i2c_addr, tuner_info.check_addr) {
            Ok(val) if val == tuner_info.check_val => {
                if let Some(tuner) = Tuners::for_chip(tuner_info, params, xtal) {
                    info!("Found {} tuner", tuner.name());
                    return Ok(tuner);
                }
            }
            Ok(val) => debug!(
                "Expecting value {:#04x}, got value {:#04x}",
                tuner_info.check_val, val
            ),
            Err(e) => error!("Reading failed, continuing. Err: {}", e),
        }
    }
    Err(NotSupported::NoTuner.into())
}

#[cfg(test)]
mod tuners_test;
