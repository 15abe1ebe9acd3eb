//! # rtl2832-tuners
//! Tuner driver stack for RTL2832U based receivers.
//!
//! The [`tuners`] module holds the chip drivers and only needs an
//! [`bus::I2cBus`]; [`RtlSdr`] wires them to a USB attached RTL2832U.

pub mod bus;
mod device;
pub mod error;
mod rtlsdr;
pub mod tuners;

use device::Device;
use error::Result;
use rtlsdr::RtlSdr as Sdr;

pub use tuners::{ElonicsDriver, GainMode, Range, TunerParams, MODE_UPDATE_WAIT_TIME_MS};

pub struct RtlSdr {
    sdr: Sdr,
}

impl RtlSdr {
    pub fn open(index: usize) -> Result<RtlSdr> {
        RtlSdr::open_with(index, TunerParams::default())
    }

    pub fn open_with(index: usize, params: TunerParams) -> Result<RtlSdr> {
        let dev = Device::new(index)?;
        let mut sdr = Sdr::new(dev, params);
        sdr.init()?;
        Ok(RtlSdr { sdr })
    }
    pub fn close(&mut self) -> Result<()> {
        self.sdr.deinit_baseband()
    }
    pub fn tuner_name(&self) -> Option<&'static str> {
        self.sdr.tuner_name()
    }
    pub fn get_center_freq(&self) -> u32 {
        self.sdr.get_center_freq()
    }
    /// Returns the frequency the tuner actually settled on.
    pub fn set_center_freq(&mut self, freq: u32) -> Result<u32> {
        self.sdr.set_center_freq(freq)
    }
    pub fn get_freq_range(&self) -> Range<u32> {
        self.sdr.get_freq_range()
    }
    pub fn get_tuner_bandwidth(&self) -> u32 {
        self.sdr.get_tuner_bandwidth()
    }
    pub fn set_tuner_bandwidth(&mut self, bw: u32) -> Result<u32> {
        self.sdr.set_tuner_bandwidth(bw)
    }
    /// Supported gains in dB.
    pub fn get_tuner_gains(&self) -> Vec<f64> {
        self.sdr.get_tuner_gains()
    }
    pub fn get_tuner_gain(&self) -> f64 {
        self.sdr.get_tuner_gain()
    }
    pub fn set_tuner_gain(&mut self, gain: f64) -> Result<()> {
        self.sdr.set_tuner_gain(gain)
    }
    pub fn get_tuner_gain_mode(&self) -> GainMode {
        self.sdr.get_tuner_gain_mode()
    }
    pub fn get_tuner_gain_modes(&self) -> &'static [(GainMode, &'static str)] {
        self.sdr.get_tuner_gain_modes()
    }
    pub fn set_tuner_gain_mode(&mut self, mode: GainMode) -> Result<()> {
        self.sdr.set_tuner_gain_mode(mode)
    }
    pub fn set_tuner_auto_gain_mode(&mut self, on: bool) -> Result<()> {
        self.sdr.set_tuner_auto_gain_mode(on)
    }
    pub fn update_tuner_gain_mode(&mut self) -> Result<bool> {
        self.sdr.update_tuner_gain_mode()
    }
    pub fn get_xtal_freq(&self) -> u32 {
        self.sdr.get_xtal_freq()
    }
    pub fn set_xtal_freq(&mut self, xtal: u32) -> Result<()> {
        self.sdr.set_xtal_freq(xtal)
    }
}
