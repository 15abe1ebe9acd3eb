use crate::bus::TunerBus;
use crate::device::{
    Device, Width, BLOCK_SYS, BLOCK_USB, DEMOD_CTL, DEMOD_CTL_1, USB_EPA_CTL, USB_EPA_MAXPKT,
    USB_SYSCTL,
};
use crate::error::{NotSupported, Quantity, RangeError, Result};
use crate::tuners::{self, GainMode, Range, Tuner, TunerParams, Tuners, DEFAULT_XTAL};
use log::info;

const INTERFACE_ID: u8 = 0;

const MIN_RTL_XTAL_FREQ: u32 = DEFAULT_XTAL - 1000;
const MAX_RTL_XTAL_FREQ: u32 = DEFAULT_XTAL + 1000;

/// The demodulator side of the receiver: owns the USB device, the tuner bus
/// and whichever tuner driver probe selected.
#[derive(Debug)]
pub struct RtlSdr {
    bus: TunerBus<Device>,
    tuner: Option<Tuners>,
    params: TunerParams,
    freq: u32, // Hz
    xtal: u32, // Hz
}

impl RtlSdr {
    pub fn new(handle: Device, params: TunerParams) -> Self {
        RtlSdr {
            bus: TunerBus::new(handle),
            tuner: None,
            params,
            freq: 0,
            xtal: DEFAULT_XTAL,
        }
    }

    pub fn init(&mut self) -> Result<()> {
        let handle = self.bus_device_mut();
        handle.claim_interface(INTERFACE_ID)?;
        handle.test_write()?;
        self.init_baseband()?;

        let mut tuner = tuners::probe(&self.bus, &self.params, self.xtal)?;
        info!("Init tuner");
        tuner.initialise(&self.bus, &self.params)?;

        if matches!(tuner, Tuners::R820t(_)) {
            // Disable Zero-IF mode
            self.device().demod_write_reg(1, 0xb1, 0x1a, Width::U8)?;
            // Only enable In-phase ADC input
            self.device().demod_write_reg(0, 0x08, 0x4d, Width::U8)?;
            self.set_if_freq(tuner.if_frequency())?;
            // Enable spectrum inversion
            self.device().demod_write_reg(1, 0x15, 0x01, Width::U8)?;
        } else {
            self.set_if_freq(0)?;
            // Enable In-phase + Quadrature ADC input
            self.device().demod_write_reg(0, 0x08, 0xcd, Width::U8)?;
            // Enable Zero-IF mode
            self.device().demod_write_reg(1, 0xb1, 0x1b, Width::U8)?;
        }
        self.tuner = Some(tuner);
        info!("Init complete");
        Ok(())
    }

    pub fn tuner_name(&self) -> Option<&'static str> {
        self.tuner.as_ref().map(|t| t.name())
    }

    pub fn get_center_freq(&self) -> u32 {
        self.freq
    }

    pub fn set_center_freq(&mut self, freq: u32) -> Result<u32> {
        let actual = self.with_tuner(|tuner, bus| tuner.set_frequency(bus, freq))?;
        self.freq = freq;
        Ok(actual)
    }

    /// Sets the tuner bandwidth. For the R820T the IF moves with the
    /// filter, so the demodulator IF is reprogrammed and the tuner retuned.
    pub fn set_tuner_bandwidth(&mut self, bw: u32) -> Result<u32> {
        let achieved = self.with_tuner(|tuner, bus| tuner.set_bandwidth(bus, bw))?;
        if let Some(tuner @ Tuners::R820t(_)) = &self.tuner {
            self.set_if_freq(tuner.if_frequency())?;
            if self.freq != 0 {
                self.set_center_freq(self.freq)?;
            }
        }
        Ok(achieved)
    }

    pub fn get_tuner_bandwidth(&self) -> u32 {
        self.tuner.as_ref().map_or(0, |t| t.bandwidth())
    }

    pub fn get_tuner_gains(&self) -> Vec<f64> {
        self.tuner
            .as_ref()
            .map_or_else(Vec::new, |t| t.gain_values())
    }

    pub fn get_tuner_gain(&self) -> f64 {
        self.tuner.as_ref().map_or(0.0, |t| t.gain())
    }

    pub fn set_tuner_gain(&mut self, gain: f64) -> Result<()> {
        self.with_tuner(|tuner, bus| tuner.set_gain(bus, gain))
    }

    pub fn get_tuner_gain_mode(&self) -> GainMode {
        self.tuner
            .as_ref()
            .map_or(GainMode::Default, |t| t.gain_mode())
    }

    pub fn get_tuner_gain_modes(&self) -> &'static [(GainMode, &'static str)] {
        self.tuner
            .as_ref()
            .map(|t| t.gain_modes())
            .unwrap_or(&[])
    }

    pub fn set_tuner_gain_mode(&mut self, mode: GainMode) -> Result<()> {
        self.with_tuner(|tuner, bus| tuner.set_gain_mode(bus, mode))
    }

    pub fn set_tuner_auto_gain_mode(&mut self, on: bool) -> Result<()> {
        self.with_tuner(|tuner, bus| tuner.set_auto_gain_mode(bus, on))
    }

    /// Re-evaluates the gain mode, returning whether it changed.
    pub fn update_tuner_gain_mode(&mut self) -> Result<bool> {
        self.with_tuner(|tuner, bus| tuner.update_gain_mode(bus))
    }

    pub fn get_freq_range(&self) -> Range<u32> {
        self.tuner
            .as_ref()
            .map_or_else(Range::undefined, |t| t.frequency_range())
    }

    pub fn get_xtal_freq(&self) -> u32 {
        self.xtal
    }

    /// Sets the crystal frequency shared by the demodulator and the tuner.
    /// The IF and the current frequency are reprogrammed with it; on failure
    /// the previous crystal stays in effect.
    pub fn set_xtal_freq(&mut self, xtal: u32) -> Result<()> {
        if !(MIN_RTL_XTAL_FREQ..=MAX_RTL_XTAL_FREQ).contains(&xtal) {
            return Err(RangeError::new(Quantity::Crystal, xtal).into());
        }
        let previous = self.xtal;
        self.use_xtal(xtal);
        if let Err(e) = self.reprogram_for_xtal() {
            self.use_xtal(previous);
            return Err(e);
        }
        info!("Crystal frequency {} Hz", xtal);
        Ok(())
    }

    fn use_xtal(&mut self, xtal: u32) {
        self.xtal = xtal;
        if let Some(tuner) = self.tuner.as_mut() {
            tuner.state_mut().xtal = xtal;
        }
    }

    fn reprogram_for_xtal(&mut self) -> Result<()> {
        let if_freq = self.tuner.as_ref().map_or(0, |t| t.if_frequency());
        if if_freq != 0 {
            self.set_if_freq(if_freq)?;
        }
        if self.tuner.is_some() && self.freq != 0 {
            self.set_center_freq(self.freq)?;
        }
        Ok(())
    }

    /// Programs the demodulator's IF, as a 22-bit fraction of the crystal.
    pub fn set_if_freq(&self, freq: u32) -> Result<()> {
        let if_freq = if_freq_word(freq, self.xtal);
        info!("IF frequency {} Hz (word {:#08x})", freq, if_freq & 0x3f_ffff);

        let tmp = ((if_freq >> 16) as u16) & 0x3f;
        self.device().demod_write_reg(1, 0x19, tmp, Width::U8)?;
        let tmp = ((if_freq >> 8) as u16) & 0xff;
        self.device().demod_write_reg(1, 0x1a, tmp, Width::U8)?;
        let tmp = if_freq as u16 & 0xff;
        self.device().demod_write_reg(1, 0x1b, tmp, Width::U8)?;
        Ok(())
    }

    fn init_baseband(&self) -> Result<()> {
        let handle = self.device();
        // Initialize USB
        handle.write_reg(BLOCK_USB, USB_SYSCTL, 0x09, Width::U8)?;
        handle.write_reg(BLOCK_USB, USB_EPA_MAXPKT, 0x0002, Width::U16)?;
        handle.write_reg(BLOCK_USB, USB_EPA_CTL, 0x1002, Width::U16)?;

        // Power-on demod
        handle.write_reg(BLOCK_SYS, DEMOD_CTL_1, 0x22, Width::U8)?;
        handle.write_reg(BLOCK_SYS, DEMOD_CTL, 0xe8, Width::U8)?;

        handle.reset_demod()?;

        // Disable spectrum inversion and adjacent channel rejection
        handle.demod_write_reg(1, 0x15, 0x00, Width::U8)?;
        handle.demod_write_reg(1, 0x16, 0x0000, Width::U16)?;

        // Clear DDC shift and IF registers
        for i in 0..5 {
            handle.demod_write_reg(1, 0x16 + i, 0x00, Width::U8)?;
        }

        // Enable SDR mode, disable DAGC (bit 5)
        handle.demod_write_reg(0, 0x19, 0x05, Width::U8)?;

        // Init FSM state-holding register
        handle.demod_write_reg(1, 0x93, 0xf0, Width::U8)?;
        handle.demod_write_reg(1, 0x94, 0x0f, Width::U8)?;

        // Disable AGC (en_dagc, bit 0)
        handle.demod_write_reg(1, 0x11, 0x00, Width::U8)?;

        // Disable RF and IF AGC loop
        handle.demod_write_reg(1, 0x04, 0x00, Width::U8)?;

        // Disable PID filter
        handle.demod_write_reg(0, 0x61, 0x60, Width::U8)?;

        // opt_adc_iq = 0, default ADC_I/ADC_Q datapath
        handle.demod_write_reg(0, 0x06, 0x80, Width::U8)?;

        // Enable Zero-IF mode, DC cancellation, and IQ estimation/compensation
        handle.demod_write_reg(1, 0xb1, 0x1b, Width::U8)?;

        // Disable 4.096 MHz clock output on pin TP_CK0
        handle.demod_write_reg(0, 0x0d, 0x83, Width::U8)?;
        Ok(())
    }

    pub fn deinit_baseband(&mut self) -> Result<()> {
        // Power-off demodulator and ADCs
        self.device()
            .write_reg(BLOCK_SYS, DEMOD_CTL, 0x20, Width::U8)?;
        Ok(())
    }

    fn device(&self) -> &Device {
        self.bus.inner()
    }

    fn bus_device_mut(&mut self) -> &mut Device {
        self.bus.inner_mut()
    }

    fn with_tuner<T>(
        &mut self,
        op: impl FnOnce(&mut Tuners, &TunerBus<Device>) -> Result<T>,
    ) -> Result<T> {
        match self.tuner.as_mut() {
            Some(tuner) => op(tuner, &self.bus),
            None => Err(NotSupported::NoTuner.into()),
        }
    }
}

/// Two's complement IF word: `-freq * 2^22 / xtal`.
fn if_freq_word(freq: u32, xtal: u32) -> i32 {
    let base = 1_i64 << 22;
    (-(freq as i64) * base / xtal as i64) as i32
}
