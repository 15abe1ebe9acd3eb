//! Gain tables and the gain mode decision.
//!
//! Gains are carried as tenths of a dB. A [`GainTable`] maps requested gains
//! to hardware codes for the user facing gain control. Cascaded stage tables
//! are separate: they describe what each analog stage currently contributes,
//! read back live, and feed the input power estimate that drives the
//! sensitive / normal / linear mode switch.
use log::{debug, warn};

use super::regs::{read_field, Field};
use super::{GainMode, Range};
use crate::bus::{I2cBus, TunerBus};
use crate::error::{NotSupported, Quantity, RangeError, Result, TunerError};

/// Converts a dB value to tenths of a dB.
pub fn tenths(db: f64) -> i32 {
    (db * 10.0).round() as i32
}

pub fn db(tenths: i32) -> f64 {
    tenths as f64 / 10.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainEntry {
    /// Tenths of a dB.
    pub gain: i32,
    pub code: u8,
}

pub const fn entry(gain: i32, code: u8) -> GainEntry {
    GainEntry { gain, code }
}

/// An ordered table of (gain, code), ascending by gain.
#[derive(Debug, Clone, Copy)]
pub struct GainTable {
    entries: &'static [GainEntry],
}

impl GainTable {
    pub const fn new(entries: &'static [GainEntry]) -> GainTable {
        GainTable { entries }
    }

    pub fn entries(&self) -> &'static [GainEntry] {
        self.entries
    }

    /// Gain the chip provides for `code`.
    pub fn gain_for(&self, code: u8) -> Option<i32> {
        self.entries.iter().find(|e| e.code == code).map(|e| e.gain)
    }

    /// The entry nearest to `gain`, ties to the lower entry.
    ///
    /// Gains outside the first and last entry are rejected, not clamped.
    pub fn lookup(&self, gain: i32) -> Result<GainEntry> {
        let (first, last) = match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(RangeError::new(Quantity::Gain, gain).into()),
        };
        if gain < first.gain || gain > last.gain {
            return Err(RangeError::new(Quantity::Gain, gain).into());
        }
        let mut best = *first;
        for e in self.entries.iter().skip(1) {
            if (e.gain - gain).abs() < (best.gain - gain).abs() {
                best = *e;
            }
        }
        Ok(best)
    }

    pub fn code_for(&self, gain: i32) -> Result<u8> {
        self.lookup(gain).map(|e| e.code)
    }

    /// Tabulated gains in dB.
    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| db(e.gain)).collect()
    }

    pub fn range(&self) -> Range<f64> {
        match (self.entries.first(), self.entries.last()) {
            (Some(first), Some(last)) => Range::new(db(first.gain), db(last.gain)),
            _ => Range::undefined(),
        }
    }
}

/// Per-code gains of one analog stage, in tenths of a dB.
#[derive(Debug, Clone, Copy)]
pub enum StageGains {
    Flat(&'static [i32]),
    /// Indexed by code, then by band (VHF, UHF).
    Banded(&'static [[i32; 2]]),
}

#[derive(Debug, Clone, Copy)]
pub struct Stage {
    pub name: &'static str,
    pub field: Field,
    pub gains: StageGains,
}

impl Stage {
    pub const fn new(name: &'static str, field: Field, gains: StageGains) -> Stage {
        Stage { name, field, gains }
    }

    pub fn gain(&self, code: u8, band: usize) -> i32 {
        let code = code as usize;
        match self.gains {
            StageGains::Flat(gains) => gains.get(code).copied().unwrap_or(0),
            StageGains::Banded(gains) => gains.get(code).map(|g| g[band.min(1)]).unwrap_or(0),
        }
    }
}

/// Sums the live gains of `stages`, one register read per stage.
pub fn cascade_gain<B: I2cBus>(
    bus: &TunerBus<B>,
    addr: u8,
    stages: &[Stage],
    band: usize,
) -> Result<i32> {
    let mut total = 0;
    for stage in stages {
        let code = read_field(bus, addr, stage.field)?;
        let gain = stage.gain(code, band);
        debug!("{} code {} gain {}", stage.name, code, gain);
        total += gain;
    }
    Ok(total)
}

/// Input power estimate: output power at zero gain less the cascade.
pub fn input_power(reference: i32, cascade: i32) -> i32 {
    reference - cascade
}

/// Hysteresis thresholds in tenths of a dBm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub sensitive_to_normal: i32,
    pub normal_to_sensitive: i32,
    pub normal_to_linear: i32,
    pub linear_to_normal: i32,
}

/// The mode `power` calls for, if it differs from `current`.
pub fn next_mode(current: GainMode, power: i32, thresholds: &Thresholds) -> Option<GainMode> {
    match current {
        GainMode::Default | GainMode::Sensitive => {
            (power > thresholds.sensitive_to_normal).then_some(GainMode::Normal)
        }
        GainMode::Normal => {
            let mut next = None;
            if power < thresholds.normal_to_sensitive {
                next = Some(GainMode::Sensitive);
            }
            if power > thresholds.normal_to_linear {
                next = Some(GainMode::Linear);
            }
            next
        }
        GainMode::Linear => (power < thresholds.linear_to_normal).then_some(GainMode::Normal),
        GainMode::Manual | GainMode::Agc => None,
    }
}

/// Chip description for a gain mode evaluation.
#[derive(Debug, Clone, Copy)]
pub struct ModeCriteria {
    pub stages: &'static [Stage],
    /// Output power at zero cascaded gain, tenths of a dBm.
    pub reference_power: i32,
    pub thresholds: Thresholds,
    /// Frequencies below this use the VHF column of banded stages.
    pub uhf_from: u32,
}

/// Reads back the stage gains and suggests a mode change.
///
/// Any read failure yields `NotSupported`; no mode is guessed.
pub fn suggest_mode<B: I2cBus>(
    bus: &TunerBus<B>,
    addr: u8,
    criteria: &ModeCriteria,
    freq: u32,
    current: GainMode,
) -> Result<Option<GainMode>> {
    let band = usize::from(freq >= criteria.uhf_from);
    let cascade = match cascade_gain(bus, addr, criteria.stages, band) {
        Ok(cascade) => cascade,
        Err(e) => {
            warn!("Gain mode evaluation failed: {}", e);
            return Err(NotSupported::GainModeEvaluation.into());
        }
    };
    let power = input_power(criteria.reference_power, cascade);
    debug!("Cascaded gain {} input power {}", cascade, power);
    Ok(next_mode(current, power, &criteria.thresholds))
}

/// Result of a gain mode update where a failed evaluation counts as
/// "mode unchanged". Bus errors still propagate.
pub fn mode_kept_on_failed_evaluation(result: Result<bool>) -> Result<bool> {
    match result {
        Err(TunerError::NotSupported(NotSupported::GainModeEvaluation)) => {
            warn!("Gain mode not evaluated, keeping the current mode");
            Ok(false)
        }
        other => other,
    }
}
