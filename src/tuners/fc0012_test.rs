// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;
use crate::bus::sim::{Event, Sim};
use crate::error::{NotSupported, TunerError};
use crate::tuners::{GainMode, DEFAULT_XTAL};

const TUNE_100MHZ: [(u8, u8); 9] = [
    (0x01, 0x06),
    (0x02, 0x1b),
    (0x03, 0x1c),
    (0x04, 0x71),
    (0x05, 0x42),
    (0x06, 0x0a),
    (0x0e, 0x80),
    (0x0e, 0x00),
    (0x0e, 0x00),
];

#[test]
fn test_reset_pulses_gpio() {
    let sim = Sim::new();
    reset(&sim.bus()).unwrap();
    assert_eq!(
        sim.events(),
        vec![
            Event::GpioOutput(5),
            Event::GpioBit(5, true),
            Event::GpioBit(5, false)
        ]
    );
}

#[test]
fn test_initialise() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    tuner.initialise(&bus, &TunerParams::default()).unwrap();
    assert_eq!(sim.reg_writes(), INIT.to_vec());
    assert_eq!(sim.repeater_toggles(), vec![true, false]);
    assert_eq!(tuner.bandwidth(), 8_000_000);
}

#[test]
fn test_set_frequency() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    let plan = synth::fc0012_plan(100_000_000, DEFAULT_XTAL).unwrap();

    assert_eq!(tuner.set_frequency(&bus, 100_000_000).unwrap(), plan.actual_hz);
    assert_eq!(tuner.frequency(), plan.actual_hz);
    assert_eq!(sim.reg_writes(), TUNE_100MHZ.to_vec());
    assert_eq!(sim.reads(), vec![0x0e]);
    assert_eq!(sim.repeater_toggles(), vec![true, false]);
}

#[test]
fn test_set_frequency_recalibrates_vco() {
    let sim = Sim::new();
    sim.pin(0x0e, 0x7d);
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    tuner.set_bandwidth(&bus, 6_000_000).unwrap();
    tuner.set_frequency(&bus, 100_000_000).unwrap();

    let writes = sim.reg_writes();
    assert_eq!(writes[5], (0x06, 0x8a));
    assert_eq!(
        &writes[9..],
        &[(0x06, 0x8a), (0x0e, 0x80), (0x0e, 0x00)]
    );
}

#[test]
fn test_set_frequency_zero() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    assert!(matches!(
        tuner.set_frequency(&bus, 0),
        Err(TunerError::Range(_))
    ));
    assert!(sim.events().is_empty());
}

#[test]
fn test_set_frequency_failure_keeps_state() {
    let sim = Sim::new();
    sim.fail_data_write(5);
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    assert!(matches!(
        tuner.set_frequency(&bus, 100_000_000),
        Err(TunerError::Transport(_))
    ));
    assert_eq!(tuner.frequency(), 0);
    assert_eq!(sim.repeater_toggles(), vec![true, false]);
}

#[test]
fn test_set_bandwidth_without_frequency_is_cached() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    assert_eq!(tuner.set_bandwidth(&bus, 7_200_000).unwrap(), 7_000_000);
    assert_eq!(tuner.bandwidth(), 7_000_000);
    assert!(sim.events().is_empty());

    assert!(matches!(
        tuner.set_bandwidth(&bus, 5_000_000),
        Err(TunerError::Range(_))
    ));
    assert_eq!(tuner.bandwidth(), 7_000_000);
}

#[test]
fn test_set_bandwidth_retunes() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    let freq = tuner.set_frequency(&bus, 100_000_000).unwrap();
    sim.clear_events();

    tuner.set_bandwidth(&bus, 7_000_000).unwrap();
    assert!(sim.reg_writes().contains(&(0x06, 0x4a)));
    assert_eq!(tuner.frequency(), freq);
    assert_eq!(sim.repeater_toggles(), vec![true, false]);
}

#[test]
fn test_bandwidth_bits() {
    assert_eq!(bandwidth_bits(0x0a, 6_000_000), 0x8a);
    assert_eq!(bandwidth_bits(0x8a, 7_000_000), 0x4a);
    assert_eq!(bandwidth_bits(0xca, 8_000_000), 0x0a);
}

#[test]
fn test_set_gain() {
    let sim = Sim::new();
    sim.set_reg(0x13, 0xff);
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);

    tuner.set_gain(&bus, 0.5).unwrap();
    assert_eq!(sim.reg(0x13), 0xef);
    assert_eq!(tuner.gain(), 0.5);

    tuner.set_gain(&bus, 0.8).unwrap();
    assert_eq!(sim.reg(0x13), 0xf7);
    assert_eq!(tuner.gain(), 1.0);

    assert!(matches!(
        tuner.set_gain(&bus, 1.5),
        Err(TunerError::Range(_))
    ));
    assert_eq!(tuner.gain(), 1.0);
    assert_eq!(tuner.gain_values(), vec![0.0, 0.5, 1.0]);
}

#[test]
fn test_gain_modes() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    assert!(tuner.gain_modes().is_empty());
    tuner.set_gain_mode(&bus, GainMode::Default).unwrap();
    assert!(matches!(
        tuner.set_gain_mode(&bus, GainMode::Linear),
        Err(TunerError::NotSupported(NotSupported::GainMode(GainMode::Linear)))
    ));
    assert_eq!(tuner.calc_appropriate_gain_mode(&bus).unwrap(), None);
    assert!(sim.events().is_empty());
}

fn divider_regs(sim: &Sim) -> Vec<u8> {
    (0x01..=0x05).map(|r| sim.reg(r)).collect()
}

#[test]
fn test_set_bandwidth_keeps_divider() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    let freq = tuner.set_frequency(&bus, 100_000_000).unwrap();
    let divider = divider_regs(&sim);
    sim.clear_events();

    assert_eq!(tuner.set_bandwidth(&bus, 6_000_000).unwrap(), 6_000_000);
    assert_eq!(&sim.reg_writes()[..5], &TUNE_100MHZ[..5]);
    assert_eq!(divider_regs(&sim), divider);
    assert_eq!(sim.reg(0x06), 0x8a);
    assert_eq!(tuner.frequency(), freq);
}

#[test]
fn test_set_bandwidth_failure_after_tune_keeps_state() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    let freq = tuner.set_frequency(&bus, 100_000_000).unwrap();
    sim.clear_events();
    sim.fail_data_write(5);

    assert!(matches!(
        tuner.set_bandwidth(&bus, 6_000_000),
        Err(TunerError::Transport(_))
    ));
    assert_eq!(tuner.bandwidth(), DEFAULT_BANDWIDTH);
    assert_eq!(tuner.frequency(), freq);
    assert_eq!(sim.repeater_toggles(), vec![true, false]);

    // A later bandwidth change still reprograms the tuned divider
    tuner.set_bandwidth(&bus, 7_000_000).unwrap();
    let expected: Vec<u8> = TUNE_100MHZ[..5].iter().map(|w| w.1).collect();
    assert_eq!(divider_regs(&sim), expected);
    assert_eq!(sim.reg(0x06), 0x4a);
}

#[test]
fn test_set_gain_after_tune_leaves_synthesizer() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Fc0012::new(DEFAULT_XTAL);
    let freq = tuner.set_frequency(&bus, 100_000_000).unwrap();
    sim.clear_events();

    tuner.set_gain(&bus, 0.5).unwrap();
    assert_eq!(sim.reg_writes(), vec![(0x13, 0x08)]);
    assert_eq!(tuner.frequency(), freq);
    assert_eq!(tuner.bandwidth(), DEFAULT_BANDWIDTH);
}
