// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::sync::{Arc, Mutex};

use super::*;
use crate::bus::mock_bus::MockBus;
use crate::bus::sim::Sim;
use crate::error::{NotSupported, TunerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Repeater(bool),
    Write(u8),
    Gpio,
}

/// A bus with at most one chip on it. The chip answers `val` at `reg`,
/// every other address NAKs.
fn chip_bus(chip: Option<(u8, u8, u8)>, steps: Arc<Mutex<Vec<Step>>>) -> TunerBus<MockBus> {
    let pointer = Arc::new(Mutex::new(0_u8));
    let mut mock = MockBus::new();

    let (s, p) = (steps.clone(), pointer.clone());
    mock.expect_i2c_write().returning(move |addr, buf| {
        s.lock().unwrap().push(Step::Write(addr));
        match chip {
            Some((chip_addr, _, _)) if chip_addr == addr => {
                *p.lock().unwrap() = buf[0];
                Ok(buf.len())
            }
            _ => Ok(0),
        }
    });
    let p = pointer.clone();
    mock.expect_i2c_read().returning(move |addr, buf| match chip {
        Some((chip_addr, reg, val)) if chip_addr == addr => {
            buf[0] = if *p.lock().unwrap() == reg { val } else { 0xff };
            Ok(buf.len())
        }
        _ => Ok(0),
    });
    let s = steps.clone();
    mock.expect_set_i2c_repeater().returning(move |on| {
        s.lock().unwrap().push(Step::Repeater(on));
        Ok(())
    });
    let s = steps.clone();
    mock.expect_set_gpio_output().returning(move |_| {
        s.lock().unwrap().push(Step::Gpio);
        Ok(())
    });
    let s = steps;
    mock.expect_set_gpio_bit().returning(move |_, _| {
        s.lock().unwrap().push(Step::Gpio);
        Ok(())
    });
    TunerBus::new(mock)
}

fn probe_chip(info: &TunerInfo, params: &TunerParams) -> Result<Tuners> {
    let steps = Arc::new(Mutex::new(Vec::new()));
    let bus = chip_bus(
        Some((info.i2c_addr, info.check_addr, info.check_val)),
        steps,
    );
    probe(&bus, params, DEFAULT_XTAL)
}

#[test]
fn test_probe_elonics_driver_choice() {
    let mut params = TunerParams::default();
    let tuner = probe_chip(&e4000::TUNER_INFO, &params).unwrap();
    assert!(matches!(tuner, Tuners::E4000(_)));

    params.elonics = ElonicsDriver::E4k;
    let tuner = probe_chip(&e4000::TUNER_INFO, &params).unwrap();
    assert!(matches!(tuner, Tuners::E4k(_)));
    assert_eq!(tuner.name(), "Elonics E4000");
}

#[test]
fn test_probe_each_chip() {
    let params = TunerParams::default();
    assert!(matches!(
        probe_chip(&fc0012::TUNER_INFO, &params).unwrap(),
        Tuners::Fc0012(_)
    ));
    assert!(matches!(
        probe_chip(&fc0013::TUNER_INFO, &params).unwrap(),
        Tuners::Fc0013(_)
    ));
    let tuner = probe_chip(&r820t::TUNER_INFO, &params).unwrap();
    assert!(matches!(tuner, Tuners::R820t(_)));
    assert_eq!(tuner.name(), "Rafael Micro R820T");
}

#[test]
fn test_probe_order_and_no_tuner() {
    let steps = Arc::new(Mutex::new(Vec::new()));
    let bus = chip_bus(None, steps.clone());
    assert!(matches!(
        probe(&bus, &TunerParams::default(), DEFAULT_XTAL),
        Err(TunerError::NotSupported(NotSupported::NoTuner))
    ));

    assert_eq!(
        *steps.lock().unwrap(),
        vec![
            Step::Repeater(true),
            Step::Write(e4000::TUNER_INFO.i2c_addr),
            Step::Write(fc0013::TUNER_INFO.i2c_addr),
            Step::Write(r820t::TUNER_INFO.i2c_addr),
            Step::Gpio,
            Step::Gpio,
            Step::Gpio,
            Step::Write(fc0012::TUNER_INFO.i2c_addr),
            Step::Repeater(false),
        ]
    );
}

#[test]
fn test_probe_continues_past_wrong_check_value() {
    // FC0012 and FC0013 share an address and differ only in the ID value
    let steps = Arc::new(Mutex::new(Vec::new()));
    let bus = chip_bus(Some((0xc6, 0x00, 0xa1)), steps);
    let tuner = probe(&bus, &TunerParams::default(), DEFAULT_XTAL).unwrap();
    assert!(matches!(tuner, Tuners::Fc0012(_)));
}

#[test]
fn test_probe_skips_fc0012_when_reset_fails() {
    let mut mock = MockBus::new();
    mock.expect_i2c_write().returning(|_, _| Ok(0));
    mock.expect_set_i2c_repeater().returning(|_| Ok(()));
    mock.expect_set_gpio_output()
        .times(1)
        .returning(|_| Err(rusb::Error::Pipe.into()));
    mock.expect_set_gpio_bit().never();
    let bus = TunerBus::new(mock);
    assert!(matches!(
        probe(&bus, &TunerParams::default(), DEFAULT_XTAL),
        Err(TunerError::NotSupported(NotSupported::NoTuner))
    ));
    assert_eq!(bus.depth(), 0);
}

#[test]
fn test_range() {
    let range = Range::new(10_u32, 20);
    assert!(range.is_defined());
    assert!(range.contains(10));
    assert!(range.contains(20));
    assert!(!range.contains(21));

    let undefined = Range::<u32>::undefined();
    assert!(!undefined.is_defined());
    assert!(undefined.contains(u32::MAX));

    assert_eq!(Range::from_values(&[6, 7, 8]), Range::new(6, 8));
    assert_eq!(Range::<u32>::from_values(&[]), undefined);
}

#[test]
fn test_check_frequency_and_bandwidth() {
    let range = Range::new(24_000_000_u32, 1_766_000_000);
    assert!(check_frequency(range, 100_000_000).is_ok());
    assert!(matches!(
        check_frequency(range, 2_000_000_000),
        Err(TunerError::Range(_))
    ));
    // Zero is never a frequency, even without limits
    assert!(matches!(
        check_frequency(Range::undefined(), 0),
        Err(TunerError::Range(_))
    ));
    assert!(check_frequency(Range::undefined(), 1).is_ok());

    assert!(check_bandwidth(Range::new(6_000_000, 8_000_000), 7_000_000).is_ok());
    assert!(matches!(
        check_bandwidth(Range::new(6_000_000, 8_000_000), 0),
        Err(TunerError::Range(_))
    ));
}

#[test]
fn test_dispatch() {
    let tuner = Tuners::R820t(R820t::new(DEFAULT_XTAL));
    assert_eq!(tuner.if_frequency(), r820t::IF_FREQ);
    assert_eq!(tuner.gain_mode_name(GainMode::Agc), "auto");
    assert_eq!(tuner.gain_mode_name(GainMode::Linear), "default");
    assert_eq!(tuner.bandwidth(), r820t::DEFAULT_BANDWIDTH);

    let tuner = Tuners::Fc0012(Fc0012::new(DEFAULT_XTAL));
    assert_eq!(tuner.if_frequency(), 0);
    assert_eq!(
        tuner.bandwidth_range(),
        Range::new(6_000_000, 8_000_000)
    );
    assert_eq!(tuner.gain_range(), Range::new(0.0, 1.0));
}

#[test]
fn test_update_gain_mode_without_suggestion() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Tuners::Fc0013(Fc0013::new(DEFAULT_XTAL));
    assert!(!tuner.update_gain_mode(&bus).unwrap());
    assert_eq!(sim.repeater_toggles(), vec![true, false]);
    assert_eq!(tuner.gain_mode(), GainMode::Default);
}

#[test]
fn test_auto_gain_mode_flag() {
    let sim = Sim::new();
    let bus = sim.bus();
    let mut tuner = Tuners::Fc0012(Fc0012::new(DEFAULT_XTAL));
    assert!(!tuner.auto_gain_mode());
    tuner.set_auto_gain_mode(&bus, true).unwrap();
    assert!(tuner.auto_gain_mode());
    assert!(sim.events().is_empty());
}
