//! A register-file tuner behind a `MockBus`, for driver tests.
//!
//! Writes store their payload at the register pointer with auto-increment,
//! reads return from the pointer onwards. Every transfer and repeater toggle
//! is recorded in order.
use std::sync::{Arc, Mutex};

use super::mock_bus::MockBus;
use super::TunerBus;
use crate::error::{Result, TransportError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Repeater(bool),
    Write(u8, Vec<u8>),
    Read(u8, u8, usize),
    GpioOutput(u8),
    GpioBit(u8, bool),
}

struct SimState {
    regs: [u8; 256],
    pinned: Vec<(u8, u8)>,
    pointer: u8,
    events: Vec<Event>,
    data_writes: usize,
    fail_data_write: Option<usize>,
    fail_reads_of: Vec<u8>,
    fail_repeater_enable: bool,
}

impl SimState {
    fn new() -> SimState {
        SimState {
            regs: [0; 256],
            pinned: Vec::new(),
            pointer: 0,
            events: Vec::new(),
            data_writes: 0,
            fail_data_write: None,
            fail_reads_of: Vec::new(),
            fail_repeater_enable: false,
        }
    }

    fn write(&mut self, addr: u8, buf: &[u8]) -> Result<usize> {
        if buf.len() > 1 {
            let index = self.data_writes;
            self.data_writes += 1;
            if self.fail_data_write == Some(index) {
                return Err(TransportError::Nak { addr }.into());
            }
        }
        self.events.push(Event::Write(addr, buf.to_vec()));
        if let Some((&reg, data)) = buf.split_first() {
            self.pointer = reg;
            for (i, val) in data.iter().enumerate() {
                self.regs[reg.wrapping_add(i as u8) as usize] = *val;
            }
        }
        Ok(buf.len())
    }

    fn read(&mut self, addr: u8, buf: &mut [u8]) -> Result<usize> {
        if self.fail_reads_of.contains(&self.pointer) {
            return Err(TransportError::Nak { addr }.into());
        }
        self.events.push(Event::Read(addr, self.pointer, buf.len()));
        for (i, out) in buf.iter_mut().enumerate() {
            let reg = self.pointer.wrapping_add(i as u8);
            *out = match self.pinned.iter().find(|(r, _)| *r == reg) {
                Some((_, val)) => *val,
                None => self.regs[reg as usize],
            };
        }
        Ok(buf.len())
    }
}

#[derive(Clone)]
pub struct Sim {
    state: Arc<Mutex<SimState>>,
}

impl Sim {
    pub fn new() -> Sim {
        Sim {
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    pub fn bus(&self) -> TunerBus<MockBus> {
        let mut mock = MockBus::new();
        let s = self.state.clone();
        mock.expect_i2c_write()
            .returning(move |addr, buf| s.lock().unwrap().write(addr, buf));
        let s = self.state.clone();
        mock.expect_i2c_read()
            .returning(move |addr, buf| s.lock().unwrap().read(addr, buf));
        let s = self.state.clone();
        mock.expect_set_i2c_repeater().returning(move |on| {
            let mut state = s.lock().unwrap();
            if on && state.fail_repeater_enable {
                return Err(TransportError::Nak { addr: 0 }.into());
            }
            state.events.push(Event::Repeater(on));
            Ok(())
        });
        let s = self.state.clone();
        mock.expect_set_gpio_output().returning(move |gpio| {
            s.lock().unwrap().events.push(Event::GpioOutput(gpio));
            Ok(())
        });
        let s = self.state.clone();
        mock.expect_set_gpio_bit().returning(move |gpio, on| {
            s.lock().unwrap().events.push(Event::GpioBit(gpio, on));
            Ok(())
        });
        TunerBus::new(mock)
    }

    pub fn set_reg(&self, reg: u8, val: u8) {
        self.state.lock().unwrap().regs[reg as usize] = val;
    }

    /// Reads of `reg` return `val` no matter what was written.
    pub fn pin(&self, reg: u8, val: u8) {
        self.state.lock().unwrap().pinned.push((reg, val));
    }

    pub fn reg(&self, reg: u8) -> u8 {
        self.state.lock().unwrap().regs[reg as usize]
    }

    /// Fails the n-th (0-based) write that carries register data.
    pub fn fail_data_write(&self, n: usize) {
        self.state.lock().unwrap().fail_data_write = Some(n);
    }

    pub fn fail_reads_of(&self, reg: u8) {
        self.state.lock().unwrap().fail_reads_of.push(reg);
    }

    pub fn fail_repeater_enable(&self) {
        self.state.lock().unwrap().fail_repeater_enable = true;
    }

    pub fn data_writes(&self) -> usize {
        self.state.lock().unwrap().data_writes
    }

    pub fn clear_events(&self) {
        let mut state = self.state.lock().unwrap();
        state.events.clear();
        state.data_writes = 0;
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn repeater_toggles(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Repeater(on) => Some(on),
                _ => None,
            })
            .collect()
    }

    /// Every register byte written, in order, with auto-increment expanded.
    pub fn reg_writes(&self) -> Vec<(u8, u8)> {
        let mut out = Vec::new();
        for event in self.events() {
            if let Event::Write(_, buf) = event {
                if let Some((&reg, data)) = buf.split_first() {
                    for (i, val) in data.iter().enumerate() {
                        out.push((reg.wrapping_add(i as u8), *val));
                    }
                }
            }
        }
        out
    }

    /// Data-carrying messages as (start register, payload).
    pub fn messages(&self) -> Vec<(u8, Vec<u8>)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Write(_, buf) if buf.len() > 1 => Some((buf[0], buf[1..].to_vec())),
                _ => None,
            })
            .collect()
    }

    pub fn reads(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Read(_, reg, _) => Some(reg),
                _ => None,
            })
            .collect()
    }
}
