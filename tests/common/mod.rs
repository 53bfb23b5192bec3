//! A single DS18B20 on a simulated line.
//!
//! Line, delay and preemption handles share one clock that only moves when
//! the driver delays. The device decodes write slots by how long the master
//! held the line low, answers read slots by holding the line low for 30µs
//! and pulls the line low for its presence pulse 15µs to 135µs after a reset.

#![allow(dead_code)]

use core::convert::Infallible;
use std::{cell::RefCell, rc::Rc};

use embedded_hal::delay::DelayNs;
use simple_ds18b20::{IoWire, Preemption};

/// Timestamps in µs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    DriveLow(u64),
    Release(u64),
    /// Sampled level, true = high
    Sample(u64, bool),
    Delay(u64, u32),
    Mask(u64),
    Unmask(u64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Rom,
    Function,
    Converting { busy_polls: usize },
    Sending { bit: usize },
}

#[derive(Debug)]
pub struct Device {
    pub scratchpad: [u8; 9],
    /// Read slots answered with 0 before the conversion completes, `usize::MAX` never completes
    pub conversion_polls: usize,
    state: State,
    shift_in: u8,
    bits_in: u8,
}

impl Device {
    pub fn new(scratchpad: [u8; 9]) -> Self {
        Device {
            scratchpad,
            conversion_polls: 3,
            state: State::Idle,
            shift_in: 0,
            bits_in: 0,
        }
    }

    fn reset(&mut self) {
        self.state = State::Rom;
        self.shift_in = 0;
        self.bits_in = 0;
    }

    fn expects_write(&self) -> bool {
        matches!(self.state, State::Rom | State::Function)
    }

    /// Bit the device puts on the line for the read slot starting now
    fn next_read_bit(&mut self) -> Option<bool> {
        match &mut self.state {
            State::Converting { busy_polls } => {
                if *busy_polls == 0 {
                    Some(true)
                } else {
                    if *busy_polls != usize::MAX {
                        *busy_polls -= 1;
                    }
                    Some(false)
                }
            }
            State::Sending { bit } => {
                let value = self
                    .scratchpad
                    .get(*bit / 8)
                    .map_or(true, |byte| (byte >> (*bit % 8)) & 1 == 1);
                *bit += 1;
                Some(value)
            }
            _ => None,
        }
    }

    /// Returns the completed byte, if any
    fn write_bit(&mut self, bit: bool) -> Option<u8> {
        self.shift_in >>= 1;
        if bit {
            self.shift_in |= 0x80;
        }
        self.bits_in += 1;
        if self.bits_in < 8 {
            return None;
        }
        let byte = self.shift_in;
        self.shift_in = 0;
        self.bits_in = 0;
        self.state = match (self.state, byte) {
            (State::Rom, 0xCC) => State::Function,
            (State::Function, 0x44) => State::Converting {
                busy_polls: self.conversion_polls,
            },
            (State::Function, 0xBE) => State::Sending { bit: 0 },
            _ => State::Idle,
        };
        Some(byte)
    }
}

#[derive(Debug, Default)]
pub struct Bus {
    now_ns: u64,
    driven_low_since: Option<u64>,
    presence: Option<(u64, u64)>,
    device_low_until: u64,
    masked: usize,
    /// Shorted line or missing pull-up
    pub stuck_low: bool,
    pub device: Option<Device>,
    pub events: Vec<Event>,
    /// Bytes the device received
    pub received: Vec<u8>,
}

impl Bus {
    fn now_us(&self) -> u64 {
        self.now_ns / 1_000
    }

    fn is_high(&self) -> bool {
        let device_low = self
            .presence
            .is_some_and(|(from, to)| (from..to).contains(&self.now_ns))
            || self.now_ns < self.device_low_until;
        !(self.stuck_low || self.driven_low_since.is_some() || device_low)
    }

    fn drive_low(&mut self) {
        self.events.push(Event::DriveLow(self.now_us()));
        if self.driven_low_since.is_some() {
            return;
        }
        self.driven_low_since = Some(self.now_ns);
        let now = self.now_ns;
        if let Some(false) = self.device.as_mut().and_then(Device::next_read_bit) {
            self.device_low_until = now + 30_000;
        }
    }

    fn release(&mut self) {
        self.events.push(Event::Release(self.now_us()));
        let Some(since) = self.driven_low_since.take() else {
            return;
        };
        let low_ns = self.now_ns - since;
        let now = self.now_ns;
        let Some(device) = self.device.as_mut() else {
            return;
        };
        if low_ns >= 480_000 {
            device.reset();
            self.presence = Some((now + 15_000, now + 135_000));
        } else if device.expects_write() {
            if let Some(byte) = device.write_bit(low_ns < 15_000) {
                self.received.push(byte);
            }
        }
    }

    fn sample(&mut self) -> bool {
        let level = self.is_high();
        self.events.push(Event::Sample(self.now_us(), level));
        level
    }

    fn delay_ns(&mut self, ns: u64) {
        self.now_ns += ns;
    }

    /// DriveLow events that happened with preemption unmasked
    pub fn unmasked_drives(&self) -> Vec<u64> {
        let mut depth = 0_usize;
        let mut drives = Vec::new();
        for event in &self.events {
            match event {
                Event::Mask(_) => depth += 1,
                Event::Unmask(_) => depth -= 1,
                Event::DriveLow(t) if depth == 0 => drives.push(*t),
                _ => {}
            }
        }
        drives
    }

    pub fn count(&self, f: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| f(e)).count()
    }
}

pub struct Line(pub Rc<RefCell<Bus>>);

impl IoWire for Line {
    type Error = Infallible;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.0.borrow_mut().sample())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.0.borrow_mut().sample())
    }

    fn drive_low(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().drive_low();
        Ok(())
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.0.borrow_mut().release();
        Ok(())
    }
}

pub struct SimDelay(pub Rc<RefCell<Bus>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().delay_ns(u64::from(ns));
    }

    fn delay_us(&mut self, us: u32) {
        let mut bus = self.0.borrow_mut();
        let now = bus.now_us();
        bus.events.push(Event::Delay(now, us));
        bus.delay_ns(u64::from(us) * 1_000);
    }
}

pub struct SimPreemption(pub Rc<RefCell<Bus>>);

impl Preemption for SimPreemption {
    fn free<R>(&mut self, f: impl FnOnce() -> R) -> R {
        {
            let mut bus = self.0.borrow_mut();
            let now = bus.now_us();
            bus.events.push(Event::Mask(now));
            bus.masked += 1;
        }
        let r = f();
        let mut bus = self.0.borrow_mut();
        let now = bus.now_us();
        bus.masked -= 1;
        bus.events.push(Event::Unmask(now));
        r
    }
}

pub fn bus(device: Option<Device>) -> (Line, SimDelay, SimPreemption, Rc<RefCell<Bus>>) {
    let bus = Rc::new(RefCell::new(Bus {
        device,
        ..Bus::default()
    }));
    (
        Line(bus.clone()),
        SimDelay(bus.clone()),
        SimPreemption(bus.clone()),
        bus,
    )
}

/// Scratchpad with a valid CRC around the given raw temperature
pub fn scratchpad(raw: u16) -> [u8; 9] {
    let [lsb, msb] = raw.to_le_bytes();
    let mut bytes = [lsb, msb, 0x4B, 0x46, 0x7F, 0xFF, 0x0C, 0x10, 0x00];
    bytes[8] = simple_ds18b20::compute_partial_crc8(0, &bytes[..8]);
    bytes
}
