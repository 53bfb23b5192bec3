use byteorder::{ByteOrder, LittleEndian};
use embedded_hal::delay::DelayNs;

use crate::{
    ensure_correct_crc8, timing::READ_SLOT_US, Config, Driver, Error, GlobalPreemption, IoWire,
    OpCode, Preemption, Sensor,
};
use core::fmt::Debug;

#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Convert = 0x44,
    ReadScratchpad = 0xBE,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MeasureResolution {
    TC8 = 0b0001_1111,
    TC4 = 0b0011_1111,
    TC2 = 0b0101_1111,
    TC = 0b0111_1111,
}

impl MeasureResolution {
    pub const fn time_ms(&self) -> u16 {
        match self {
            MeasureResolution::TC8 => 94,
            MeasureResolution::TC4 => 188,
            MeasureResolution::TC2 => 375,
            MeasureResolution::TC => 750,
        }
    }

    pub fn from_config_register(reg: u8) -> Option<Self> {
        match reg {
            0b0001_1111 => Some(MeasureResolution::TC8),
            0b0011_1111 => Some(MeasureResolution::TC4),
            0b0101_1111 => Some(MeasureResolution::TC2),
            0b0111_1111 => Some(MeasureResolution::TC),
            _ => None,
        }
    }
}

/// °C per LSB of the temperature register
const CELSIUS_PER_LSB: f32 = 0.0625;

/// Register image of the device.
///
/// Only constructed from bytes whose trailing CRC matches, so the
/// temperature is never decoded from a torn or corrupted read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Scratchpad {
    raw: [u8; Self::BYTES],
}

impl Scratchpad {
    pub const BYTES: usize = 9;

    pub fn from_bytes<E: Debug>(raw: [u8; Self::BYTES]) -> Result<Self, Error<E>> {
        ensure_correct_crc8(&raw[..8], raw[8])?;
        Ok(Scratchpad { raw })
    }

    /// Two's complement, 4 fractional bits
    pub fn temperature_raw(&self) -> u16 {
        LittleEndian::read_u16(&self.raw[0..2])
    }

    pub fn temperature(&self) -> f32 {
        raw_to_celsius(self.temperature_raw())
    }

    /// Upper alarm trigger in whole °C
    pub fn alarm_high(&self) -> i8 {
        self.raw[2] as i8
    }

    /// Lower alarm trigger in whole °C
    pub fn alarm_low(&self) -> i8 {
        self.raw[3] as i8
    }

    pub fn resolution(&self) -> Option<MeasureResolution> {
        MeasureResolution::from_config_register(self.raw[4])
    }

    pub fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.raw
    }
}

impl From<Scratchpad> for [u8; Scratchpad::BYTES] {
    fn from(scratchpad: Scratchpad) -> Self {
        scratchpad.raw
    }
}

pub fn raw_to_celsius(temperature: u16) -> f32 {
    f32::from(temperature as i16) * CELSIUS_PER_LSB
}

/// Split raw u16 value to two parts: integer and fraction N
/// Original value may be calculated as: integer + fraction/10000
pub fn split_temp(temperature: u16) -> (i16, i16) {
    let value = i32::from(temperature as i16);
    ((value / 16) as i16, ((value % 16) * 625) as i16)
}

/// The only device on the line, always addressed with Skip-ROM.
///
/// A session is blocking from the first reset to the last scratchpad byte.
/// The line is exclusively owned, so sessions can never overlap.
pub struct Ds18b20<W: IoWire, P: Preemption = GlobalPreemption> {
    driver: Driver<W, P>,
    config: Config,
}

impl<E: Debug, W: IoWire<Error = E>> Ds18b20<W> {
    /// Takes the line and releases it into its idle state
    pub fn new(io_wire: W) -> Result<Self, Error<E>> {
        Self::with_config(io_wire, Config::default())
    }

    pub fn with_config(io_wire: W, config: Config) -> Result<Self, Error<E>> {
        Self::from_driver(Driver::new(io_wire), config)
    }
}

impl<E: Debug, W: IoWire<Error = E>, P: Preemption> Ds18b20<W, P> {
    pub fn from_driver(mut driver: Driver<W, P>, config: Config) -> Result<Self, Error<E>> {
        driver.release()?;
        Ok(Ds18b20 { driver, config })
    }

    pub fn free(self) -> Driver<W, P> {
        self.driver
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn set_config(&mut self, config: Config) {
        self.config = config;
    }

    /// Starts a conversion and polls until the device reports it finished
    pub fn convert(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        let convert = [Command::Convert.op_code()];
        self.driver.reset_skip_write_only(delay, &convert)?;
        self.wait_for_conversion(delay)
    }

    /// The device answers read slots with 0 while converting and 1 once done.
    /// Elapsed time is counted in whole read slots.
    fn wait_for_conversion(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        let budget_us = u64::from(self.config.conversion_timeout.ticks()) * 1_000;
        let mut elapsed_us = 0_u64;
        while !self.driver.read_bit(delay)? {
            elapsed_us += u64::from(READ_SLOT_US);
            if elapsed_us >= budget_us {
                log::warn!("conversion still running after {}us", elapsed_us);
                return Err(Error::ConversionTimeout);
            }
        }
        log::trace!("conversion done after {}us", elapsed_us);
        Ok(())
    }

    pub fn read_scratchpad(&mut self, delay: &mut impl DelayNs) -> Result<Scratchpad, Error<E>> {
        let mut raw = [0u8; Scratchpad::BYTES];
        self.driver.reset_skip_write_read(
            delay,
            &[Command::ReadScratchpad.op_code()],
            &mut raw,
        )?;
        Scratchpad::from_bytes(raw).inspect_err(|e| log::warn!("scratchpad rejected: {}", e))
    }

    /// Full session: convert, wait, read back and verify the scratchpad
    pub fn measure(&mut self, delay: &mut impl DelayNs) -> Result<Scratchpad, Error<E>> {
        self.convert(delay)?;
        self.read_scratchpad(delay)
    }

    pub fn read_raw(&mut self, delay: &mut impl DelayNs) -> Result<u16, Error<E>> {
        self.measure(delay).map(|scratchpad| scratchpad.temperature_raw())
    }
}

impl<E: Debug, W: IoWire<Error = E>, P: Preemption> Sensor for Ds18b20<W, P> {
    type Error = Error<E>;

    fn read_temperature(&mut self, delay: &mut impl DelayNs) -> Result<f32, Self::Error> {
        let scratchpad = self.measure(delay)?;
        log::trace!("scratchpad {:02x?}", scratchpad.as_bytes());
        Ok(scratchpad.temperature())
    }
}
