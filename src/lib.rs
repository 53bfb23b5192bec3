#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

mod command;
mod config;
mod driver;
pub mod ds18b20;
mod iowire;
mod preemption;
mod result;
mod sensor;
pub mod timing;

use core::fmt::Debug;

pub use command::{Command, OpCode};
pub use config::Config;
pub use driver::Driver;
pub use ds18b20::{Ds18b20, MeasureResolution, Scratchpad};
pub use iowire::{Inverted, IoWire};
pub use preemption::{GlobalPreemption, Preemption, Unmasked};
pub use result::Error;
pub use sensor::Sensor;

/// Reading reported by [`Sensor::read_temperature_celsius`] when the
/// measurement failed for any reason
pub const DEVICE_DISCONNECTED_C: f32 = -127.0;

/// CRC-8/MAXIM (reflected polynomial 0x8C), continuing from `crc`
pub fn compute_partial_crc8(crc: u8, data: &[u8]) -> u8 {
    let mut crc = crc;
    for byte in data.iter() {
        let mut byte = *byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0x00 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

/// Fails with [`Error::CrcMismatch`] unless the CRC of `data` equals `crc8`
pub fn ensure_correct_crc8<E: Debug>(data: &[u8], crc8: u8) -> Result<(), Error<E>> {
    let computed = compute_partial_crc8(0, data);
    if computed != crc8 {
        Err(Error::CrcMismatch(computed, crc8))
    } else {
        Ok(())
    }
}
