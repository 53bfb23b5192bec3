use crate::DEVICE_DISCONNECTED_C;
use embedded_hal::delay::DelayNs;

pub trait Sensor {
    type Error;

    /// Runs one complete measurement and returns the value in °C
    fn read_temperature(&mut self, delay: &mut impl DelayNs) -> Result<f32, Self::Error>;

    /// Same as [`Sensor::read_temperature`], but every failure reads as
    /// [`DEVICE_DISCONNECTED_C`]
    fn read_temperature_celsius(&mut self, delay: &mut impl DelayNs) -> f32 {
        self.read_temperature(delay).unwrap_or(DEVICE_DISCONNECTED_C)
    }
}
