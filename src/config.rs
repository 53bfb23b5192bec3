use crate::MeasureResolution;
use fugit::MillisDurationU32;

/// Per-sensor settings. Slot and reset timings are protocol constants and
/// live in [`crate::timing`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Upper bound for the busy-wait on a running conversion
    pub conversion_timeout: MillisDurationU32,
}

impl Default for Config {
    fn default() -> Self {
        // 750ms worst case at 12 bit, plus margin
        Self::new(MillisDurationU32::from_ticks(1_000))
    }
}

impl Config {
    pub const fn new(conversion_timeout: MillisDurationU32) -> Self {
        Self { conversion_timeout }
    }

    /// Nominal conversion time of `resolution` plus 25%
    pub const fn for_resolution(resolution: MeasureResolution) -> Self {
        let nominal = resolution.time_ms() as u32;
        Self::new(MillisDurationU32::from_ticks(nominal + nominal / 4))
    }
}
