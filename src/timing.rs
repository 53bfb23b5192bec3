//! Slot and handshake durations in microseconds.
//!
//! A device samples a write slot 15µs to 60µs after the master pulls the
//! line low, so a written 1 must be released well before 15µs and a
//! written 0 held past 60µs. In a read slot the device's answer is only
//! valid for 15µs after the falling edge, the master samples just before.

/// Polls of the idle line before the link is declared faulty
pub const IDLE_RETRIES: u8 = 60;
pub const IDLE_RETRY_US: u32 = 4;

pub const RESET_LOW_US: u32 = 480;
/// Release to presence sample. Devices answer 15µs to 60µs after the release
/// and hold the line low for 60µs to 240µs.
pub const PRESENCE_WAIT_US: u32 = 70;
/// Presence sample to the end of the 480µs receive window
pub const RESET_RECOVERY_US: u32 = 410;

pub const WRITE_1_LOW_US: u32 = 10;
pub const WRITE_1_RELEASE_US: u32 = 60;
pub const WRITE_0_LOW_US: u32 = 65;
pub const WRITE_0_RELEASE_US: u32 = 5;

/// Gap to the previous slot
pub const READ_RECOVERY_US: u32 = 1;
pub const READ_INIT_LOW_US: u32 = 2;
/// Release to sample, ~11µs after the slot started
pub const READ_SAMPLE_US: u32 = 9;
pub const READ_RELEASE_US: u32 = 48;
pub const READ_SLOT_US: u32 =
    READ_RECOVERY_US + READ_INIT_LOW_US + READ_SAMPLE_US + READ_RELEASE_US;
