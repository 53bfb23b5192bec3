pub trait OpCode {
    fn op_code(&self) -> u8;
}

/// ROM level commands. Only the broadcast is supported, the bus is
/// expected to carry exactly one device.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    SkipRom = 0xCC,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}
