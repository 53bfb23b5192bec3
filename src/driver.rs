use crate::{timing::*, Command, Error, GlobalPreemption, IoWire, OpCode, Preemption};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

/// Bit-banged bus master owning the line
pub struct Driver<W: IoWire, P: Preemption = GlobalPreemption> {
    io_wire: W,
    preemption: P,
}

impl<E: Debug, W: IoWire<Error = E>> Driver<W> {
    pub fn new(io_wire: W) -> Self {
        Self::with_preemption(io_wire, GlobalPreemption)
    }
}

impl<E: Debug, W: IoWire<Error = E>, P: Preemption> Driver<W, P> {
    pub fn with_preemption(io_wire: W, preemption: P) -> Self {
        Driver {
            io_wire,
            preemption,
        }
    }

    /// Gives the line and the preemption handle back
    pub fn into_inner(self) -> (W, P) {
        (self.io_wire, self.preemption)
    }

    pub fn reset_skip_write_only(
        &mut self,
        delay: &mut impl DelayNs,
        write: &[u8],
    ) -> Result<(), Error<E>> {
        self.reset(delay)?;
        self.skip(delay)?;
        self.write_bytes(delay, write)?;
        Ok(())
    }

    pub fn reset_skip_write_read(
        &mut self,
        delay: &mut impl DelayNs,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Error<E>> {
        self.reset(delay)?;
        self.skip(delay)?;
        self.write_bytes(delay, write)?;
        self.read_bytes(delay, read)?;
        Ok(())
    }

    pub fn skip(&mut self, delay: &mut impl DelayNs) -> Result<(), E> {
        self.write_command(delay, Command::SkipRom)
    }

    /// Performs a reset and listens for a presence pulse
    /// Returns Err(LinkFault) if the line never reads high beforehand,
    /// Err(NoPresence) if no device pulled the line low in response.
    ///
    /// Always waits out the device's recovery window before returning,
    /// also when no device answered.
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        self.release()?;
        self.ensure_wire_high(delay)?;

        // a stretched reset pulse is harmless, only the presence window is timed
        self.io_wire.drive_low()?;
        delay.delay_us(RESET_LOW_US);

        let Self {
            io_wire,
            preemption,
        } = self;
        let presence = preemption.free(|| -> Result<bool, E> {
            io_wire.release()?;
            delay.delay_us(PRESENCE_WAIT_US);
            io_wire.is_low()
        });
        // the device's recovery window applies even when the sample failed
        delay.delay_us(RESET_RECOVERY_US);

        if presence? {
            Ok(())
        } else {
            log::debug!("no presence pulse after reset");
            Err(Error::NoPresence)
        }
    }

    pub fn reset_presence(&mut self, delay: &mut impl DelayNs) -> Result<bool, Error<E>> {
        self.reset(delay).map(|_| true).or_else(|error| {
            if matches!(error, Error::NoPresence) {
                Ok(false)
            } else {
                Err(error)
            }
        })
    }

    fn ensure_wire_high(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        for _ in 0..IDLE_RETRIES {
            if self.io_wire.is_high()? {
                return Ok(());
            }
            delay.delay_us(IDLE_RETRY_US);
        }
        log::debug!("line stuck low, check the pull-up");
        Err(Error::LinkFault)
    }

    /// Releases the line into its idle state
    pub fn release(&mut self) -> Result<(), E> {
        self.io_wire.release()
    }

    pub fn read_bytes(&mut self, delay: &mut impl DelayNs, dst: &mut [u8]) -> Result<(), E> {
        for d in dst {
            *d = self.read_byte(delay)?;
        }
        Ok(())
    }

    /// Reads 8 slots, LSB first, without re-enabling preemption in between
    pub fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, E> {
        let Self {
            io_wire,
            preemption,
        } = self;
        preemption.free(|| -> Result<u8, E> {
            let mut byte = 0_u8;
            for _ in 0..8 {
                byte >>= 1;
                if read_slot(io_wire, delay)? {
                    byte |= 0x80;
                }
            }
            Ok(byte)
        })
    }

    pub fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, E> {
        let Self {
            io_wire,
            preemption,
        } = self;
        preemption.free(|| read_slot(io_wire, delay))
    }

    pub fn write_command(&mut self, delay: &mut impl DelayNs, cmd: impl OpCode) -> Result<(), E> {
        self.write_byte(delay, cmd.op_code())
    }

    pub fn write_bytes(&mut self, delay: &mut impl DelayNs, bytes: &[u8]) -> Result<(), E> {
        for b in bytes {
            self.write_byte(delay, *b)?;
        }
        Ok(())
    }

    pub fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<(), E> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(delay, (byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        Ok(())
    }

    pub fn write_bit(&mut self, delay: &mut impl DelayNs, high: bool) -> Result<(), E> {
        let Self {
            io_wire,
            preemption,
        } = self;
        preemption.free(|| write_slot(io_wire, delay, high))
    }
}

fn write_slot<W: IoWire>(
    io_wire: &mut W,
    delay: &mut impl DelayNs,
    high: bool,
) -> Result<(), W::Error> {
    io_wire.drive_low()?;
    delay.delay_us(if high { WRITE_1_LOW_US } else { WRITE_0_LOW_US });
    io_wire.release()?;
    delay.delay_us(if high {
        WRITE_1_RELEASE_US
    } else {
        WRITE_0_RELEASE_US
    });
    Ok(())
}

fn read_slot<W: IoWire>(io_wire: &mut W, delay: &mut impl DelayNs) -> Result<bool, W::Error> {
    delay.delay_us(READ_RECOVERY_US);
    io_wire.drive_low()?;
    delay.delay_us(READ_INIT_LOW_US);
    io_wire.release()?;
    delay.delay_us(READ_SAMPLE_US);
    let val = io_wire.is_high()?;
    delay.delay_us(READ_RELEASE_US);
    Ok(val)
}
