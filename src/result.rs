use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// Error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: Sized + Debug> {
    /// Line never read high before the reset, usually a missing pull-up or a short
    LinkFault,
    /// No presence pulse after the reset
    NoPresence,
    /// Scratchpad checksum mismatch: (computed, received)
    CrcMismatch(u8, u8),
    /// The device did not finish its conversion within the configured bound
    ConversionTimeout,
    PortError(E),
}

impl<E: Sized + Debug> Error<E> {
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::LinkFault => "Line not high",
            Error::NoPresence => "No presence pulse",
            Error::CrcMismatch(..) => "CRC mismatch",
            Error::ConversionTimeout => "Conversion timeout",
            Error::PortError(_) => "Pin error",
        }
    }
}

impl<E: Sized + Debug> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Error::CrcMismatch(computed, received) => write!(
                f,
                "{} (computed {:#04x}, received {:#04x})",
                self.as_str(),
                computed,
                received
            ),
            Error::PortError(e) => write!(f, "{}: {:?}", self.as_str(), e),
            _ => f.write_str(self.as_str()),
        }
    }
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::PortError(e)
    }
}
