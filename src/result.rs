use core::fmt::{Debug, Display, Formatter, Result as FmtResult};

/// Error type
#[derive(Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E: Sized + Debug> {
    /// No presence on wire, or wire held low
    NoPresence,
    /// Scratchpad transfer corrupted
    CrcMismatch { computed: u8, expected: u8 },
    PortError(E),
}

impl<E: Sized + Debug> From<E> for Error<E> {
    fn from(e: E) -> Self {
        Error::PortError(e)
    }
}

impl<E: Sized + Debug> Display for Error<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Error::NoPresence => f.write_str("no presence pulse on reset"),
            Error::CrcMismatch { computed, expected } => write!(
                f,
                "crc mismatch: computed {:#04x}, expected {:#04x}",
                computed, expected
            ),
            Error::PortError(e) => write!(f, "pin error: {:?}", e),
        }
    }
}
