use embedded_hal::digital::{Error, ErrorType, InputPin, OutputPin};

/// The single data line of the bus.
///
/// The line is open-drain: it is either pulled low by the master or released,
/// in which case the pull-up resistor (or a slave) decides its level.
pub trait IoWire {
    type Error: Error;

    /// Is the line high?
    fn is_high(&mut self) -> Result<bool, Self::Error>;

    /// Is the line low?
    fn is_low(&mut self) -> Result<bool, Self::Error>;

    /// Drives the line low
    fn pull_low(&mut self) -> Result<(), Self::Error>;

    /// Stops driving the line and lets it float high
    ///
    /// *NOTE* the line only reads high if no slave holds it low at the same time
    fn release(&mut self) -> Result<(), Self::Error>;
}

/// Single open-drain pin, used both to drive and to sense the line
impl<IO> IoWire for (IO,)
where
    IO: ErrorType + OutputPin + InputPin,
{
    type Error = IO::Error;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn pull_low(&mut self) -> Result<(), Self::Error> {
        self.0.set_low()
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.0.set_high()
    }
}

/// Separate sense and drive pins wired to the same line
impl<E, I, O> IoWire for (I, O)
where
    E: Error,
    I: ErrorType<Error = E> + InputPin,
    O: ErrorType<Error = E> + OutputPin,
{
    type Error = E;

    fn is_high(&mut self) -> Result<bool, Self::Error> {
        self.0.is_high()
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        self.0.is_low()
    }

    fn pull_low(&mut self) -> Result<(), Self::Error> {
        self.1.set_low()
    }

    fn release(&mut self) -> Result<(), Self::Error> {
        self.1.set_high()
    }
}
