use crate::{Command, Error, IoWire, OpCode};
use core::fmt::Debug;
use embedded_hal::delay::DelayNs;

// Reset pulse and presence detection. Sampling starts 15 µs after release and
// runs through 75 µs; the line then stays released for 480 µs in total.
const RESET_LOW_US: u32 = 480;
const PRESENCE_WAIT_US: u32 = 15;
const PRESENCE_SAMPLES: u8 = 7;
const PRESENCE_SAMPLE_INTERVAL_US: u32 = 10;
const PRESENCE_RELEASE_US: u32 = 405;
// A presence pulse lasts at least 60 µs, so it spans several samples.
const PRESENCE_MIN_LOW_SAMPLES: u8 = 2;

// Polling for the pull-up to bring the idle line high before a reset.
const WIRE_HIGH_POLLS: u8 = 125;
const WIRE_HIGH_POLL_US: u32 = 2;

// Write slots. A 1 is released well inside the 15 µs window, a 0 is held for
// the whole slot.
const WRITE_1_LOW_US: u32 = 6;
const WRITE_1_HIGH_US: u32 = 64;
const WRITE_0_LOW_US: u32 = 65;
const WRITE_0_HIGH_US: u32 = 5;

// Read slots. The sample must land within 15 µs of the slot start.
const READ_INIT_LOW_US: u32 = 3;
const READ_SAMPLE_US: u32 = 9;
const READ_RECOVERY_US: u32 = 55;

/// Bit-banging bus master, owning the data line.
pub struct Driver<W: IoWire> {
    io_wire: W,
}

impl<E: Debug, W: IoWire<Error = E>> Driver<W> {
    pub fn new(io_wire: W) -> Self {
        Driver { io_wire }
    }

    /// Gives back the data line.
    pub fn into_inner(self) -> W {
        self.io_wire
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

    /// Addresses the only device on the bus without sending its ROM code.
    pub fn skip(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        self.write_command(delay, Command::SkipRom)?;
        Ok(())
    }

    /// Performs a reset and listens for a presence pulse
    /// Returns Err(NoPresence) if no device answered, or if the wire is held
    /// low and no reset could be issued at all
    pub fn reset(&mut self, delay: &mut impl DelayNs) -> Result<(), Error<E>> {
        self.release()?;
        if !self.wire_goes_high(delay)? {
            warn!("wire stays low, check wiring and pull-up");
            return Err(Error::NoPresence);
        }

        self.pull_low()?;
        delay.delay_us(RESET_LOW_US);

        let presence = critical_section::with(|_| -> Result<bool, E> {
            self.release()?;
            delay.delay_us(PRESENCE_WAIT_US);
            let mut low_run = 0_u8;
            let mut presence = false;
            for sample in 0..PRESENCE_SAMPLES {
                if sample > 0 {
                    delay.delay_us(PRESENCE_SAMPLE_INTERVAL_US);
                }
                low_run = if self.is_low()? { low_run + 1 } else { 0 };
                presence |= low_run >= PRESENCE_MIN_LOW_SAMPLES;
            }
            Ok(presence)
        })?;
        delay.delay_us(PRESENCE_RELEASE_US);

        if presence {
            Ok(())
        } else {
            debug!("no presence pulse after reset");
            Err(Error::NoPresence)
        }
    }

    /// Reset with the presence pulse reported as a flag instead of an error.
    pub fn reset_and_detect_presence(
        &mut self,
        delay: &mut impl DelayNs,
    ) -> Result<bool, Error<E>> {
        self.reset(delay).map(|_| true).or_else(|error| {
            if matches!(error, Error::NoPresence) {
                Ok(false)
            } else {
                Err(error)
            }
        })
    }

    fn wire_goes_high(&mut self, delay: &mut impl DelayNs) -> Result<bool, E> {
        for _ in 0..WIRE_HIGH_POLLS {
            if self.is_high()? {
                return Ok(true);
            }
            delay.delay_us(WIRE_HIGH_POLL_US);
        }
        Ok(false)
    }

    pub fn read_bytes(&mut self, delay: &mut impl DelayNs, dst: &mut [u8]) -> Result<(), E> {
        for d in dst {
            *d = self.read_byte(delay)?;
        }
        Ok(())
    }

    /// Reads eight slots, the first one lands in bit 0.
    pub fn read_byte(&mut self, delay: &mut impl DelayNs) -> Result<u8, E> {
        let mut byte = 0_u8;
        for _ in 0..8 {
            byte >>= 1;
            if self.read_bit(delay)? {
                byte |= 0x80;
            }
        }
        Ok(byte)
    }

    pub fn read_bit(&mut self, delay: &mut impl DelayNs) -> Result<bool, E> {
        let val = critical_section::with(|_| -> Result<bool, E> {
            self.pull_low()?;
            delay.delay_us(READ_INIT_LOW_US);
            self.release()?;
            delay.delay_us(READ_SAMPLE_US);
            self.is_high()
        })?;
        delay.delay_us(READ_RECOVERY_US);
        Ok(val)
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

    /// Writes eight slots, least significant bit first.
    pub fn write_byte(&mut self, delay: &mut impl DelayNs, byte: u8) -> Result<(), E> {
        let mut byte = byte;
        for _ in 0..8 {
            self.write_bit(delay, (byte & 0x01) == 0x01)?;
            byte >>= 1;
        }
        Ok(())
    }

    pub fn write_bit(&mut self, delay: &mut impl DelayNs, high: bool) -> Result<(), E> {
        critical_section::with(|_| -> Result<(), E> {
            self.pull_low()?;
            delay.delay_us(if high { WRITE_1_LOW_US } else { WRITE_0_LOW_US });
            self.release()?;
            delay.delay_us(if high { WRITE_1_HIGH_US } else { WRITE_0_HIGH_US });
            Ok(())
        })
    }

    #[inline(always)]
    pub(crate) fn release(&mut self) -> Result<(), E> {
        self.io_wire.release()
    }

    #[inline(always)]
    pub(crate) fn pull_low(&mut self) -> Result<(), E> {
        self.io_wire.pull_low()
    }

    #[inline(always)]
    pub(crate) fn is_high(&mut self) -> Result<bool, E> {
        self.io_wire.is_high()
    }

    #[inline(always)]
    pub(crate) fn is_low(&mut self) -> Result<bool, E> {
        self.io_wire.is_low()
    }
}
