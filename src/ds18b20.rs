//! DS18B20 temperature sensor, alone on the bus.
//!
//! A reading is a full cycle: reset, `Skip ROM`, `Convert T`, a fixed wait for
//! the worst-case conversion time, reset, `Skip ROM`, `Read Scratchpad`, and a
//! CRC check over the nine returned bytes. Nothing is cached between calls.
//!
//! After power-up the temperature register holds 85 °C until the first
//! conversion completes. That value carries a valid CRC and is returned as is.

use byteorder::{ByteOrder, LittleEndian};
use core::fmt::Debug;
use core::num::NonZeroU32;
use embedded_hal::delay::DelayNs;

use crate::{ensure_correct_crc8, Driver, Error, IoWire, OpCode, Sensor};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    Convert = 0x44,
    ReadScratchpad = 0xBE,
}

impl OpCode for Command {
    fn op_code(&self) -> u8 {
        *self as _
    }
}

/// Conversion resolution, as stored in the configuration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MeasureResolution {
    TC8 = 0b0001_1111,
    TC4 = 0b0011_1111,
    TC2 = 0b0101_1111,
    TC = 0b0111_1111,
}

impl MeasureResolution {
    /// Worst-case conversion time
    pub fn time_ms(&self) -> u16 {
        match self {
            MeasureResolution::TC8 => 94,
            MeasureResolution::TC4 => 188,
            MeasureResolution::TC2 => 375,
            MeasureResolution::TC => 750,
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            MeasureResolution::TC8 => 9,
            MeasureResolution::TC4 => 10,
            MeasureResolution::TC2 => 11,
            MeasureResolution::TC => 12,
        }
    }

    /// Decodes bits R1:R0 (6:5) of the configuration register.
    pub fn from_config(config: u8) -> Self {
        match (config >> 5) & 0b11 {
            0b00 => MeasureResolution::TC8,
            0b01 => MeasureResolution::TC4,
            0b10 => MeasureResolution::TC2,
            _ => MeasureResolution::TC,
        }
    }
}

/// The nine bytes read back from the sensor, checked against their CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scratchpad([u8; Scratchpad::BYTES]);

impl Scratchpad {
    pub const BYTES: usize = 9;

    /// Accepts the transfer only if the last byte is the CRC of the first eight.
    ///
    /// An all-zero frame also passes the CRC but is what a line held low reads
    /// back, so it is rejected too.
    pub fn new<E: Debug>(bytes: [u8; Self::BYTES]) -> Result<Self, Error<E>> {
        if bytes.iter().all(|&b| b == 0) {
            warn!("scratchpad reads all zeros");
            return Err(Error::CrcMismatch {
                computed: 0,
                expected: 0,
            });
        }
        ensure_correct_crc8(&bytes[..8], bytes[8])?;
        Ok(Scratchpad(bytes))
    }

    /// Temperature in 1/16 °C
    pub fn raw_temperature(&self) -> i16 {
        LittleEndian::read_i16(&self.0[0..2])
    }

    pub fn celsius(&self) -> f32 {
        raw_to_celsius(self.raw_temperature())
    }

    /// Upper alarm trigger, whole degrees
    pub fn alarm_high(&self) -> i8 {
        self.0[2] as i8
    }

    /// Lower alarm trigger, whole degrees
    pub fn alarm_low(&self) -> i8 {
        self.0[3] as i8
    }

    pub fn resolution(&self) -> MeasureResolution {
        MeasureResolution::from_config(self.0[4])
    }

    pub fn as_bytes(&self) -> &[u8; Self::BYTES] {
        &self.0
    }
}

pub fn raw_to_celsius(raw: i16) -> f32 {
    f32::from(raw) / 16_f32
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Ds18b20;

impl Ds18b20 {
    /// Power-on resolution, never changed by this driver
    pub const RESOLUTION: MeasureResolution = MeasureResolution::TC;

    pub fn new() -> Self {
        Ds18b20
    }

    /// Triggers a conversion and returns the milliseconds to wait before the
    /// scratchpad holds the result.
    pub fn start_conversion<W: IoWire>(
        &self,
        driver: &mut Driver<W>,
        delay: &mut impl DelayNs,
    ) -> Result<u16, Error<W::Error>> {
        driver.reset_skip_write_only(delay, &[Command::Convert.op_code()])?;
        trace!("conversion started");
        Ok(Self::RESOLUTION.time_ms())
    }

    /// Polls the busy flag. Only valid directly after [`Self::start_conversion`],
    /// before any other bus traffic: the sensor answers read slots with 0 while
    /// it is converting and with 1 once done.
    pub fn conversion_done<W: IoWire>(
        &self,
        driver: &mut Driver<W>,
        delay: &mut impl DelayNs,
    ) -> Result<bool, Error<W::Error>> {
        Ok(driver.read_bit(delay)?)
    }

    pub fn read_scratchpad<W: IoWire>(
        &self,
        driver: &mut Driver<W>,
        delay: &mut impl DelayNs,
    ) -> Result<Scratchpad, Error<W::Error>> {
        let mut scratchpad = [0u8; Scratchpad::BYTES];
        driver.reset_skip_write_read(
            delay,
            &[Command::ReadScratchpad.op_code()],
            &mut scratchpad[..],
        )?;
        Scratchpad::new(scratchpad)
    }

    /// Runs a complete conversion cycle, blocking for the conversion time.
    ///
    /// Fails with [`Error::NoPresence`] if either reset goes unanswered and with
    /// [`Error::CrcMismatch`] if the scratchpad arrived corrupted. Both mean the
    /// reading is unavailable this cycle; the whole cycle has to be repeated.
    pub fn read_temperature<W: IoWire>(
        &self,
        driver: &mut Driver<W>,
        delay: &mut impl DelayNs,
    ) -> Result<f32, Error<W::Error>> {
        let wait_ms = self.start_conversion(driver, delay)?;
        delay.delay_ms(u32::from(wait_ms));
        Ok(self.read_scratchpad(driver, delay)?.celsius())
    }

    /// Repeats [`Self::read_temperature`] until it succeeds.
    ///
    /// With `max_attempts` set, gives up after that many cycles and returns the
    /// last failure. Pin errors are returned right away.
    pub fn read_temperature_retrying<W: IoWire>(
        &self,
        driver: &mut Driver<W>,
        delay: &mut impl DelayNs,
        max_attempts: Option<NonZeroU32>,
    ) -> Result<f32, Error<W::Error>> {
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match self.read_temperature(driver, delay) {
                Ok(celsius) => return Ok(celsius),
                Err(Error::PortError(e)) => return Err(Error::PortError(e)),
                Err(error) => {
                    if max_attempts.map_or(false, |max| attempt >= max.get()) {
                        return Err(error);
                    }
                    debug!("temperature unavailable, attempt {=u32}", attempt);
                }
            }
        }
    }
}

impl Sensor for Ds18b20 {
    fn start_measurement<W: IoWire>(
        &self,
        driver: &mut Driver<W>,
        delay: &mut impl DelayNs,
    ) -> Result<u16, Error<W::Error>> {
        self.start_conversion(driver, delay)
    }

    fn read_measurement<W: IoWire>(
        &self,
        driver: &mut Driver<W>,
        delay: &mut impl DelayNs,
    ) -> Result<f32, Error<W::Error>> {
        self.read_measurement_raw(driver, delay).map(raw_to_celsius)
    }

    fn read_measurement_raw<W: IoWire>(
        &self,
        driver: &mut Driver<W>,
        delay: &mut impl DelayNs,
    ) -> Result<i16, Error<W::Error>> {
        Ok(self.read_scratchpad(driver, delay)?.raw_temperature())
    }
}

/// Split raw value to two parts: integer and fraction N
/// Original value may be calculated as: integer + fraction/10000
pub fn split_temp(raw: i16) -> (i16, i16) {
    let abs = raw.unsigned_abs();
    let integer = (abs >> 4) as i16;
    let fraction = (abs & 0xF) as i16 * 625;
    if raw < 0 {
        (-integer, -fraction)
    } else {
        (integer, fraction)
    }
}
