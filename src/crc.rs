//! Dallas/Maxim CRC-8 (x^8 + x^5 + x^4 + 1, reflected, initial value 0).

use crate::Error;
use core::fmt::Debug;

/// Continues a CRC-8 computation from `crc` over `data`.
pub fn compute_partial_crc8(crc: u8, data: &[u8]) -> u8 {
    let mut crc = crc;
    for byte in data.iter() {
        let mut byte = *byte;
        for _ in 0..8 {
            let mix = (crc ^ byte) & 0x01;
            crc >>= 1;
            if mix != 0x00 {
                crc ^= 0x8C;
            }
            byte >>= 1;
        }
    }
    crc
}

pub fn crc8(data: &[u8]) -> u8 {
    compute_partial_crc8(0, data)
}

/// Checks a sequence whose last byte is the CRC of the preceding bytes.
///
/// Running the CRC over data and its own check byte leaves a zero residue.
pub fn check_crc8(sequence: &[u8]) -> bool {
    !sequence.is_empty() && crc8(sequence) == 0
}

pub fn ensure_correct_crc8<E: Debug>(data: &[u8], expected: u8) -> Result<(), Error<E>> {
    let computed = crc8(data);
    if computed != expected {
        warn!("crc mismatch: computed {=u8:#x}, expected {=u8:#x}", computed, expected);
        Err(Error::CrcMismatch { computed, expected })
    } else {
        Ok(())
    }
}
