pub trait OpCode {
    fn op_code(&self) -> u8;
}

/// ROM commands. Only the single-drop selection is supported, the bus
/// is expected to carry exactly one device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
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
