#![cfg_attr(not(test), no_std)]
#![doc = include_str!("../README.md")]

#[macro_use]
mod fmt;

mod command;
mod crc;
mod driver;
#[cfg(feature = "ds18b20")]
pub mod ds18b20;
mod iowire;
mod result;
#[cfg(feature = "ds18b20")]
mod sensor;

pub use command::{Command, OpCode};
pub use crc::{check_crc8, compute_partial_crc8, crc8, ensure_correct_crc8};
pub use driver::Driver;
pub use iowire::IoWire;
pub use result::Error;
#[cfg(feature = "ds18b20")]
pub use sensor::Sensor;
