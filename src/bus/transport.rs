// Bus transport contract consumed by the controller
//
// The controller never talks to hardware directly. A connector opens a
// byte-oriented connection to a 7-bit address on a numbered bus, and may
// additionally drive named digital output pins (needed for the reset line).

use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BusError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot open bus {bus} at address {address:#04X}: {reason}")]
    Open { address: u8, bus: u8, reason: String },

    #[error("Digital output is not supported by this transport")]
    Unsupported,

    #[error("Connection closed")]
    Closed,

    #[error("Bus error: {0}")]
    Other(String),
}

pub type BusResult<T> = std::result::Result<T, BusError>;

/// Level driven onto a digital output pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinLevel {
    Low,
    High,
}

impl From<bool> for PinLevel {
    fn from(high: bool) -> Self {
        if high {
            PinLevel::High
        } else {
            PinLevel::Low
        }
    }
}

/// An open connection to one device on the bus
pub trait BusConnection {
    /// Write the whole buffer as one transaction
    async fn write(&mut self, bytes: &[u8]) -> BusResult<()>;

    /// Read a single byte
    async fn read_byte(&mut self) -> BusResult<u8>;

    /// Read into `buf` and return the count read. Implementations either fill
    /// the buffer or fail; the controller treats anything shorter as fatal.
    async fn read(&mut self, buf: &mut [u8]) -> BusResult<usize>;
}

/// Opens connections and, optionally, drives digital pins
pub trait BusConnector {
    type Connection: BusConnection;

    /// Bus used when the configuration names none
    fn default_bus(&self) -> u8;

    /// Whether `digital_write` is available. Checked once, when the
    /// controller is built.
    fn supports_digital_output(&self) -> bool;

    async fn connect(&mut self, address: u8, bus: u8) -> BusResult<Self::Connection>;

    async fn digital_write(&mut self, pin: &str, level: PinLevel) -> BusResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_level_from_bool() {
        assert_eq!(PinLevel::from(true), PinLevel::High);
        assert_eq!(PinLevel::from(false), PinLevel::Low);
    }

    #[test]
    fn test_error_display() {
        let err = BusError::Open {
            address: 0x63,
            bus: 1,
            reason: "no such device".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot open bus 1 at address 0x63: no such device"
        );
    }
}
