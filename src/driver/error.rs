// Controller error taxonomy

use crate::bus::BusError;
use crate::codec::{FrameError, ResponseError};
use crate::core::ConfigError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("Cannot connect to the transmitter: {0}")]
    Connection(BusError),

    #[error("Bus transport lacks a required capability: {0}")]
    CapabilityMissing(&'static str),

    #[error("Couldn't find radio: part number Si47{0:02}, expected Si4713")]
    DeviceNotFound(u8),

    #[error("Failed to read {expected} bytes from the line, read {actual}")]
    ShortRead { expected: usize, actual: usize },

    #[error("Bus error: {0}")]
    Bus(#[from] BusError),

    #[error("Timed out waiting for {operation} after {attempts} polls")]
    Timeout {
        operation: &'static str,
        attempts: u32,
    },

    #[error("Invalid command: {0}")]
    Frame(#[from] FrameError),

    #[error("Transmitter is not started")]
    NotConnected,
}

impl From<ResponseError> for DriverError {
    fn from(err: ResponseError) -> Self {
        match err {
            ResponseError::MalformedResponse {
                expected, actual, ..
            } => DriverError::ShortRead { expected, actual },
        }
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_response_becomes_short_read() {
        let err: DriverError = ResponseError::MalformedResponse {
            response: "revision",
            expected: 9,
            actual: 4,
        }
        .into();
        assert!(matches!(
            err,
            DriverError::ShortRead {
                expected: 9,
                actual: 4
            }
        ));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            DriverError::DeviceNotFound(21).to_string(),
            "Couldn't find radio: part number Si4721, expected Si4713"
        );
        assert_eq!(
            DriverError::ShortRead {
                expected: 9,
                actual: 1
            }
            .to_string(),
            "Failed to read 9 bytes from the line, read 1"
        );
    }
}
