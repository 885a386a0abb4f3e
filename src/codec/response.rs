// Response decoding
//
// Responses start with the status byte. Offsets follow the datasheet; bytes
// the driver has no use for are skipped, never interpreted.

use crate::core::constants::{
    ASQ_STATUS_LEN, RDS_BUFFER_STATUS_LEN, REVISION_LEN, TUNE_STATUS_LEN,
};
use crate::core::Frequency;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ResponseError {
    #[error("Malformed {response} response: expected {expected} bytes, got {actual}")]
    MalformedResponse {
        response: &'static str,
        expected: usize,
        actual: usize,
    },
}

fn check_len(response: &'static str, bytes: &[u8], expected: usize) -> Result<(), ResponseError> {
    if bytes.len() < expected {
        return Err(ResponseError::MalformedResponse {
            response,
            expected,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Result of TX_TUNE_STATUS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TuneStatus {
    pub frequency: Frequency,
    /// Output level in dBµV
    pub level: u8,
    pub antenna_capacitance: u8,
    /// Received noise level from the last TX_TUNE_MEASURE
    pub noise_level: u8,
}

/// Layout: status, resp1 (interrupt ack), freq high, freq low, resp4
/// (reserved), level, antenna capacitance, noise level
pub fn decode_tune_status(bytes: &[u8]) -> Result<TuneStatus, ResponseError> {
    check_len("tune status", bytes, TUNE_STATUS_LEN)?;
    Ok(TuneStatus {
        frequency: Frequency::from_hundredths(u16::from_be_bytes([bytes[2], bytes[3]])),
        level: bytes[5],
        antenna_capacitance: bytes[6],
        noise_level: bytes[7],
    })
}

/// Result of GET_REV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Revision {
    /// Final two digits of the part number (13 for an Si4713)
    pub part_number: u8,
    pub firmware: u16,
    pub patch: u16,
    pub component: u16,
    pub chip_revision: u8,
}

pub fn decode_revision(bytes: &[u8]) -> Result<Revision, ResponseError> {
    check_len("revision", bytes, REVISION_LEN)?;
    Ok(Revision {
        part_number: bytes[1],
        firmware: u16::from_be_bytes([bytes[2], bytes[3]]),
        patch: u16::from_be_bytes([bytes[4], bytes[5]]),
        component: u16::from_be_bytes([bytes[6], bytes[7]]),
        chip_revision: bytes[8],
    })
}

/// Result of TX_ASQ_STATUS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsqStatus {
    pub status: u8,
    /// Overmodulation and input level alarm flags
    pub signal_quality: u8,
    /// Audio input level in dBfs
    pub input_level: i8,
}

/// Layout: status, ASQ flags, two reserved bytes, input level
pub fn decode_asq_status(bytes: &[u8]) -> Result<AsqStatus, ResponseError> {
    check_len("ASQ status", bytes, ASQ_STATUS_LEN)?;
    Ok(AsqStatus {
        status: bytes[0],
        signal_quality: bytes[1],
        input_level: bytes[4] as i8,
    })
}

/// Occupancy of the RDS circular buffer and FIFO
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RdsBufferStatus {
    pub overflow: u8,
    pub circular_available: u8,
    pub circular_used: u8,
    pub fifo_available: u8,
    pub fifo_used: u8,
}

pub fn decode_rds_buffer_status(bytes: &[u8]) -> Result<RdsBufferStatus, ResponseError> {
    check_len("RDS buffer status", bytes, RDS_BUFFER_STATUS_LEN)?;
    Ok(RdsBufferStatus {
        overflow: bytes[1],
        circular_available: bytes[2],
        circular_used: bytes[3],
        fifo_available: bytes[4],
        fifo_used: bytes[5],
    })
}
