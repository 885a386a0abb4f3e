// Command frame encoding
//
// Every command is built fresh from its typed arguments; the layout of each
// opcode is fixed and checked when a frame is constructed from raw bytes.

use crate::core::constants::cmd;
use crate::core::Frequency;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("Unknown opcode {0:#04X}")]
    UnknownOpcode(u8),

    #[error("Opcode {opcode:#04X} needs {expected} bytes, got {actual}")]
    WrongLength {
        opcode: u8,
        expected: usize,
        actual: usize,
    },

    #[error("Empty frame")]
    Empty,

    #[error("{what} needs {slots} slots, at most {max} are addressable")]
    TooManySlots {
        what: &'static str,
        slots: usize,
        max: usize,
    },
}

/// Wire length of every frame the driver sends, by opcode
pub fn frame_len(opcode: u8) -> Option<usize> {
    Some(match opcode {
        cmd::POWER_UP => 3,
        cmd::POWER_DOWN => 2,
        cmd::GET_REV => 2,
        cmd::SET_PROPERTY => 6,
        cmd::GET_INT_STATUS => 1,
        cmd::TX_TUNE_FREQ => 4,
        cmd::TX_TUNE_POWER => 5,
        cmd::TX_TUNE_MEASURE => 5,
        cmd::TX_TUNE_STATUS => 2,
        cmd::TX_ASQ_STATUS => 2,
        cmd::TX_RDS_BUFF => 8,
        cmd::TX_RDS_PS => 6,
        cmd::GPO_CTL => 2,
        cmd::GPO_SET => 2,
        _ => return None,
    })
}

/// One command as it goes on the wire: opcode followed by its arguments
#[derive(Clone, PartialEq, Eq)]
pub struct CommandFrame(Vec<u8>);

impl CommandFrame {
    /// Check raw bytes against the opcode's layout
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        let opcode = *bytes.first().ok_or(FrameError::Empty)?;
        let expected = frame_len(opcode).ok_or(FrameError::UnknownOpcode(opcode))?;
        if bytes.len() != expected {
            return Err(FrameError::WrongLength {
                opcode,
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    fn fixed<const N: usize>(bytes: [u8; N]) -> Self {
        debug_assert_eq!(frame_len(bytes[0]), Some(N));
        Self(bytes.to_vec())
    }

    pub fn opcode(&self) -> u8 {
        self.0[0]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The chip stops answering the CTS protocol after this one
    pub fn is_power_down(&self) -> bool {
        self.opcode() == cmd::POWER_DOWN
    }
}

impl AsRef<[u8]> for CommandFrame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CommandFrame({:02X?})", self.0)
    }
}

impl fmt::Display for CommandFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, byte) in self.0.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "[{}]=0x{:02x}({})", idx, byte, byte)?;
        }
        Ok(())
    }
}

/// FM transmit, crystal oscillator on, analog audio input
pub fn power_up() -> CommandFrame {
    CommandFrame::fixed([cmd::POWER_UP, 0x12, 0x50])
}

pub fn power_down() -> CommandFrame {
    CommandFrame::fixed([cmd::POWER_DOWN, 0x00])
}

pub fn get_revision() -> CommandFrame {
    CommandFrame::fixed([cmd::GET_REV, 0x00])
}

pub fn get_int_status() -> CommandFrame {
    CommandFrame::fixed([cmd::GET_INT_STATUS])
}

pub fn tune(freq: Frequency) -> CommandFrame {
    CommandFrame::fixed([cmd::TX_TUNE_FREQ, 0x00, freq.high_byte(), freq.low_byte()])
}

/// Status of the last tune/power/measure command, acknowledging its interrupt
pub fn tune_status() -> CommandFrame {
    CommandFrame::fixed([cmd::TX_TUNE_STATUS, 0x01])
}

/// Noise measurement; the chip only measures on 50 kHz boundaries
pub fn tune_measure(freq: Frequency) -> CommandFrame {
    let freq = freq.round_down_to_50khz();
    CommandFrame::fixed([
        cmd::TX_TUNE_MEASURE,
        0x00,
        freq.high_byte(),
        freq.low_byte(),
        0x00,
    ])
}

pub fn set_power(level: u8, antenna_capacitance: u8) -> CommandFrame {
    CommandFrame::fixed([cmd::TX_TUNE_POWER, 0x00, 0x00, level, antenna_capacitance])
}

pub fn set_property(property: u16, value: u16) -> CommandFrame {
    let [ph, pl] = property.to_be_bytes();
    let [vh, vl] = value.to_be_bytes();
    CommandFrame::fixed([cmd::SET_PROPERTY, 0x00, ph, pl, vh, vl])
}

pub fn rds_station_slot(slot: u8, chars: [u8; 4]) -> CommandFrame {
    let [a, b, c, d] = chars;
    CommandFrame::fixed([cmd::TX_RDS_PS, slot, a, b, c, d])
}

/// Group buffer load; the first slot of a message carries the start flag
pub fn rds_message_slot(slot: u8, is_first: bool, chars: [u8; 4]) -> CommandFrame {
    let kind = if is_first { 0x06 } else { 0x04 };
    let [a, b, c, d] = chars;
    CommandFrame::fixed([cmd::TX_RDS_BUFF, kind, 0x20, slot, a, b, c, d])
}

/// Clock-time group with a fixed payload
pub fn rds_time() -> CommandFrame {
    CommandFrame::fixed([cmd::TX_RDS_BUFF, 0x84, 0x40, 0x01, 0xA7, 0x0B, 0x2D, 0x6C])
}

/// Group buffer query: acknowledge interrupts, load nothing
pub fn rds_buffer_status() -> CommandFrame {
    CommandFrame::fixed([cmd::TX_RDS_BUFF, 0x01, 0, 0, 0, 0, 0, 0])
}

/// Configure the masked GPO pins as outputs
pub fn gpio_control(mask: u8) -> CommandFrame {
    CommandFrame::fixed([cmd::GPO_CTL, mask])
}

/// Drive the masked GPO pins high, the rest low
pub fn gpio_set(mask: u8) -> CommandFrame {
    CommandFrame::fixed([cmd::GPO_SET, mask])
}

pub fn asq_status() -> CommandFrame {
    CommandFrame::fixed([cmd::TX_ASQ_STATUS, 0x01])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_frames() {
        assert_eq!(power_up().as_bytes(), &[0x01, 0x12, 0x50]);
        assert_eq!(power_down().as_bytes(), &[0x11, 0x00]);
        assert_eq!(get_revision().as_bytes(), &[0x10, 0x00]);
        assert_eq!(tune_status().as_bytes(), &[0x33, 0x01]);
        assert_eq!(asq_status().as_bytes(), &[0x34, 0x01]);
        assert_eq!(get_int_status().as_bytes(), &[0x14]);
        assert!(power_down().is_power_down());
        assert!(!power_up().is_power_down());
    }

    #[test]
    fn test_tune() {
        let frame = tune(Frequency::from_hundredths(9550));
        assert_eq!(frame.as_bytes(), &[0x30, 0x00, 0x25, 0x4E]);

        let frame = tune(Frequency::from_hundredths(10800));
        assert_eq!(frame.as_bytes(), &[0x30, 0x00, 0x2A, 0x30]);
    }

    #[test]
    fn test_tune_measure_rounds_down() {
        let frame = tune_measure(Frequency::from_hundredths(9553));
        assert_eq!(frame.as_bytes(), &[0x32, 0x00, 0x25, 0x4E, 0x00]);

        let frame = tune_measure(Frequency::from_hundredths(8750));
        assert_eq!(frame.as_bytes(), &[0x32, 0x00, 0x22, 0x2E, 0x00]);
    }

    #[test]
    fn test_set_power_and_property() {
        assert_eq!(set_power(115, 0).as_bytes(), &[0x31, 0, 0, 115, 0]);
        assert_eq!(set_power(88, 7).as_bytes(), &[0x31, 0, 0, 88, 7]);

        assert_eq!(
            set_property(0x0201, 32768).as_bytes(),
            &[0x12, 0x00, 0x02, 0x01, 0x80, 0x00]
        );
        assert_eq!(
            set_property(0x2C01, 0x3104).as_bytes(),
            &[0x12, 0x00, 0x2C, 0x01, 0x31, 0x04]
        );
    }

    #[test]
    fn test_rds_frames() {
        assert_eq!(
            rds_station_slot(1, *b"WXYZ").as_bytes(),
            &[0x36, 0x01, b'W', b'X', b'Y', b'Z']
        );
        assert_eq!(
            rds_message_slot(0, true, *b"Hell").as_bytes(),
            &[0x35, 0x06, 0x20, 0x00, b'H', b'e', b'l', b'l']
        );
        assert_eq!(rds_message_slot(3, false, *b"o   ").as_bytes()[1], 0x04);
        assert_eq!(rds_message_slot(3, false, *b"o   ").as_bytes()[3], 3);
        assert_eq!(
            rds_time().as_bytes(),
            &[0x35, 0x84, 0x40, 0x01, 0xA7, 0x0B, 0x2D, 0x6C]
        );
        assert_eq!(rds_buffer_status().len(), 8);
    }

    #[test]
    fn test_gpio() {
        assert_eq!(gpio_control(0x06).as_bytes(), &[0x80, 0x06]);
        assert_eq!(gpio_set(0x02).as_bytes(), &[0x81, 0x02]);
    }

    #[test]
    fn test_from_bytes_checks_layout() {
        assert!(CommandFrame::from_bytes(&[0x30, 0x00, 0x25, 0x4E]).is_ok());
        assert_eq!(
            CommandFrame::from_bytes(&[0x30, 0x00, 0x25]),
            Err(FrameError::WrongLength {
                opcode: 0x30,
                expected: 4,
                actual: 3
            })
        );
        assert_eq!(
            CommandFrame::from_bytes(&[0x99]),
            Err(FrameError::UnknownOpcode(0x99))
        );
        assert_eq!(CommandFrame::from_bytes(&[]), Err(FrameError::Empty));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            gpio_set(0x02).to_string(),
            "[0]=0x81(129) [1]=0x02(2)"
        );
    }
}
