// RDS text segmentation
//
// PS names and buffer messages travel four characters per command. Text is
// cut into 4-byte slots, the last one padded with spaces.

use super::frame::{self, CommandFrame, FrameError};

/// PS slots the chip can hold (PSID 0x00-0x17)
pub const MAX_STATION_SLOTS: usize = 24;

/// Highest slot index a group buffer frame can carry, plus one
pub const MAX_MESSAGE_SLOTS: usize = 256;

/// Split text into space-padded 4-byte slots; `ceil(len / 4)` of them
pub fn segment(text: &str) -> Vec<[u8; 4]> {
    text.as_bytes()
        .chunks(4)
        .map(|chunk| {
            let mut slot = [b' '; 4];
            slot[..chunk.len()].copy_from_slice(chunk);
            slot
        })
        .collect()
}

/// One TX_RDS_PS frame per slot of the station name
pub fn station_frames(name: &str) -> Result<Vec<CommandFrame>, FrameError> {
    let slots = segment(name);
    if slots.len() > MAX_STATION_SLOTS {
        return Err(FrameError::TooManySlots {
            what: "station name",
            slots: slots.len(),
            max: MAX_STATION_SLOTS,
        });
    }

    Ok(slots
        .into_iter()
        .zip(0u8..)
        .map(|(chars, slot)| frame::rds_station_slot(slot, chars))
        .collect())
}

/// One TX_RDS_BUFF frame per slot of the message, first one flagged
pub fn message_frames(text: &str) -> Result<Vec<CommandFrame>, FrameError> {
    let slots = segment(text);
    if slots.len() > MAX_MESSAGE_SLOTS {
        return Err(FrameError::TooManySlots {
            what: "RDS message",
            slots: slots.len(),
            max: MAX_MESSAGE_SLOTS,
        });
    }

    Ok(slots
        .into_iter()
        .zip(0u8..=u8::MAX)
        .map(|(chars, slot)| frame::rds_message_slot(slot, slot == 0, chars))
        .collect())
}
