// Command codec: pure encoding of command frames and decoding of responses
pub mod frame;
pub mod rds;
pub mod response;

pub use frame::{frame_len, CommandFrame, FrameError};
pub use rds::{message_frames, segment, station_frames};
pub use response::{
    decode_asq_status, decode_rds_buffer_status, decode_revision, decode_tune_status, AsqStatus,
    RdsBufferStatus, ResponseError, Revision, TuneStatus,
};
