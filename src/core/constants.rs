// Si4713 command set, property addresses and device constants
// Reference: Si4712/13-B30 datasheet, AN332 programming guide

/// Bus address when the SEN strap is high
pub const ADDRESS: u8 = 0x63;

/// Bus address when the SEN strap is low
pub const ALTERNATE_ADDRESS: u8 = 0x11;

/// Part number reported by GET_REV for an Si4713
pub const PART_NUMBER: u8 = 13;

/// Default RDS program identifier
pub const DEFAULT_RDS_PROGRAM_ID: u16 = 0x3104;

/// Default reset pin
pub const DEFAULT_RESET_PIN: &str = "29";

/// Default device name
pub const DEFAULT_NAME: &str = "Si4713";

/// Legal FM transmit band, in hundredths of MHz
pub const MIN_FREQUENCY: u16 = 8750;
pub const MAX_FREQUENCY: u16 = 10800;

/// Step used by the noise scan (0.10 MHz)
pub const SCAN_STEP: u16 = 10;

/// Transmit power range in dBµV
pub const MIN_TX_POWER: u8 = 88;
pub const MAX_TX_POWER: u8 = 115;

/// Status byte bits
pub mod status {
    /// Clear-to-send
    pub const CTS: u8 = 0x80;
    /// Seek/tune complete interrupt
    pub const STC_INT: u8 = 0x01;
    /// Tune complete and ready for the next command
    pub const TUNE_COMPLETE: u8 = CTS | STC_INT;
}

/// Command opcodes
pub mod cmd {
    pub const POWER_UP: u8 = 0x01;
    pub const GET_REV: u8 = 0x10;
    pub const POWER_DOWN: u8 = 0x11;
    pub const SET_PROPERTY: u8 = 0x12;
    pub const GET_INT_STATUS: u8 = 0x14;
    pub const TX_TUNE_FREQ: u8 = 0x30;
    pub const TX_TUNE_POWER: u8 = 0x31;
    pub const TX_TUNE_MEASURE: u8 = 0x32;
    pub const TX_TUNE_STATUS: u8 = 0x33;
    pub const TX_ASQ_STATUS: u8 = 0x34;
    pub const TX_RDS_BUFF: u8 = 0x35;
    pub const TX_RDS_PS: u8 = 0x36;
    pub const GPO_CTL: u8 = 0x80;
    pub const GPO_SET: u8 = 0x81;
}

/// Property addresses
pub mod prop {
    pub const REFCLK_FREQ: u16 = 0x0201;
    pub const TX_COMPONENT_ENABLE: u16 = 0x2100;
    pub const TX_AUDIO_DEVIATION: u16 = 0x2101;
    pub const TX_RDS_DEVIATION: u16 = 0x2103;
    pub const TX_PREEMPHASIS: u16 = 0x2106;
    pub const TX_ACOMP_ENABLE: u16 = 0x2200;
    pub const TX_ACOMP_GAIN: u16 = 0x2204;
    pub const TX_RDS_INTERRUPT_SOURCE: u16 = 0x2C00;
    pub const TX_RDS_PI: u16 = 0x2C01;
    pub const TX_RDS_PS_MIX: u16 = 0x2C02;
    pub const TX_RDS_PS_MISC: u16 = 0x2C03;
    pub const TX_RDS_PS_REPEAT_COUNT: u16 = 0x2C04;
    pub const TX_RDS_MESSAGE_COUNT: u16 = 0x2C05;
    pub const TX_RDS_PS_AF: u16 = 0x2C06;
    pub const TX_RDS_FIFO_SIZE: u16 = 0x2C07;
}

/// Stereo, pilot and RDS components
pub const COMPONENTS_STEREO_PILOT_RDS: u16 = 0x0007;

/// Auxiliary output pins GPO1 and GPO2
pub const GPO1: u8 = 1 << 1;
pub const GPO2: u8 = 1 << 2;

/// Response lengths, status byte included
pub const REVISION_LEN: usize = 9;
pub const TUNE_STATUS_LEN: usize = 8;
pub const ASQ_STATUS_LEN: usize = 5;
pub const RDS_BUFFER_STATUS_LEN: usize = 6;
