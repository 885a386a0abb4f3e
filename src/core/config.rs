// Station configuration and its one-time normalization
//
// A `RawConfig` is what the operator writes (or what a JSON file holds).
// `normalize` turns it into a `ValidatedConfig`, filling defaults and clamping
// numeric fields. The controller only ever accepts the validated form.

use super::constants::{
    ADDRESS, ALTERNATE_ADDRESS, DEFAULT_NAME, DEFAULT_RDS_PROGRAM_ID, DEFAULT_RESET_PIN,
    MAX_TX_POWER, MIN_FREQUENCY, MIN_TX_POWER,
};
use super::frequency::Frequency;
use super::retry::{millis, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Longest station name the PS slots can hold (24 slots of 4 characters)
pub const MAX_STATION_NAME_LEN: usize = 24 * 4;

/// Longest RDS message the group buffer slots can address
pub const MAX_RDS_MESSAGE_LEN: usize = 256 * 4;

/// Characters a receiver shows for one PS name
pub const PS_NAME_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("A log sink is required; failures are reported only through it")]
    MissingLogSink,

    #[error("FM transmission frequency not set")]
    MissingFrequency,

    #[error("FM transmission frequency {0} not in 87.50 MHz ... 108.00 MHz bounds")]
    FrequencyOutOfBand(Frequency),

    #[error("RDS program identifier {0:#X} does not fit in 16 bits")]
    ProgramIdOutOfRange(i64),

    #[error("RDS station name is {0} characters, at most {max} fit", max = MAX_STATION_NAME_LEN)]
    StationNameTooLong(usize),

    #[error("RDS message is {0} characters, at most {max} fit", max = MAX_RDS_MESSAGE_LEN)]
    MessageTooLong(usize),

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A validation finding. Warnings are applied silently and reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationMessage {
    Warning(String),
    Error(String),
}

impl ValidationMessage {
    pub fn is_error(&self) -> bool {
        matches!(self, ValidationMessage::Error(_))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, ValidationMessage::Warning(_))
    }

    pub fn message(&self) -> &str {
        match self {
            ValidationMessage::Warning(msg) | ValidationMessage::Error(msg) => msg,
        }
    }
}

/// Destination for operator-facing log lines
#[derive(Clone)]
pub struct LogSink(Arc<dyn Fn(&str) + Send + Sync>);

impl LogSink {
    pub fn new(f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// Forward every line to `tracing::info!`
    pub fn tracing() -> Self {
        Self::new(|msg| tracing::info!("{}", msg))
    }

    pub fn emit(&self, msg: &str) {
        (self.0)(msg)
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LogSink")
    }
}

/// Delays the controller observes between physical actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timing {
    /// Length of each phase of the reset pulse
    #[serde(default = "default_reset_pulse", with = "millis")]
    pub reset_pulse: Duration,

    /// Pause after each auxiliary pin toggle in the status poll
    #[serde(default = "default_gpio_toggle_delay", with = "millis")]
    pub gpio_toggle_delay: Duration,

    /// Period of the status poll when the station runs unattended
    #[serde(default = "default_poll_interval", with = "millis")]
    pub poll_interval: Duration,
}

fn default_reset_pulse() -> Duration {
    Duration::from_millis(10)
}

fn default_gpio_toggle_delay() -> Duration {
    Duration::from_millis(500)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            reset_pulse: default_reset_pulse(),
            gpio_toggle_delay: default_gpio_toggle_delay(),
            poll_interval: default_poll_interval(),
        }
    }
}

impl Timing {
    /// No waiting at all; for simulated buses
    pub fn immediate() -> Self {
        Self {
            reset_pulse: Duration::ZERO,
            gpio_toggle_delay: Duration::ZERO,
            poll_interval: Duration::ZERO,
        }
    }
}

/// Configuration as supplied by the operator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// Device name reported by `name()`
    pub name: String,

    /// Primary log sink; mandatory
    #[serde(skip)]
    pub log: Option<LogSink>,

    /// Verbose output sink; used only when `diagnostics` is on
    #[serde(skip)]
    pub debug_log: Option<LogSink>,

    /// Verbose logging and the periodic status poll
    pub diagnostics: bool,

    /// Main transmission frequency, 87.50-108.00 MHz
    pub transmit_frequency: Frequency,

    /// Output power in dBµV, 88-115
    pub transmit_power: u8,

    /// Alternate frequency announced over RDS
    pub alternate_frequency: Frequency,

    /// Pin wired to the chip's RST line
    pub reset_pin: String,

    /// Bus index; the connector's default bus when unset
    pub bus: Option<u8>,

    /// State of the SEN strap, which selects the bus address
    pub sen_high: bool,

    pub has_rds: bool,
    pub rds_program_id: i64,
    pub rds_station_name: String,
    pub rds_message: String,

    /// Measure noise across the band before transmitting
    pub with_frequency_scan: bool,

    /// Stop once the scan is done; nothing is transmitted
    pub stop_after_frequency_scan: bool,

    pub timing: Timing,
    pub retry: RetryPolicy,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            log: None,
            debug_log: None,
            diagnostics: false,
            transmit_frequency: Frequency::default(),
            transmit_power: MAX_TX_POWER,
            alternate_frequency: Frequency::MIN,
            reset_pin: String::new(),
            bus: None,
            sen_high: true,
            has_rds: false,
            rds_program_id: 0,
            rds_station_name: String::new(),
            rds_message: String::new(),
            with_frequency_scan: false,
            stop_after_frequency_scan: false,
            timing: Timing::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl RawConfig {
    pub fn new(transmit_frequency: Frequency, log: LogSink) -> Self {
        Self {
            transmit_frequency,
            log: Some(log),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

/// Configuration that has passed `normalize`
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    name: String,
    log: LogSink,
    debug_log: Option<LogSink>,
    diagnostics: bool,
    transmit_frequency: Frequency,
    transmit_power: u8,
    alternate_frequency: Frequency,
    reset_pin: String,
    bus: Option<u8>,
    address: u8,
    has_rds: bool,
    rds_program_id: u16,
    rds_station_name: String,
    rds_message: String,
    with_frequency_scan: bool,
    stop_after_frequency_scan: bool,
    timing: Timing,
    retry: RetryPolicy,
    notices: Vec<ValidationMessage>,
}

impl ValidatedConfig {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn log(&self) -> &LogSink {
        &self.log
    }

    pub fn debug_log(&self) -> Option<&LogSink> {
        self.debug_log.as_ref()
    }

    pub fn diagnostics(&self) -> bool {
        self.diagnostics
    }

    pub fn transmit_frequency(&self) -> Frequency {
        self.transmit_frequency
    }

    pub fn transmit_power(&self) -> u8 {
        self.transmit_power
    }

    pub fn alternate_frequency(&self) -> Frequency {
        self.alternate_frequency
    }

    pub fn reset_pin(&self) -> &str {
        &self.reset_pin
    }

    pub fn bus(&self) -> Option<u8> {
        self.bus
    }

    /// 7-bit bus address picked by the SEN strap
    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn has_rds(&self) -> bool {
        self.has_rds
    }

    pub fn rds_program_id(&self) -> u16 {
        self.rds_program_id
    }

    pub fn rds_station_name(&self) -> &str {
        &self.rds_station_name
    }

    pub fn rds_message(&self) -> &str {
        &self.rds_message
    }

    pub fn with_frequency_scan(&self) -> bool {
        self.with_frequency_scan
    }

    pub fn stop_after_frequency_scan(&self) -> bool {
        self.stop_after_frequency_scan
    }

    pub fn timing(&self) -> Timing {
        self.timing
    }

    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Adjustments made while normalizing
    pub fn notices(&self) -> &[ValidationMessage] {
        &self.notices
    }
}

/// Validate and normalize a raw configuration.
///
/// Out-of-range power and alternate frequency are clamped with a notice sent to
/// the log sink. Missing program id, reset pin and name fall back to defaults
/// without one. A missing log sink or an unusable transmit frequency is an
/// error and nothing touches the bus.
pub fn normalize(raw: RawConfig) -> Result<ValidatedConfig, ConfigError> {
    let log = raw.log.ok_or(ConfigError::MissingLogSink)?;
    let mut notices = Vec::new();
    let mut warn = |msg: String| {
        log.emit(&msg);
        notices.push(ValidationMessage::Warning(msg));
    };

    if raw.transmit_frequency.hundredths() == 0 {
        return Err(ConfigError::MissingFrequency);
    }
    if !raw.transmit_frequency.in_band() {
        return Err(ConfigError::FrequencyOutOfBand(raw.transmit_frequency));
    }

    let alternate_frequency = if raw.alternate_frequency.in_band() {
        raw.alternate_frequency
    } else {
        warn(format!(
            "FM alternate transmission frequency not in 87.50 MHz ... 108 MHz bounds, defaulting to {}",
            MIN_FREQUENCY
        ));
        Frequency::MIN
    };

    let transmit_power = if raw.transmit_power < MIN_TX_POWER {
        warn(format!(
            "Transmit power {} < {}. Adjusting to minimum of {}.",
            raw.transmit_power, MIN_TX_POWER, MIN_TX_POWER
        ));
        MIN_TX_POWER
    } else if raw.transmit_power > MAX_TX_POWER {
        warn(format!(
            "Transmit power {} > {}. Adjusting to maximum of {}.",
            raw.transmit_power, MAX_TX_POWER, MAX_TX_POWER
        ));
        MAX_TX_POWER
    } else {
        raw.transmit_power
    };

    let rds_program_id = if raw.rds_program_id < 1 {
        DEFAULT_RDS_PROGRAM_ID
    } else {
        u16::try_from(raw.rds_program_id)
            .map_err(|_| ConfigError::ProgramIdOutOfRange(raw.rds_program_id))?
    };

    if raw.rds_station_name.len() > MAX_STATION_NAME_LEN {
        return Err(ConfigError::StationNameTooLong(raw.rds_station_name.len()));
    }
    if raw.rds_message.len() > MAX_RDS_MESSAGE_LEN {
        return Err(ConfigError::MessageTooLong(raw.rds_message.len()));
    }
    if raw.has_rds && raw.rds_station_name.len() > PS_NAME_LEN {
        warn(format!(
            "RDS station name {:?} is longer than {} characters; receivers show the first {}",
            raw.rds_station_name, PS_NAME_LEN, PS_NAME_LEN
        ));
    }

    if raw.stop_after_frequency_scan && !raw.with_frequency_scan {
        warn("Stop after frequency scan is set without a frequency scan; nothing will be transmitted".to_string());
    }

    let reset_pin = if raw.reset_pin.is_empty() {
        DEFAULT_RESET_PIN.to_string()
    } else {
        raw.reset_pin
    };

    let name = if raw.name.is_empty() {
        DEFAULT_NAME.to_string()
    } else {
        raw.name
    };

    Ok(ValidatedConfig {
        name,
        debug_log: raw.debug_log,
        diagnostics: raw.diagnostics,
        transmit_frequency: raw.transmit_frequency,
        transmit_power,
        alternate_frequency,
        reset_pin,
        bus: raw.bus,
        address: if raw.sen_high { ADDRESS } else { ALTERNATE_ADDRESS },
        has_rds: raw.has_rds,
        rds_program_id,
        rds_station_name: raw.rds_station_name,
        rds_message: raw.rds_message,
        with_frequency_scan: raw.with_frequency_scan,
        stop_after_frequency_scan: raw.stop_after_frequency_scan,
        timing: raw.timing,
        retry: raw.retry,
        notices,
        log,
    })
}
