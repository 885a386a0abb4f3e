// Si4713 FM transmitter controller
// Reference: Si4712/13-B30 datasheet, AN332 programming guide
//
// Startup runs once, strictly forward:
// connect, reset pulse, power-up, optional noise scan, power, tune,
// optional RDS, auxiliary outputs. Any failure leaves the controller in
// `DriverState::Failed`; the caller restarts from scratch.

use super::error::{DriverError, DriverResult};
use super::session::{Diagnostics, Session};
use super::traits::{Device, StartOutcome};
use crate::bus::{BusConnector, BusError, PinLevel};
use crate::codec::{self, frame, CommandFrame, Revision, TuneStatus};
use crate::core::constants::{
    prop, GPO1, GPO2, PART_NUMBER, REVISION_LEN, SCAN_STEP, TUNE_STATUS_LEN,
};
use crate::core::{normalize, Frequency, RawConfig, ValidatedConfig};
use std::fmt;

/// Where the controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Uninitialized,
    Connected,
    Reset,
    PoweredUp,
    Scanning,
    PowerSet,
    Tuned,
    RdsEnabled,
    Running,
    Halted,
    Failed,
}

impl fmt::Display for DriverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DriverState::Uninitialized => "uninitialized",
            DriverState::Connected => "connected",
            DriverState::Reset => "reset",
            DriverState::PoweredUp => "powered up",
            DriverState::Scanning => "scanning",
            DriverState::PowerSet => "power set",
            DriverState::Tuned => "tuned",
            DriverState::RdsEnabled => "RDS enabled",
            DriverState::Running => "running",
            DriverState::Halted => "halted",
            DriverState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Received noise on one frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoiseSample {
    pub frequency: Frequency,
    pub noise_level: u8,
}

/// Controller for one Si4713 on a bus
pub struct Si4713<C: BusConnector> {
    connector: C,
    config: ValidatedConfig,
    name: String,
    pub(super) diag: Diagnostics,
    session: Option<Session<C::Connection>>,
    state: DriverState,
    revision: Option<Revision>,
    last_scan: Vec<NoiseSample>,
}

impl<C: BusConnector> Si4713<C> {
    /// Build a controller. The reset line is mandatory, so a connector
    /// without digital output is rejected here rather than at reset time.
    pub fn new(connector: C, config: ValidatedConfig) -> DriverResult<Self> {
        if !connector.supports_digital_output() {
            return Err(DriverError::CapabilityMissing("digital output"));
        }

        let diag = Diagnostics::new(config.diagnostics(), config.debug_log().cloned());
        Ok(Self {
            connector,
            name: config.name().to_string(),
            config,
            diag,
            session: None,
            state: DriverState::Uninitialized,
            revision: None,
            last_scan: Vec::new(),
        })
    }

    /// Normalize a raw configuration and build the controller from it
    pub fn from_raw(connector: C, raw: RawConfig) -> DriverResult<Self> {
        let config = normalize(raw)?;
        Self::new(connector, config)
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// 7-bit bus address selected by the SEN strap setting
    pub fn address(&self) -> u8 {
        self.config.address()
    }

    /// Revision read during power-up
    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    /// Noise levels from the most recent scan
    pub fn last_scan(&self) -> &[NoiseSample] {
        &self.last_scan
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn rds_enabled(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.rds_enabled())
    }

    /// Status byte most recently read from the chip
    pub fn last_status(&self) -> Option<u8> {
        self.session.as_ref().map(|s| s.last_status())
    }

    pub(super) fn set_state(&mut self, state: DriverState) {
        self.state = state;
    }

    pub(super) fn session(&mut self) -> DriverResult<&mut Session<C::Connection>> {
        self.session.as_mut().ok_or(DriverError::NotConnected)
    }

    pub(super) async fn send(&mut self, frame: &CommandFrame) -> DriverResult<()> {
        self.session()?.send_command(frame).await
    }

    pub(super) async fn set_property(&mut self, property: u16, value: u16) -> DriverResult<()> {
        self.diag.log(format_args!(
            "Set property {:#06X} = {:#06X} ({})",
            property, value, value
        ));
        self.send(&frame::set_property(property, value)).await
    }

    /// Operator-facing notice; the log sink decides where it ends up
    fn notify(&self, msg: &str) {
        self.config.log().emit(msg);
    }

    async fn run_startup(&mut self) -> DriverResult<StartOutcome> {
        self.connect().await?;
        self.reset().await?;
        self.power_up().await?;

        if self.config.with_frequency_scan() {
            self.scan().await?;

            if self.config.stop_after_frequency_scan() {
                self.notify("Stopping after frequency scan as configured");
                self.state = DriverState::Halted;
                return Ok(StartOutcome::StoppedAfterScan);
            }

            let frequency = self.config.transmit_frequency();
            let sample = self.measure(frequency).await?;
            self.diag.log(format_args!(
                "Noise level on {} is {}",
                sample.frequency, sample.noise_level
            ));
        }

        let power = self.config.transmit_power();
        self.diag.log(format_args!("Set TX power {}", power));
        self.send(&frame::set_power(power, 0)).await?;
        self.state = DriverState::PowerSet;

        let frequency = self.config.transmit_frequency();
        self.tune(frequency).await?;

        if self.config.has_rds() {
            self.enable_rds().await?;
        }

        self.gpio_control(GPO1 | GPO2).await?;
        self.state = DriverState::Running;

        let msg = format!(
            "{} transmitting on {} at {} dBuV",
            self.name, frequency, power
        );
        self.notify(&msg);
        Ok(StartOutcome::Broadcasting)
    }

    async fn connect(&mut self) -> DriverResult<()> {
        let address = self.config.address();
        let bus = self
            .config
            .bus()
            .unwrap_or_else(|| self.connector.default_bus());

        let conn = self
            .connector
            .connect(address, bus)
            .await
            .map_err(DriverError::Connection)?;
        tracing::debug!("Connected to {:#04X} on bus {}", address, bus);

        self.session = Some(Session::new(conn, self.config.retry(), self.diag.clone()));
        self.state = DriverState::Connected;
        Ok(())
    }

    /// Pulse the reset line high, low, high
    async fn reset(&mut self) -> DriverResult<()> {
        let pin = self.config.reset_pin().to_string();
        let pulse = self.config.timing().reset_pulse;

        for (idx, level) in [PinLevel::High, PinLevel::Low, PinLevel::High]
            .into_iter()
            .enumerate()
        {
            if idx > 0 {
                tokio::time::sleep(pulse).await;
            }
            self.connector
                .digital_write(&pin, level)
                .await
                .map_err(|e| match e {
                    BusError::Unsupported => DriverError::CapabilityMissing("digital output"),
                    other => DriverError::Bus(other),
                })?;
        }

        self.diag.log(format_args!("Reset on pin {}", pin));
        self.state = DriverState::Reset;
        Ok(())
    }

    async fn power_up(&mut self) -> DriverResult<()> {
        self.send(&frame::power_up()).await?;

        // 32.768 kHz crystal
        self.set_property(prop::REFCLK_FREQ, 32768).await?;
        // 74 us pre-emphasis
        self.set_property(prop::TX_PREEMPHASIS, 0).await?;
        // limiter on, no dynamic range control
        self.set_property(prop::TX_ACOMP_ENABLE, 0x02).await?;
        self.set_property(prop::TX_ACOMP_GAIN, 10).await?;

        let revision = self.read_revision().await?;
        if revision.part_number != PART_NUMBER {
            return Err(DriverError::DeviceNotFound(revision.part_number));
        }

        tracing::info!(
            "Found Si47{:02} firmware {:X} patch {:X} component {:X} chip rev {}",
            revision.part_number,
            revision.firmware,
            revision.patch,
            revision.component,
            revision.chip_revision
        );
        self.revision = Some(revision);
        self.state = DriverState::PoweredUp;
        Ok(())
    }

    async fn read_revision(&mut self) -> DriverResult<Revision> {
        self.send(&frame::get_revision()).await?;
        let values = self.session()?.read_response(REVISION_LEN).await?;
        Ok(codec::decode_revision(&values)?)
    }

    /// Read back what the chip reports for the last tune, power or measure
    pub async fn tune_status(&mut self) -> DriverResult<TuneStatus> {
        self.send(&frame::tune_status()).await?;
        let values = self.session()?.read_response(TUNE_STATUS_LEN).await?;
        Ok(codec::decode_tune_status(&values)?)
    }

    /// Tune the transmitter and wait for the chip to settle
    pub async fn tune(&mut self, frequency: Frequency) -> DriverResult<()> {
        self.diag.log(format_args!("Tuning into {}", frequency));
        self.send(&frame::tune(frequency)).await?;
        self.session()?.wait_tune_complete("tune").await?;
        self.state = DriverState::Tuned;

        if self.diag.enabled() {
            let status = self.tune_status().await?;
            self.diag.log(format_args!("Curr freq: {}", status.frequency));
            self.diag.log(format_args!("Curr freq dBuV: {}", status.level));
            self.diag
                .log(format_args!("Curr ANT cap: {}", status.antenna_capacitance));
            self.diag
                .log(format_args!("Curr noise level: {}", status.noise_level));
        }
        Ok(())
    }

    /// Measure received noise on one frequency (rounded down to 50 kHz)
    pub async fn measure(&mut self, frequency: Frequency) -> DriverResult<NoiseSample> {
        let frequency = frequency.round_down_to_50khz();
        self.diag
            .log(format_args!("Measuring frequency: {}", frequency));

        self.send(&frame::tune_measure(frequency)).await?;
        self.session()?.wait_tune_complete("tune measure").await?;
        let status = self.tune_status().await?;

        Ok(NoiseSample {
            frequency,
            noise_level: status.noise_level,
        })
    }

    /// Measure noise across the whole band, one step at a time.
    /// Nothing is chosen from the result; it is only reported.
    pub async fn scan(&mut self) -> DriverResult<Vec<NoiseSample>> {
        self.state = DriverState::Scanning;
        self.last_scan.clear();

        for frequency in Frequency::band_steps(SCAN_STEP) {
            let sample = self.measure(frequency).await?;
            self.diag.log(format_args!(
                "Noise level on {} is {}",
                sample.frequency, sample.noise_level
            ));
            self.last_scan.push(sample);
        }

        tracing::info!("Scanned {} frequencies", self.last_scan.len());
        Ok(self.last_scan.clone())
    }

    /// Drive the masked auxiliary outputs high, the rest low
    pub async fn set_gpio(&mut self, mask: u8) -> DriverResult<()> {
        self.send(&frame::gpio_set(mask)).await
    }

    /// Configure the masked auxiliary pins as outputs
    pub async fn gpio_control(&mut self, mask: u8) -> DriverResult<()> {
        self.send(&frame::gpio_control(mask)).await
    }
}

impl<C: BusConnector> Device for Si4713<C> {
    fn name(&self) -> &str {
        &self.name
    }

    fn set_name(&mut self, name: &str) {
        self.name = name.to_string();
    }

    async fn start(&mut self) -> DriverResult<StartOutcome> {
        tracing::info!("Starting {} at {:#04X}", self.name, self.address());
        match self.run_startup().await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                self.state = DriverState::Failed;
                self.notify(&format!("{} failed to start: {}", self.name, err));
                Err(err)
            }
        }
    }

    /// Power down and release the connection; anything after this needs a
    /// fresh `start`
    async fn halt(&mut self) -> DriverResult<()> {
        self.send(&frame::power_down()).await?;
        self.session = None;
        self.state = DriverState::Halted;
        self.notify(&format!("{} powered down", self.name));
        Ok(())
    }
}
