// Device lifecycle contract

use super::error::DriverResult;

/// What `Device::start` ended with when it did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// Tuned and transmitting
    Broadcasting,
    /// The configuration asked to stop once the noise scan was done
    StoppedAfterScan,
}

/// A named device with a start/halt lifecycle, driven by an external scheduler
pub trait Device {
    /// Get the device name
    fn name(&self) -> &str;

    /// Rename the device
    fn set_name(&mut self, name: &str);

    /// Run the full startup sequence
    async fn start(&mut self) -> DriverResult<StartOutcome>;

    /// Stop the device gracefully
    async fn halt(&mut self) -> DriverResult<()>;
}
