// SI4713-RS: driver for the Si4713 FM transmitter with RDS
// Copyright 2024 - Licensed under GPLv3

#![allow(async_fn_in_trait)]

pub mod bus;
pub mod codec;
pub mod core;
pub mod driver;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use bus::{BusConnection, BusConnector, BusError, MockBus, PinLevel};
pub use codec::{CommandFrame, FrameError};
pub use crate::core::{
    constants::*, normalize, ConfigError, Frequency, LogSink, RawConfig, RetryPolicy, Timing,
    ValidatedConfig, ValidationMessage,
};
pub use driver::{
    Device, DriverError, DriverResult, DriverState, NoiseSample, Si4713, StartOutcome,
    StatusReport,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
