// Core types shared by the codec and the controller
pub mod config;
pub mod constants;
pub mod frequency;
pub mod retry;

// Re-export commonly used types
pub use config::{
    normalize, ConfigError, LogSink, RawConfig, Timing, ValidatedConfig, ValidationMessage,
};
pub use constants::*;
pub use frequency::{Frequency, FrequencyError};
pub use retry::{RetryBudget, RetryPolicy};
