// Si4713 controller: session handshake, startup sequence, RDS and status
pub mod error;
pub mod rds;
pub mod session;
pub mod si4713;
pub mod status;
pub mod traits;

pub use error::{DriverError, DriverResult};
pub use session::{Diagnostics, Session};
pub use si4713::{DriverState, NoiseSample, Si4713};
pub use status::StatusReport;
pub use traits::{Device, StartOutcome};
