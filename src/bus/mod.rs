// Bus transport contract and the in-memory chip used for testing
pub mod mock;
pub mod transport;

pub use mock::{BusEvent, MockBus, MockConnection};
pub use transport::{BusConnection, BusConnector, BusError, BusResult, PinLevel};
