// In-memory Si4713 for testing and dry runs without hardware
//
// The mock answers like a healthy chip: CTS after every command, tune
// complete on every interrupt-status poll, and canned payloads for the
// commands that return data. Every bus transaction is recorded.

use super::transport::{BusConnection, BusConnector, BusError, BusResult, PinLevel};
use crate::core::constants::{cmd, status, PART_NUMBER};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

/// One recorded bus transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Connect { address: u8, bus: u8 },
    Pin { pin: String, level: PinLevel },
    Write(Vec<u8>),
    ReadByte(u8),
    Read { requested: usize, returned: usize },
}

#[derive(Debug)]
struct MockState {
    events: Vec<BusEvent>,
    last_opcode: Option<u8>,
    scripted_status: VecDeque<u8>,
    int_status: u8,
    part_number: u8,
    power: u8,
    antenna_capacitance: u8,
    frequency: u16,
    noise: HashMap<u16, u8>,
    default_noise: u8,
    asq: [u8; 5],
    rds_buffer: [u8; 6],
    fail_connect: bool,
    fail_opcode: Option<u8>,
    short_read: Option<usize>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            last_opcode: None,
            scripted_status: VecDeque::new(),
            int_status: status::TUNE_COMPLETE,
            part_number: PART_NUMBER,
            power: 0,
            antenna_capacitance: 0,
            frequency: 0,
            noise: HashMap::new(),
            default_noise: 20,
            asq: [status::CTS, 0x00, 0x00, 0x00, 0xEC],
            rds_buffer: [status::CTS, 0x00, 30, 0, 10, 0],
            fail_connect: false,
            fail_opcode: None,
            short_read: None,
        }
    }
}

impl MockState {
    fn response(&self, len: usize) -> Vec<u8> {
        let mut out = match self.last_opcode {
            Some(cmd::GET_REV) => {
                vec![status::CTS, self.part_number, 0x32, 0x30, 0x00, 0x00, 0x33, 0x30, 0x42]
            }
            Some(cmd::TX_TUNE_STATUS) => {
                let [fh, fl] = self.frequency.to_be_bytes();
                let noise = self
                    .noise
                    .get(&self.frequency)
                    .copied()
                    .unwrap_or(self.default_noise);
                vec![
                    status::CTS,
                    0x01,
                    fh,
                    fl,
                    0x00,
                    self.power,
                    self.antenna_capacitance,
                    noise,
                ]
            }
            Some(cmd::TX_ASQ_STATUS) => self.asq.to_vec(),
            Some(cmd::TX_RDS_BUFF) => self.rds_buffer.to_vec(),
            _ => vec![status::CTS],
        };
        out.resize(len, 0);
        out
    }

    fn observe_write(&mut self, bytes: &[u8]) {
        let opcode = bytes[0];
        match opcode {
            cmd::TX_TUNE_FREQ | cmd::TX_TUNE_MEASURE if bytes.len() >= 4 => {
                self.frequency = u16::from_be_bytes([bytes[2], bytes[3]]);
            }
            cmd::TX_TUNE_POWER if bytes.len() >= 5 => {
                self.power = bytes[3];
                self.antenna_capacitance = bytes[4];
            }
            _ => {}
        }
        self.last_opcode = Some(opcode);
    }
}

/// Mock connector; clones share the same simulated chip
#[derive(Debug, Clone)]
pub struct MockBus {
    state: Arc<Mutex<MockState>>,
    digital_output: bool,
}

impl MockBus {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState::default())),
            digital_output: true,
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Report a different part number from GET_REV
    pub fn with_part_number(self, part_number: u8) -> Self {
        self.state().part_number = part_number;
        self
    }

    /// Answer interrupt-status polls with this byte
    pub fn with_int_status(self, value: u8) -> Self {
        self.state().int_status = value;
        self
    }

    /// Noise level reported for a measured frequency
    pub fn with_noise(self, frequency: u16, level: u8) -> Self {
        self.state().noise.insert(frequency, level);
        self
    }

    pub fn with_asq(self, response: [u8; 5]) -> Self {
        self.state().asq = response;
        self
    }

    pub fn with_rds_buffer(self, response: [u8; 6]) -> Self {
        self.state().rds_buffer = response;
        self
    }

    /// Transport without pin control
    pub fn without_digital_output(mut self) -> Self {
        self.digital_output = false;
        self
    }

    pub fn failing_connect(self) -> Self {
        self.state().fail_connect = true;
        self
    }

    /// Fail any write whose first byte is `opcode`
    pub fn failing_on(self, opcode: u8) -> Self {
        self.state().fail_opcode = Some(opcode);
        self
    }

    /// Return at most `count` bytes from multi-byte reads
    pub fn with_short_reads(self, count: usize) -> Self {
        self.state().short_read = Some(count);
        self
    }

    /// Queue status bytes served to single-byte reads before the defaults
    pub fn push_status(&self, bytes: &[u8]) {
        self.state().scripted_status.extend(bytes.iter().copied());
    }

    pub fn events(&self) -> Vec<BusEvent> {
        self.state().events.clone()
    }

    pub fn clear_events(&self) {
        self.state().events.clear();
    }

    /// Every buffer written, in order
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// First byte of every buffer written, in order
    pub fn opcodes(&self) -> Vec<u8> {
        self.written().iter().map(|w| w[0]).collect()
    }

    pub fn byte_reads(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|e| matches!(e, BusEvent::ReadByte(_)))
            .count()
    }

    pub fn pin_writes(&self) -> Vec<(String, PinLevel)> {
        self.state()
            .events
            .iter()
            .filter_map(|e| match e {
                BusEvent::Pin { pin, level } => Some((pin.clone(), *level)),
                _ => None,
            })
            .collect()
    }

    /// Check if a buffer was written as one transaction
    pub fn was_written(&self, expected: &[u8]) -> bool {
        self.written().iter().any(|w| w == expected)
    }
}

impl Default for MockBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusConnector for MockBus {
    type Connection = MockConnection;

    fn default_bus(&self) -> u8 {
        1
    }

    fn supports_digital_output(&self) -> bool {
        self.digital_output
    }

    async fn connect(&mut self, address: u8, bus: u8) -> BusResult<MockConnection> {
        let mut state = self.state();
        if state.fail_connect {
            return Err(BusError::Open {
                address,
                bus,
                reason: "invalid i2c connection".to_string(),
            });
        }
        state.events.push(BusEvent::Connect { address, bus });
        Ok(MockConnection {
            state: self.state.clone(),
        })
    }

    async fn digital_write(&mut self, pin: &str, level: PinLevel) -> BusResult<()> {
        if !self.digital_output {
            return Err(BusError::Unsupported);
        }
        self.state().events.push(BusEvent::Pin {
            pin: pin.to_string(),
            level,
        });
        Ok(())
    }
}

/// Connection handed out by `MockBus::connect`
#[derive(Debug)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl BusConnection for MockConnection {
    async fn write(&mut self, bytes: &[u8]) -> BusResult<()> {
        let mut state = self.state();
        if bytes.is_empty() {
            return Err(BusError::Other("empty write".to_string()));
        }
        if state.fail_opcode == Some(bytes[0]) {
            return Err(BusError::Other(format!(
                "simulated write failure for {:#04X}",
                bytes[0]
            )));
        }
        state.events.push(BusEvent::Write(bytes.to_vec()));
        state.observe_write(bytes);
        Ok(())
    }

    async fn read_byte(&mut self) -> BusResult<u8> {
        let mut state = self.state();
        let value = match state.scripted_status.pop_front() {
            Some(value) => value,
            None if state.last_opcode == Some(cmd::GET_INT_STATUS) => state.int_status,
            None => status::CTS,
        };
        state.events.push(BusEvent::ReadByte(value));
        Ok(value)
    }

    async fn read(&mut self, buf: &mut [u8]) -> BusResult<usize> {
        let mut state = self.state();
        let response = state.response(buf.len());
        let count = state.short_read.map_or(buf.len(), |n| n.min(buf.len()));
        buf[..count].copy_from_slice(&response[..count]);
        state.events.push(BusEvent::Read {
            requested: buf.len(),
            returned: count,
        });
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_and_answers() {
        let mut bus = MockBus::new();
        let mut conn = bus.connect(0x63, 1).await.unwrap();

        conn.write(&[cmd::POWER_UP, 0x12, 0x50]).await.unwrap();
        assert_eq!(conn.read_byte().await.unwrap(), status::CTS);

        conn.write(&[cmd::GET_INT_STATUS]).await.unwrap();
        assert_eq!(conn.read_byte().await.unwrap(), status::TUNE_COMPLETE);

        conn.write(&[cmd::GET_REV, 0]).await.unwrap();
        let mut buf = [0u8; 9];
        assert_eq!(conn.read(&mut buf).await.unwrap(), 9);
        assert_eq!(buf[1], PART_NUMBER);

        assert_eq!(bus.opcodes(), vec![cmd::POWER_UP, cmd::GET_INT_STATUS, cmd::GET_REV]);
        assert!(bus.was_written(&[cmd::POWER_UP, 0x12, 0x50]));
        assert_eq!(bus.byte_reads(), 2);
    }

    #[tokio::test]
    async fn test_scripted_status_comes_first() {
        let mut bus = MockBus::new();
        bus.push_status(&[0x00, 0x00]);
        let mut conn = bus.connect(0x63, 1).await.unwrap();
        conn.write(&[cmd::GPO_SET, 0x02]).await.unwrap();
        assert_eq!(conn.read_byte().await.unwrap(), 0x00);
        assert_eq!(conn.read_byte().await.unwrap(), 0x00);
        assert_eq!(conn.read_byte().await.unwrap(), status::CTS);
    }

    #[tokio::test]
    async fn test_tune_status_follows_measure() {
        let mut bus = MockBus::new().with_noise(9000, 55);
        let mut conn = bus.connect(0x63, 1).await.unwrap();
        conn.write(&[cmd::TX_TUNE_MEASURE, 0, 0x23, 0x28, 0]).await.unwrap();
        conn.write(&[cmd::TX_TUNE_STATUS, 0x01]).await.unwrap();
        let mut buf = [0u8; 8];
        conn.read(&mut buf).await.unwrap();
        assert_eq!(u16::from_be_bytes([buf[2], buf[3]]), 9000);
        assert_eq!(buf[7], 55);
    }

    #[tokio::test]
    async fn test_failure_injection() {
        let mut bus = MockBus::new().failing_connect();
        assert!(matches!(bus.connect(0x63, 1).await, Err(BusError::Open { .. })));

        let mut bus = MockBus::new().failing_on(cmd::TX_TUNE_FREQ).with_short_reads(3);
        let mut conn = bus.connect(0x63, 1).await.unwrap();
        assert!(conn.write(&[cmd::TX_TUNE_FREQ, 0, 0x25, 0x4E]).await.is_err());
        let mut buf = [0u8; 9];
        assert_eq!(conn.read(&mut buf).await.unwrap(), 3);

        let mut bus = MockBus::new().without_digital_output();
        assert!(!bus.supports_digital_output());
        assert!(matches!(
            bus.digital_write("29", PinLevel::High).await,
            Err(BusError::Unsupported)
        ));
    }
}
