// Bus session and the command handshake
//
// Every command except POWER_DOWN is followed by reads of the status byte
// until CTS is set. Tune-type commands additionally poll GET_INT_STATUS
// until both CTS and STC are reported.

use super::error::{DriverError, DriverResult};
use crate::bus::BusConnection;
use crate::codec::{self, CommandFrame};
use crate::core::constants::status;
use crate::core::{LogSink, RetryBudget, RetryPolicy};
use std::fmt;
use std::future::Future;
use std::time::Duration;

/// Verbose output channel; silent unless diagnostics are enabled
#[derive(Debug, Clone)]
pub struct Diagnostics {
    enabled: bool,
    sink: Option<LogSink>,
}

impl Diagnostics {
    pub fn new(enabled: bool, sink: Option<LogSink>) -> Self {
        Self { enabled, sink }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn log(&self, args: fmt::Arguments<'_>) {
        if !self.enabled {
            return;
        }
        let msg = args.to_string();
        tracing::debug!("{}", msg);
        if let Some(sink) = &self.sink {
            sink.emit(&msg);
        }
    }
}

/// The open connection plus what the controller remembers about the chip
pub struct Session<T: BusConnection> {
    conn: T,
    last_status: u8,
    rds_enabled: bool,
    retry: RetryPolicy,
    diag: Diagnostics,
}

impl<T: BusConnection> Session<T> {
    pub fn new(conn: T, retry: RetryPolicy, diag: Diagnostics) -> Self {
        Self {
            conn,
            last_status: 0,
            rds_enabled: false,
            retry,
            diag,
        }
    }

    /// Status byte from the most recent read of it
    pub fn last_status(&self) -> u8 {
        self.last_status
    }

    pub fn rds_enabled(&self) -> bool {
        self.rds_enabled
    }

    pub fn set_rds_enabled(&mut self, enabled: bool) {
        self.rds_enabled = enabled;
    }

    pub fn connection(&self) -> &T {
        &self.conn
    }

    pub fn into_connection(self) -> T {
        self.conn
    }

    /// Write a command and wait for clear-to-send
    pub async fn send_command(&mut self, frame: &CommandFrame) -> DriverResult<()> {
        self.diag.log(format_args!("*** Command: {}", frame));
        self.conn.write(frame.as_bytes()).await?;

        // The chip no longer answers once it is told to power down
        if frame.is_power_down() {
            return Ok(());
        }

        self.wait_clear_to_send().await
    }

    async fn wait_clear_to_send(&mut self) -> DriverResult<()> {
        let mut budget = self.retry.start();
        let limit = self.retry.max_duration;
        let outcome = within(limit, self.poll_clear_to_send(&mut budget)).await;
        match outcome {
            Some(result) => result,
            None => Err(timed_out("clear-to-send", &budget)),
        }
    }

    async fn poll_clear_to_send(&mut self, budget: &mut RetryBudget) -> DriverResult<()> {
        loop {
            if !budget.try_attempt() {
                return Err(timed_out("clear-to-send", budget));
            }

            let value = self.conn.read_byte().await?;
            self.last_status = value;
            self.diag
                .log(format_args!("status: {:x} ({})", value, value));

            if value & status::CTS != 0 {
                return Ok(());
            }
            budget.pause().await;
        }
    }

    /// Read the interrupt status byte
    pub async fn int_status(&mut self) -> DriverResult<u8> {
        self.conn
            .write(codec::frame::get_int_status().as_bytes())
            .await?;
        let value = self.conn.read_byte().await?;
        self.last_status = value;
        Ok(value)
    }

    /// Poll interrupt status until CTS and STC are both set
    pub async fn wait_tune_complete(&mut self, operation: &'static str) -> DriverResult<()> {
        let mut budget = self.retry.start();
        let limit = self.retry.max_duration;
        let outcome = within(limit, self.poll_tune_complete(operation, &mut budget)).await;
        match outcome {
            Some(result) => result,
            None => Err(timed_out(operation, &budget)),
        }
    }

    async fn poll_tune_complete(
        &mut self,
        operation: &'static str,
        budget: &mut RetryBudget,
    ) -> DriverResult<()> {
        loop {
            if !budget.try_attempt() {
                return Err(timed_out(operation, budget));
            }

            let value = self.int_status().await?;
            if value & status::TUNE_COMPLETE == status::TUNE_COMPLETE {
                return Ok(());
            }
            budget.pause().await;
        }
    }

    /// Read a response of exactly `len` bytes
    pub async fn read_response(&mut self, len: usize) -> DriverResult<Vec<u8>> {
        let mut values = vec![0u8; len];
        let count = self.conn.read(&mut values).await?;
        if count != len {
            tracing::debug!(
                "short read: wanted {} bytes, got {}: {:02X?}",
                len,
                count,
                &values[..count.min(len)]
            );
            return Err(DriverError::ShortRead {
                expected: len,
                actual: count,
            });
        }

        self.last_status = values[0];
        self.diag
            .log(format_args!("read {} bytes: {:02X?}", len, values));
        Ok(values)
    }
}

/// Run a whole poll loop under the duration bound, if there is one.
/// `None` means the bound elapsed, even with a bus call still pending.
async fn within<T>(
    limit: Option<Duration>,
    poll: impl Future<Output = DriverResult<T>>,
) -> Option<DriverResult<T>> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, poll).await.ok(),
        None => Some(poll.await),
    }
}

fn timed_out(operation: &'static str, budget: &RetryBudget) -> DriverError {
    tracing::warn!(
        "{} did not complete after {} polls ({:?})",
        operation,
        budget.attempts(),
        budget.elapsed()
    );
    DriverError::Timeout {
        operation,
        attempts: budget.attempts(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::{BusConnector, BusEvent, MockBus, MockConnection};
    use crate::codec::frame;
    use crate::core::constants::cmd;
    use std::time::Duration;

    async fn session(bus: &mut MockBus, retry: RetryPolicy) -> Session<MockConnection> {
        let conn = bus.connect(0x63, 1).await.unwrap();
        Session::new(conn, retry, Diagnostics::new(false, None))
    }

    fn fast() -> RetryPolicy {
        RetryPolicy::unbounded(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_handshake_reads_until_cts() {
        let mut bus = MockBus::new();
        bus.push_status(&[0x00, 0x00, 0x80]);
        let mut s = session(&mut bus, fast()).await;

        s.send_command(&frame::gpio_set(0x02)).await.unwrap();

        assert_eq!(bus.byte_reads(), 3);
        assert_eq!(s.last_status(), 0x80);
    }

    #[tokio::test]
    async fn test_power_down_skips_handshake() {
        let mut bus = MockBus::new();
        let mut s = session(&mut bus, fast()).await;

        s.send_command(&frame::power_down()).await.unwrap();

        assert_eq!(bus.written(), vec![vec![cmd::POWER_DOWN, 0x00]]);
        assert_eq!(bus.byte_reads(), 0);
        assert!(matches!(bus.events().last(), Some(BusEvent::Write(_))));
    }

    #[tokio::test]
    async fn test_handshake_times_out() {
        let mut bus = MockBus::new();
        bus.push_status(&[0x00; 16]);
        let mut s = session(&mut bus, fast().with_max_attempts(5)).await;

        let err = s.send_command(&frame::power_up()).await.unwrap_err();

        assert!(matches!(
            err,
            DriverError::Timeout {
                operation: "clear-to-send",
                attempts: 5
            }
        ));
        assert_eq!(bus.byte_reads(), 5);
    }

    #[tokio::test]
    async fn test_wait_tune_complete_needs_both_bits() {
        let mut bus = MockBus::new();
        // CTS alone, STC alone, then both
        bus.push_status(&[0x80, 0x01, 0x81]);
        let mut s = session(&mut bus, fast()).await;

        s.wait_tune_complete("tune").await.unwrap();

        assert_eq!(bus.byte_reads(), 3);
        assert_eq!(bus.opcodes(), vec![cmd::GET_INT_STATUS; 3]);
    }

    #[tokio::test]
    async fn test_wait_tune_complete_times_out() {
        let mut bus = MockBus::new().with_int_status(0x80);
        let mut s = session(&mut bus, fast().with_max_attempts(4)).await;

        let err = s.wait_tune_complete("tune").await.unwrap_err();
        assert!(matches!(
            err,
            DriverError::Timeout {
                operation: "tune",
                attempts: 4
            }
        ));
    }

    /// A device that accepts writes and then never answers
    struct HungConnection;

    impl BusConnection for HungConnection {
        async fn write(&mut self, _bytes: &[u8]) -> crate::bus::BusResult<()> {
            Ok(())
        }

        async fn read_byte(&mut self) -> crate::bus::BusResult<u8> {
            std::future::pending().await
        }

        async fn read(&mut self, _buf: &mut [u8]) -> crate::bus::BusResult<usize> {
            std::future::pending().await
        }
    }

    fn hung(retry: RetryPolicy) -> Session<HungConnection> {
        Session::new(HungConnection, retry, Diagnostics::new(false, None))
    }

    #[tokio::test]
    async fn test_duration_bound_covers_pending_read() {
        let retry = fast().with_max_duration(Duration::from_millis(50));
        let mut s = hung(retry);

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            s.send_command(&frame::power_up()),
        )
        .await
        .expect("handshake must give up on its own");

        assert!(matches!(
            result,
            Err(DriverError::Timeout {
                operation: "clear-to-send",
                attempts: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_duration_bound_covers_pending_tune_poll() {
        let retry = RetryPolicy::default().with_max_duration(Duration::from_millis(50));
        let mut s = hung(retry);

        let result = tokio::time::timeout(Duration::from_secs(2), s.wait_tune_complete("tune"))
            .await
            .expect("tune wait must give up on its own");

        assert!(matches!(
            result,
            Err(DriverError::Timeout {
                operation: "tune",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_short_read_is_fatal() {
        let mut bus = MockBus::new().with_short_reads(1);
        let mut s = session(&mut bus, fast()).await;

        s.send_command(&frame::get_revision()).await.unwrap();
        let err = s.read_response(9).await.unwrap_err();

        assert!(matches!(
            err,
            DriverError::ShortRead {
                expected: 9,
                actual: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let mut bus = MockBus::new().failing_on(cmd::SET_PROPERTY);
        let mut s = session(&mut bus, fast()).await;

        let err = s
            .send_command(&frame::set_property(0x0201, 32768))
            .await
            .unwrap_err();
        assert!(matches!(err, DriverError::Bus(_)));
        assert_eq!(bus.byte_reads(), 0);
    }

    #[test]
    fn test_diagnostics_sink() {
        use std::sync::{Arc, Mutex};

        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let sink = LogSink::new(move |m| captured.lock().unwrap().push(m.to_string()));

        Diagnostics::new(false, Some(sink.clone())).log(format_args!("hidden"));
        Diagnostics::new(true, Some(sink)).log(format_args!("shown {}", 1));
        // Enabled without a sink only goes to tracing
        Diagnostics::new(true, None).log(format_args!("tracing only"));

        assert_eq!(*lines.lock().unwrap(), vec!["shown 1".to_string()]);
    }
}
