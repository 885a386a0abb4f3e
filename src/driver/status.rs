// Periodic status poll
//
// Invoked once per tick by whoever schedules the station. Does nothing
// unless diagnostics are enabled.

use super::error::DriverResult;
use super::si4713::Si4713;
use crate::bus::BusConnector;
use crate::codec::{self, frame, AsqStatus, RdsBufferStatus};
use crate::core::constants::{ASQ_STATUS_LEN, GPO1, GPO2, RDS_BUFFER_STATUS_LEN};

/// What one poll read from the chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReport {
    pub asq: AsqStatus,
    pub rds_buffer: RdsBufferStatus,
}

impl<C: BusConnector> Si4713<C> {
    /// Read audio signal quality
    pub async fn asq_status(&mut self) -> DriverResult<AsqStatus> {
        self.send(&frame::asq_status()).await?;
        let values = self.session()?.read_response(ASQ_STATUS_LEN).await?;
        Ok(codec::decode_asq_status(&values)?)
    }

    /// Read RDS circular buffer and FIFO occupancy
    pub async fn rds_buffer_status(&mut self) -> DriverResult<RdsBufferStatus> {
        self.send(&frame::rds_buffer_status()).await?;
        let values = self
            .session()?
            .read_response(RDS_BUFFER_STATUS_LEN)
            .await?;
        Ok(codec::decode_rds_buffer_status(&values)?)
    }

    /// One status tick: log signal quality, blink both auxiliary outputs,
    /// log RDS buffer occupancy. Returns `None` when diagnostics are off.
    pub async fn poll(&mut self) -> DriverResult<Option<StatusReport>> {
        if !self.diag.enabled() {
            return Ok(None);
        }

        let asq = self.asq_status().await?;
        self.diag.log(format_args!(
            "Curr Status: {:#x} ASQ: {:#x} InLevel: {} dBfs",
            asq.status, asq.signal_quality, asq.input_level
        ));

        let delay = self.config().timing().gpio_toggle_delay;
        self.set_gpio(GPO1).await?;
        tokio::time::sleep(delay).await;
        self.set_gpio(GPO2).await?;
        tokio::time::sleep(delay).await;

        let rds_buffer = self.rds_buffer_status().await?;
        self.diag.log(format_args!(
            "Circular avail: {} used: {}",
            rds_buffer.circular_available, rds_buffer.circular_used
        ));
        self.diag.log(format_args!(
            "FIFO avail: {} used: {} overflow: {}",
            rds_buffer.fifo_available, rds_buffer.fifo_used, rds_buffer.overflow
        ));

        Ok(Some(StatusReport { asq, rds_buffer }))
    }
}
