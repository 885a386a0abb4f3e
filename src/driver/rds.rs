// RDS configuration and text loading

use super::error::DriverResult;
use super::si4713::{DriverState, Si4713};
use crate::bus::BusConnector;
use crate::codec::{self, frame};
use crate::core::constants::{prop, COMPONENTS_STEREO_PILOT_RDS};

impl<C: BusConnector> Si4713<C> {
    /// Configure the RDS encoder, load station name and message, and turn
    /// the RDS component on
    pub async fn enable_rds(&mut self) -> DriverResult<()> {
        let program_id = self.config().rds_program_id();
        let alternate = self.config().alternate_frequency();

        // 66.25 kHz
        self.set_property(prop::TX_AUDIO_DEVIATION, 6625).await?;
        // 2 kHz
        self.set_property(prop::TX_RDS_DEVIATION, 200).await?;
        self.set_property(prop::TX_RDS_INTERRUPT_SOURCE, 0x0001).await?;
        self.set_property(prop::TX_RDS_PI, program_id).await?;
        // 50% mix
        self.set_property(prop::TX_RDS_PS_MIX, 0x03).await?;
        // RDSD0 and RDSMS
        self.set_property(prop::TX_RDS_PS_MISC, 0x1808).await?;
        self.set_property(prop::TX_RDS_PS_REPEAT_COUNT, 3).await?;
        self.set_property(prop::TX_RDS_MESSAGE_COUNT, 1).await?;
        self.set_property(prop::TX_RDS_PS_AF, alternate.hundredths())
            .await?;
        self.set_property(prop::TX_RDS_FIFO_SIZE, 0).await?;
        self.set_property(prop::TX_COMPONENT_ENABLE, COMPONENTS_STEREO_PILOT_RDS)
            .await?;

        let station = self.config().rds_station_name().to_string();
        let message = self.config().rds_message().to_string();
        self.set_rds_station(&station).await?;
        self.set_rds_message(&message).await?;

        self.session()?.set_rds_enabled(true);
        self.set_state(DriverState::RdsEnabled);
        self.diag.log(format_args!("RDS on!"));
        Ok(())
    }

    /// Load the PS station name, four characters per slot
    pub async fn set_rds_station(&mut self, name: &str) -> DriverResult<()> {
        self.diag.log(format_args!("Set RDS station {:?}", name));
        for frame in codec::station_frames(name)? {
            self.send(&frame).await?;
        }
        Ok(())
    }

    /// Load the group buffer message, then the clock-time group, and
    /// re-assert the component mask
    pub async fn set_rds_message(&mut self, message: &str) -> DriverResult<()> {
        self.diag.log(format_args!("Set RDS message {:?}", message));
        for frame in codec::message_frames(message)? {
            self.send(&frame).await?;
        }

        self.send(&frame::rds_time()).await?;
        self.set_property(prop::TX_COMPONENT_ENABLE, COMPONENTS_STEREO_PILOT_RDS)
            .await
    }
}
