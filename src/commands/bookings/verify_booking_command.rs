use crate::{
    commands::{Command, CommandContext},
    db,
    entities::booking,
    errors::ServiceError,
    events::Event,
    models::VerifyStatus,
    repositories::booking_repository::find_booking,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyBookingCommand {
    pub booking_id: Uuid,
    pub verify_status: VerifyStatus,
}

#[async_trait::async_trait]
impl Command for VerifyBookingCommand {
    type Result = booking::Model;

    #[instrument(skip(self, ctx), fields(booking_id = %self.booking_id, status = %self.verify_status))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let booking_id = self.booking_id;
        let verify_status = self.verify_status;

        let booking = db::transaction(&ctx.db_pool, "booking.verify", move |txn| {
            Box::pin(async move {
                let booking = find_booking(txn, booking_id).await?;
                let mut active: booking::ActiveModel = booking.into();
                active.verify_status = Set(verify_status);
                active.updated_at = Set(Utc::now());
                Ok(active.update(txn).await?)
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to verify booking");
            e
        })?;

        info!(crm_id = %booking.crm_id, "Booking verify status set");
        ctx.event_sender
            .send_or_log(Event::BookingVerified {
                booking_id,
                verify_status,
            })
            .await;

        Ok(booking)
    }
}
