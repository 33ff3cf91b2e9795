use crate::{
    commands::{Command, CommandContext},
    db,
    entities::{booking, booking_item},
    errors::ServiceError,
    events::Event,
    models::crm,
    repositories::booking_repository::{
        booking_crm_taken, find_booking, items_of, load_details, next_booking_crm_id,
        BookingDetails,
    },
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Hands a booking over to another staff member under a new CRM id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassignBookingCommand {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    /// New CRM id; generated from the configured prefix when absent
    pub crm_id: Option<String>,
}

#[async_trait::async_trait]
impl Command for ReassignBookingCommand {
    type Result = BookingDetails;

    #[instrument(skip(self, ctx), fields(booking_id = %self.booking_id, user_id = %self.user_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        if matches!(&self.crm_id, Some(id) if id.trim().is_empty()) {
            return Err(ServiceError::ValidationError(
                "crm_id must not be blank".to_string(),
            ));
        }

        let booking_id = self.booking_id;
        let user_id = self.user_id;
        let requested_crm_id = self.crm_id.clone();
        let prefix = ctx.settings.crm_prefix.clone();

        let (details, previous_user_id) =
            db::transaction(&ctx.db_pool, "booking.reassign", move |txn| {
                Box::pin(async move {
                    let stored = find_booking(txn, booking_id).await?;
                    let new_crm_id = match requested_crm_id {
                        Some(id) if id == stored.crm_id => id,
                        Some(id) => {
                            if booking_crm_taken(txn, &id).await? {
                                return Err(ServiceError::Conflict(format!(
                                    "Booking CRM id {} is already in use",
                                    id
                                )));
                            }
                            id
                        }
                        None => next_booking_crm_id(txn, &prefix).await?,
                    };

                    let now = Utc::now();
                    let previous_user_id = stored.user_id;
                    let previous_crm_id = stored.crm_id.clone();
                    let mut active: booking::ActiveModel = stored.into();
                    active.is_past_info = Set(true);
                    active.past_user_id = Set(Some(previous_user_id));
                    active.past_crm_id = Set(Some(previous_crm_id));
                    active.user_id = Set(user_id);
                    active.crm_id = Set(new_crm_id.clone());
                    active.updated_at = Set(now);
                    active.update(txn).await?;

                    for (idx, item) in items_of(txn, booking_id).await?.into_iter().enumerate() {
                        let sequence = match item.sequence() {
                            Some(sequence) => sequence,
                            None => {
                                warn!(crm_id = %item.crm_id, "Item CRM id has no sequence; renumbering by position");
                                (idx + 1) as u32
                            }
                        };
                        let mut active: booking_item::ActiveModel = item.into();
                        active.crm_id = Set(crm::item_crm_id(&new_crm_id, sequence));
                        active.updated_at = Set(now);
                        active.update(txn).await?;
                    }

                    Ok((load_details(txn, booking_id).await?, previous_user_id))
                })
            })
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to reassign booking");
                e
            })?;

        info!(
            crm_id = %details.booking.crm_id,
            past_crm_id = ?details.booking.past_crm_id,
            "Booking reassigned"
        );
        ctx.event_sender
            .send_or_log(Event::BookingReassigned {
                booking_id,
                previous_user_id,
                user_id,
                crm_id: details.booking.crm_id.clone(),
            })
            .await;

        Ok(details)
    }
}
