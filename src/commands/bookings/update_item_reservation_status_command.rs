use crate::{
    commands::{Command, CommandContext},
    db,
    entities::booking_item,
    errors::ServiceError,
    events::Event,
    models::ItemReservationStatus,
    repositories::booking_repository::{find_booking, find_item},
};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::promote_if_all_reserved;

lazy_static! {
    static ref ITEM_STATUS_CHANGES: IntCounter = IntCounter::new(
        "booking_item_status_changes_total",
        "Total number of item reservation status changes"
    )
    .expect("metric can be created");
    static ref BOOKING_CONFIRMATIONS: IntCounter = IntCounter::new(
        "booking_confirmations_total",
        "Total number of bookings promoted to confirmed"
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItemReservationStatusCommand {
    pub item_id: Uuid,
    pub reservation_status: ItemReservationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStatusChange {
    pub item: booking_item::Model,
    pub old_status: ItemReservationStatus,
    /// Whether this change promoted the booking to confirmed
    pub booking_confirmed: bool,
}

#[async_trait::async_trait]
impl Command for UpdateItemReservationStatusCommand {
    type Result = ItemStatusChange;

    #[instrument(skip(self, ctx), fields(item_id = %self.item_id, status = %self.reservation_status))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let item_id = self.item_id;
        let new_status = self.reservation_status;

        let (change, confirmed_crm_id) =
            db::transaction(&ctx.db_pool, "booking_item.reservation_status", move |txn| {
                Box::pin(async move {
                    let item = find_item(txn, item_id).await?;
                    let old_status = item.reservation_status;
                    if old_status == new_status {
                        return Ok((
                            ItemStatusChange {
                                item,
                                old_status,
                                booking_confirmed: false,
                            },
                            None,
                        ));
                    }

                    let booking_id = item.booking_id;
                    let mut active: booking_item::ActiveModel = item.into();
                    active.reservation_status = Set(new_status);
                    active.updated_at = Set(Utc::now());
                    let item = active.update(txn).await?;

                    let booking = find_booking(txn, booking_id).await?;
                    let promoted = promote_if_all_reserved(txn, booking).await?;
                    Ok((
                        ItemStatusChange {
                            item,
                            old_status,
                            booking_confirmed: promoted.is_some(),
                        },
                        promoted.map(|b| b.crm_id),
                    ))
                })
            })
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to update item reservation status");
                e
            })?;

        if change.old_status == new_status {
            info!("Reservation status unchanged");
            return Ok(change);
        }

        ITEM_STATUS_CHANGES.inc();
        ctx.event_sender
            .send_or_log(Event::ItemReservationChanged {
                booking_id: change.item.booking_id,
                item_id,
                old_status: change.old_status,
                new_status,
            })
            .await;
        if let Some(crm_id) = confirmed_crm_id {
            BOOKING_CONFIRMATIONS.inc();
            ctx.event_sender
                .send_or_log(Event::BookingConfirmed {
                    booking_id: change.item.booking_id,
                    crm_id,
                })
                .await;
        }

        Ok(change)
    }
}
