use crate::{
    commands::{Command, CommandContext},
    db,
    entities::{booking, booking_receipt},
    errors::ServiceError,
    events::Event,
    repositories::booking_repository::{delete_item_rows, load_details},
    storage::FileCategory,
};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::{delete_files_best_effort, item_files, StoredFile};

lazy_static! {
    static ref BOOKING_DELETIONS: IntCounter =
        IntCounter::new("booking_deletions_total", "Total number of bookings deleted")
            .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteBookingCommand {
    pub booking_id: Uuid,
}

#[async_trait::async_trait]
impl Command for DeleteBookingCommand {
    type Result = ();

    #[instrument(skip(self, ctx), fields(booking_id = %self.booking_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let booking_id = self.booking_id;
        let storage = ctx.storage.clone();

        let (crm_id, snapshot) = db::transaction(&ctx.db_pool, "booking.delete", move |txn| {
            Box::pin(async move {
                let details = load_details(txn, booking_id).await?;
                let snapshot = serde_json::to_value(&details)?;

                let mut files: Vec<StoredFile> =
                    details.items.iter().flat_map(item_files).collect();
                files.extend(
                    details
                        .receipts
                        .iter()
                        .map(|receipt| StoredFile::new(FileCategory::Images, &receipt.image)),
                );
                delete_files_best_effort(&storage, &files).await;

                for item in &details.items {
                    delete_item_rows(txn, item.id).await?;
                }
                booking_receipt::Entity::delete_many()
                    .filter(booking_receipt::Column::BookingId.eq(booking_id))
                    .exec(txn)
                    .await?;
                booking::Entity::delete_by_id(booking_id).exec(txn).await?;

                Ok((details.booking.crm_id, snapshot))
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to delete booking");
            e
        })?;

        info!(crm_id = %crm_id, "Booking deleted");
        ctx.event_sender
            .send_or_log(Event::BookingDeleted {
                booking_id,
                crm_id,
                snapshot,
            })
            .await;
        BOOKING_DELETIONS.inc();

        Ok(())
    }
}
