use crate::{
    commands::{Command, CommandContext},
    db,
    entities::booking_item,
    errors::ServiceError,
    events::Event,
    models::PaymentStatus,
    repositories::booking_repository::find_item,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

/// Updates what the agency paid the supplier for an item. Independent of the
/// customer-facing payment status on the booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateItemExpenseCommand {
    pub item_id: Uuid,
    pub payment_status: Option<PaymentStatus>,
    pub payment_method: Option<String>,
}

#[async_trait::async_trait]
impl Command for UpdateItemExpenseCommand {
    type Result = booking_item::Model;

    #[instrument(skip(self, ctx), fields(item_id = %self.item_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        if self.payment_status.is_none() && self.payment_method.is_none() {
            return Err(ServiceError::ValidationError(
                "payment_status or payment_method is required".to_string(),
            ));
        }

        let item_id = self.item_id;
        let payment_status = self.payment_status;
        let payment_method = self.payment_method.clone();
        let item = db::transaction(&ctx.db_pool, "booking_item.expense", move |txn| {
            Box::pin(async move {
                let item = find_item(txn, item_id).await?;
                let mut active: booking_item::ActiveModel = item.into();
                if let Some(status) = payment_status {
                    active.payment_status = Set(status);
                }
                if payment_method.is_some() {
                    active.payment_method = Set(payment_method);
                }
                active.updated_at = Set(Utc::now());
                Ok(active.update(txn).await?)
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to update item expense");
            e
        })?;

        info!(payment_status = %item.payment_status, "Item expense updated");
        ctx.event_sender
            .send_or_log(Event::ItemExpenseChanged {
                booking_id: item.booking_id,
                item_id,
                payment_status: item.payment_status,
            })
            .await;

        Ok(item)
    }
}
