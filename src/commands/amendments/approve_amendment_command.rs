use crate::{
    commands::{Command, CommandContext},
    db,
    errors::ServiceError,
    events::Event,
    models::{Actor, AmendStatus, AmendmentView},
    repositories::amendment_repository::find_amendment,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::decide;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveAmendmentCommand {
    pub amendment_id: Uuid,
    pub actor: Actor,
}

#[async_trait::async_trait]
impl Command for ApproveAmendmentCommand {
    type Result = AmendmentView;

    #[instrument(skip(self, ctx), fields(amendment_id = %self.amendment_id, actor = %self.actor.name))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let amendment_id = self.amendment_id;
        let actor = self.actor.clone();

        let record = db::transaction(&ctx.db_pool, "amendment.approve", move |txn| {
            Box::pin(async move {
                let record = find_amendment(txn, amendment_id).await?;
                decide(txn, record, AmendStatus::Approved, None, &actor, Utc::now()).await
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to approve amendment");
            e
        })?;

        let view = AmendmentView::try_from(record)?;
        info!(booking_item_id = %view.booking_item_id, "Amendment approved");
        ctx.event_sender
            .send_or_log(Event::AmendmentApproved {
                amendment_id,
                booking_item_id: view.booking_item_id,
            })
            .await;

        Ok(view)
    }
}
