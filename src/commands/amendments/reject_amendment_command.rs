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
pub struct RejectAmendmentCommand {
    pub amendment_id: Uuid,
    pub reason: Option<String>,
    pub actor: Actor,
}

#[async_trait::async_trait]
impl Command for RejectAmendmentCommand {
    type Result = AmendmentView;

    #[instrument(skip(self, ctx), fields(amendment_id = %self.amendment_id, actor = %self.actor.name))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let amendment_id = self.amendment_id;
        let reason = self.reason.clone();
        let actor = self.actor.clone();

        let record = db::transaction(&ctx.db_pool, "amendment.reject", move |txn| {
            Box::pin(async move {
                let record = find_amendment(txn, amendment_id).await?;
                decide(txn, record, AmendStatus::Rejected, reason, &actor, Utc::now()).await
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to reject amendment");
            e
        })?;

        let view = AmendmentView::try_from(record)?;
        info!(booking_item_id = %view.booking_item_id, "Amendment rejected");
        ctx.event_sender
            .send_or_log(Event::AmendmentRejected {
                amendment_id,
                booking_item_id: view.booking_item_id,
                reason: self.reason.clone(),
            })
            .await;

        Ok(view)
    }
}
