use crate::{
    commands::{Command, CommandContext},
    db,
    errors::ServiceError,
    events::Event,
    models::{Actor, AmendStatus, AmendmentEntry, AmendmentView, ChangeSet, ChangesPayload},
};
use chrono::Utc;
use lazy_static::lazy_static;
use prometheus::IntCounter;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::append_entry;

lazy_static! {
    static ref AMENDMENT_REQUESTS: IntCounter = IntCounter::new(
        "amendment_requests_total",
        "Total number of amendment requests recorded"
    )
    .expect("metric can be created");
}

/// Requests a change to a booking item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAmendmentCommand {
    pub booking_item_id: Uuid,
    pub changes: ChangesPayload,
    pub amend_status: Option<AmendStatus>,
    pub actor: Actor,
}

#[async_trait::async_trait]
impl Command for SubmitAmendmentCommand {
    type Result = AmendmentView;

    #[instrument(skip(self, ctx), fields(booking_item_id = %self.booking_item_id, actor = %self.actor.name))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let changes = self.changes.clone().decode().map_err(|e| {
            error!(error = %e, "Rejected malformed amendment payload");
            e
        })?;

        let now = Utc::now();
        let entry = AmendmentEntry::new(ChangeSet::split(changes), &self.actor, now);
        let booking_item_id = self.booking_item_id;
        let status = self.amend_status.unwrap_or_default();

        let record = db::transaction(&ctx.db_pool, "amendment.submit", move |txn| {
            Box::pin(async move { append_entry(txn, booking_item_id, entry, status, now).await })
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to record amendment request");
            e
        })?;

        let view = AmendmentView::try_from(record)?;
        info!(
            amendment_id = %view.id,
            entries = view.amend_history.len(),
            "Amendment requested"
        );
        ctx.event_sender
            .send_or_log(Event::AmendmentRequested {
                amendment_id: view.id,
                booking_item_id,
            })
            .await;
        AMENDMENT_REQUESTS.inc();

        Ok(view)
    }
}
