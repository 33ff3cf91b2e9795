use crate::{
    commands::{Command, CommandContext},
    db,
    entities::booking_item_amendment,
    errors::ServiceError,
    events::Event,
    models::{Actor, AmendStatus, AmendmentEntry, AmendmentView, ChangeSet, ChangesPayload},
    repositories::amendment_repository::find_amendment,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, Set};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;

use super::append_entry;

/// Partial update of an amendment record. Each field is applied on its own;
/// `changes` is appended the same way a submission is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAmendmentCommand {
    pub amendment_id: Uuid,
    pub amend_request: Option<bool>,
    pub amend_mail_sent: Option<bool>,
    pub amend_approve: Option<bool>,
    pub amend_status: Option<AmendStatus>,
    pub changes: Option<ChangesPayload>,
    pub actor: Actor,
}

impl UpdateAmendmentCommand {
    fn is_empty(&self) -> bool {
        self.amend_request.is_none()
            && self.amend_mail_sent.is_none()
            && self.amend_approve.is_none()
            && self.amend_status.is_none()
            && self.changes.is_none()
    }
}

#[async_trait::async_trait]
impl Command for UpdateAmendmentCommand {
    type Result = AmendmentView;

    #[instrument(skip(self, ctx), fields(amendment_id = %self.amendment_id, actor = %self.actor.name))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        if self.is_empty() {
            return Err(ServiceError::ValidationError(
                "nothing to update".to_string(),
            ));
        }

        let now = Utc::now();
        let entry = match &self.changes {
            Some(payload) => Some(AmendmentEntry::new(
                ChangeSet::split(payload.clone().decode()?),
                &self.actor,
                now,
            )),
            None => None,
        };
        let appended = entry.is_some();
        let command = self.clone();

        let record = db::transaction(&ctx.db_pool, "amendment.update", move |txn| {
            Box::pin(async move {
                let mut record = find_amendment(txn, command.amendment_id).await?;
                if let Some(entry) = entry {
                    let status = command.amend_status.unwrap_or(AmendStatus::Pending);
                    record = append_entry(txn, record.booking_item_id, entry, status, now).await?;
                }

                let mut active: booking_item_amendment::ActiveModel = record.into();
                if let Some(flag) = command.amend_request {
                    active.amend_request = Set(flag);
                }
                if let Some(flag) = command.amend_mail_sent {
                    active.amend_mail_sent = Set(flag);
                }
                if let Some(flag) = command.amend_approve {
                    active.amend_approve = Set(flag);
                }
                if let Some(status) = command.amend_status {
                    active.amend_status = Set(status);
                }
                active.updated_at = Set(now);
                Ok(active.update(txn).await?)
            })
        })
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to update amendment");
            e
        })?;

        let view = AmendmentView::try_from(record)?;
        info!(
            amend_status = %view.amend_status,
            appended,
            "Amendment updated"
        );
        if appended {
            ctx.event_sender
                .send_or_log(Event::AmendmentRequested {
                    amendment_id: view.id,
                    booking_item_id: view.booking_item_id,
                })
                .await;
        }

        Ok(view)
    }
}
