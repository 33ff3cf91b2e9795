use slog::Logger;
use uuid::Uuid;

use crate::{
    commands::{
        amendments::{
            ApproveAmendmentCommand, RejectAmendmentCommand, SubmitAmendmentCommand,
            UpdateAmendmentCommand,
        },
        Command, CommandContext,
    },
    errors::ServiceError,
    logging::{audit_failure, audit_success},
    models::{Actor, AmendStatus, AmendmentView, ChangesPayload},
    repositories::amendment_repository::AmendmentRepository,
};

/// Amendment requests on booking items. The acting user is always explicit.
#[derive(Clone)]
pub struct AmendmentService {
    ctx: CommandContext,
    repository: AmendmentRepository,
    audit: Logger,
}

impl AmendmentService {
    pub fn new(ctx: CommandContext, audit: Logger) -> Self {
        let repository = AmendmentRepository::new(ctx.db_pool.clone());
        Self {
            ctx,
            repository,
            audit,
        }
    }

    async fn run<C>(
        &self,
        operation: &'static str,
        subject: Uuid,
        command: C,
    ) -> Result<AmendmentView, ServiceError>
    where
        C: Command<Result = AmendmentView>,
    {
        let subject = subject.to_string();
        command
            .execute(&self.ctx)
            .await
            .map(|view| {
                audit_success(&self.audit, operation, &subject);
                view
            })
            .map_err(|e| {
                audit_failure(&self.audit, operation, &subject, &e);
                e
            })
    }

    pub async fn submit(
        &self,
        booking_item_id: Uuid,
        changes: ChangesPayload,
        amend_status: Option<AmendStatus>,
        actor: Actor,
    ) -> Result<AmendmentView, ServiceError> {
        let command = SubmitAmendmentCommand {
            booking_item_id,
            changes,
            amend_status,
            actor,
        };
        self.run("amendment.submit", booking_item_id, command).await
    }

    pub async fn reject(
        &self,
        amendment_id: Uuid,
        reason: Option<String>,
        actor: Actor,
    ) -> Result<AmendmentView, ServiceError> {
        let command = RejectAmendmentCommand {
            amendment_id,
            reason,
            actor,
        };
        self.run("amendment.reject", amendment_id, command).await
    }

    pub async fn approve(
        &self,
        amendment_id: Uuid,
        actor: Actor,
    ) -> Result<AmendmentView, ServiceError> {
        let command = ApproveAmendmentCommand {
            amendment_id,
            actor,
        };
        self.run("amendment.approve", amendment_id, command).await
    }

    pub async fn update(
        &self,
        command: UpdateAmendmentCommand,
    ) -> Result<AmendmentView, ServiceError> {
        let subject = command.amendment_id;
        self.run("amendment.update", subject, command).await
    }

    pub async fn get_amendment(&self, amendment_id: Uuid) -> Result<AmendmentView, ServiceError> {
        self.repository.get_amendment(amendment_id).await
    }

    pub async fn amendment_for_item(
        &self,
        booking_item_id: Uuid,
    ) -> Result<Option<AmendmentView>, ServiceError> {
        self.repository.amendment_for_item(booking_item_id).await
    }
}
