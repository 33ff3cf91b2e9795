use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{error, info, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::booking_item_amendment,
    errors::ServiceError,
    message_queue::{Message, MessageQueue, MessageQueueError},
    models::amendment::decode_history,
    storage::{FileCategory, FileStorage},
};

pub const EMAIL_TOPIC: &str = "notifications.email";
pub const ARCHIVE_TOPIC: &str = "bookings.archive";

/// Work queued by the event processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationJob {
    ReservationConfirmed {
        booking_id: Uuid,
        crm_id: String,
        to: String,
    },
    AmendmentRequest {
        amendment_id: Uuid,
        booking_item_id: Uuid,
        to: String,
    },
    AmendmentRejected {
        amendment_id: Uuid,
        booking_item_id: Uuid,
        reason: Option<String>,
        to: String,
    },
    ArchiveBooking {
        booking_id: Uuid,
        crm_id: String,
        snapshot: serde_json::Value,
    },
}

impl NotificationJob {
    pub fn topic(&self) -> &'static str {
        match self {
            NotificationJob::ArchiveBooking { .. } => ARCHIVE_TOPIC,
            _ => EMAIL_TOPIC,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            NotificationJob::ReservationConfirmed { .. } => "reservation_confirmed",
            NotificationJob::AmendmentRequest { .. } => "amendment_request",
            NotificationJob::AmendmentRejected { .. } => "amendment_rejected",
            NotificationJob::ArchiveBooking { .. } => "archive_booking",
        }
    }

    pub fn into_message(self, max_retries: u32) -> Result<Message, MessageQueueError> {
        let topic = self.topic();
        let payload = serde_json::to_value(&self)
            .map_err(|e| MessageQueueError::SerializationError(e.to_string()))?;
        Ok(Message::new(topic, payload).with_max_retries(max_retries))
    }

    pub fn from_message(message: &Message) -> Result<Self, ServiceError> {
        serde_json::from_value(message.payload.clone()).map_err(ServiceError::from)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Mail transport error: {0}")]
    Transport(String),
    #[error("Invalid recipient: {0}")]
    InvalidRecipient(String),
}

impl From<MailError> for ServiceError {
    fn from(err: MailError) -> Self {
        ServiceError::InternalError(err.to_string())
    }
}

/// Outbound email transport.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &EmailMessage) -> Result<(), MailError>;
}

/// Mailer that writes messages to the log instead of delivering them.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &EmailMessage) -> Result<(), MailError> {
        if !email.to.contains('@') {
            return Err(MailError::InvalidRecipient(email.to.clone()));
        }
        info!(to = %email.to, subject = %email.subject, "Email dispatched");
        Ok(())
    }
}

/// Polls the job topics and executes jobs with the queue's retry semantics:
/// success acks, failure nacks.
pub struct NotificationWorker {
    queue: Arc<dyn MessageQueue>,
    mailer: Arc<dyn Mailer>,
    storage: Arc<dyn FileStorage>,
    db_pool: Arc<DbPool>,
    logger: Logger,
    poll_interval: Duration,
}

impl NotificationWorker {
    pub fn new(
        queue: Arc<dyn MessageQueue>,
        mailer: Arc<dyn Mailer>,
        storage: Arc<dyn FileStorage>,
        db_pool: Arc<DbPool>,
        logger: Logger,
    ) -> Self {
        Self {
            queue,
            mailer,
            storage,
            db_pool,
            logger,
            poll_interval: Duration::from_millis(500),
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Takes at most one message from each topic and executes it.
    /// Returns how many messages were handled.
    pub async fn process_next(&self) -> Result<usize, ServiceError> {
        let mut handled = 0;
        for topic in [EMAIL_TOPIC, ARCHIVE_TOPIC] {
            if let Some(message) = self.queue.subscribe(topic).await? {
                self.handle(message).await?;
                handled += 1;
            }
        }
        Ok(handled)
    }

    /// Runs until `shutdown` flips to true.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!("Notification worker started");
        loop {
            if *shutdown.borrow() {
                break;
            }
            match self.process_next().await {
                Ok(0) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        changed = shutdown.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "Notification worker poll failed");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
        info!("Notification worker stopped");
    }

    async fn handle(&self, message: Message) -> Result<(), ServiceError> {
        let outcome = match NotificationJob::from_message(&message) {
            Ok(job) => self.execute(&job).await.map(|_| job.kind()),
            Err(e) => Err(e),
        };

        match outcome {
            Ok(kind) => {
                slog::info!(self.logger, "job completed";
                    "kind" => kind,
                    "message_id" => %message.id,
                    "attempt" => message.retry_count + 1);
                self.queue.ack(&message.id).await?;
            }
            Err(e) => {
                slog::warn!(self.logger, "job failed";
                    "topic" => &message.topic,
                    "message_id" => %message.id,
                    "attempt" => message.retry_count + 1,
                    "max_retries" => message.max_retries,
                    "error" => %e);
                self.queue.nack(&message.id).await?;
            }
        }
        Ok(())
    }

    #[instrument(skip(self, job), fields(kind = job.kind()))]
    async fn execute(&self, job: &NotificationJob) -> Result<(), ServiceError> {
        match job {
            NotificationJob::ReservationConfirmed {
                booking_id,
                crm_id,
                to,
            } => {
                let email = EmailMessage {
                    to: to.clone(),
                    subject: format!("Reservation confirmed: {}", crm_id),
                    body: format!(
                        "All items of booking {} ({}) are reserved. The booking is now confirmed.",
                        crm_id, booking_id
                    ),
                };
                self.mailer.send(&email).await?;
            }
            NotificationJob::AmendmentRequest {
                amendment_id,
                booking_item_id,
                to,
            } => {
                let amendment = booking_item_amendment::Entity::find_by_id(*amendment_id)
                    .one(self.db_pool.as_ref())
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Amendment", amendment_id))?;
                let history = decode_history(&amendment.amend_history)?;
                let requested = history
                    .last()
                    .map(|entry| {
                        format!(
                            "{} requested: {}",
                            entry.requested_by_name,
                            serde_json::Value::Object(entry.changes.clone())
                        )
                    })
                    .unwrap_or_else(|| "No changes recorded.".to_string());

                let email = EmailMessage {
                    to: to.clone(),
                    subject: format!("Amendment request for booking item {}", booking_item_id),
                    body: requested,
                };
                self.mailer.send(&email).await?;

                let mut active: booking_item_amendment::ActiveModel = amendment.into();
                active.amend_mail_sent = Set(true);
                active.updated_at = Set(Utc::now());
                active.update(self.db_pool.as_ref()).await?;
            }
            NotificationJob::AmendmentRejected {
                booking_item_id,
                reason,
                to,
                ..
            } => {
                let email = EmailMessage {
                    to: to.clone(),
                    subject: format!("Amendment rejected for booking item {}", booking_item_id),
                    body: reason
                        .clone()
                        .unwrap_or_else(|| "No reason given.".to_string()),
                };
                self.mailer.send(&email).await?;
            }
            NotificationJob::ArchiveBooking {
                booking_id,
                crm_id,
                snapshot,
            } => {
                let bytes = serde_json::to_vec_pretty(snapshot)?;
                let name = format!("{}_{}.json", crm_id, booking_id);
                self.storage.put(FileCategory::Archives, &name, bytes).await?;
            }
        }
        Ok(())
    }
}
