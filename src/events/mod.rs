use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::message_queue::MessageQueue;
use crate::models::{ItemReservationStatus, PaymentStatus, VerifyStatus};
use crate::notifications::NotificationJob;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event after a commit. Failures are logged; the committed
    /// operation has already succeeded.
    pub async fn send_or_log(&self, event: Event) {
        let name = event.name();
        if let Err(e) = self.send(event).await {
            warn!(event = name, error = %e, "Failed to publish domain event");
        }
    }
}

/// Domain events published after a booking or amendment transaction commits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    BookingCreated {
        booking_id: Uuid,
        crm_id: String,
    },
    BookingUpdated(Uuid),
    BookingDeleted {
        booking_id: Uuid,
        crm_id: String,
        /// Booking with items and receipts as it was before deletion
        snapshot: serde_json::Value,
    },
    BookingVerified {
        booking_id: Uuid,
        verify_status: VerifyStatus,
    },
    BookingReassigned {
        booking_id: Uuid,
        previous_user_id: Uuid,
        user_id: Uuid,
        crm_id: String,
    },
    ItemReservationChanged {
        booking_id: Uuid,
        item_id: Uuid,
        old_status: ItemReservationStatus,
        new_status: ItemReservationStatus,
    },
    BookingConfirmed {
        booking_id: Uuid,
        crm_id: String,
    },
    ItemExpenseChanged {
        booking_id: Uuid,
        item_id: Uuid,
        payment_status: PaymentStatus,
    },
    AmendmentRequested {
        amendment_id: Uuid,
        booking_item_id: Uuid,
    },
    AmendmentApproved {
        amendment_id: Uuid,
        booking_item_id: Uuid,
    },
    AmendmentRejected {
        amendment_id: Uuid,
        booking_item_id: Uuid,
        reason: Option<String>,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::BookingCreated { .. } => "BookingCreated",
            Event::BookingUpdated(_) => "BookingUpdated",
            Event::BookingDeleted { .. } => "BookingDeleted",
            Event::BookingVerified { .. } => "BookingVerified",
            Event::BookingReassigned { .. } => "BookingReassigned",
            Event::ItemReservationChanged { .. } => "ItemReservationChanged",
            Event::BookingConfirmed { .. } => "BookingConfirmed",
            Event::ItemExpenseChanged { .. } => "ItemExpenseChanged",
            Event::AmendmentRequested { .. } => "AmendmentRequested",
            Event::AmendmentApproved { .. } => "AmendmentApproved",
            Event::AmendmentRejected { .. } => "AmendmentRejected",
        }
    }
}

/// Where jobs derived from events are delivered.
#[derive(Debug, Clone)]
pub struct JobRouting {
    pub ops_mailbox: String,
    pub max_retries: u32,
}

/// The job an event triggers, if any.
pub fn job_for_event(event: &Event, routing: &JobRouting) -> Option<NotificationJob> {
    let to = routing.ops_mailbox.clone();
    match event {
        Event::BookingConfirmed { booking_id, crm_id } => {
            Some(NotificationJob::ReservationConfirmed {
                booking_id: *booking_id,
                crm_id: crm_id.clone(),
                to,
            })
        }
        Event::AmendmentRequested {
            amendment_id,
            booking_item_id,
        } => Some(NotificationJob::AmendmentRequest {
            amendment_id: *amendment_id,
            booking_item_id: *booking_item_id,
            to,
        }),
        Event::AmendmentRejected {
            amendment_id,
            booking_item_id,
            reason,
        } => Some(NotificationJob::AmendmentRejected {
            amendment_id: *amendment_id,
            booking_item_id: *booking_item_id,
            reason: reason.clone(),
            to,
        }),
        Event::BookingDeleted {
            booking_id,
            crm_id,
            snapshot,
        } => Some(NotificationJob::ArchiveBooking {
            booking_id: *booking_id,
            crm_id: crm_id.clone(),
            snapshot: snapshot.clone(),
        }),
        _ => None,
    }
}

/// Consumes domain events and enqueues the jobs they trigger.
///
/// Returns when every sender has been dropped.
pub async fn process_events(
    mut rx: mpsc::Receiver<Event>,
    queue: Arc<dyn MessageQueue>,
    routing: JobRouting,
) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        debug!(event = event.name(), "Received event");

        let Some(job) = job_for_event(&event, &routing) else {
            continue;
        };

        let message = match job.into_message(routing.max_retries) {
            Ok(message) => message,
            Err(e) => {
                error!(event = event.name(), error = %e, "Failed to encode job");
                continue;
            }
        };

        let topic = message.topic.clone();
        if let Err(e) = queue.publish(message).await {
            error!(event = event.name(), topic = %topic, error = %e, "Failed to enqueue job");
        }
    }

    info!("Event channel closed; event processing stopped");
}
