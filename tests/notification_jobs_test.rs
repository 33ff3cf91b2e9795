mod common;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use common::{booking_payload, tour_item, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use slog::{o, Discard, Logger};
use travelops_api::{
    commands::bookings::CreateBookingCommand,
    events::{process_events, JobRouting},
    message_queue::{InMemoryMessageQueue, MessageQueue},
    models::{Actor, ChangesPayload, ItemReservationStatus},
    notifications::{
        EmailMessage, MailError, Mailer, NotificationWorker, ARCHIVE_TOPIC, EMAIL_TOPIC,
    },
    repositories::booking_repository::BookingDetails,
    storage::{FileCategory, FileStorage},
};

const OPS: &str = "ops@travelops.test";

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<EmailMessage>>,
    attempts: Mutex<u32>,
    fail: bool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn sent(&self) -> Vec<EmailMessage> {
        self.sent.lock().unwrap().clone()
    }

    fn attempts(&self) -> u32 {
        *self.attempts.lock().unwrap()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: &EmailMessage) -> Result<(), MailError> {
        *self.attempts.lock().unwrap() += 1;
        if self.fail {
            return Err(MailError::Transport("smtp unavailable".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Wires the event channel of `app` into a job queue and returns the queue.
fn start_event_pipeline(app: &mut TestApp, max_retries: u32) -> Arc<InMemoryMessageQueue> {
    let queue = Arc::new(InMemoryMessageQueue::new());
    let (_, placeholder) = tokio::sync::mpsc::channel(1);
    let rx = std::mem::replace(&mut app.events, placeholder);
    tokio::spawn(process_events(
        rx,
        queue.clone(),
        JobRouting {
            ops_mailbox: OPS.to_string(),
            max_retries,
        },
    ));
    queue
}

async fn wait_for_job(queue: &InMemoryMessageQueue, topic: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while queue.pending(topic) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job was never enqueued");
}

fn worker(
    app: &TestApp,
    queue: Arc<InMemoryMessageQueue>,
    mailer: Arc<RecordingMailer>,
) -> NotificationWorker {
    NotificationWorker::new(
        queue,
        mailer,
        app.storage.clone(),
        app.pool.clone(),
        Logger::root(Discard, o!()),
    )
}

async fn create_booking(app: &TestApp, item_count: usize) -> BookingDetails {
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let items = (0..item_count).map(|_| tour_item(tour_id, 1)).collect();
    let sub_total = (250 * item_count).to_string();
    let command: CreateBookingCommand =
        serde_json::from_value(booking_payload(items, &sub_total)).unwrap();
    app.bookings.create_booking(command).await.unwrap()
}

#[tokio::test]
async fn amendment_email_marks_the_record_as_mailed() {
    let mut app = TestApp::new().await;
    let queue = start_event_pipeline(&mut app, 3);
    let details = create_booking(&app, 1).await;

    let view = app
        .amendments
        .submit(
            details.items[0].id,
            ChangesPayload(json!({ "quantity": 2, "current_quantity": 1 })),
            None,
            Actor::system(),
        )
        .await
        .unwrap();
    assert!(!view.amend_mail_sent);

    wait_for_job(&queue, EMAIL_TOPIC).await;
    let mailer = Arc::new(RecordingMailer::default());
    let handled = worker(&app, queue.clone(), mailer.clone())
        .process_next()
        .await
        .unwrap();
    assert_eq!(handled, 1);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, OPS);
    assert!(sent[0].body.contains("quantity"));
    assert!(!sent[0].body.contains("current_quantity"));

    let reloaded = app.amendments.get_amendment(view.id).await.unwrap();
    assert!(reloaded.amend_mail_sent);
}

#[tokio::test]
async fn confirmation_sends_a_reservation_email() {
    let mut app = TestApp::new().await;
    let queue = start_event_pipeline(&mut app, 3);
    let details = create_booking(&app, 1).await;

    app.bookings
        .update_item_reservation_status(details.items[0].id, ItemReservationStatus::Reserved)
        .await
        .unwrap();

    wait_for_job(&queue, EMAIL_TOPIC).await;
    let mailer = Arc::new(RecordingMailer::default());
    worker(&app, queue.clone(), mailer.clone())
        .process_next()
        .await
        .unwrap();

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, "Reservation confirmed: TB00001");
}

#[tokio::test]
async fn failing_job_is_retried_then_dead_lettered() {
    let mut app = TestApp::new().await;
    let queue = start_event_pipeline(&mut app, 2);
    let details = create_booking(&app, 1).await;

    app.amendments
        .submit(
            details.items[0].id,
            ChangesPayload(json!({ "quantity": 2 })),
            None,
            Actor::system(),
        )
        .await
        .unwrap();
    wait_for_job(&queue, EMAIL_TOPIC).await;

    let mailer = Arc::new(RecordingMailer::failing());
    let worker = worker(&app, queue.clone(), mailer.clone());
    while worker.process_next().await.unwrap() > 0 {}

    // First attempt plus two retries.
    assert_eq!(mailer.attempts(), 3);
    let dead = queue.dead_letters().await.unwrap();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].retry_count, 2);
    assert_eq!(queue.pending(EMAIL_TOPIC), 0);

    let amendment = app
        .amendments
        .amendment_for_item(details.items[0].id)
        .await
        .unwrap()
        .unwrap();
    assert!(!amendment.amend_mail_sent);
}

#[tokio::test]
async fn deleted_booking_is_archived() {
    let mut app = TestApp::new().await;
    let queue = start_event_pipeline(&mut app, 3);
    let details = create_booking(&app, 2).await;

    app.bookings
        .delete_booking(details.booking.id)
        .await
        .unwrap();
    wait_for_job(&queue, ARCHIVE_TOPIC).await;

    let mailer = Arc::new(RecordingMailer::default());
    worker(&app, queue.clone(), mailer.clone())
        .process_next()
        .await
        .unwrap();

    let archived = app.storage.stored(FileCategory::Archives);
    assert_eq!(
        archived,
        vec![format!("TB00001_{}.json", details.booking.id)]
    );
    let bytes = app
        .storage
        .read(FileCategory::Archives, &archived[0])
        .await
        .unwrap();
    let snapshot: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(snapshot["items"].as_array().map(Vec::len), Some(2));
    assert!(mailer.sent().is_empty());
}
