mod common;

use assert_matches::assert_matches;
use common::{booking_payload, hotel_item, tour_item, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use sea_orm::EntityTrait;
use travelops_api::{
    commands::bookings::{CreateBookingCommand, UpdateBookingCommand},
    entities::catalog::group_tour,
    config::TotalsPolicy,
    errors::ServiceError,
    events::Event,
    models::{
        Actor, BookingReservationStatus, ChangesPayload, ItemReservationStatus, VerifyStatus,
    },
    storage::FileCategory,
};
use uuid::Uuid;

fn create_command(payload: serde_json::Value) -> CreateBookingCommand {
    serde_json::from_value(payload).expect("valid create payload")
}

fn update_command(payload: serde_json::Value) -> UpdateBookingCommand {
    serde_json::from_value(payload).expect("valid update payload")
}

#[tokio::test]
async fn create_assigns_crm_ids_in_input_order_and_prices_items() {
    let mut app = TestApp::new().await;
    let (hotel_id, room_id) = app.seed_hotel(dec!(1800)).await;
    let tour_id = app.seed_group_tour(dec!(250)).await;

    let details = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![hotel_item(hotel_id, room_id), tour_item(tour_id, 3)],
            "1350",
        )))
        .await
        .unwrap();

    assert_eq!(details.booking.crm_id, "TB00001");
    assert_eq!(details.booking.grand_total, dec!(1350));
    assert_eq!(details.booking.balance_due, dec!(1350));
    assert_eq!(
        details.booking.reservation_status,
        BookingReservationStatus::Awaiting
    );
    assert_eq!(details.booking.payment_currency, "THB");

    let crm_ids: Vec<_> = details.items.iter().map(|i| i.crm_id.as_str()).collect();
    assert_eq!(crm_ids, vec!["TB00001_001", "TB00001_002"]);
    // 2 rooms x 100 x 3 nights
    assert_eq!(details.items[0].amount, dec!(600));
    assert_eq!(details.items[1].amount, dec!(750));
    assert!(details
        .items
        .iter()
        .all(|i| i.reservation_status == ItemReservationStatus::Awaiting));

    assert_matches!(
        app.drain_events().as_slice(),
        [Event::BookingCreated { crm_id, .. }] if crm_id == "TB00001"
    );

    let second = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1)],
            "250",
        )))
        .await
        .unwrap();
    assert_eq!(second.booking.crm_id, "TB00002");
    assert_eq!(second.items[0].crm_id, "TB00002_001");
}

#[tokio::test]
async fn explicit_crm_id_must_be_unique() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;

    let mut payload = booking_payload(vec![tour_item(tour_id, 1)], "250");
    payload["crm_id"] = json!("VIP00042");
    let details = app
        .bookings
        .create_booking(create_command(payload.clone()))
        .await
        .unwrap();
    assert_eq!(details.items[0].crm_id, "VIP00042_001");

    assert_matches!(
        app.bookings.create_booking(create_command(payload)).await,
        Err(ServiceError::Conflict(_))
    );
}

#[tokio::test]
async fn failed_item_rolls_back_the_whole_booking() {
    let mut app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;

    let payload = booking_payload(
        vec![tour_item(tour_id, 1), tour_item(Uuid::new_v4(), 1)],
        "500",
    );
    assert_matches!(
        app.bookings.create_booking(create_command(payload)).await,
        Err(ServiceError::Conflict(msg)) if msg.contains("does not exist")
    );

    let page = app.bookings.list_bookings(1, 10).await.unwrap();
    assert_eq!(page.total, 0);
    assert!(app.drain_events().is_empty());
}

#[tokio::test]
async fn room_from_another_hotel_is_rejected() {
    let app = TestApp::new().await;
    let (hotel_id, _) = app.seed_hotel(dec!(1800)).await;
    let (_, foreign_room) = app.seed_hotel(dec!(900)).await;

    let payload = booking_payload(vec![hotel_item(hotel_id, foreign_room)], "600");
    assert_matches!(
        app.bookings.create_booking(create_command(payload)).await,
        Err(ServiceError::Conflict(msg)) if msg.contains("does not belong")
    );
}

#[tokio::test]
async fn create_validates_payload_before_writing() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;

    let empty = booking_payload(vec![], "0");
    assert_matches!(
        app.bookings.create_booking(create_command(empty)).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut hotel = hotel_item(Uuid::new_v4(), Uuid::new_v4());
    hotel["checkout_date"] = json!("2024-01-01");
    let same_day = booking_payload(vec![hotel], "0");
    assert_matches!(
        app.bookings.create_booking(create_command(same_day)).await,
        Err(ServiceError::ValidationError(_))
    );

    let mut inconsistent = booking_payload(vec![tour_item(tour_id, 1)], "250");
    inconsistent["grand_total"] = json!("300");
    assert_matches!(
        app.bookings.create_booking(create_command(inconsistent)).await,
        Err(ServiceError::ValidationError(msg)) if msg.contains("grand_total")
    );

    assert_eq!(app.bookings.list_bookings(1, 10).await.unwrap().total, 0);
}

#[tokio::test]
async fn update_reconciles_items_and_never_reuses_sequences() {
    let mut app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![
                tour_item(tour_id, 1),
                tour_item(tour_id, 2),
                tour_item(tour_id, 3),
            ],
            "1500",
        )))
        .await
        .unwrap();
    app.drain_events();
    let first = &created.items[0];

    // Keep item 1 with a new quantity, drop 2 and 3, add one new item.
    let updated = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "comment": "changed after call",
            "items": [
                { "id": first.id, "quantity": 4 },
                tour_item(tour_id, 1),
            ]
        })))
        .await
        .unwrap();

    let crm_ids: Vec<_> = updated.items.iter().map(|i| i.crm_id.as_str()).collect();
    assert_eq!(crm_ids, vec!["TB00001_001", "TB00001_004"]);
    assert_eq!(updated.items[0].id, first.id);
    assert_eq!(updated.items[0].amount, dec!(1000));
    assert_eq!(updated.booking.comment.as_deref(), Some("changed after call"));
    assert_matches!(app.drain_events().as_slice(), [Event::BookingUpdated(id)] if *id == created.booking.id);
}

#[tokio::test]
async fn sentinel_ids_create_new_items() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1)],
            "250",
        )))
        .await
        .unwrap();

    let mut blank = tour_item(tour_id, 1);
    blank["id"] = json!("");
    let mut undefined = tour_item(tour_id, 1);
    undefined["id"] = json!("undefined");
    let updated = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "items": [{ "id": created.items[0].id }, blank, undefined]
        })))
        .await
        .unwrap();

    assert_eq!(updated.items.len(), 3);
    assert_eq!(updated.items[2].crm_id, "TB00001_003");
}

#[tokio::test]
async fn resubmitting_the_same_items_is_idempotent() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1), tour_item(tour_id, 2)],
            "750",
        )))
        .await
        .unwrap();

    let same_items: Vec<_> = created
        .items
        .iter()
        .map(|i| json!({ "id": i.id }))
        .collect();
    let payload = json!({ "booking_id": created.booking.id, "items": same_items });

    let once = app
        .bookings
        .update_booking(update_command(payload.clone()))
        .await
        .unwrap();
    let twice = app
        .bookings
        .update_booking(update_command(payload))
        .await
        .unwrap();

    let summary = |items: &[travelops_api::entities::booking_item::Model]| {
        items
            .iter()
            .map(|i| (i.id, i.crm_id.clone(), i.quantity, i.amount))
            .collect::<Vec<_>>()
    };
    assert_eq!(summary(&once.items), summary(&created.items));
    assert_eq!(summary(&twice.items), summary(&once.items));
}

#[tokio::test]
async fn numbers_of_items_removed_earlier_are_not_reissued() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![
                tour_item(tour_id, 1),
                tour_item(tour_id, 1),
                tour_item(tour_id, 1),
            ],
            "750",
        )))
        .await
        .unwrap();
    let kept: Vec<_> = created.items[..2]
        .iter()
        .map(|i| json!({ "id": i.id }))
        .collect();

    let trimmed = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "items": kept.clone()
        })))
        .await
        .unwrap();
    assert_eq!(trimmed.items.len(), 2);

    let mut grown = kept;
    grown.push(tour_item(tour_id, 1));
    let updated = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "items": grown
        })))
        .await
        .unwrap();

    let crm_ids: Vec<_> = updated.items.iter().map(|i| i.crm_id.as_str()).collect();
    assert_eq!(crm_ids, vec!["TB00001_001", "TB00001_002", "TB00001_004"]);
    assert_eq!(updated.booking.last_item_sequence, 4);
}

#[tokio::test]
async fn retired_products_do_not_block_unchanged_items() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 2)],
            "500",
        )))
        .await
        .unwrap();

    group_tour::Entity::delete_by_id(tour_id)
        .exec(app.pool.as_ref())
        .await
        .unwrap();

    let item_id = created.items[0].id;
    let updated = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "items": [{ "id": item_id, "comment": "window seat" }]
        })))
        .await
        .unwrap();
    assert_eq!(updated.items[0].comment.as_deref(), Some("window seat"));

    // Pointing the item at another missing product is still checked.
    assert_matches!(
        app.bookings
            .update_booking(update_command(json!({
                "booking_id": created.booking.id,
                "items": [{ "id": item_id, "product_id": Uuid::new_v4() }]
            })))
            .await,
        Err(ServiceError::Conflict(_))
    );
}

#[tokio::test]
async fn foreign_item_id_fails_without_changes() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let ours = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1), tour_item(tour_id, 2)],
            "750",
        )))
        .await
        .unwrap();
    let theirs = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1)],
            "250",
        )))
        .await
        .unwrap();

    let result = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": ours.booking.id,
            "comment": "should not stick",
            "items": [{ "id": theirs.items[0].id }]
        })))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("does not belong"));

    let reloaded = app.bookings.get_booking(ours.booking.id).await.unwrap();
    assert_eq!(reloaded, ours);
}

#[tokio::test]
async fn removed_items_lose_files_and_amendments() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;

    let mut with_files = tour_item(tour_id, 1);
    with_files["receipt_image"] = json!("receipt-7.png");
    with_files["confirmation_letter"] = json!("letter-7.pdf");
    app.storage.seed(FileCategory::Images, "receipt-7.png");
    app.storage.seed(FileCategory::Files, "letter-7.pdf");

    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1), with_files],
            "500",
        )))
        .await
        .unwrap();
    let doomed = created.items[1].id;
    app.amendments
        .submit(
            doomed,
            ChangesPayload(json!({ "quantity": 2 })),
            None,
            Actor::system(),
        )
        .await
        .unwrap();

    app.bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "items": [{ "id": created.items[0].id }]
        })))
        .await
        .unwrap();

    assert!(!app.storage.contains(FileCategory::Images, "receipt-7.png"));
    assert!(!app.storage.contains(FileCategory::Files, "letter-7.pdf"));
    assert_matches!(
        app.bookings.get_item(doomed).await,
        Err(ServiceError::NotFound(_))
    );
    assert_eq!(app.amendments.amendment_for_item(doomed).await.unwrap(), None);
}

#[tokio::test]
async fn file_deletion_failures_do_not_abort_removal() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let mut with_file = tour_item(tour_id, 1);
    with_file["customer_attachment"] = json!("passport.jpg");

    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1), with_file],
            "500",
        )))
        .await
        .unwrap();

    app.storage.fail_deletes(true);
    let updated = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "items": [{ "id": created.items[0].id }]
        })))
        .await
        .unwrap();
    assert_eq!(updated.items.len(), 1);
}

#[tokio::test]
async fn replacing_an_attachment_deletes_the_old_file() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let mut item = tour_item(tour_id, 1);
    item["confirmation_letter"] = json!("letter-v1.pdf");
    app.storage.seed(FileCategory::Files, "letter-v1.pdf");

    let created = app
        .bookings
        .create_booking(create_command(booking_payload(vec![item], "250")))
        .await
        .unwrap();
    app.bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "items": [{ "id": created.items[0].id, "confirmation_letter": "letter-v2.pdf" }]
        })))
        .await
        .unwrap();

    assert_eq!(
        app.storage.deleted(),
        vec![(FileCategory::Files, "letter-v1.pdf".to_string())]
    );
}

#[tokio::test]
async fn booking_is_confirmed_once_every_item_is_reserved() {
    let mut app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1), tour_item(tour_id, 1)],
            "500",
        )))
        .await
        .unwrap();
    app.drain_events();

    let first = app
        .bookings
        .update_item_reservation_status(created.items[0].id, ItemReservationStatus::Reserved)
        .await
        .unwrap();
    assert!(!first.booking_confirmed);
    let booking = app.bookings.get_booking(created.booking.id).await.unwrap();
    assert_eq!(
        booking.booking.reservation_status,
        BookingReservationStatus::Awaiting
    );

    let second = app
        .bookings
        .update_item_reservation_status(created.items[1].id, ItemReservationStatus::Reserved)
        .await
        .unwrap();
    assert!(second.booking_confirmed);
    let booking = app.bookings.get_booking(created.booking.id).await.unwrap();
    assert_eq!(
        booking.booking.reservation_status,
        BookingReservationStatus::Confirmed
    );

    let events = app.drain_events();
    assert_eq!(events.len(), 3);
    assert_matches!(
        &events[2],
        Event::BookingConfirmed { crm_id, .. } if crm_id == "TB00001"
    );

    // Same status again changes nothing and publishes nothing.
    let repeat = app
        .bookings
        .update_item_reservation_status(created.items[1].id, ItemReservationStatus::Reserved)
        .await
        .unwrap();
    assert!(!repeat.booking_confirmed);
    assert!(app.drain_events().is_empty());
}

#[tokio::test]
async fn canceled_item_blocks_confirmation() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1), tour_item(tour_id, 1)],
            "500",
        )))
        .await
        .unwrap();

    app.bookings
        .update_item_reservation_status(created.items[0].id, ItemReservationStatus::Canceled)
        .await
        .unwrap();
    let change = app
        .bookings
        .update_item_reservation_status(created.items[1].id, ItemReservationStatus::Reserved)
        .await
        .unwrap();
    assert!(!change.booking_confirmed);
}

#[tokio::test]
async fn reassign_records_past_owner_and_renames_items() {
    let mut app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1), tour_item(tour_id, 1)],
            "500",
        )))
        .await
        .unwrap();
    app.drain_events();

    let new_owner = Uuid::new_v4();
    let reassigned = app
        .bookings
        .reassign_booking(created.booking.id, new_owner, Some("TB09000".to_string()))
        .await
        .unwrap();

    assert!(reassigned.booking.is_past_info);
    assert_eq!(reassigned.booking.past_user_id, Some(created.booking.user_id));
    assert_eq!(reassigned.booking.past_crm_id.as_deref(), Some("TB00001"));
    assert_eq!(reassigned.booking.user_id, new_owner);
    let crm_ids: Vec<_> = reassigned.items.iter().map(|i| i.crm_id.as_str()).collect();
    assert_eq!(crm_ids, vec!["TB09000_001", "TB09000_002"]);
    assert_matches!(
        app.drain_events().as_slice(),
        [Event::BookingReassigned { previous_user_id, .. }] if *previous_user_id == created.booking.user_id
    );
}

#[tokio::test]
async fn verify_and_expense_updates_are_independent() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 1)],
            "250",
        )))
        .await
        .unwrap();

    let verified = app
        .bookings
        .verify_booking(created.booking.id, VerifyStatus::Verified)
        .await
        .unwrap();
    assert_eq!(verified.verify_status, VerifyStatus::Verified);

    let item = app
        .bookings
        .update_item_expense(
            created.items[0].id,
            Some(travelops_api::models::PaymentStatus::FullyPaid),
            Some("cash".to_string()),
        )
        .await
        .unwrap();
    assert_eq!(
        item.payment_status,
        travelops_api::models::PaymentStatus::FullyPaid
    );
    let booking = app.bookings.get_booking(created.booking.id).await.unwrap();
    assert_eq!(
        booking.booking.payment_status,
        travelops_api::models::PaymentStatus::NotPaid
    );
}

#[tokio::test]
async fn delete_removes_everything_and_publishes_a_snapshot() {
    let mut app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let mut payload = booking_payload(vec![tour_item(tour_id, 1)], "250");
    payload["receipts"] = json!([{ "image": "slip-1.png", "note": "deposit" }]);
    app.storage.seed(FileCategory::Images, "slip-1.png");

    let created = app
        .bookings
        .create_booking(create_command(payload))
        .await
        .unwrap();
    assert_eq!(created.receipts.len(), 1);
    app.amendments
        .submit(
            created.items[0].id,
            ChangesPayload(json!({ "note": "late checkout" })),
            None,
            Actor::system(),
        )
        .await
        .unwrap();
    app.drain_events();

    app.bookings.delete_booking(created.booking.id).await.unwrap();

    assert_matches!(
        app.bookings.get_booking(created.booking.id).await,
        Err(ServiceError::NotFound(_))
    );
    assert!(!app.storage.contains(FileCategory::Images, "slip-1.png"));
    let events = app.drain_events();
    assert_matches!(
        events.as_slice(),
        [Event::BookingDeleted { crm_id, snapshot, .. }]
            if crm_id == "TB00001" && snapshot["items"][0]["crm_id"] == "TB00001_001"
    );
}

#[tokio::test]
async fn always_policy_rejects_inconsistent_update() {
    let app = TestApp::with_policy(TotalsPolicy::Always).await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 4)],
            "1000",
        )))
        .await
        .unwrap();

    let result = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "discount": "100"
        })))
        .await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("grand_total"));

    let consistent = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "discount": "100",
            "grand_total": "900",
            "deposit": "300",
            "balance_due": "600"
        })))
        .await
        .unwrap();
    assert_eq!(consistent.booking.balance_due, dec!(600));
}

#[tokio::test]
async fn default_policy_accepts_manual_totals_on_update() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    let created = app
        .bookings
        .create_booking(create_command(booking_payload(
            vec![tour_item(tour_id, 4)],
            "1000",
        )))
        .await
        .unwrap();

    let updated = app
        .bookings
        .update_booking(update_command(json!({
            "booking_id": created.booking.id,
            "grand_total": "950"
        })))
        .await
        .unwrap();
    assert_eq!(updated.booking.grand_total, dec!(950));
}

#[tokio::test]
async fn list_is_paginated_newest_first() {
    let app = TestApp::new().await;
    let tour_id = app.seed_group_tour(dec!(250)).await;
    for _ in 0..3 {
        app.bookings
            .create_booking(create_command(booking_payload(
                vec![tour_item(tour_id, 1)],
                "250",
            )))
            .await
            .unwrap();
    }

    let page = app.bookings.list_bookings(1, 2).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.bookings.len(), 2);
    assert_eq!(page.bookings[0].crm_id, "TB00003");

    assert_matches!(
        app.bookings.list_bookings(0, 2).await,
        Err(ServiceError::ValidationError(_))
    );
}
