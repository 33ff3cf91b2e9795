use crate::{
    commands::{BookingSettings, Command, CommandContext},
    db,
    entities::{booking, booking_item, booking_receipt},
    errors::ServiceError,
    events::Event,
    models::{crm, PaymentStatus},
    repositories::booking_repository::{
        delete_item_rows, find_booking, items_of, load_details, BookingDetails,
    },
    services::catalog::resolve_product,
    storage::FileStorage,
};
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{
    delete_files_best_effort, item_files, promote_if_all_reserved,
    totals::{Stage, Totals},
    validate_receipts, BookingItemInput, ItemDraft, ReceiptInput, StoredFile,
};

lazy_static! {
    static ref BOOKING_UPDATES: IntCounter =
        IntCounter::new("booking_updates_total", "Total number of bookings updated")
            .expect("metric can be created");
    static ref BOOKING_UPDATE_FAILURES: IntCounter = IntCounter::new(
        "booking_update_failures_total",
        "Total number of failed booking updates"
    )
    .expect("metric can be created");
}

/// Booking-level fields; `None` keeps the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BookingPatch {
    pub customer_id: Option<Uuid>,
    pub sold_from: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    #[validate(length(equal = 3, message = "payment_currency must be an ISO 4217 code"))]
    pub payment_currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub sub_total: Option<Decimal>,
    pub discount: Option<Decimal>,
    pub grand_total: Option<Decimal>,
    pub deposit: Option<Decimal>,
    pub balance_due: Option<Decimal>,
    pub balance_due_date: Option<NaiveDate>,
    pub booking_date: Option<NaiveDate>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateBookingCommand {
    pub booking_id: Uuid,
    #[serde(flatten)]
    #[validate]
    pub patch: BookingPatch,
    /// Replacement item list. `None` leaves items untouched; an empty list
    /// removes every item.
    pub items: Option<Vec<BookingItemInput>>,
    /// Receipts appended to the booking
    #[serde(default)]
    pub receipts: Vec<ReceiptInput>,
}

/// What an item list does to the stored items.
#[derive(Debug)]
enum ItemChange {
    Update {
        stored: Box<booking_item::Model>,
        draft: ItemDraft,
    },
    Create(ItemDraft),
}

impl ItemChange {
    /// The draft when it points at a product the item did not already hold.
    /// Unchanged references were checked when first stored.
    fn new_reference(&self) -> Option<&ItemDraft> {
        match self {
            ItemChange::Create(draft) => Some(draft),
            ItemChange::Update { stored, draft } => match stored.product_ref() {
                Ok(current) if current == draft.product => None,
                _ => Some(draft),
            },
        }
    }
}

#[derive(Debug)]
struct Reconciliation {
    changes: Vec<ItemChange>,
    removed: Vec<booking_item::Model>,
    next_sequence: u32,
}

/// Matches the incoming list against stored items. Fails before any write
/// when an id is foreign to the booking or repeated.
///
/// `last_issued` is the booking's high-water mark, so numbers of items removed
/// by earlier updates are never handed out again.
fn reconcile(
    booking_id: Uuid,
    last_issued: u32,
    stored: Vec<booking_item::Model>,
    inputs: &[BookingItemInput],
) -> Result<Reconciliation, ServiceError> {
    let next_sequence = crm::next_item_sequence(
        stored
            .iter()
            .filter_map(|item| item.sequence())
            .chain(std::iter::once(last_issued)),
    );
    let mut by_id: HashMap<Uuid, booking_item::Model> =
        stored.into_iter().map(|item| (item.id, item)).collect();
    let mut seen = HashSet::new();
    let mut changes = Vec::with_capacity(inputs.len());

    for (idx, input) in inputs.iter().enumerate() {
        let position = idx + 1;
        match input.id {
            Some(id) => {
                if !seen.insert(id) {
                    return Err(ServiceError::ValidationError(format!(
                        "item {}: id {} appears more than once",
                        position, id
                    )));
                }
                let stored = by_id.remove(&id).ok_or_else(|| {
                    ServiceError::ValidationError(format!(
                        "item {}: id {} does not belong to booking {}",
                        position, id, booking_id
                    ))
                })?;
                let draft = input.draft_update(&stored, position)?;
                changes.push(ItemChange::Update {
                    stored: Box::new(stored),
                    draft,
                });
            }
            None => changes.push(ItemChange::Create(input.draft_new(position)?)),
        }
    }

    let mut removed: Vec<_> = by_id.into_values().collect();
    removed.sort_by(|a, b| a.crm_id.cmp(&b.crm_id));

    Ok(Reconciliation {
        changes,
        removed,
        next_sequence,
    })
}

/// Result of the transactional part of an update.
struct UpdateOutcome {
    details: BookingDetails,
    confirmed: bool,
    replaced_files: Vec<StoredFile>,
}

#[async_trait::async_trait]
impl Command for UpdateBookingCommand {
    type Result = BookingDetails;

    #[instrument(skip(self, ctx), fields(booking_id = %self.booking_id))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        self.check_payload().map_err(|e| {
            BOOKING_UPDATE_FAILURES.inc();
            error!(error = %e, "Invalid booking update payload");
            e
        })?;

        let command = self.clone();
        let settings = ctx.settings.clone();
        let storage = ctx.storage.clone();
        let outcome = db::transaction(&ctx.db_pool, "booking.update", move |txn| {
            Box::pin(async move { apply(txn, command, &settings, &storage).await })
        })
        .await
        .map_err(|e| {
            BOOKING_UPDATE_FAILURES.inc();
            error!(error = %e, "Failed to update booking");
            e
        })?;

        // Old attachments go only once the new names are committed.
        delete_files_best_effort(&ctx.storage, &outcome.replaced_files).await;

        let booking = &outcome.details.booking;
        info!(
            crm_id = %booking.crm_id,
            items_count = outcome.details.items.len(),
            "Booking updated successfully"
        );
        ctx.event_sender
            .send_or_log(Event::BookingUpdated(booking.id))
            .await;
        if outcome.confirmed {
            ctx.event_sender
                .send_or_log(Event::BookingConfirmed {
                    booking_id: booking.id,
                    crm_id: booking.crm_id.clone(),
                })
                .await;
        }
        BOOKING_UPDATES.inc();

        Ok(outcome.details)
    }
}

impl UpdateBookingCommand {
    /// Checks that need no stored state.
    fn check_payload(&self) -> Result<(), ServiceError> {
        self.validate()?;
        for (field, value) in [
            ("sub_total", self.patch.sub_total),
            ("discount", self.patch.discount),
            ("grand_total", self.patch.grand_total),
            ("deposit", self.patch.deposit),
            ("balance_due", self.patch.balance_due),
        ] {
            if matches!(value, Some(v) if v < Decimal::ZERO) {
                return Err(ServiceError::ValidationError(format!(
                    "{} must not be negative",
                    field
                )));
            }
        }
        if matches!(self.patch.exchange_rate, Some(rate) if rate <= Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "exchange_rate must be positive".to_string(),
            ));
        }
        validate_receipts(&self.receipts)
    }
}

/// Patched totals. Supplied values are taken as manual overrides.
fn patched_totals(stored: &booking::Model, patch: &BookingPatch) -> Totals {
    Totals {
        sub_total: patch.sub_total.unwrap_or(stored.sub_total),
        discount: patch.discount.unwrap_or(stored.discount),
        grand_total: patch.grand_total.unwrap_or(stored.grand_total),
        deposit: patch.deposit.unwrap_or(stored.deposit),
        balance_due: patch.balance_due.unwrap_or(stored.balance_due),
    }
}

async fn apply(
    txn: &DatabaseTransaction,
    command: UpdateBookingCommand,
    settings: &BookingSettings,
    storage: &Arc<dyn FileStorage>,
) -> Result<UpdateOutcome, ServiceError> {
    let stored_booking = find_booking(txn, command.booking_id).await?;

    let totals = patched_totals(&stored_booking, &command.patch);
    totals.check_non_negative()?;
    totals.enforce(settings.totals_policy, Stage::Update)?;

    let reconciliation = match &command.items {
        Some(inputs) => {
            let stored_items = items_of(txn, stored_booking.id).await?;
            Some(reconcile(
                stored_booking.id,
                crm::sequence_from_column(stored_booking.last_item_sequence),
                stored_items,
                inputs,
            )?)
        }
        None => None,
    };

    if settings.enforce_product_integrity {
        if let Some(plan) = &reconciliation {
            for draft in plan.changes.iter().filter_map(ItemChange::new_reference) {
                resolve_product(txn, &draft.product).await?;
            }
        }
    }

    let now = Utc::now();
    let booking_id = stored_booking.id;
    let booking_crm_id = stored_booking.crm_id.clone();
    let mut replaced_files = Vec::new();
    let mut last_issued = None;

    if let Some(plan) = reconciliation {
        for item in &plan.removed {
            delete_files_best_effort(storage, &item_files(item)).await;
            delete_item_rows(txn, item.id).await?;
            info!(item_id = %item.id, crm_id = %item.crm_id, "Removed booking item");
        }

        let mut sequence = plan.next_sequence;
        for change in plan.changes {
            match change {
                ItemChange::Update { stored, draft } => {
                    replaced_files.extend(draft.replaced_files(&stored));
                    draft.update_model(*stored, now).update(txn).await?;
                }
                ItemChange::Create(draft) => {
                    let item_crm_id = crm::item_crm_id(&booking_crm_id, sequence);
                    draft
                        .insert_model(booking_id, item_crm_id, now)
                        .insert(txn)
                        .await?;
                    last_issued = Some(sequence);
                    sequence += 1;
                }
            }
        }
    }

    for receipt in command.receipts {
        booking_receipt::ActiveModel {
            id: Set(Uuid::new_v4()),
            booking_id: Set(booking_id),
            image: Set(receipt.image),
            note: Set(receipt.note),
            created_at: Set(now),
        }
        .insert(txn)
        .await?;
    }

    let patch = command.patch;
    let mut active: booking::ActiveModel = stored_booking.into();
    if let Some(customer_id) = patch.customer_id {
        active.customer_id = Set(customer_id);
    }
    if patch.sold_from.is_some() {
        active.sold_from = Set(patch.sold_from);
    }
    if patch.payment_method.is_some() {
        active.payment_method = Set(patch.payment_method);
    }
    if let Some(status) = patch.payment_status {
        active.payment_status = Set(status);
    }
    if let Some(currency) = patch.payment_currency {
        active.payment_currency = Set(currency);
    }
    if patch.exchange_rate.is_some() {
        active.exchange_rate = Set(patch.exchange_rate);
    }
    if patch.balance_due_date.is_some() {
        active.balance_due_date = Set(patch.balance_due_date);
    }
    if let Some(date) = patch.booking_date {
        active.booking_date = Set(date);
    }
    if patch.comment.is_some() {
        active.comment = Set(patch.comment);
    }
    active.sub_total = Set(totals.sub_total);
    active.discount = Set(totals.discount);
    active.grand_total = Set(totals.grand_total);
    active.deposit = Set(totals.deposit);
    active.balance_due = Set(totals.balance_due);
    if let Some(sequence) = last_issued {
        active.last_item_sequence = Set(crm::sequence_column(sequence));
    }
    active.updated_at = Set(now);
    let updated = active.update(txn).await?;

    let confirmed = promote_if_all_reserved(txn, updated).await?.is_some();
    let details = load_details(txn, booking_id).await?;

    Ok(UpdateOutcome {
        details,
        confirmed,
        replaced_files,
    })
}
