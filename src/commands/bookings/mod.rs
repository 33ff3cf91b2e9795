//! Commands on the booking aggregate: a booking, its line items and receipts.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::{
    entities::{booking, booking_item},
    errors::ServiceError,
    models::{
        product::line_total, BookingReservationStatus, ItemReservationStatus, PaymentStatus,
        ProductRef, ProductType, SubSelectors,
    },
    repositories::booking_repository::items_of,
    storage::{validate_file_name, FileCategory, FileStorage},
};

pub mod create_booking_command;
pub mod delete_booking_command;
pub mod reassign_booking_command;
pub mod totals;
pub mod update_booking_command;
pub mod update_item_expense_command;
pub mod update_item_reservation_status_command;
pub mod verify_booking_command;

pub use create_booking_command::CreateBookingCommand;
pub use delete_booking_command::DeleteBookingCommand;
pub use reassign_booking_command::ReassignBookingCommand;
pub use update_booking_command::{BookingPatch, UpdateBookingCommand};
pub use update_item_expense_command::UpdateItemExpenseCommand;
pub use update_item_reservation_status_command::{
    ItemStatusChange, UpdateItemReservationStatusCommand,
};
pub use verify_booking_command::VerifyBookingCommand;

/// Item ids arrive from loosely typed clients: a missing id, `null`, `""` and
/// `"undefined"` all mean "create a new item".
fn deserialize_item_id<'de, D>(deserializer: D) -> Result<Option<Uuid>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("undefined") | Some("null") => Ok(None),
        Some(id) => Uuid::parse_str(id)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// One item of a create or update payload. Every field is optional so the
/// same shape serves creation and partial in-place updates.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct BookingItemInput {
    #[serde(default, deserialize_with = "deserialize_item_id")]
    pub id: Option<Uuid>,
    pub product_type: Option<String>,
    pub product_id: Option<Uuid>,
    pub room_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub car_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
    pub service_date: Option<NaiveDate>,
    pub checkin_date: Option<NaiveDate>,
    pub checkout_date: Option<NaiveDate>,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: Option<i32>,
    pub selling_price: Option<Decimal>,
    pub cost_price: Option<Decimal>,
    pub total_cost_price: Option<Decimal>,
    pub payment_method: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub reservation_status: Option<ItemReservationStatus>,
    pub comment: Option<String>,
    pub special_request: Option<String>,
    pub route_plan: Option<String>,
    pub confirmation_letter: Option<String>,
    pub customer_attachment: Option<String>,
    pub receipt_image: Option<String>,
}

/// A booking-level receipt image.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptInput {
    #[validate(length(min = 1, message = "receipt image is required"))]
    pub image: String,
    pub note: Option<String>,
}

pub(crate) fn validate_receipts(receipts: &[ReceiptInput]) -> Result<(), ServiceError> {
    for receipt in receipts {
        receipt.validate()?;
        validate_file_name(&receipt.image)?;
    }
    Ok(())
}

fn item_error(position: usize, err: ServiceError) -> ServiceError {
    match err {
        ServiceError::ValidationError(msg) => {
            ServiceError::ValidationError(format!("item {}: {}", position, msg))
        }
        other => other,
    }
}

fn non_negative(field: &str, value: Option<Decimal>) -> Result<(), ServiceError> {
    match value {
        Some(v) if v < Decimal::ZERO => Err(ServiceError::ValidationError(format!(
            "{} must not be negative",
            field
        ))),
        _ => Ok(()),
    }
}

/// Fully validated values for an item row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ItemDraft {
    pub product: ProductRef,
    pub service_date: Option<NaiveDate>,
    pub checkin_date: Option<NaiveDate>,
    pub checkout_date: Option<NaiveDate>,
    pub quantity: i32,
    pub selling_price: Decimal,
    pub cost_price: Option<Decimal>,
    pub total_cost_price: Option<Decimal>,
    pub amount: Decimal,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub reservation_status: ItemReservationStatus,
    pub comment: Option<String>,
    pub special_request: Option<String>,
    pub route_plan: Option<String>,
    pub confirmation_letter: Option<String>,
    pub customer_attachment: Option<String>,
    pub receipt_image: Option<String>,
}

impl BookingItemInput {
    fn selectors(&self) -> SubSelectors {
        SubSelectors {
            room_id: self.room_id,
            variation_id: self.variation_id,
            car_id: self.car_id,
            ticket_id: self.ticket_id,
        }
    }

    fn check_attachments(&self) -> Result<(), ServiceError> {
        for name in [
            &self.confirmation_letter,
            &self.customer_attachment,
            &self.receipt_image,
        ]
        .into_iter()
        .flatten()
        {
            validate_file_name(name)?;
        }
        Ok(())
    }

    /// Validates the input as a new item at 1-based `position`.
    pub(crate) fn draft_new(&self, position: usize) -> Result<ItemDraft, ServiceError> {
        self.build_new().map_err(|e| item_error(position, e))
    }

    fn build_new(&self) -> Result<ItemDraft, ServiceError> {
        self.validate()?;
        let raw_type = self.product_type.as_deref().ok_or_else(|| {
            ServiceError::ValidationError("product_type is required".to_string())
        })?;
        let product_type = ProductType::parse(raw_type)?;
        let product_id = self
            .product_id
            .ok_or_else(|| ServiceError::ValidationError("product_id is required".to_string()))?;
        let product = ProductRef::from_parts(product_type, product_id, self.selectors())?;

        let quantity = self
            .quantity
            .ok_or_else(|| ServiceError::ValidationError("quantity is required".to_string()))?;
        let selling_price = self.selling_price.ok_or_else(|| {
            ServiceError::ValidationError("selling_price is required".to_string())
        })?;

        ItemDraft::finish(ItemDraft {
            product,
            service_date: self.service_date,
            checkin_date: self.checkin_date,
            checkout_date: self.checkout_date,
            quantity,
            selling_price,
            cost_price: self.cost_price,
            total_cost_price: self.total_cost_price,
            amount: Decimal::ZERO,
            payment_method: self.payment_method.clone(),
            payment_status: self.payment_status.unwrap_or_default(),
            reservation_status: self.reservation_status.unwrap_or_default(),
            comment: self.comment.clone(),
            special_request: self.special_request.clone(),
            route_plan: self.route_plan.clone(),
            confirmation_letter: self.confirmation_letter.clone(),
            customer_attachment: self.customer_attachment.clone(),
            receipt_image: self.receipt_image.clone(),
        })
        .and_then(|draft| self.check_attachments().map(|_| draft))
    }

    /// Merges the input onto a stored item; absent fields keep stored values.
    pub(crate) fn draft_update(
        &self,
        stored: &booking_item::Model,
        position: usize,
    ) -> Result<ItemDraft, ServiceError> {
        self.build_update(stored).map_err(|e| item_error(position, e))
    }

    fn build_update(&self, stored: &booking_item::Model) -> Result<ItemDraft, ServiceError> {
        self.validate()?;
        let product_type = match self.product_type.as_deref() {
            Some(raw) => ProductType::parse(raw)?,
            None => stored.product_type,
        };
        let product_id = self.product_id.unwrap_or(stored.product_id);
        // A type change drops the stored sub-selector; it belonged to the old type.
        let selectors = if product_type == stored.product_type {
            SubSelectors {
                room_id: self.room_id.or(stored.room_id),
                variation_id: self.variation_id.or(stored.variation_id),
                car_id: self.car_id.or(stored.car_id),
                ticket_id: self.ticket_id.or(stored.ticket_id),
            }
        } else {
            self.selectors()
        };
        let product = ProductRef::from_parts(product_type, product_id, selectors)?;

        ItemDraft::finish(ItemDraft {
            product,
            service_date: self.service_date.or(stored.service_date),
            checkin_date: self.checkin_date.or(stored.checkin_date),
            checkout_date: self.checkout_date.or(stored.checkout_date),
            quantity: self.quantity.unwrap_or(stored.quantity),
            selling_price: self.selling_price.unwrap_or(stored.selling_price),
            cost_price: self.cost_price.or(stored.cost_price),
            total_cost_price: self.total_cost_price.or(stored.total_cost_price),
            amount: stored.amount,
            payment_method: self
                .payment_method
                .clone()
                .or_else(|| stored.payment_method.clone()),
            payment_status: self.payment_status.unwrap_or(stored.payment_status),
            reservation_status: self.reservation_status.unwrap_or(stored.reservation_status),
            comment: self.comment.clone().or_else(|| stored.comment.clone()),
            special_request: self
                .special_request
                .clone()
                .or_else(|| stored.special_request.clone()),
            route_plan: self.route_plan.clone().or_else(|| stored.route_plan.clone()),
            confirmation_letter: self
                .confirmation_letter
                .clone()
                .or_else(|| stored.confirmation_letter.clone()),
            customer_attachment: self
                .customer_attachment
                .clone()
                .or_else(|| stored.customer_attachment.clone()),
            receipt_image: self
                .receipt_image
                .clone()
                .or_else(|| stored.receipt_image.clone()),
        })
        .and_then(|draft| self.check_attachments().map(|_| draft))
    }
}

impl ItemDraft {
    /// Checks the numeric rules and computes `amount`.
    fn finish(mut self) -> Result<Self, ServiceError> {
        if self.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "quantity must be at least 1".to_string(),
            ));
        }
        non_negative("selling_price", Some(self.selling_price))?;
        non_negative("cost_price", self.cost_price)?;
        non_negative("total_cost_price", self.total_cost_price)?;

        self.amount = line_total(
            self.product.pricing(),
            self.quantity,
            self.selling_price,
            self.checkin_date,
            self.checkout_date,
        )?;
        Ok(self)
    }

    pub(crate) fn insert_model(
        self,
        booking_id: Uuid,
        crm_id: String,
        now: DateTime<Utc>,
    ) -> booking_item::ActiveModel {
        let selectors = self.product.sub_selectors();
        booking_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            booking_id: Set(booking_id),
            crm_id: Set(crm_id),
            product_type: Set(self.product.product_type()),
            product_id: Set(self.product.product_id()),
            room_id: Set(selectors.room_id),
            variation_id: Set(selectors.variation_id),
            car_id: Set(selectors.car_id),
            ticket_id: Set(selectors.ticket_id),
            service_date: Set(self.service_date),
            checkin_date: Set(self.checkin_date),
            checkout_date: Set(self.checkout_date),
            quantity: Set(self.quantity),
            selling_price: Set(self.selling_price),
            cost_price: Set(self.cost_price),
            total_cost_price: Set(self.total_cost_price),
            amount: Set(self.amount),
            payment_method: Set(self.payment_method),
            payment_status: Set(self.payment_status),
            reservation_status: Set(self.reservation_status),
            comment: Set(self.comment),
            special_request: Set(self.special_request),
            route_plan: Set(self.route_plan),
            confirmation_letter: Set(self.confirmation_letter),
            customer_attachment: Set(self.customer_attachment),
            receipt_image: Set(self.receipt_image),
            created_at: Set(now),
            updated_at: Set(now),
        }
    }

    pub(crate) fn update_model(
        self,
        stored: booking_item::Model,
        now: DateTime<Utc>,
    ) -> booking_item::ActiveModel {
        let selectors = self.product.sub_selectors();
        let mut active: booking_item::ActiveModel = stored.into();
        active.product_type = Set(self.product.product_type());
        active.product_id = Set(self.product.product_id());
        active.room_id = Set(selectors.room_id);
        active.variation_id = Set(selectors.variation_id);
        active.car_id = Set(selectors.car_id);
        active.ticket_id = Set(selectors.ticket_id);
        active.service_date = Set(self.service_date);
        active.checkin_date = Set(self.checkin_date);
        active.checkout_date = Set(self.checkout_date);
        active.quantity = Set(self.quantity);
        active.selling_price = Set(self.selling_price);
        active.cost_price = Set(self.cost_price);
        active.total_cost_price = Set(self.total_cost_price);
        active.amount = Set(self.amount);
        active.payment_method = Set(self.payment_method);
        active.payment_status = Set(self.payment_status);
        active.reservation_status = Set(self.reservation_status);
        active.comment = Set(self.comment);
        active.special_request = Set(self.special_request);
        active.route_plan = Set(self.route_plan);
        active.confirmation_letter = Set(self.confirmation_letter);
        active.customer_attachment = Set(self.customer_attachment);
        active.receipt_image = Set(self.receipt_image);
        active.updated_at = Set(now);
        active
    }

    /// Stored files of `stored` that this draft replaces with a different name.
    pub(crate) fn replaced_files(&self, stored: &booking_item::Model) -> Vec<StoredFile> {
        [
            (
                FileCategory::Images,
                &stored.receipt_image,
                &self.receipt_image,
            ),
            (
                FileCategory::Files,
                &stored.confirmation_letter,
                &self.confirmation_letter,
            ),
            (
                FileCategory::Files,
                &stored.customer_attachment,
                &self.customer_attachment,
            ),
        ]
        .into_iter()
        .filter_map(|(category, old, new)| match (old, new) {
            (Some(old), Some(new)) if old != new => Some(StoredFile::new(category, old)),
            _ => None,
        })
        .collect()
    }
}

/// A file in attachment storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub category: FileCategory,
    pub name: String,
}

impl StoredFile {
    pub fn new(category: FileCategory, name: &str) -> Self {
        Self {
            category,
            name: name.to_string(),
        }
    }
}

/// Attachments an item owns.
pub(crate) fn item_files(item: &booking_item::Model) -> Vec<StoredFile> {
    let mut files = Vec::new();
    if let Some(name) = &item.receipt_image {
        files.push(StoredFile::new(FileCategory::Images, name));
    }
    if let Some(name) = &item.confirmation_letter {
        files.push(StoredFile::new(FileCategory::Files, name));
    }
    if let Some(name) = &item.customer_attachment {
        files.push(StoredFile::new(FileCategory::Files, name));
    }
    files
}

/// Deletes files one by one. Failures are logged and never abort the caller.
pub(crate) async fn delete_files_best_effort(storage: &Arc<dyn FileStorage>, files: &[StoredFile]) {
    for file in files {
        if let Err(e) = storage.delete(file.category, &file.name).await {
            warn!(
                category = %file.category,
                file = %file.name,
                error = %e,
                "Failed to delete stored file; continuing"
            );
        }
    }
}

/// Promotes the booking to confirmed when every item is reserved.
///
/// Reads sibling items without a lock: two concurrent item updates may both
/// miss the final state. Promotion itself is idempotent.
pub(crate) async fn promote_if_all_reserved<C: ConnectionTrait>(
    conn: &C,
    booking: booking::Model,
) -> Result<Option<booking::Model>, ServiceError> {
    if booking.reservation_status == BookingReservationStatus::Confirmed {
        return Ok(None);
    }

    let items = items_of(conn, booking.id).await?;
    let all_reserved = !items.is_empty()
        && items
            .iter()
            .all(|item| item.reservation_status == ItemReservationStatus::Reserved);
    if !all_reserved {
        return Ok(None);
    }

    let booking_id = booking.id;
    let mut active: booking::ActiveModel = booking.into();
    active.reservation_status = Set(BookingReservationStatus::Confirmed);
    active.updated_at = Set(Utc::now());
    let promoted = active.update(conn).await?;
    info!(booking_id = %booking_id, crm_id = %promoted.crm_id, "Booking confirmed; all items reserved");
    Ok(Some(promoted))
}
