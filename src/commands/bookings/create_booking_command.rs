use crate::{
    commands::{BookingSettings, Command, CommandContext},
    db,
    entities::{booking, booking_receipt},
    errors::ServiceError,
    events::Event,
    models::{crm, BookingReservationStatus, PaymentStatus, VerifyStatus},
    repositories::booking_repository::{
        booking_crm_taken, load_details, next_booking_crm_id, BookingDetails,
    },
    services::catalog::resolve_product,
};
use chrono::{NaiveDate, Utc};
use lazy_static::lazy_static;
use prometheus::IntCounter;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, DatabaseTransaction, Set};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};
use uuid::Uuid;
use validator::Validate;

use super::{
    totals::{Stage, Totals},
    validate_receipts, BookingItemInput, ItemDraft, ReceiptInput,
};

lazy_static! {
    static ref BOOKING_CREATIONS: IntCounter =
        IntCounter::new("booking_creations_total", "Total number of bookings created")
            .expect("metric can be created");
    static ref BOOKING_CREATION_FAILURES: IntCounter = IntCounter::new(
        "booking_creation_failures_total",
        "Total number of failed booking creations"
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateBookingCommand {
    /// Explicit CRM id; generated from the configured prefix when absent
    pub crm_id: Option<String>,
    pub customer_id: Uuid,
    pub user_id: Uuid,
    pub sold_from: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    #[validate(length(equal = 3, message = "payment_currency must be an ISO 4217 code"))]
    pub payment_currency: Option<String>,
    pub exchange_rate: Option<Decimal>,
    pub sub_total: Decimal,
    #[serde(default)]
    pub discount: Decimal,
    pub grand_total: Option<Decimal>,
    #[serde(default)]
    pub deposit: Decimal,
    pub balance_due: Option<Decimal>,
    pub balance_due_date: Option<NaiveDate>,
    pub booking_date: Option<NaiveDate>,
    pub comment: Option<String>,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<BookingItemInput>,
    #[serde(default)]
    pub receipts: Vec<ReceiptInput>,
}

/// Everything the transaction writes, validated up front.
#[derive(Debug)]
struct CreatePlan {
    command: CreateBookingCommand,
    totals: Totals,
    drafts: Vec<ItemDraft>,
}

#[async_trait::async_trait]
impl Command for CreateBookingCommand {
    type Result = BookingDetails;

    #[instrument(skip(self, ctx), fields(customer_id = %self.customer_id, items = self.items.len()))]
    async fn execute(&self, ctx: &CommandContext) -> Result<Self::Result, ServiceError> {
        let plan = self.plan(&ctx.settings).map_err(|e| {
            BOOKING_CREATION_FAILURES.inc();
            error!(error = %e, "Invalid booking payload");
            e
        })?;

        let settings = ctx.settings.clone();
        let details = db::transaction(&ctx.db_pool, "booking.create", move |txn| {
            Box::pin(async move { persist(txn, plan, &settings).await })
        })
        .await
        .map_err(|e| {
            BOOKING_CREATION_FAILURES.inc();
            error!(error = %e, "Failed to create booking");
            e
        })?;

        info!(
            booking_id = %details.booking.id,
            crm_id = %details.booking.crm_id,
            items_count = details.items.len(),
            "Booking created successfully"
        );
        ctx.event_sender
            .send_or_log(Event::BookingCreated {
                booking_id: details.booking.id,
                crm_id: details.booking.crm_id.clone(),
            })
            .await;
        BOOKING_CREATIONS.inc();

        Ok(details)
    }
}

impl CreateBookingCommand {
    fn plan(&self, settings: &BookingSettings) -> Result<CreatePlan, ServiceError> {
        self.validate()?;
        if let Some(crm_id) = &self.crm_id {
            if crm_id.trim().is_empty() {
                return Err(ServiceError::ValidationError(
                    "crm_id must not be blank".to_string(),
                ));
            }
        }
        if matches!(self.exchange_rate, Some(rate) if rate <= Decimal::ZERO) {
            return Err(ServiceError::ValidationError(
                "exchange_rate must be positive".to_string(),
            ));
        }

        let totals = Totals::derive(
            self.sub_total,
            self.discount,
            self.grand_total,
            self.deposit,
            self.balance_due,
        )?;
        totals.check_non_negative()?;
        totals.enforce(settings.totals_policy, Stage::Create)?;

        let drafts = self
            .items
            .iter()
            .enumerate()
            .map(|(idx, item)| item.draft_new(idx + 1))
            .collect::<Result<Vec<_>, _>>()?;
        validate_receipts(&self.receipts)?;

        Ok(CreatePlan {
            command: self.clone(),
            totals,
            drafts,
        })
    }
}

async fn persist(
    txn: &DatabaseTransaction,
    plan: CreatePlan,
    settings: &BookingSettings,
) -> Result<BookingDetails, ServiceError> {
    let CreatePlan {
        command,
        totals,
        drafts,
    } = plan;

    let crm_id = match command.crm_id {
        Some(crm_id) => {
            if booking_crm_taken(txn, &crm_id).await? {
                return Err(ServiceError::Conflict(format!(
                    "Booking CRM id {} is already in use",
                    crm_id
                )));
            }
            crm_id
        }
        None => next_booking_crm_id(txn, &settings.crm_prefix).await?,
    };

    let now = Utc::now();
    let booking_id = Uuid::new_v4();
    let new_booking = booking::ActiveModel {
        id: Set(booking_id),
        crm_id: Set(crm_id.clone()),
        customer_id: Set(command.customer_id),
        user_id: Set(command.user_id),
        sold_from: Set(command.sold_from),
        payment_method: Set(command.payment_method),
        payment_status: Set(command.payment_status.unwrap_or_default()),
        payment_currency: Set(command
            .payment_currency
            .unwrap_or_else(|| settings.default_currency.clone())),
        exchange_rate: Set(command.exchange_rate),
        sub_total: Set(totals.sub_total),
        discount: Set(totals.discount),
        grand_total: Set(totals.grand_total),
        deposit: Set(totals.deposit),
        balance_due: Set(totals.balance_due),
        balance_due_date: Set(command.balance_due_date),
        booking_date: Set(command.booking_date.unwrap_or_else(|| now.date_naive())),
        reservation_status: Set(BookingReservationStatus::Awaiting),
        verify_status: Set(VerifyStatus::Unverified),
        is_past_info: Set(false),
        past_user_id: Set(None),
        past_crm_id: Set(None),
        last_item_sequence: Set(crm::sequence_column(drafts.len() as u32)),
        comment: Set(command.comment),
        created_at: Set(now),
        updated_at: Set(now),
    };
    new_booking.insert(txn).await.map_err(|e| {
        error!(crm_id = %crm_id, error = %e, "Failed to insert booking");
        ServiceError::db_error(e)
    })?;

    for (idx, draft) in drafts.into_iter().enumerate() {
        if settings.enforce_product_integrity {
            resolve_product(txn, &draft.product).await?;
        }
        let item_crm_id = crm::item_crm_id(&crm_id, (idx + 1) as u32);
        draft
            .insert_model(booking_id, item_crm_id.clone(), now)
            .insert(txn)
            .await
            .map_err(|e| {
                error!(crm_id = %item_crm_id, error = %e, "Failed to insert booking item");
                ServiceError::db_error(e)
            })?;
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

    load_details(txn, booking_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TotalsPolicy;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn command() -> CreateBookingCommand {
        serde_json::from_value(json!({
            "customer_id": Uuid::new_v4(),
            "user_id": Uuid::new_v4(),
            "sub_total": "1500",
            "discount": "100",
            "items": [
                { "product_type": "GroupTour", "product_id": Uuid::new_v4(), "quantity": 3, "selling_price": "500" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn plan_derives_totals_and_prices_items() {
        let plan = command().plan(&BookingSettings::default()).unwrap();
        assert_eq!(plan.totals.grand_total, dec!(1400));
        assert_eq!(plan.totals.balance_due, dec!(1400));
        assert_eq!(plan.drafts[0].amount, dec!(1500));
    }

    #[test]
    fn plan_rejects_empty_items() {
        let mut cmd = command();
        cmd.items.clear();
        assert_matches!(
            cmd.plan(&BookingSettings::default()),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn plan_applies_totals_policy() {
        let mut cmd = command();
        cmd.grand_total = Some(dec!(1500));
        assert!(cmd.plan(&BookingSettings::default()).is_err());

        let settings = BookingSettings {
            totals_policy: TotalsPolicy::Off,
            ..Default::default()
        };
        assert!(cmd.plan(&settings).is_ok());
    }

    #[test]
    fn plan_rejects_receipt_paths() {
        let mut cmd = command();
        cmd.receipts.push(ReceiptInput {
            image: "a/b.png".into(),
            note: None,
        });
        assert!(cmd.plan(&BookingSettings::default()).is_err());
    }
}
