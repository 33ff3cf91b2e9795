use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::models::{ItemReservationStatus, PaymentStatus, ProductRef, ProductType, SubSelectors};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub booking_id: Uuid,
    /// `{booking.crm_id}_{NNN}`
    #[sea_orm(unique)]
    pub crm_id: String,
    pub product_type: ProductType,
    pub product_id: Uuid,
    pub room_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub car_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
    pub service_date: Option<NaiveDate>,
    pub checkin_date: Option<NaiveDate>,
    pub checkout_date: Option<NaiveDate>,
    pub quantity: i32,
    pub selling_price: Decimal,
    pub cost_price: Option<Decimal>,
    pub total_cost_price: Option<Decimal>,
    /// Line total under the product type's pricing rule
    pub amount: Decimal,
    pub payment_method: Option<String>,
    /// Expense side: what is owed to the supplier
    pub payment_status: PaymentStatus,
    pub reservation_status: ItemReservationStatus,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub special_request: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub route_plan: Option<String>,
    pub confirmation_letter: Option<String>,
    pub customer_attachment: Option<String>,
    pub receipt_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn product_ref(&self) -> Result<ProductRef, ServiceError> {
        ProductRef::from_parts(
            self.product_type,
            self.product_id,
            SubSelectors {
                room_id: self.room_id,
                variation_id: self.variation_id,
                car_id: self.car_id,
                ticket_id: self.ticket_id,
            },
        )
    }

    /// Position of the item within its booking, parsed from the CRM id suffix.
    pub fn sequence(&self) -> Option<u32> {
        crate::models::crm::item_sequence(&self.crm_id)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking::Entity",
        from = "Column::BookingId",
        to = "super::booking::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Booking,
    #[sea_orm(has_many = "super::booking_item_amendment::Entity")]
    Amendments,
}

impl Related<super::booking::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Booking.def()
    }
}

impl Related<super::booking_item_amendment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Amendments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
