use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{BookingReservationStatus, PaymentStatus, VerifyStatus};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub crm_id: String,
    pub customer_id: Uuid,
    /// Staff member owning the sale
    pub user_id: Uuid,
    pub sold_from: Option<String>,
    pub payment_method: Option<String>,
    pub payment_status: PaymentStatus,
    pub payment_currency: String,
    pub exchange_rate: Option<Decimal>,
    pub sub_total: Decimal,
    pub discount: Decimal,
    pub grand_total: Decimal,
    pub deposit: Decimal,
    pub balance_due: Decimal,
    pub balance_due_date: Option<NaiveDate>,
    pub booking_date: NaiveDate,
    pub reservation_status: BookingReservationStatus,
    pub verify_status: VerifyStatus,
    pub is_past_info: bool,
    pub past_user_id: Option<Uuid>,
    pub past_crm_id: Option<String>,
    /// Highest item sequence ever issued; removed items keep their number.
    pub last_item_sequence: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::booking_item::Entity")]
    Items,
    #[sea_orm(has_many = "super::booking_receipt::Entity")]
    Receipts,
}

impl Related<super::booking_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Items.def()
    }
}

impl Related<super::booking_receipt::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Receipts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
