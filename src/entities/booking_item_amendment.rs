use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::AmendStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking_item_amendments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub booking_item_id: Uuid,
    /// Append-only list of `AmendmentEntry`
    pub amend_history: Json,
    /// Append-only list of `Disposition`
    pub dispositions: Json,
    pub amend_request: bool,
    pub amend_mail_sent: bool,
    pub amend_approve: bool,
    pub amend_status: AmendStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::booking_item::Entity",
        from = "Column::BookingItemId",
        to = "super::booking_item::Column::Id",
        on_delete = "Cascade"
    )]
    BookingItem,
}

impl Related<super::booking_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BookingItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
