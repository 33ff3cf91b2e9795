use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "entrance_ticket_variations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub entrance_ticket_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::entrance_ticket::Entity",
        from = "Column::EntranceTicketId",
        to = "super::entrance_ticket::Column::Id",
        on_delete = "Cascade"
    )]
    EntranceTicket,
}

impl Related<super::entrance_ticket::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EntranceTicket.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
