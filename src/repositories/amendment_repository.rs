use sea_orm::{ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::booking_item_amendment;
use crate::errors::ServiceError;
use crate::models::AmendmentView;

use super::{BaseRepository, Repository};

pub async fn find_amendment<C: ConnectionTrait>(
    conn: &C,
    amendment_id: Uuid,
) -> Result<booking_item_amendment::Model, ServiceError> {
    booking_item_amendment::Entity::find_by_id(amendment_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Amendment", amendment_id))
}

/// The amendment record of an item. Items carry at most one in practice.
pub async fn amendment_of_item<C: ConnectionTrait>(
    conn: &C,
    booking_item_id: Uuid,
) -> Result<Option<booking_item_amendment::Model>, ServiceError> {
    Ok(booking_item_amendment::Entity::find()
        .filter(booking_item_amendment::Column::BookingItemId.eq(booking_item_id))
        .one(conn)
        .await?)
}

#[derive(Debug, Clone)]
pub struct AmendmentRepository {
    base: BaseRepository,
}

impl AmendmentRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn get_amendment(&self, amendment_id: Uuid) -> Result<AmendmentView, ServiceError> {
        find_amendment(self.base.get_db(), amendment_id)
            .await?
            .try_into()
    }

    pub async fn amendment_for_item(
        &self,
        booking_item_id: Uuid,
    ) -> Result<Option<AmendmentView>, ServiceError> {
        amendment_of_item(self.base.get_db(), booking_item_id)
            .await?
            .map(AmendmentView::try_from)
            .transpose()
    }
}
