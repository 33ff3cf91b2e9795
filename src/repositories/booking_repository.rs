use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::entities::{booking, booking_item, booking_item_amendment, booking_receipt};
use crate::errors::ServiceError;
use crate::models::crm;

use super::{BaseRepository, Repository};

/// A booking with its items (ordered by CRM id) and receipts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: booking::Model,
    pub items: Vec<booking_item::Model>,
    pub receipts: Vec<booking_receipt::Model>,
}

pub async fn find_booking<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
) -> Result<booking::Model, ServiceError> {
    booking::Entity::find_by_id(booking_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("Booking", booking_id))
}

pub async fn find_item<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
) -> Result<booking_item::Model, ServiceError> {
    booking_item::Entity::find_by_id(item_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::not_found("BookingItem", item_id))
}

pub async fn items_of<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
) -> Result<Vec<booking_item::Model>, ServiceError> {
    Ok(booking_item::Entity::find()
        .filter(booking_item::Column::BookingId.eq(booking_id))
        .order_by_asc(booking_item::Column::CrmId)
        .all(conn)
        .await?)
}

pub async fn receipts_of<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
) -> Result<Vec<booking_receipt::Model>, ServiceError> {
    Ok(booking_receipt::Entity::find()
        .filter(booking_receipt::Column::BookingId.eq(booking_id))
        .order_by_asc(booking_receipt::Column::CreatedAt)
        .all(conn)
        .await?)
}

pub async fn load_details<C: ConnectionTrait>(
    conn: &C,
    booking_id: Uuid,
) -> Result<BookingDetails, ServiceError> {
    let booking = find_booking(conn, booking_id).await?;
    let items = items_of(conn, booking_id).await?;
    let receipts = receipts_of(conn, booking_id).await?;
    Ok(BookingDetails {
        booking,
        items,
        receipts,
    })
}

pub async fn booking_crm_taken<C: ConnectionTrait>(
    conn: &C,
    crm_id: &str,
) -> Result<bool, ServiceError> {
    let existing = booking::Entity::find()
        .filter(booking::Column::CrmId.eq(crm_id))
        .count(conn)
        .await?;
    Ok(existing > 0)
}

/// First free `{prefix}{NNNNN}` starting after the current booking count.
pub async fn next_booking_crm_id<C: ConnectionTrait>(
    conn: &C,
    prefix: &str,
) -> Result<String, ServiceError> {
    let mut sequence = booking::Entity::find().count(conn).await? + 1;
    loop {
        let candidate = crm::booking_crm_id(prefix, sequence);
        if !booking_crm_taken(conn, &candidate).await? {
            return Ok(candidate);
        }
        sequence += 1;
    }
}

/// Removes an item's amendment rows and then the item row.
pub async fn delete_item_rows<C: ConnectionTrait>(
    conn: &C,
    item_id: Uuid,
) -> Result<(), ServiceError> {
    booking_item_amendment::Entity::delete_many()
        .filter(booking_item_amendment::Column::BookingItemId.eq(item_id))
        .exec(conn)
        .await?;
    booking_item::Entity::delete_by_id(item_id).exec(conn).await?;
    Ok(())
}

/// Read side of the booking aggregate.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    base: BaseRepository,
}

impl BookingRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<BookingDetails, ServiceError> {
        load_details(self.base.get_db(), booking_id).await
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<booking_item::Model, ServiceError> {
        find_item(self.base.get_db(), item_id).await
    }

    /// Bookings newest first. `page` is 1-based.
    pub async fn list_bookings(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<booking::Model>, u64), ServiceError> {
        if page == 0 || per_page == 0 {
            return Err(ServiceError::ValidationError(
                "page and per_page must be at least 1".to_string(),
            ));
        }

        let paginator = booking::Entity::find()
            .order_by_desc(booking::Column::CreatedAt)
            .order_by_desc(booking::Column::CrmId)
            .paginate(self.base.get_db(), per_page);

        let total = paginator.num_items().await?;
        let bookings = paginator.fetch_page(page - 1).await?;
        Ok((bookings, total))
    }
}
