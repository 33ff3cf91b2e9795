use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use std::sync::Arc;
use tracing::{debug, error, instrument};
use uuid::Uuid;

use crate::{
    db::DbPool,
    entities::catalog::{
        airline, airline_ticket, car, entrance_ticket, entrance_ticket_variation, group_tour,
        hotel, private_van_tour, private_van_tour_car, room,
    },
    errors::ServiceError,
    models::ProductRef,
};

fn missing(kind: &str, id: Uuid) -> ServiceError {
    ServiceError::Conflict(format!("{} {} does not exist", kind, id))
}

fn not_owned(kind: &str, id: Uuid, owner_kind: &str, owner_id: Uuid) -> ServiceError {
    ServiceError::Conflict(format!(
        "{} {} does not belong to {} {}",
        kind, id, owner_kind, owner_id
    ))
}

/// Checks that `reference` points at an existing catalog product and that
/// its sub-variant, when given, belongs to that product.
///
/// Runs on any connection so it can take part in the caller's transaction.
#[instrument(skip(conn))]
pub async fn resolve_product<C: ConnectionTrait>(
    conn: &C,
    reference: &ProductRef,
) -> Result<(), ServiceError> {
    match *reference {
        ProductRef::Hotel { hotel_id, room_id } => {
            hotel::Entity::find_by_id(hotel_id)
                .one(conn)
                .await?
                .ok_or_else(|| missing("Hotel", hotel_id))?;
            if let Some(room_id) = room_id {
                let room = room::Entity::find_by_id(room_id)
                    .one(conn)
                    .await?
                    .ok_or_else(|| missing("Room", room_id))?;
                if room.hotel_id != hotel_id {
                    return Err(not_owned("Room", room_id, "Hotel", hotel_id));
                }
            }
        }
        ProductRef::EntranceTicket {
            ticket_id,
            variation_id,
        } => {
            entrance_ticket::Entity::find_by_id(ticket_id)
                .one(conn)
                .await?
                .ok_or_else(|| missing("EntranceTicket", ticket_id))?;
            if let Some(variation_id) = variation_id {
                let variation = entrance_ticket_variation::Entity::find_by_id(variation_id)
                    .one(conn)
                    .await?
                    .ok_or_else(|| missing("EntranceTicketVariation", variation_id))?;
                if variation.entrance_ticket_id != ticket_id {
                    return Err(not_owned(
                        "EntranceTicketVariation",
                        variation_id,
                        "EntranceTicket",
                        ticket_id,
                    ));
                }
            }
        }
        ProductRef::PrivateVanTour { tour_id, car_id } => {
            private_van_tour::Entity::find_by_id(tour_id)
                .one(conn)
                .await?
                .ok_or_else(|| missing("PrivateVanTour", tour_id))?;
            if let Some(car_id) = car_id {
                private_van_tour_car::Entity::find()
                    .filter(private_van_tour_car::Column::PrivateVanTourId.eq(tour_id))
                    .filter(private_van_tour_car::Column::CarId.eq(car_id))
                    .one(conn)
                    .await?
                    .ok_or_else(|| not_owned("Car", car_id, "PrivateVanTour", tour_id))?;
            }
        }
        ProductRef::Airline {
            airline_id,
            ticket_id,
        } => {
            airline::Entity::find_by_id(airline_id)
                .one(conn)
                .await?
                .ok_or_else(|| missing("Airline", airline_id))?;
            if let Some(ticket_id) = ticket_id {
                let ticket = airline_ticket::Entity::find_by_id(ticket_id)
                    .one(conn)
                    .await?
                    .ok_or_else(|| missing("AirlineTicket", ticket_id))?;
                if ticket.airline_id != airline_id {
                    return Err(not_owned("AirlineTicket", ticket_id, "Airline", airline_id));
                }
            }
        }
        ProductRef::GroupTour { tour_id } => {
            group_tour::Entity::find_by_id(tour_id)
                .one(conn)
                .await?
                .ok_or_else(|| missing("GroupTour", tour_id))?;
        }
    }

    debug!("Product reference resolved");
    Ok(())
}

/// Maintains catalog rows that booking items refer to.
#[derive(Clone)]
pub struct CatalogService {
    db_pool: Arc<DbPool>,
}

impl CatalogService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn resolve(&self, reference: &ProductRef) -> Result<(), ServiceError> {
        resolve_product(self.db_pool.as_ref(), reference).await
    }

    #[instrument(skip(self))]
    pub async fn create_hotel(
        &self,
        name: &str,
        city: Option<String>,
    ) -> Result<hotel::Model, ServiceError> {
        hotel::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            city: Set(city),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create hotel");
            ServiceError::db_error(e)
        })
    }

    #[instrument(skip(self))]
    pub async fn add_room(
        &self,
        hotel_id: Uuid,
        name: &str,
        room_price: Decimal,
    ) -> Result<room::Model, ServiceError> {
        room::ActiveModel {
            id: Set(Uuid::new_v4()),
            hotel_id: Set(hotel_id),
            name: Set(name.to_string()),
            room_price: Set(room_price),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn create_entrance_ticket(
        &self,
        name: &str,
    ) -> Result<entrance_ticket::Model, ServiceError> {
        entrance_ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn add_variation(
        &self,
        entrance_ticket_id: Uuid,
        name: &str,
        price: Decimal,
    ) -> Result<entrance_ticket_variation::Model, ServiceError> {
        entrance_ticket_variation::ActiveModel {
            id: Set(Uuid::new_v4()),
            entrance_ticket_id: Set(entrance_ticket_id),
            name: Set(name.to_string()),
            price: Set(price),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn create_private_van_tour(
        &self,
        name: &str,
    ) -> Result<private_van_tour::Model, ServiceError> {
        private_van_tour::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn create_car(
        &self,
        name: &str,
        max_person: Option<i32>,
    ) -> Result<car::Model, ServiceError> {
        car::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            max_person: Set(max_person),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    /// Offers `car_id` on a private van tour at `price`.
    pub async fn attach_car(
        &self,
        private_van_tour_id: Uuid,
        car_id: Uuid,
        price: Decimal,
    ) -> Result<private_van_tour_car::Model, ServiceError> {
        private_van_tour_car::ActiveModel {
            id: Set(Uuid::new_v4()),
            private_van_tour_id: Set(private_van_tour_id),
            car_id: Set(car_id),
            price: Set(price),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn create_airline(&self, name: &str) -> Result<airline::Model, ServiceError> {
        airline::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn add_airline_ticket(
        &self,
        airline_id: Uuid,
        name: &str,
        price: Decimal,
    ) -> Result<airline_ticket::Model, ServiceError> {
        airline_ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            airline_id: Set(airline_id),
            name: Set(name.to_string()),
            price: Set(price),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }

    pub async fn create_group_tour(
        &self,
        name: &str,
        price: Decimal,
    ) -> Result<group_tour::Model, ServiceError> {
        group_tour::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.to_string()),
            price: Set(price),
            created_at: Set(Utc::now()),
        }
        .insert(self.db_pool.as_ref())
        .await
        .map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    async fn catalog() -> CatalogService {
        let pool = establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        CatalogService::new(Arc::new(pool))
    }

    #[tokio::test]
    async fn resolves_existing_hotel_and_owned_room() {
        let catalog = catalog().await;
        let hotel = catalog.create_hotel("Riverside", None).await.unwrap();
        let room = catalog.add_room(hotel.id, "Deluxe", dec!(1800)).await.unwrap();

        let reference = ProductRef::Hotel {
            hotel_id: hotel.id,
            room_id: Some(room.id),
        };
        assert!(catalog.resolve(&reference).await.is_ok());
    }

    #[tokio::test]
    async fn room_of_another_hotel_is_a_conflict() {
        let catalog = catalog().await;
        let hotel = catalog.create_hotel("Riverside", None).await.unwrap();
        let other = catalog.create_hotel("Hillside", None).await.unwrap();
        let room = catalog.add_room(other.id, "Suite", dec!(3000)).await.unwrap();

        let reference = ProductRef::Hotel {
            hotel_id: hotel.id,
            room_id: Some(room.id),
        };
        assert_matches!(
            catalog.resolve(&reference).await,
            Err(ServiceError::Conflict(msg)) if msg.contains("does not belong")
        );
    }

    #[tokio::test]
    async fn van_tour_car_must_be_offered_on_the_tour() {
        let catalog = catalog().await;
        let tour = catalog.create_private_van_tour("Floating market").await.unwrap();
        let offered = catalog.create_car("Commuter", Some(9)).await.unwrap();
        let other = catalog.create_car("Sedan", Some(3)).await.unwrap();
        catalog.attach_car(tour.id, offered.id, dec!(2500)).await.unwrap();

        let ok = ProductRef::PrivateVanTour {
            tour_id: tour.id,
            car_id: Some(offered.id),
        };
        assert!(catalog.resolve(&ok).await.is_ok());

        let not_offered = ProductRef::PrivateVanTour {
            tour_id: tour.id,
            car_id: Some(other.id),
        };
        assert_matches!(
            catalog.resolve(&not_offered).await,
            Err(ServiceError::Conflict(_))
        );
    }

    #[tokio::test]
    async fn unknown_group_tour_is_a_conflict() {
        let catalog = catalog().await;
        let reference = ProductRef::GroupTour {
            tour_id: Uuid::new_v4(),
        };
        assert_matches!(
            catalog.resolve(&reference).await,
            Err(ServiceError::Conflict(msg)) if msg.contains("GroupTour")
        );
    }
}
