//! Product catalog tables referenced by booking items.

pub mod airline;
pub mod airline_ticket;
pub mod car;
pub mod entrance_ticket;
pub mod entrance_ticket_variation;
pub mod group_tour;
pub mod hotel;
pub mod private_van_tour;
pub mod private_van_tour_car;
pub mod room;
