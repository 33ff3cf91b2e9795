// Booking aggregate
pub mod bookings;

// Amendment log on booking items
pub mod amendments;

// Catalog rows referenced by booking items
pub mod catalog;
