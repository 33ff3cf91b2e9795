pub mod booking;
pub mod booking_item;
pub mod booking_item_amendment;
pub mod booking_receipt;
pub mod catalog;
