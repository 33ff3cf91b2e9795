//! TravelOps booking backend
//!
//! Bookings with polymorphic line items, the amendment log on those items,
//! reservation status propagation and the notification jobs derived from
//! booking events.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod message_queue;
pub mod migrator;
pub mod models;
pub mod notifications;
pub mod repositories;
pub mod services;
pub mod storage;

pub use errors::ServiceError;
