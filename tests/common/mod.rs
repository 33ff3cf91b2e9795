#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use slog::{o, Discard, Logger};
use tokio::sync::mpsc;
use travelops_api::{
    commands::{BookingSettings, CommandContext},
    config::TotalsPolicy,
    db::{self, DbConfig, DbPool},
    events::{Event, EventSender},
    services::{amendments::AmendmentService, bookings::BookingService, catalog::CatalogService},
    storage::{FileCategory, FileStorage, StorageError},
};
use uuid::Uuid;

/// In-memory attachment storage that records every deletion and can be told
/// to fail them.
#[derive(Default)]
pub struct RecordingStorage {
    files: Mutex<HashMap<(FileCategory, String), Vec<u8>>>,
    deleted: Mutex<Vec<(FileCategory, String)>>,
    fail_deletes: Mutex<bool>,
}

impl RecordingStorage {
    pub fn seed(&self, category: FileCategory, name: &str) {
        self.files
            .lock()
            .unwrap()
            .insert((category, name.to_string()), b"seed".to_vec());
    }

    pub fn contains(&self, category: FileCategory, name: &str) -> bool {
        self.files
            .lock()
            .unwrap()
            .contains_key(&(category, name.to_string()))
    }

    pub fn deleted(&self) -> Vec<(FileCategory, String)> {
        self.deleted.lock().unwrap().clone()
    }

    pub fn fail_deletes(&self, fail: bool) {
        *self.fail_deletes.lock().unwrap() = fail;
    }

    pub fn stored(&self, category: FileCategory) -> Vec<String> {
        let mut names: Vec<String> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .filter(|(c, _)| *c == category)
            .map(|(_, name)| name.clone())
            .collect();
        names.sort();
        names
    }
}

#[async_trait]
impl FileStorage for RecordingStorage {
    async fn put(
        &self,
        category: FileCategory,
        name: &str,
        bytes: Vec<u8>,
    ) -> Result<PathBuf, StorageError> {
        self.files
            .lock()
            .unwrap()
            .insert((category, name.to_string()), bytes);
        self.path(category, name)
    }

    async fn read(&self, category: FileCategory, name: &str) -> Result<Vec<u8>, StorageError> {
        self.files
            .lock()
            .unwrap()
            .get(&(category, name.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::InvalidName(name.to_string()))
    }

    async fn delete(&self, category: FileCategory, name: &str) -> Result<(), StorageError> {
        if *self.fail_deletes.lock().unwrap() {
            return Err(StorageError::Io {
                path: name.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
            });
        }
        self.files
            .lock()
            .unwrap()
            .remove(&(category, name.to_string()));
        self.deleted
            .lock()
            .unwrap()
            .push((category, name.to_string()));
        Ok(())
    }

    fn path(&self, category: FileCategory, name: &str) -> Result<PathBuf, StorageError> {
        Ok(PathBuf::from(category.dir_name()).join(name))
    }
}

/// Services wired against a fresh in-memory SQLite database.
pub struct TestApp {
    pub pool: Arc<DbPool>,
    pub bookings: BookingService,
    pub amendments: AmendmentService,
    pub catalog: CatalogService,
    pub storage: Arc<RecordingStorage>,
    pub events: mpsc::Receiver<Event>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_settings(BookingSettings::default()).await
    }

    pub async fn with_policy(policy: TotalsPolicy) -> Self {
        Self::with_settings(BookingSettings {
            totals_policy: policy,
            ..Default::default()
        })
        .await
    }

    pub async fn with_settings(settings: BookingSettings) -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::in_memory_sqlite())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let pool = Arc::new(pool);

        let (tx, rx) = mpsc::channel(256);
        let storage = Arc::new(RecordingStorage::default());
        let ctx = CommandContext {
            db_pool: pool.clone(),
            event_sender: Arc::new(EventSender::new(tx)),
            storage: storage.clone(),
            settings,
        };
        let audit = Logger::root(Discard, o!());

        Self {
            bookings: BookingService::new(ctx.clone(), audit.clone()),
            amendments: AmendmentService::new(ctx, audit),
            catalog: CatalogService::new(pool.clone()),
            pool,
            storage,
            events: rx,
        }
    }

    /// Events published so far, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub async fn seed_hotel(&self, room_price: Decimal) -> (Uuid, Uuid) {
        let hotel = self
            .catalog
            .create_hotel("Riverside Resort", Some("Chiang Mai".to_string()))
            .await
            .expect("hotel");
        let room = self
            .catalog
            .add_room(hotel.id, "Deluxe", room_price)
            .await
            .expect("room");
        (hotel.id, room.id)
    }

    pub async fn seed_group_tour(&self, price: Decimal) -> Uuid {
        self.catalog
            .create_group_tour("Old City Walk", price)
            .await
            .expect("group tour")
            .id
    }
}

pub fn hotel_item(hotel_id: Uuid, room_id: Uuid) -> Value {
    json!({
        "product_type": "Hotel",
        "product_id": hotel_id,
        "room_id": room_id,
        "checkin_date": "2024-01-01",
        "checkout_date": "2024-01-04",
        "quantity": 2,
        "selling_price": "100"
    })
}

pub fn tour_item(tour_id: Uuid, quantity: i32) -> Value {
    json!({
        "product_type": "GroupTour",
        "product_id": tour_id,
        "quantity": quantity,
        "selling_price": "250"
    })
}

/// A create payload with consistent totals for the given items.
pub fn booking_payload(items: Vec<Value>, sub_total: &str) -> Value {
    json!({
        "customer_id": Uuid::new_v4(),
        "user_id": Uuid::new_v4(),
        "sold_from": "line",
        "payment_method": "bank_transfer",
        "sub_total": sub_total,
        "discount": "0",
        "deposit": "0",
        "items": items
    })
}
