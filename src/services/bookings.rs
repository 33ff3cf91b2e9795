use slog::Logger;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    commands::{
        bookings::{
            CreateBookingCommand, DeleteBookingCommand, ItemStatusChange, ReassignBookingCommand,
            UpdateBookingCommand, UpdateItemExpenseCommand, UpdateItemReservationStatusCommand,
            VerifyBookingCommand,
        },
        Command, CommandContext,
    },
    entities::{booking, booking_item},
    errors::ServiceError,
    logging::{audit_failure, audit_success},
    models::{ItemReservationStatus, PaymentStatus, VerifyStatus},
    repositories::booking_repository::{BookingDetails, BookingRepository},
};

/// A page of bookings, newest first.
#[derive(Debug, Clone, serde::Serialize)]
pub struct BookingPage {
    pub bookings: Vec<booking::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Entry point for the booking aggregate. Mutations go through commands;
/// every failure leaves an audit record.
#[derive(Clone)]
pub struct BookingService {
    ctx: CommandContext,
    repository: BookingRepository,
    audit: Logger,
}

impl BookingService {
    pub fn new(ctx: CommandContext, audit: Logger) -> Self {
        let repository = BookingRepository::new(ctx.db_pool.clone());
        Self {
            ctx,
            repository,
            audit,
        }
    }

    async fn run<C>(
        &self,
        operation: &'static str,
        subject: String,
        command: C,
    ) -> Result<C::Result, ServiceError>
    where
        C: Command,
        C::Result: Send,
    {
        match command.execute(&self.ctx).await {
            Ok(result) => {
                audit_success(&self.audit, operation, &subject);
                Ok(result)
            }
            Err(e) => {
                audit_failure(&self.audit, operation, &subject, &e);
                Err(e)
            }
        }
    }

    #[instrument(skip(self, command))]
    pub async fn create_booking(
        &self,
        command: CreateBookingCommand,
    ) -> Result<BookingDetails, ServiceError> {
        let subject = format!("customer {}", command.customer_id);
        self.run("booking.create", subject, command).await
    }

    #[instrument(skip(self, command), fields(booking_id = %command.booking_id))]
    pub async fn update_booking(
        &self,
        command: UpdateBookingCommand,
    ) -> Result<BookingDetails, ServiceError> {
        let subject = command.booking_id.to_string();
        self.run("booking.update", subject, command).await
    }

    pub async fn update_item_reservation_status(
        &self,
        item_id: Uuid,
        reservation_status: ItemReservationStatus,
    ) -> Result<ItemStatusChange, ServiceError> {
        let command = UpdateItemReservationStatusCommand {
            item_id,
            reservation_status,
        };
        self.run("booking_item.reservation_status", item_id.to_string(), command)
            .await
    }

    pub async fn update_item_expense(
        &self,
        item_id: Uuid,
        payment_status: Option<PaymentStatus>,
        payment_method: Option<String>,
    ) -> Result<booking_item::Model, ServiceError> {
        let command = UpdateItemExpenseCommand {
            item_id,
            payment_status,
            payment_method,
        };
        self.run("booking_item.expense", item_id.to_string(), command)
            .await
    }

    pub async fn verify_booking(
        &self,
        booking_id: Uuid,
        verify_status: VerifyStatus,
    ) -> Result<booking::Model, ServiceError> {
        let command = VerifyBookingCommand {
            booking_id,
            verify_status,
        };
        self.run("booking.verify", booking_id.to_string(), command)
            .await
    }

    pub async fn reassign_booking(
        &self,
        booking_id: Uuid,
        user_id: Uuid,
        crm_id: Option<String>,
    ) -> Result<BookingDetails, ServiceError> {
        let command = ReassignBookingCommand {
            booking_id,
            user_id,
            crm_id,
        };
        self.run("booking.reassign", booking_id.to_string(), command)
            .await
    }

    pub async fn delete_booking(&self, booking_id: Uuid) -> Result<(), ServiceError> {
        self.run(
            "booking.delete",
            booking_id.to_string(),
            DeleteBookingCommand { booking_id },
        )
        .await
    }

    pub async fn get_booking(&self, booking_id: Uuid) -> Result<BookingDetails, ServiceError> {
        self.repository.get_booking(booking_id).await
    }

    pub async fn get_item(&self, item_id: Uuid) -> Result<booking_item::Model, ServiceError> {
        self.repository.get_item(item_id).await
    }

    /// `page` is 1-based.
    pub async fn list_bookings(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<BookingPage, ServiceError> {
        let (bookings, total) = self.repository.list_bookings(page, per_page).await?;
        Ok(BookingPage {
            bookings,
            total,
            page,
            per_page,
        })
    }
}
