use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240601_000001_create_catalog_tables::Migration),
            Box::new(m20240601_000002_create_bookings_table::Migration),
            Box::new(m20240601_000003_create_booking_items_table::Migration),
            Box::new(m20240601_000004_create_booking_receipts_table::Migration),
            Box::new(m20240601_000005_create_booking_item_amendments_table::Migration),
        ]
    }
}

mod m20240601_000001_create_catalog_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000001_create_catalog_tables"
        }
    }

    fn id_col<T: IntoIden>(col: T) -> ColumnDef {
        ColumnDef::new(col).uuid().primary_key().not_null().to_owned()
    }

    fn created_at_col<T: IntoIden>(col: T) -> ColumnDef {
        ColumnDef::new(col)
            .timestamp_with_time_zone()
            .not_null()
            .to_owned()
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Hotels::Table)
                        .if_not_exists()
                        .col(id_col(Hotels::Id))
                        .col(ColumnDef::new(Hotels::Name).string().not_null())
                        .col(ColumnDef::new(Hotels::City).string().null())
                        .col(created_at_col(Hotels::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Rooms::Table)
                        .if_not_exists()
                        .col(id_col(Rooms::Id))
                        .col(ColumnDef::new(Rooms::HotelId).uuid().not_null())
                        .col(ColumnDef::new(Rooms::Name).string().not_null())
                        .col(
                            ColumnDef::new(Rooms::RoomPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(created_at_col(Rooms::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_rooms_hotel_id")
                                .from(Rooms::Table, Rooms::HotelId)
                                .to(Hotels::Table, Hotels::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(EntranceTickets::Table)
                        .if_not_exists()
                        .col(id_col(EntranceTickets::Id))
                        .col(ColumnDef::new(EntranceTickets::Name).string().not_null())
                        .col(created_at_col(EntranceTickets::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(EntranceTicketVariations::Table)
                        .if_not_exists()
                        .col(id_col(EntranceTicketVariations::Id))
                        .col(
                            ColumnDef::new(EntranceTicketVariations::EntranceTicketId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EntranceTicketVariations::Name)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(EntranceTicketVariations::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(created_at_col(EntranceTicketVariations::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_entrance_ticket_variations_ticket_id")
                                .from(
                                    EntranceTicketVariations::Table,
                                    EntranceTicketVariations::EntranceTicketId,
                                )
                                .to(EntranceTickets::Table, EntranceTickets::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PrivateVanTours::Table)
                        .if_not_exists()
                        .col(id_col(PrivateVanTours::Id))
                        .col(ColumnDef::new(PrivateVanTours::Name).string().not_null())
                        .col(created_at_col(PrivateVanTours::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Cars::Table)
                        .if_not_exists()
                        .col(id_col(Cars::Id))
                        .col(ColumnDef::new(Cars::Name).string().not_null())
                        .col(ColumnDef::new(Cars::MaxPerson).integer().null())
                        .col(created_at_col(Cars::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(PrivateVanTourCars::Table)
                        .if_not_exists()
                        .col(id_col(PrivateVanTourCars::Id))
                        .col(
                            ColumnDef::new(PrivateVanTourCars::PrivateVanTourId)
                                .uuid()
                                .not_null(),
                        )
                        .col(ColumnDef::new(PrivateVanTourCars::CarId).uuid().not_null())
                        .col(
                            ColumnDef::new(PrivateVanTourCars::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_private_van_tour_cars_tour_id")
                                .from(
                                    PrivateVanTourCars::Table,
                                    PrivateVanTourCars::PrivateVanTourId,
                                )
                                .to(PrivateVanTours::Table, PrivateVanTours::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_private_van_tour_cars_car_id")
                                .from(PrivateVanTourCars::Table, PrivateVanTourCars::CarId)
                                .to(Cars::Table, Cars::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Airlines::Table)
                        .if_not_exists()
                        .col(id_col(Airlines::Id))
                        .col(ColumnDef::new(Airlines::Name).string().not_null())
                        .col(created_at_col(Airlines::CreatedAt))
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(AirlineTickets::Table)
                        .if_not_exists()
                        .col(id_col(AirlineTickets::Id))
                        .col(ColumnDef::new(AirlineTickets::AirlineId).uuid().not_null())
                        .col(ColumnDef::new(AirlineTickets::Name).string().not_null())
                        .col(
                            ColumnDef::new(AirlineTickets::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(created_at_col(AirlineTickets::CreatedAt))
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_airline_tickets_airline_id")
                                .from(AirlineTickets::Table, AirlineTickets::AirlineId)
                                .to(Airlines::Table, Airlines::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(GroupTours::Table)
                        .if_not_exists()
                        .col(id_col(GroupTours::Id))
                        .col(ColumnDef::new(GroupTours::Name).string().not_null())
                        .col(
                            ColumnDef::new(GroupTours::Price)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(created_at_col(GroupTours::CreatedAt))
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                GroupTours::Table.into_iden(),
                AirlineTickets::Table.into_iden(),
                Airlines::Table.into_iden(),
                PrivateVanTourCars::Table.into_iden(),
                Cars::Table.into_iden(),
                PrivateVanTours::Table.into_iden(),
                EntranceTicketVariations::Table.into_iden(),
                EntranceTickets::Table.into_iden(),
                Rooms::Table.into_iden(),
                Hotels::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).if_exists().to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum Hotels {
        Table,
        Id,
        Name,
        City,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Rooms {
        Table,
        Id,
        HotelId,
        Name,
        RoomPrice,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum EntranceTickets {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum EntranceTicketVariations {
        Table,
        Id,
        EntranceTicketId,
        Name,
        Price,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PrivateVanTours {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum Cars {
        Table,
        Id,
        Name,
        MaxPerson,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum PrivateVanTourCars {
        Table,
        Id,
        PrivateVanTourId,
        CarId,
        Price,
    }

    #[derive(DeriveIden)]
    enum Airlines {
        Table,
        Id,
        Name,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum AirlineTickets {
        Table,
        Id,
        AirlineId,
        Name,
        Price,
        CreatedAt,
    }

    #[derive(DeriveIden)]
    enum GroupTours {
        Table,
        Id,
        Name,
        Price,
        CreatedAt,
    }
}

mod m20240601_000002_create_bookings_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000002_create_bookings_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Bookings::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Bookings::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Bookings::CrmId).string().not_null())
                        .col(ColumnDef::new(Bookings::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(Bookings::UserId).uuid().not_null())
                        .col(ColumnDef::new(Bookings::SoldFrom).string().null())
                        .col(ColumnDef::new(Bookings::PaymentMethod).string().null())
                        .col(ColumnDef::new(Bookings::PaymentStatus).string().not_null())
                        .col(ColumnDef::new(Bookings::PaymentCurrency).string().not_null())
                        .col(ColumnDef::new(Bookings::ExchangeRate).decimal().null())
                        .col(ColumnDef::new(Bookings::SubTotal).decimal().not_null().default(0))
                        .col(ColumnDef::new(Bookings::Discount).decimal().not_null().default(0))
                        .col(ColumnDef::new(Bookings::GrandTotal).decimal().not_null().default(0))
                        .col(ColumnDef::new(Bookings::Deposit).decimal().not_null().default(0))
                        .col(ColumnDef::new(Bookings::BalanceDue).decimal().not_null().default(0))
                        .col(ColumnDef::new(Bookings::BalanceDueDate).date().null())
                        .col(ColumnDef::new(Bookings::BookingDate).date().not_null())
                        .col(ColumnDef::new(Bookings::ReservationStatus).string().not_null())
                        .col(ColumnDef::new(Bookings::VerifyStatus).string().not_null())
                        .col(
                            ColumnDef::new(Bookings::IsPastInfo)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Bookings::PastUserId).uuid().null())
                        .col(ColumnDef::new(Bookings::PastCrmId).string().null())
                        .col(
                            ColumnDef::new(Bookings::LastItemSequence)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Bookings::Comment).text().null())
                        .col(
                            ColumnDef::new(Bookings::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Bookings::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_bookings_crm_id")
                        .table(Bookings::Table)
                        .col(Bookings::CrmId)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bookings_customer_id")
                        .table(Bookings::Table)
                        .col(Bookings::CustomerId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_bookings_reservation_status")
                        .table(Bookings::Table)
                        .col(Bookings::ReservationStatus)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Bookings::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Bookings {
        Table,
        Id,
        CrmId,
        CustomerId,
        UserId,
        SoldFrom,
        PaymentMethod,
        PaymentStatus,
        PaymentCurrency,
        ExchangeRate,
        SubTotal,
        Discount,
        GrandTotal,
        Deposit,
        BalanceDue,
        BalanceDueDate,
        BookingDate,
        ReservationStatus,
        VerifyStatus,
        IsPastInfo,
        PastUserId,
        PastCrmId,
        LastItemSequence,
        Comment,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000003_create_booking_items_table {
    use super::m20240601_000002_create_bookings_table::Bookings;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000003_create_booking_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BookingItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BookingItems::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BookingItems::BookingId).uuid().not_null())
                        .col(ColumnDef::new(BookingItems::CrmId).string().not_null())
                        .col(ColumnDef::new(BookingItems::ProductType).string().not_null())
                        .col(ColumnDef::new(BookingItems::ProductId).uuid().not_null())
                        .col(ColumnDef::new(BookingItems::RoomId).uuid().null())
                        .col(ColumnDef::new(BookingItems::VariationId).uuid().null())
                        .col(ColumnDef::new(BookingItems::CarId).uuid().null())
                        .col(ColumnDef::new(BookingItems::TicketId).uuid().null())
                        .col(ColumnDef::new(BookingItems::ServiceDate).date().null())
                        .col(ColumnDef::new(BookingItems::CheckinDate).date().null())
                        .col(ColumnDef::new(BookingItems::CheckoutDate).date().null())
                        .col(ColumnDef::new(BookingItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(BookingItems::SellingPrice)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(BookingItems::CostPrice).decimal().null())
                        .col(ColumnDef::new(BookingItems::TotalCostPrice).decimal().null())
                        .col(
                            ColumnDef::new(BookingItems::Amount)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(BookingItems::PaymentMethod).string().null())
                        .col(ColumnDef::new(BookingItems::PaymentStatus).string().not_null())
                        .col(
                            ColumnDef::new(BookingItems::ReservationStatus)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BookingItems::Comment).text().null())
                        .col(ColumnDef::new(BookingItems::SpecialRequest).text().null())
                        .col(ColumnDef::new(BookingItems::RoutePlan).text().null())
                        .col(ColumnDef::new(BookingItems::ConfirmationLetter).string().null())
                        .col(ColumnDef::new(BookingItems::CustomerAttachment).string().null())
                        .col(ColumnDef::new(BookingItems::ReceiptImage).string().null())
                        .col(
                            ColumnDef::new(BookingItems::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BookingItems::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_booking_items_booking_id")
                                .from(BookingItems::Table, BookingItems::BookingId)
                                .to(Bookings::Table, Bookings::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_booking_items_booking_id")
                        .table(BookingItems::Table)
                        .col(BookingItems::BookingId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("uq_booking_items_crm_id")
                        .table(BookingItems::Table)
                        .col(BookingItems::CrmId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BookingItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum BookingItems {
        Table,
        Id,
        BookingId,
        CrmId,
        ProductType,
        ProductId,
        RoomId,
        VariationId,
        CarId,
        TicketId,
        ServiceDate,
        CheckinDate,
        CheckoutDate,
        Quantity,
        SellingPrice,
        CostPrice,
        TotalCostPrice,
        Amount,
        PaymentMethod,
        PaymentStatus,
        ReservationStatus,
        Comment,
        SpecialRequest,
        RoutePlan,
        ConfirmationLetter,
        CustomerAttachment,
        ReceiptImage,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240601_000004_create_booking_receipts_table {
    use super::m20240601_000002_create_bookings_table::Bookings;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000004_create_booking_receipts_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BookingReceipts::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BookingReceipts::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(BookingReceipts::BookingId).uuid().not_null())
                        .col(ColumnDef::new(BookingReceipts::Image).string().not_null())
                        .col(ColumnDef::new(BookingReceipts::Note).string().null())
                        .col(
                            ColumnDef::new(BookingReceipts::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_booking_receipts_booking_id")
                                .from(BookingReceipts::Table, BookingReceipts::BookingId)
                                .to(Bookings::Table, Bookings::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_booking_receipts_booking_id")
                        .table(BookingReceipts::Table)
                        .col(BookingReceipts::BookingId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BookingReceipts::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BookingReceipts {
        Table,
        Id,
        BookingId,
        Image,
        Note,
        CreatedAt,
    }
}

mod m20240601_000005_create_booking_item_amendments_table {
    use super::m20240601_000003_create_booking_items_table::BookingItems;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240601_000005_create_booking_item_amendments_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(BookingItemAmendments::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(BookingItemAmendments::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BookingItemAmendments::BookingItemId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BookingItemAmendments::AmendHistory)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BookingItemAmendments::Dispositions)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BookingItemAmendments::AmendRequest)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(BookingItemAmendments::AmendMailSent)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(BookingItemAmendments::AmendApprove)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(BookingItemAmendments::AmendStatus)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BookingItemAmendments::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(BookingItemAmendments::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_booking_item_amendments_item_id")
                                .from(
                                    BookingItemAmendments::Table,
                                    BookingItemAmendments::BookingItemId,
                                )
                                .to(BookingItems::Table, BookingItems::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_booking_item_amendments_item_id")
                        .table(BookingItemAmendments::Table)
                        .col(BookingItemAmendments::BookingItemId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(BookingItemAmendments::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum BookingItemAmendments {
        Table,
        Id,
        BookingItemId,
        AmendHistory,
        Dispositions,
        AmendRequest,
        AmendMailSent,
        AmendApprove,
        AmendStatus,
        CreatedAt,
        UpdatedAt,
    }
}
