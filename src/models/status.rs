use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Customer-side payment state of a booking, and supplier-side (expense)
/// payment state of an item.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "fully_paid")]
    FullyPaid,
    #[sea_orm(string_value = "partially_paid")]
    PartiallyPaid,
    #[default]
    #[sea_orm(string_value = "not_paid")]
    NotPaid,
}

/// Aggregate reservation state of a booking
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BookingReservationStatus {
    #[default]
    #[sea_orm(string_value = "awaiting")]
    Awaiting,
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerifyStatus {
    #[sea_orm(string_value = "verified")]
    Verified,
    #[default]
    #[sea_orm(string_value = "unverified")]
    Unverified,
    #[sea_orm(string_value = "pending")]
    Pending,
}

/// Reservation state of a single line item
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ItemReservationStatus {
    #[default]
    #[sea_orm(string_value = "awaiting")]
    Awaiting,
    #[sea_orm(string_value = "reserved")]
    Reserved,
    #[sea_orm(string_value = "canceled")]
    Canceled,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AmendStatus {
    #[default]
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "approved")]
    Approved,
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn string_forms_match_stored_values() {
        assert_eq!(PaymentStatus::PartiallyPaid.to_string(), "partially_paid");
        assert_eq!(
            PaymentStatus::PartiallyPaid.to_value(),
            "partially_paid".to_string()
        );
        assert_eq!(
            ItemReservationStatus::from_str("canceled").unwrap(),
            ItemReservationStatus::Canceled
        );
        assert!(BookingReservationStatus::from_str("Confirmed").is_err());
    }

    #[test]
    fn defaults_follow_the_booking_lifecycle() {
        assert_eq!(PaymentStatus::default(), PaymentStatus::NotPaid);
        assert_eq!(
            ItemReservationStatus::default(),
            ItemReservationStatus::Awaiting
        );
        assert_eq!(AmendStatus::default(), AmendStatus::Pending);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&VerifyStatus::Unverified).unwrap();
        assert_eq!(json, "\"unverified\"");
        let status: AmendStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(status, AmendStatus::Rejected);
    }
}
