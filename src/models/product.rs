//! Polymorphic product references carried by booking items.
//!
//! A booking item points at exactly one catalog product. The discriminator
//! (`product_type`) decides which catalog table backs the reference, which
//! sub-variant selector is meaningful and how the line total is priced.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Display, EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
pub enum ProductType {
    #[sea_orm(string_value = "Hotel")]
    Hotel,
    #[sea_orm(string_value = "EntranceTicket")]
    EntranceTicket,
    #[sea_orm(string_value = "PrivateVanTour")]
    PrivateVanTour,
    #[sea_orm(string_value = "Airline")]
    Airline,
    #[sea_orm(string_value = "GroupTour")]
    GroupTour,
}

/// Which sub-selector column refines a product reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubSelector {
    RoomId,
    VariationId,
    CarId,
    TicketId,
}

impl SubSelector {
    pub fn field_name(&self) -> &'static str {
        match self {
            SubSelector::RoomId => "room_id",
            SubSelector::VariationId => "variation_id",
            SubSelector::CarId => "car_id",
            SubSelector::TicketId => "ticket_id",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PricingRule {
    /// `quantity × selling_price × nights`
    PerNight,
    /// `quantity × selling_price`
    Flat,
}

/// Static resolver row for one product type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductSpec {
    pub table: &'static str,
    pub sub_selector: Option<SubSelector>,
    pub pricing: PricingRule,
}

impl ProductType {
    pub fn spec(&self) -> ProductSpec {
        match self {
            ProductType::Hotel => ProductSpec {
                table: "hotels",
                sub_selector: Some(SubSelector::RoomId),
                pricing: PricingRule::PerNight,
            },
            ProductType::EntranceTicket => ProductSpec {
                table: "entrance_tickets",
                sub_selector: Some(SubSelector::VariationId),
                pricing: PricingRule::Flat,
            },
            ProductType::PrivateVanTour => ProductSpec {
                table: "private_van_tours",
                sub_selector: Some(SubSelector::CarId),
                pricing: PricingRule::Flat,
            },
            ProductType::Airline => ProductSpec {
                table: "airlines",
                sub_selector: Some(SubSelector::TicketId),
                pricing: PricingRule::Flat,
            },
            ProductType::GroupTour => ProductSpec {
                table: "group_tours",
                sub_selector: None,
                pricing: PricingRule::Flat,
            },
        }
    }

    /// Parses the loosely typed `product_type` of an item payload.
    pub fn parse(raw: &str) -> Result<Self, ServiceError> {
        ProductType::from_str(raw.trim()).map_err(|_| {
            ServiceError::ValidationError(format!("unknown product_type '{}'", raw))
        })
    }
}

/// Flat sub-selector columns as they appear on an item row or payload.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubSelectors {
    pub room_id: Option<Uuid>,
    pub variation_id: Option<Uuid>,
    pub car_id: Option<Uuid>,
    pub ticket_id: Option<Uuid>,
}

impl SubSelectors {
    fn present(&self) -> Vec<(SubSelector, Uuid)> {
        [
            (SubSelector::RoomId, self.room_id),
            (SubSelector::VariationId, self.variation_id),
            (SubSelector::CarId, self.car_id),
            (SubSelector::TicketId, self.ticket_id),
        ]
        .into_iter()
        .filter_map(|(selector, id)| id.map(|id| (selector, id)))
        .collect()
    }
}

/// A booking item's product reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "product_type")]
pub enum ProductRef {
    Hotel {
        hotel_id: Uuid,
        room_id: Option<Uuid>,
    },
    EntranceTicket {
        ticket_id: Uuid,
        variation_id: Option<Uuid>,
    },
    PrivateVanTour {
        tour_id: Uuid,
        car_id: Option<Uuid>,
    },
    Airline {
        airline_id: Uuid,
        ticket_id: Option<Uuid>,
    },
    GroupTour {
        tour_id: Uuid,
    },
}

impl ProductRef {
    /// Builds a reference from the flat columns, rejecting any sub-selector
    /// that is not the one valid for `product_type`.
    pub fn from_parts(
        product_type: ProductType,
        product_id: Uuid,
        selectors: SubSelectors,
    ) -> Result<Self, ServiceError> {
        let allowed = product_type.spec().sub_selector;
        if let Some((selector, _)) = selectors
            .present()
            .into_iter()
            .find(|(selector, _)| Some(*selector) != allowed)
        {
            return Err(ServiceError::ValidationError(format!(
                "{} is not valid for product_type {}",
                selector.field_name(),
                product_type
            )));
        }

        Ok(match product_type {
            ProductType::Hotel => ProductRef::Hotel {
                hotel_id: product_id,
                room_id: selectors.room_id,
            },
            ProductType::EntranceTicket => ProductRef::EntranceTicket {
                ticket_id: product_id,
                variation_id: selectors.variation_id,
            },
            ProductType::PrivateVanTour => ProductRef::PrivateVanTour {
                tour_id: product_id,
                car_id: selectors.car_id,
            },
            ProductType::Airline => ProductRef::Airline {
                airline_id: product_id,
                ticket_id: selectors.ticket_id,
            },
            ProductType::GroupTour => ProductRef::GroupTour {
                tour_id: product_id,
            },
        })
    }

    pub fn product_type(&self) -> ProductType {
        match self {
            ProductRef::Hotel { .. } => ProductType::Hotel,
            ProductRef::EntranceTicket { .. } => ProductType::EntranceTicket,
            ProductRef::PrivateVanTour { .. } => ProductType::PrivateVanTour,
            ProductRef::Airline { .. } => ProductType::Airline,
            ProductRef::GroupTour { .. } => ProductType::GroupTour,
        }
    }

    pub fn product_id(&self) -> Uuid {
        match *self {
            ProductRef::Hotel { hotel_id, .. } => hotel_id,
            ProductRef::EntranceTicket { ticket_id, .. } => ticket_id,
            ProductRef::PrivateVanTour { tour_id, .. } => tour_id,
            ProductRef::Airline { airline_id, .. } => airline_id,
            ProductRef::GroupTour { tour_id } => tour_id,
        }
    }

    /// The sub-variant id, when one was selected.
    pub fn variant_id(&self) -> Option<Uuid> {
        match *self {
            ProductRef::Hotel { room_id, .. } => room_id,
            ProductRef::EntranceTicket { variation_id, .. } => variation_id,
            ProductRef::PrivateVanTour { car_id, .. } => car_id,
            ProductRef::Airline { ticket_id, .. } => ticket_id,
            ProductRef::GroupTour { .. } => None,
        }
    }

    pub fn sub_selectors(&self) -> SubSelectors {
        let mut selectors = SubSelectors::default();
        match *self {
            ProductRef::Hotel { room_id, .. } => selectors.room_id = room_id,
            ProductRef::EntranceTicket { variation_id, .. } => {
                selectors.variation_id = variation_id
            }
            ProductRef::PrivateVanTour { car_id, .. } => selectors.car_id = car_id,
            ProductRef::Airline { ticket_id, .. } => selectors.ticket_id = ticket_id,
            ProductRef::GroupTour { .. } => {}
        }
        selectors
    }

    pub fn pricing(&self) -> PricingRule {
        self.product_type().spec().pricing
    }
}

/// Nights between two dates; the checkout day is not counted.
pub fn nights(checkin: NaiveDate, checkout: NaiveDate) -> i64 {
    (checkout - checkin).num_days()
}

/// Computes an item's line total under `rule`.
///
/// Per-night pricing needs both dates with `checkin < checkout`.
pub fn line_total(
    rule: PricingRule,
    quantity: i32,
    selling_price: Decimal,
    checkin: Option<NaiveDate>,
    checkout: Option<NaiveDate>,
) -> Result<Decimal, ServiceError> {
    let base = Decimal::from(quantity)
        .checked_mul(selling_price)
        .ok_or_else(|| overflow(quantity, selling_price))?;
    match rule {
        PricingRule::Flat => Ok(base),
        PricingRule::PerNight => {
            let (checkin, checkout) = checkin.zip(checkout).ok_or_else(|| {
                ServiceError::ValidationError(
                    "hotel items require checkin_date and checkout_date".to_string(),
                )
            })?;
            let nights = nights(checkin, checkout);
            if nights < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "checkin_date {} must be before checkout_date {}",
                    checkin, checkout
                )));
            }
            base.checked_mul(Decimal::from(nights))
                .ok_or_else(|| overflow(quantity, selling_price))
        }
    }
}

fn overflow(quantity: i32, selling_price: Decimal) -> ServiceError {
    ServiceError::ValidationError(format!(
        "line total of quantity {} at selling_price {} overflows",
        quantity, selling_price
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn hotel_nights_exclude_checkout_day() {
        let total = line_total(
            PricingRule::PerNight,
            2,
            dec!(100),
            Some(date(2024, 1, 1)),
            Some(date(2024, 1, 4)),
        )
        .unwrap();
        assert_eq!(total, dec!(600));
    }

    #[test]
    fn oversized_lines_are_rejected_instead_of_overflowing() {
        let huge = Decimal::from_str("100000000000000000000").unwrap();
        assert_matches!(
            line_total(PricingRule::Flat, i32::MAX, huge, None, None),
            Err(ServiceError::ValidationError(msg)) if msg.contains("overflows")
        );
        assert_matches!(
            line_total(
                PricingRule::PerNight,
                1,
                Decimal::MAX,
                Some(date(2024, 1, 1)),
                Some(date(2024, 1, 3)),
            ),
            Err(ServiceError::ValidationError(msg)) if msg.contains("overflows")
        );
    }

    #[test]
    fn flat_pricing_ignores_dates() {
        let total = line_total(
            PricingRule::Flat,
            3,
            dec!(45.50),
            Some(date(2024, 1, 1)),
            Some(date(2024, 1, 9)),
        )
        .unwrap();
        assert_eq!(total, dec!(136.50));
    }

    #[rstest]
    #[case(Some(date(2024, 3, 2)), Some(date(2024, 3, 2)))]
    #[case(Some(date(2024, 3, 5)), Some(date(2024, 3, 2)))]
    #[case(None, Some(date(2024, 3, 2)))]
    #[case(Some(date(2024, 3, 2)), None)]
    fn per_night_requires_an_ordered_date_pair(
        #[case] checkin: Option<NaiveDate>,
        #[case] checkout: Option<NaiveDate>,
    ) {
        assert_matches!(
            line_total(PricingRule::PerNight, 1, dec!(10), checkin, checkout),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[rstest]
    #[case(ProductType::Hotel, "hotels", Some(SubSelector::RoomId), PricingRule::PerNight)]
    #[case(ProductType::EntranceTicket, "entrance_tickets", Some(SubSelector::VariationId), PricingRule::Flat)]
    #[case(ProductType::PrivateVanTour, "private_van_tours", Some(SubSelector::CarId), PricingRule::Flat)]
    #[case(ProductType::Airline, "airlines", Some(SubSelector::TicketId), PricingRule::Flat)]
    #[case(ProductType::GroupTour, "group_tours", None, PricingRule::Flat)]
    fn resolver_table(
        #[case] product_type: ProductType,
        #[case] table: &str,
        #[case] selector: Option<SubSelector>,
        #[case] pricing: PricingRule,
    ) {
        let spec = product_type.spec();
        assert_eq!(spec.table, table);
        assert_eq!(spec.sub_selector, selector);
        assert_eq!(spec.pricing, pricing);
    }

    #[test]
    fn rejects_sub_selector_of_another_type() {
        let err = ProductRef::from_parts(
            ProductType::GroupTour,
            Uuid::new_v4(),
            SubSelectors {
                room_id: Some(Uuid::new_v4()),
                ..Default::default()
            },
        )
        .unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg.contains("room_id"));
    }

    #[test]
    fn flat_columns_survive_the_sum_type() {
        let car = Uuid::new_v4();
        let selectors = SubSelectors {
            car_id: Some(car),
            ..Default::default()
        };
        let product = Uuid::new_v4();
        let reference =
            ProductRef::from_parts(ProductType::PrivateVanTour, product, selectors).unwrap();
        assert_eq!(reference.product_type(), ProductType::PrivateVanTour);
        assert_eq!(reference.product_id(), product);
        assert_eq!(reference.variant_id(), Some(car));
        assert_eq!(reference.sub_selectors(), selectors);
    }

    #[test]
    fn parses_product_type_strings() {
        assert_eq!(ProductType::parse("EntranceTicket").unwrap(), ProductType::EntranceTicket);
        assert_eq!(ProductType::parse(" Hotel ").unwrap(), ProductType::Hotel);
        assert_matches!(
            ProductType::parse("App\\Models\\Hotel"),
            Err(ServiceError::ValidationError(_))
        );
    }
}
