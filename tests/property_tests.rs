//! Property-based tests for identifier formats, pricing and amendment payloads.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use travelops_api::{
    commands::bookings::totals::Totals,
    models::{
        amendment::SNAPSHOT_PREFIX,
        crm::{booking_crm_id, item_crm_id, item_sequence, next_item_sequence},
        product::line_total,
        ChangeSet, PricingRule,
    },
};

fn price_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
}

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..3650).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2020, 1, 1).unwrap() + Duration::days(offset)
    })
}

fn payload_strategy() -> impl Strategy<Value = Map<String, Value>> {
    prop::collection::btree_map(
        prop_oneof!["[a-z_]{1,12}", "[a-z_]{1,12}".prop_map(|k| format!("{}{}", SNAPSHOT_PREFIX, k))],
        any::<i64>(),
        0..12,
    )
    .prop_map(|entries| {
        entries
            .into_iter()
            .map(|(k, v)| (k, Value::from(v)))
            .collect()
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn item_ids_carry_their_parent_and_sequence(
        prefix in "[A-Z]{1,4}",
        booking_seq in 1u64..10_000_000,
        item_seq in 1u32..100_000,
    ) {
        let parent = booking_crm_id(&prefix, booking_seq);
        prop_assert!(parent.starts_with(&prefix));
        prop_assert!(parent.len() >= prefix.len() + 5);

        let item = item_crm_id(&parent, item_seq);
        let expected_prefix = format!("{}_", parent);
        prop_assert!(item.starts_with(&expected_prefix));
        prop_assert_eq!(item_sequence(&item), Some(item_seq));
    }

    #[test]
    fn next_sequence_exceeds_every_existing_one(
        existing in prop::collection::vec(1u32..10_000, 0..20),
    ) {
        let next = next_item_sequence(existing.iter().copied());
        prop_assert!(existing.iter().all(|seq| *seq < next));
        if existing.is_empty() {
            prop_assert_eq!(next, 1);
        }
    }

    #[test]
    fn hotel_lines_are_priced_per_night(
        quantity in 1i32..50,
        price in price_strategy(),
        checkin in date_strategy(),
        nights in 1i64..60,
    ) {
        let checkout = checkin + Duration::days(nights);
        let total = line_total(PricingRule::PerNight, quantity, price, Some(checkin), Some(checkout))
            .unwrap();
        prop_assert_eq!(total, Decimal::from(quantity) * price * Decimal::from(nights));
    }

    #[test]
    fn inverted_stays_are_rejected(
        price in price_strategy(),
        checkin in date_strategy(),
        back in 0i64..30,
    ) {
        let checkout = checkin - Duration::days(back);
        prop_assert!(line_total(PricingRule::PerNight, 1, price, Some(checkin), Some(checkout)).is_err());
    }

    #[test]
    fn flat_lines_ignore_dates(quantity in 1i32..50, price in price_strategy()) {
        let total = line_total(PricingRule::Flat, quantity, price, None, None).unwrap();
        prop_assert_eq!(total, Decimal::from(quantity) * price);
    }

    #[test]
    fn snapshot_split_partitions_the_payload(payload in payload_strategy()) {
        let set = ChangeSet::split(payload.clone());

        prop_assert!(set.previous_values.keys().all(|k| k.starts_with(SNAPSHOT_PREFIX)));
        prop_assert!(set.changes.keys().all(|k| !k.starts_with(SNAPSHOT_PREFIX)));
        prop_assert_eq!(set.changes.len() + set.previous_values.len(), payload.len());
        for (key, value) in &payload {
            let side = if key.starts_with(SNAPSHOT_PREFIX) {
                &set.previous_values
            } else {
                &set.changes
            };
            prop_assert_eq!(side.get(key), Some(value));
        }
    }

    #[test]
    fn derived_totals_balance(
        sub_total in price_strategy(),
        discount in price_strategy(),
        deposit in price_strategy(),
    ) {
        let totals = Totals::derive(sub_total, discount, None, deposit, None).unwrap();
        prop_assert_eq!(totals.grand_total, sub_total - discount);
        prop_assert_eq!(totals.balance_due, totals.grand_total - deposit);
    }

    #[test]
    fn supplied_totals_are_kept(
        sub_total in price_strategy(),
        grand_total in price_strategy(),
        balance_due in price_strategy(),
    ) {
        let totals = Totals::derive(sub_total, Decimal::ZERO, Some(grand_total), Decimal::ZERO, Some(balance_due)).unwrap();
        prop_assert_eq!(totals.grand_total, grand_total);
        prop_assert_eq!(totals.balance_due, balance_due);
    }
}
