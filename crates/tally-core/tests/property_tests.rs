//! # Property-Based Tests
//!
//! Invariants of the derived views, checked with proptest over random
//! interaction tables.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeMap;
use tally_core::primitives::TOP_N_USERS;
use tally_core::{
    Action, Aggregator, InteractionId, InteractionRecord, InteractionTable, ProductId, UserId,
};

// =============================================================================
// STRATEGIES
// =============================================================================

fn base_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid base time")
}

/// (user, product, action index, day offset, second of day)
type RawRow = (i64, i64, usize, i64, i64);

fn raw_rows(max_len: usize) -> impl Strategy<Value = Vec<RawRow>> {
    vec((1i64..=8, 1i64..=4, 0usize..3, 0i64..10, 0i64..86_400), 0..max_len)
}

fn build_table(rows: &[RawRow]) -> InteractionTable {
    rows.iter()
        .enumerate()
        .map(|(i, &(user, product, action, day, second))| {
            InteractionRecord::new(
                InteractionId(i as i64 + 1),
                UserId(user),
                ProductId(product),
                Action::ALL[action],
                base_time() + Duration::days(day) + Duration::seconds(second),
            )
        })
        .collect()
}

fn user_counts(table: &InteractionTable) -> BTreeMap<UserId, i64> {
    let mut counts = BTreeMap::new();
    for record in table {
        *counts.entry(record.user_id).or_insert(0) += 1;
    }
    counts
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every input row appears once, carrying the size of its pair group.
    #[test]
    fn pair_counts_match_group_cardinality(rows in raw_rows(60)) {
        let table = build_table(&rows);
        let pair_counts = Aggregator::pair_counts(&table);

        prop_assert_eq!(pair_counts.len(), table.len());

        for row in &pair_counts {
            let expected = table
                .iter()
                .filter(|r| r.pair() == row.record.pair())
                .count() as i64;
            prop_assert_eq!(row.interaction_count.value(), expected);
        }

        let mut in_ids: Vec<_> = table.iter().map(|r| r.interaction_id).collect();
        let mut out_ids: Vec<_> = pair_counts.iter().map(|r| r.record.interaction_id).collect();
        in_ids.sort();
        out_ids.sort();
        prop_assert_eq!(in_ids, out_ids);
    }

    /// Within a pair group, rows keep their input order.
    #[test]
    fn pair_counts_stable_within_group(rows in raw_rows(60)) {
        let table = build_table(&rows);
        let pair_counts = Aggregator::pair_counts(&table);

        let mut last_seen: BTreeMap<(UserId, ProductId), InteractionId> = BTreeMap::new();
        for row in &pair_counts {
            if let Some(prev) = last_seen.insert(row.record.pair(), row.record.interaction_id) {
                prop_assert!(prev < row.record.interaction_id);
            }
        }
    }

    /// Daily totals sum to the input size and are strictly ascending by date.
    #[test]
    fn daily_totals_cover_every_row(rows in raw_rows(60)) {
        let table = build_table(&rows);
        let totals = Aggregator::daily_totals(&table);

        let sum: i64 = totals.iter().map(|r| r.interaction_count.value()).sum();
        prop_assert_eq!(sum, table.len() as i64);

        for pair in totals.windows(2) {
            prop_assert!(pair[0].date < pair[1].date);
        }
    }

    /// The ranking is bounded, sorted, and dominates every excluded user.
    #[test]
    fn top_users_dominate_the_rest(rows in raw_rows(60)) {
        let table = build_table(&rows);
        let top = Aggregator::top_users(&table, TOP_N_USERS);
        let counts = user_counts(&table);

        prop_assert!(top.len() <= TOP_N_USERS);
        prop_assert_eq!(top.len(), counts.len().min(TOP_N_USERS));

        for pair in top.windows(2) {
            prop_assert!(pair[0].interaction_count >= pair[1].interaction_count);
            if pair[0].interaction_count == pair[1].interaction_count {
                prop_assert!(pair[0].user_id < pair[1].user_id);
            }
        }

        let lowest = top.last().map(|r| r.interaction_count.value()).unwrap_or(0);
        for (user, count) in &counts {
            if !top.iter().any(|r| r.user_id == *user) {
                prop_assert!(*count <= lowest);
            }
        }

        for row in &top {
            prop_assert_eq!(Some(&row.interaction_count.value()), counts.get(&row.user_id));
        }
    }

    /// Aggregating the same table twice gives identical views.
    #[test]
    fn aggregate_is_deterministic(rows in raw_rows(40)) {
        let table = build_table(&rows);
        prop_assert_eq!(Aggregator::aggregate(&table), Aggregator::aggregate(&table));
    }

    /// Daily totals and the ranking do not depend on input order.
    #[test]
    fn grouped_views_ignore_input_order(rows in raw_rows(40)) {
        let table = build_table(&rows);
        let reversed: InteractionTable = table.iter().rev().cloned().collect();

        prop_assert_eq!(
            Aggregator::daily_totals(&table),
            Aggregator::daily_totals(&reversed)
        );
        prop_assert_eq!(
            Aggregator::top_users(&table, TOP_N_USERS),
            Aggregator::top_users(&reversed, TOP_N_USERS)
        );
    }
}
