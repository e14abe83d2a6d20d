//! # Aggregator Module
//!
//! Derives the three summary views from a cleaned interaction table.
//!
//! - Pure: no I/O, no side effects, input is only borrowed
//! - Deterministic: grouping uses `BTreeMap`, ties are broken explicitly
//! - Schema-stable: an empty table yields three empty views

use crate::primitives::TOP_N_USERS;
use crate::{
    DailyTotalRow, DerivedViews, InteractionCount, InteractionRecord, InteractionTable,
    PairCountRow, ProductId, UserId, UserTotalRow,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// The Aggregator computes derived views over an interaction table.
pub struct Aggregator;

impl Aggregator {
    /// Compute all three views.
    #[must_use]
    pub fn aggregate(table: &InteractionTable) -> DerivedViews {
        DerivedViews {
            pair_counts: Self::pair_counts(table),
            daily_totals: Self::daily_totals(table),
            top_users: Self::top_users(table, TOP_N_USERS),
        }
    }

    /// Widen every record with the size of its `(user, product)` group.
    ///
    /// Equivalent to an inner join of the table with its own grouped counts.
    /// Rows are emitted group by group: groups in order of first appearance,
    /// records within a group in input order. Output length equals input length.
    #[must_use]
    pub fn pair_counts(table: &InteractionTable) -> Vec<PairCountRow> {
        let mut first_seen: Vec<(UserId, ProductId)> = Vec::new();
        let mut groups: BTreeMap<(UserId, ProductId), Vec<&InteractionRecord>> = BTreeMap::new();

        for record in table {
            match groups.entry(record.pair()) {
                Entry::Vacant(slot) => {
                    first_seen.push(record.pair());
                    slot.insert(vec![record]);
                }
                Entry::Occupied(mut slot) => slot.get_mut().push(record),
            }
        }

        let mut rows = Vec::with_capacity(table.len());
        for key in &first_seen {
            let Some(members) = groups.get(key) else {
                continue;
            };
            let count = count_of(members.len());
            rows.extend(members.iter().map(|record| PairCountRow {
                record: (*record).clone(),
                interaction_count: count,
            }));
        }

        rows
    }

    /// Count records per calendar date, ascending by date.
    #[must_use]
    pub fn daily_totals(table: &InteractionTable) -> Vec<DailyTotalRow> {
        let mut per_day: BTreeMap<NaiveDate, InteractionCount> = BTreeMap::new();

        for record in table {
            let count = per_day.entry(record.date()).or_default();
            *count = count.increment();
        }

        per_day
            .into_iter()
            .map(|(date, interaction_count)| DailyTotalRow {
                date,
                interaction_count,
            })
            .collect()
    }

    /// Rank users by total interactions and keep the first `limit`.
    ///
    /// Ordered descending by count; equal counts are ordered by ascending
    /// `user_id`, so the ranking is stable across runs and input orders.
    #[must_use]
    pub fn top_users(table: &InteractionTable, limit: usize) -> Vec<UserTotalRow> {
        let mut ranking = Self::user_totals(table);

        ranking.sort_by(|a, b| {
            b.interaction_count
                .cmp(&a.interaction_count)
                .then_with(|| a.user_id.cmp(&b.user_id))
        });
        ranking.truncate(limit);

        ranking
    }

    /// Total interactions per user, ascending by `user_id`.
    #[must_use]
    pub fn user_totals(table: &InteractionTable) -> Vec<UserTotalRow> {
        let mut per_user: BTreeMap<UserId, InteractionCount> = BTreeMap::new();

        for record in table {
            let count = per_user.entry(record.user_id).or_default();
            *count = count.increment();
        }

        per_user
            .into_iter()
            .map(|(user_id, interaction_count)| UserTotalRow {
                user_id,
                interaction_count,
            })
            .collect()
    }
}

fn count_of(len: usize) -> InteractionCount {
    InteractionCount::new(i64::try_from(len).unwrap_or(i64::MAX))
}

// =============================================================================
// TESTS
// =============================================================================
