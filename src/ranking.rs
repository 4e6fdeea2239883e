/*
 *  Kratos - Discord bot for managing a Black Desert Online guild's gearscore roster.
 *  Copyright (C) 2026  The Kratos developers
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  You should have received a copy of the GNU General Public License
 *  along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */
use crate::error::StoreError;
use crate::gear::{ClassStatistic, GearRecord, RankingResult};
use crate::roster::{eligible_members, RosterEntry};
use crate::store::GearStore;
use serenity::all::UserId;
use std::cmp::Reverse;

/**
 * Returns the eligible records ordered for display: score descending, member identifier
 * ascending on ties. The order is a deterministic total order, so repeated calls over the same
 * snapshot produce the same leaderboard.
 */
pub fn leaderboard(
    store: &dyn GearStore,
    roster: &[RosterEntry],
) -> Result<Vec<(GearRecord, i64)>, StoreError> {
    let eligible = eligible_members(roster);
    let records = store.list_records(Some(&eligible))?;

    let mut scored = Vec::with_capacity(records.len());
    for record in records {
        let score = record
            .total_score()
            .map_err(|err| StoreError::Corrupt(err.to_string()))?;
        scored.push((record, score));
    }
    scored.sort_by_key(|(record, score)| (Reverse(*score), record.member_id()));

    Ok(scored)
}

/**
 * Computes the target member's leaderboard position among the currently eligible members.
 *
 * Returns `None` ("not eligible", a defined no-result outcome rather than an error) when the
 * target does not hold the qualifying role, or holds it but never registered a record.
 *
 * The percentile is `round((total - position + 1) / total * 100)`, rounded half-up
 * (`f64::round`): last place out of 8 is 12.5 and reports as 13.
 */
pub fn rank(
    store: &dyn GearStore,
    roster: &[RosterEntry],
    target: UserId,
) -> Result<Option<RankingResult>, StoreError> {
    if !eligible_members(roster).contains(&target) {
        return Ok(None);
    }

    let board = leaderboard(store, roster)?;
    let Some(index) = board
        .iter()
        .position(|(record, _)| record.member_id() == target)
    else {
        // Eligible, but no record registered yet:
        return Ok(None);
    };

    let position = index + 1;
    let total_eligible = board.len();
    let percentile =
        (((total_eligible - position + 1) as f64 / total_eligible as f64) * 100.0).round() as u32;

    Ok(Some(RankingResult {
        position,
        total_eligible,
        count_above: position - 1,
        count_below: total_eligible - position,
        percentile,
    }))
}

/**
 * Per-class statistics over the eligible record set, ordered by class size descending, then
 * mean score descending.
 */
pub fn class_statistics(
    store: &dyn GearStore,
    roster: &[RosterEntry],
) -> Result<Vec<ClassStatistic>, StoreError> {
    let eligible = eligible_members(roster);
    store.class_aggregate(Some(&eligible))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::testutil::record;

    fn entry(member_id: u64, qualifying: bool) -> RosterEntry {
        RosterEntry {
            member_id: UserId::new(member_id),
            qualifying,
        }
    }

    /// Three eligible members: A (600), B (550), C (600). A and C tie.
    fn three_member_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.upsert_record(&record(1, "witch", 280, 300, 300)).unwrap(); // A, 600.
        store.upsert_record(&record(2, "warrior", 250, 230, 300)).unwrap(); // B, 550.
        store.upsert_record(&record(3, "valkyrie", 300, 290, 300)).unwrap(); // C, 600.
        store
    }

    #[test]
    fn tied_scores_order_by_member_id() {
        let store = three_member_store();
        let roster = vec![entry(1, true), entry(2, true), entry(3, true)];

        let board = leaderboard(&store, &roster).unwrap();
        let ids: Vec<u64> = board.iter().map(|(r, _)| r.member_id().get()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn rank_of_last_member_of_three() {
        let store = three_member_store();
        let roster = vec![entry(1, true), entry(2, true), entry(3, true)];

        let result = rank(&store, &roster, UserId::new(2)).unwrap().unwrap();
        assert_eq!(result.position, 3);
        assert_eq!(result.total_eligible, 3);
        assert_eq!(result.count_above, 2);
        assert_eq!(result.count_below, 0);
        // (3 - 3 + 1) / 3 * 100 = 33.33.., rounds to 33:
        assert_eq!(result.percentile, 33);
    }

    #[test]
    fn rank_is_stable_across_calls() {
        let store = three_member_store();
        let roster = vec![entry(1, true), entry(2, true), entry(3, true)];

        let first = rank(&store, &roster, UserId::new(3)).unwrap().unwrap();
        let second = rank(&store, &roster, UserId::new(3)).unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.position, 2);
    }

    #[test]
    fn member_without_qualifying_role_is_not_ranked() {
        let store = three_member_store();
        // Member 1 has a record but lost the role:
        let roster = vec![entry(1, false), entry(2, true), entry(3, true)];

        assert!(rank(&store, &roster, UserId::new(1)).unwrap().is_none());

        // And their record no longer counts against the others:
        let result = rank(&store, &roster, UserId::new(2)).unwrap().unwrap();
        assert_eq!(result.total_eligible, 2);
        assert_eq!(result.position, 2);
    }

    #[test]
    fn eligible_member_without_record_is_not_ranked() {
        let store = three_member_store();
        let roster = vec![entry(1, true), entry(2, true), entry(3, true), entry(4, true)];

        assert!(rank(&store, &roster, UserId::new(4)).unwrap().is_none());
    }

    #[test]
    fn percentile_rounds_half_up() {
        let store = MemoryStore::new();
        let mut roster = Vec::new();
        for id in 1..=8 {
            // Score increases with id, so member 1 lands in last place:
            store
                .upsert_record(&record(id, "witch", 200 + id as i64, 100, 100))
                .unwrap();
            roster.push(entry(id, true));
        }

        let result = rank(&store, &roster, UserId::new(1)).unwrap().unwrap();
        assert_eq!(result.position, 8);
        // 1/8 = 12.5%, half-up to 13:
        assert_eq!(result.percentile, 13);
    }

    #[test]
    fn top_member_is_hundredth_percentile() {
        let store = three_member_store();
        let roster = vec![entry(1, true), entry(2, true), entry(3, true)];

        let result = rank(&store, &roster, UserId::new(1)).unwrap().unwrap();
        assert_eq!(result.position, 1);
        assert_eq!(result.percentile, 100);
    }

    #[test]
    fn class_statistics_follow_the_eligibility_filter() {
        let store = MemoryStore::new();
        store.upsert_record(&record(1, "witch", 200, 250, 250)).unwrap(); // 500.
        store.upsert_record(&record(2, "witch", 300, 350, 350)).unwrap(); // 700.
        store.upsert_record(&record(3, "witch", 0, 0, 1)).unwrap(); // Not eligible.
        let roster = vec![entry(1, true), entry(2, true), entry(3, false)];

        let stats = class_statistics(&store, &roster).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].avg_score, 600.0);
    }
}
