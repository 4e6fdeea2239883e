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
pub mod json;
pub mod memory;
pub mod sqlite;

use crate::error::StoreError;
use crate::gear::{ClassStatistic, GearRecord, HistoryEntry};
use serenity::all::UserId;
use std::collections::{BTreeMap, HashSet};

/// Default cap on the number of history entries returned by a single query.
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Clamps a caller-requested history length to the default cap.
pub fn history_limit(requested: usize) -> usize {
    requested.min(DEFAULT_HISTORY_LIMIT)
}

/**
 * Persistence contract for gear records and their history.
 *
 * Every backend implements these operations with identical semantics; callers receive one
 * canonical record shape no matter which backend is configured. Concurrent writers to the same
 * member must never observe a torn record: `upsert_record` is an atomic replace-or-insert keyed
 * by member.
 */
pub trait GearStore: Send + Sync {
    /// Inserts the record, or replaces the member's existing record atomically.
    fn upsert_record(&self, record: &GearRecord) -> Result<(), StoreError>;

    /// Deletes the member's record if (and only if) it carries the given class tag.
    fn delete_record(&self, member_id: UserId, class_tag: &str) -> Result<(), StoreError>;

    /// Fetches the member's current record, if any.
    fn get_record(&self, member_id: UserId) -> Result<Option<GearRecord>, StoreError>;

    /// Lists current records, optionally restricted to the given member set.
    /// Records are returned ordered by member identifier, for determinism.
    fn list_records(
        &self,
        filter_ids: Option<&HashSet<UserId>>,
    ) -> Result<Vec<GearRecord>, StoreError>;

    /// Appends one entry to the append-only history log.
    fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError>;

    /// Returns up to `limit` history entries for the member, newest first, optionally
    /// restricted to one class tag.
    fn get_history(
        &self,
        member_id: UserId,
        class_tag: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError>;

    /// Per-class aggregate statistics over the (optionally filtered) record set.
    fn class_aggregate(
        &self,
        filter_ids: Option<&HashSet<UserId>>,
    ) -> Result<Vec<ClassStatistic>, StoreError>;

    /// Wipes all records and all history.
    fn clear_all(&self) -> Result<(), StoreError>;

    /// Wipes the history log, leaving current records untouched.
    fn clear_history(&self) -> Result<(), StoreError>;
}

/**
 * Groups records by class tag and computes the per-class counts and means.
 *
 * Every backend's `class_aggregate` delegates here over its own `list_records` output, so the
 * aggregation semantics cannot drift between backends. Results are ordered by count descending,
 * then average score descending.
 */
pub(crate) fn aggregate_classes(records: &[GearRecord]) -> Result<Vec<ClassStatistic>, StoreError> {
    let mut groups: BTreeMap<&str, Vec<&GearRecord>> = BTreeMap::new();
    for record in records {
        groups.entry(record.class_tag()).or_default().push(record);
    }

    let mut stats = Vec::with_capacity(groups.len());
    for (class_tag, group) in groups {
        let count = group.len();
        let mut score_sum = 0_i64;
        let mut ap_sum = 0_i64;
        let mut aap_sum = 0_i64;
        let mut dp_sum = 0_i64;
        for record in &group {
            score_sum += record
                .total_score()
                .map_err(|err| StoreError::Corrupt(err.to_string()))?;
            ap_sum += record.ap();
            aap_sum += record.aap();
            dp_sum += record.dp();
        }

        stats.push(ClassStatistic {
            class_tag: class_tag.to_string(),
            count,
            avg_score: score_sum as f64 / count as f64,
            avg_ap: ap_sum as f64 / count as f64,
            avg_aap: aap_sum as f64 / count as f64,
            avg_dp: dp_sum as f64 / count as f64,
        });
    }

    // Biggest classes first; break count ties by mean score:
    stats.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then(b.avg_score.total_cmp(&a.avg_score))
    });

    Ok(stats)
}

#[cfg(test)]
pub(crate) mod testutil {
    use super::*;
    use chrono::{DateTime, Utc};

    /// Builds a valid record for store and engine tests.
    pub fn record(member_id: u64, class_tag: &str, ap: i64, aap: i64, dp: i64) -> GearRecord {
        record_at(member_id, class_tag, ap, aap, dp, Utc::now())
    }

    pub fn record_at(
        member_id: u64,
        class_tag: &str,
        ap: i64,
        aap: i64,
        dp: i64,
        updated_at: DateTime<Utc>,
    ) -> GearRecord {
        GearRecord::new(
            UserId::new(member_id),
            format!("Family{}", member_id),
            None,
            class_tag.to_string(),
            ap,
            aap,
            dp,
            "https://garmoth.com/character/test".to_string(),
            updated_at,
        )
        .unwrap()
    }

    /// Exercises the full contract against one backend. Each adapter's test module calls this,
    /// so all three stay behaviorally identical.
    pub fn check_store_contract(store: &dyn GearStore) {
        let rec_a = record(1, "witch", 260, 280, 330);
        let rec_b = record(2, "warrior", 250, 240, 310);

        // Starts empty:
        assert!(store.get_record(UserId::new(1)).unwrap().is_none());
        assert!(store.list_records(None).unwrap().is_empty());

        // Upsert inserts, then replaces:
        store.upsert_record(&rec_a).unwrap();
        store.upsert_record(&rec_b).unwrap();
        let replacement = record(1, "witch", 270, 290, 340);
        store.upsert_record(&replacement).unwrap();

        let listed = store.list_records(None).unwrap();
        assert_eq!(listed.len(), 2);
        // Ordered by member id:
        assert_eq!(listed[0].member_id(), UserId::new(1));
        assert_eq!(listed[0].ap(), 270);
        assert_eq!(listed[1].member_id(), UserId::new(2));

        // Filtered listing:
        let only_two: HashSet<UserId> = [UserId::new(2)].into();
        let filtered = store.list_records(Some(&only_two)).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].member_id(), UserId::new(2));

        // get_record round-trips the canonical shape:
        let fetched = store.get_record(UserId::new(1)).unwrap().unwrap();
        assert_eq!(fetched.family_name(), "Family1");
        assert_eq!(fetched.class_tag(), "witch");
        assert_eq!(fetched.total_score().unwrap(), 290 + 340);

        // delete_record is a no-op for a non-matching class tag:
        store.delete_record(UserId::new(1), "warrior").unwrap();
        assert!(store.get_record(UserId::new(1)).unwrap().is_some());
        store.delete_record(UserId::new(1), "witch").unwrap();
        assert!(store.get_record(UserId::new(1)).unwrap().is_none());

        // History is append-only, newest first, filterable by class:
        for (class, score_dp) in [("witch", 300), ("witch", 310), ("valkyrie", 320)] {
            let entry = HistoryEntry::for_record(&record(2, class, 200, 210, score_dp)).unwrap();
            store.append_history(&entry).unwrap();
        }
        let hist = store.get_history(UserId::new(2), None, DEFAULT_HISTORY_LIMIT).unwrap();
        assert_eq!(hist.len(), 3);
        assert_eq!(hist[0].class_tag(), "valkyrie");
        let witch_only = store.get_history(UserId::new(2), Some("witch"), 10).unwrap();
        assert_eq!(witch_only.len(), 2);
        assert!(witch_only.iter().all(|e| e.class_tag() == "witch"));
        let limited = store.get_history(UserId::new(2), None, 1).unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].class_tag(), "valkyrie");

        // clear_history leaves records untouched:
        store.clear_history().unwrap();
        assert!(store
            .get_history(UserId::new(2), None, DEFAULT_HISTORY_LIMIT)
            .unwrap()
            .is_empty());
        assert_eq!(store.list_records(None).unwrap().len(), 1);

        // Aggregates go through the shared helper:
        store.upsert_record(&record(3, "warrior", 250, 240, 290)).unwrap();
        let stats = store.class_aggregate(None).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].class_tag, "warrior");
        assert_eq!(stats[0].count, 2);

        // clear_all wipes everything:
        store.clear_all().unwrap();
        assert!(store.list_records(None).unwrap().is_empty());
        assert!(store
            .get_history(UserId::new(2), None, DEFAULT_HISTORY_LIMIT)
            .unwrap()
            .is_empty());
    }
}

#[cfg(test)]
mod tests {
    use super::testutil::record;
    use super::*;

    #[test]
    fn aggregate_groups_and_averages_per_class() {
        let records = vec![
            record(1, "witch", 200, 250, 250), // Score 500.
            record(2, "witch", 300, 350, 350), // Score 700.
            record(3, "warrior", 100, 100, 100),
        ];

        let stats = aggregate_classes(&records).unwrap();
        assert_eq!(stats.len(), 2);
        // Witch has the bigger count, so it comes first:
        assert_eq!(stats[0].class_tag, "witch");
        assert_eq!(stats[0].count, 2);
        assert_eq!(stats[0].avg_score, 600.0);
        assert_eq!(stats[0].avg_ap, 250.0);
        assert_eq!(stats[0].avg_aap, 300.0);
        assert_eq!(stats[0].avg_dp, 300.0);
        assert_eq!(stats[1].class_tag, "warrior");
        assert_eq!(stats[1].count, 1);
    }

    #[test]
    fn aggregate_breaks_count_ties_by_mean_score() {
        let records = vec![
            record(1, "witch", 100, 100, 100),
            record(2, "warrior", 300, 300, 300),
        ];

        let stats = aggregate_classes(&records).unwrap();
        assert_eq!(stats[0].class_tag, "warrior");
        assert_eq!(stats[1].class_tag, "witch");
    }

    #[test]
    fn aggregate_of_no_records_is_empty() {
        assert!(aggregate_classes(&[]).unwrap().is_empty());
    }

    #[test]
    fn history_limit_caps_oversized_requests() {
        assert_eq!(history_limit(10), 10);
        assert_eq!(history_limit(DEFAULT_HISTORY_LIMIT), DEFAULT_HISTORY_LIMIT);
        assert_eq!(history_limit(500), DEFAULT_HISTORY_LIMIT);
    }
}
