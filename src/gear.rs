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
use crate::error::GearError;
use chrono::{DateTime, Utc};
use getset::{CopyGetters, Getters};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serenity::all::UserId;
use std::sync::OnceLock;

/// Upper bound accepted for a single stat value. The game's stats sit in the hundreds; the cap
/// keeps every score and aggregate sum far from `i64`'s range.
pub const MAX_STAT: i64 = 9_999;

/**
 * Gearscore formula: `max(AP, AAP) + DP`.
 *
 * This is the single source of truth for the score; registration, updates, ranking and class
 * statistics all go through it. Fails with `InvalidInput` if any argument is negative or above
 * `MAX_STAT` (stat values are self-reported and arrive as signed integers from the command
 * layer), so the sum below can never overflow.
 */
pub fn gearscore(ap: i64, aap: i64, dp: i64) -> Result<i64, GearError> {
    let in_range = |stat: i64| (0..=MAX_STAT).contains(&stat);
    if !in_range(ap) || !in_range(aap) || !in_range(dp) {
        return Err(GearError::InvalidInput(format!(
            "stat values must be between 0 and {} (got AP {}, AAP {}, DP {})",
            MAX_STAT, ap, aap, dp
        )));
    }

    Ok(ap.max(aap) + dp)
}

/// Pattern a gear (planner) link must match to be accepted.
fn gear_link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^https?://\S+$").unwrap() // The pattern is a literal; it always compiles.
    })
}

/// Trims and lowercases a class tag, so "Witch" and "witch " rank into the same bucket.
pub fn normalize_class_tag(class_tag: &str) -> String {
    class_tag.trim().to_lowercase()
}

/**
 * Data structure defining a member's current gear record.
 *
 * At most one record exists per member at any time: changing class replaces the record instead
 * of adding a second one. Records are only created through `GearRecord::new`, which enforces
 * the input invariants, and only mutated through the lifecycle operations.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
#[derive(Clone, Serialize, Deserialize, Getters, CopyGetters)]
pub struct GearRecord {
    /// Discord identifier of the member owning the record (immutable).
    #[getset(get_copy = "pub")]
    member_id: UserId,
    /// In-game family name.
    #[getset(get = "pub")]
    family_name: String,
    /// Name of the character currently playing the class, if reported.
    #[getset(get = "pub")]
    character_name: Option<String>,
    /// Class tag (normalized). A member has at most one active class at a time.
    #[getset(get = "pub")]
    class_tag: String,
    /// Attack power.
    #[getset(get_copy = "pub")]
    ap: i64,
    /// Awakened attack power.
    #[getset(get_copy = "pub")]
    aap: i64,
    /// Defense power.
    #[getset(get_copy = "pub")]
    dp: i64,
    /// Link to the member's gear planner page.
    #[getset(get = "pub")]
    gear_link: String,
    /// Timestamp of the last register/update call that produced this record.
    #[getset(get_copy = "pub")]
    updated_at: DateTime<Utc>,
}

impl GearRecord {
    /**
     * Constructor for a gear record. Validates every field before anything can be written:
     * stats must be within the accepted range, family name and class tag non-empty, and the
     * gear link an http(s) URL.
     */
    pub fn new(
        member_id: UserId,
        family_name: String,
        character_name: Option<String>,
        class_tag: String,
        ap: i64,
        aap: i64,
        dp: i64,
        gear_link: String,
        updated_at: DateTime<Utc>,
    ) -> Result<GearRecord, GearError> {
        gearscore(ap, aap, dp)?;

        if family_name.trim().is_empty() {
            return Err(GearError::InvalidInput(
                "family name cannot be empty".to_string(),
            ));
        }

        let class_tag = normalize_class_tag(&class_tag);
        if class_tag.is_empty() {
            return Err(GearError::InvalidInput(
                "class tag cannot be empty".to_string(),
            ));
        }

        if !gear_link_pattern().is_match(gear_link.trim()) {
            return Err(GearError::InvalidInput(format!(
                "gear link `{}` is not an http(s) URL",
                gear_link
            )));
        }

        // Discard reported character names that are pure whitespace:
        let character_name = character_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        Ok(Self {
            member_id,
            family_name: family_name.trim().to_string(),
            character_name,
            class_tag,
            ap,
            aap,
            dp,
            gear_link: gear_link.trim().to_string(),
            updated_at,
        })
    }

    /// Total score for the record, through the gearscore formula.
    ///
    /// Fails only if the stored stats were tampered with outside the lifecycle operations.
    pub fn total_score(&self) -> Result<i64, GearError> {
        gearscore(self.ap, self.aap, self.dp)
    }
}

/**
 * Data structure defining one append-only history entry.
 *
 * One entry is created per register/update call. History survives record deletion and class
 * moves, and is only used for progress queries, never for ranking.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
#[derive(Clone, Serialize, Deserialize, Getters, CopyGetters)]
pub struct HistoryEntry {
    #[getset(get_copy = "pub")]
    member_id: UserId,
    /// Class tag the stats were reported under.
    #[getset(get = "pub")]
    class_tag: String,
    #[getset(get_copy = "pub")]
    ap: i64,
    #[getset(get_copy = "pub")]
    aap: i64,
    #[getset(get_copy = "pub")]
    dp: i64,
    /// Score at the time of the write, computed with the gearscore formula.
    #[getset(get_copy = "pub")]
    total_score: i64,
    #[getset(get_copy = "pub")]
    created_at: DateTime<Utc>,
}

impl HistoryEntry {
    /// Reassembles an entry from its stored fields. Used by the storage backends.
    pub(crate) fn from_parts(
        member_id: UserId,
        class_tag: String,
        ap: i64,
        aap: i64,
        dp: i64,
        total_score: i64,
        created_at: DateTime<Utc>,
    ) -> HistoryEntry {
        Self {
            member_id,
            class_tag,
            ap,
            aap,
            dp,
            total_score,
            created_at,
        }
    }

    /// Builds the history entry matching a freshly written gear record.
    pub fn for_record(record: &GearRecord) -> Result<HistoryEntry, GearError> {
        Ok(Self {
            member_id: record.member_id(),
            class_tag: record.class_tag().clone(),
            ap: record.ap(),
            aap: record.aap(),
            dp: record.dp(),
            total_score: record.total_score()?,
            created_at: record.updated_at(),
        })
    }
}

/**
 * Aggregated per-class statistics, derived from the eligible record set. Never persisted.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
#[derive(Clone, PartialEq, Serialize)]
pub struct ClassStatistic {
    pub class_tag: String,
    pub count: usize,
    pub avg_score: f64,
    pub avg_ap: f64,
    pub avg_aap: f64,
    pub avg_dp: f64,
}

/**
 * Position of a member within the guild's leaderboard, derived on demand.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct RankingResult {
    /// 1-based position in the leaderboard.
    pub position: usize,
    /// Number of eligible members holding a record.
    pub total_eligible: usize,
    /// Members ranked strictly above the target.
    pub count_above: usize,
    /// Members ranked strictly below the target.
    pub count_below: usize,
    /// Share of the leaderboard at or below the target, in percent, rounded half-up.
    pub percentile: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ap: i64, aap: i64, dp: i64) -> GearRecord {
        GearRecord::new(
            UserId::new(7),
            "Belmorn".to_string(),
            Some("Adofeu".to_string()),
            "Witch".to_string(),
            ap,
            aap,
            dp,
            "https://garmoth.com/character/abc".to_string(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn gearscore_is_max_plus_dp() {
        assert_eq!(gearscore(269, 281, 330).unwrap(), 611);
        assert_eq!(gearscore(281, 269, 330).unwrap(), 611);
        assert_eq!(gearscore(0, 0, 0).unwrap(), 0);
    }

    #[test]
    fn gearscore_is_invariant_under_ap_swap() {
        for (ap, aap, dp) in [(100, 200, 50), (200, 100, 50), (150, 150, 75)] {
            assert_eq!(
                gearscore(ap, aap, dp).unwrap(),
                gearscore(aap, ap, dp).unwrap()
            );
        }
    }

    #[test]
    fn gearscore_rejects_negative_stats() {
        assert!(matches!(
            gearscore(-1, 200, 300),
            Err(GearError::InvalidInput(_))
        ));
        assert!(matches!(
            gearscore(200, -1, 300),
            Err(GearError::InvalidInput(_))
        ));
        assert!(matches!(
            gearscore(200, 200, -1),
            Err(GearError::InvalidInput(_))
        ));
    }

    #[test]
    fn gearscore_rejects_stats_above_the_cap() {
        assert!(matches!(
            gearscore(i64::MAX, 0, 1),
            Err(GearError::InvalidInput(_))
        ));
        assert!(matches!(
            gearscore(0, MAX_STAT + 1, 0),
            Err(GearError::InvalidInput(_))
        ));
        assert!(matches!(
            gearscore(0, 0, i64::MAX),
            Err(GearError::InvalidInput(_))
        ));
        // The cap itself is a valid value:
        assert_eq!(
            gearscore(MAX_STAT, MAX_STAT, MAX_STAT).unwrap(),
            2 * MAX_STAT
        );
    }

    #[test]
    fn record_normalizes_class_tag() {
        let rec = GearRecord::new(
            UserId::new(7),
            "Belmorn".to_string(),
            None,
            "  Witch ".to_string(),
            100,
            200,
            300,
            "https://garmoth.com/character/abc".to_string(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(rec.class_tag(), "witch");
    }

    #[test]
    fn record_rejects_bad_inputs() {
        let now = Utc::now();
        // Empty family name:
        assert!(GearRecord::new(
            UserId::new(7),
            "  ".to_string(),
            None,
            "witch".to_string(),
            1,
            2,
            3,
            "https://garmoth.com/x".to_string(),
            now,
        )
        .is_err());
        // Empty class tag:
        assert!(GearRecord::new(
            UserId::new(7),
            "Belmorn".to_string(),
            None,
            " ".to_string(),
            1,
            2,
            3,
            "https://garmoth.com/x".to_string(),
            now,
        )
        .is_err());
        // Non-URL gear link:
        assert!(GearRecord::new(
            UserId::new(7),
            "Belmorn".to_string(),
            None,
            "witch".to_string(),
            1,
            2,
            3,
            "garmoth dot com".to_string(),
            now,
        )
        .is_err());
    }

    #[test]
    fn history_entry_matches_record() {
        let rec = record(269, 281, 330);
        let entry = HistoryEntry::for_record(&rec).unwrap();
        assert_eq!(entry.member_id(), rec.member_id());
        assert_eq!(entry.class_tag(), rec.class_tag());
        assert_eq!(entry.total_score(), 611);
        assert_eq!(entry.created_at(), rec.updated_at());
    }
}
