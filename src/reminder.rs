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
use crate::roster::{self, RosterEntry};
use crate::store::GearStore;
use crate::utils;
use chrono::{DateTime, Duration, Utc};
use serenity::all::{Context as SerenityContext, GuildId, UserId};
use std::collections::HashMap;
use std::fs;
use std::sync::Arc;
use tracing::{info, warn};

/// How often the background loop wakes up to check the per-guild reminder intervals.
const TICK_SECONDS: u64 = 3600;

/**
 * A member due for a gearscore reminder: eligible for ranking, but with a record older than the
 * staleness cutoff, or with no record at all.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct StaleMember {
    pub member_id: UserId,
    /// Timestamp of the member's last submission, or `None` if they never registered.
    pub last_update: Option<DateTime<Utc>>,
}

/**
 * Scans the store for eligible members whose gear data has gone stale.
 *
 * Pure query over one storage snapshot and one roster snapshot; the caller decides what to do
 * with the result. Output is ordered by member identifier, for determinism.
 */
pub fn stale_members(
    store: &dyn GearStore,
    roster: &[RosterEntry],
    now: DateTime<Utc>,
    stale_after: Duration,
) -> Result<Vec<StaleMember>, StoreError> {
    let eligible = roster::eligible_members(roster);
    let records = store.list_records(Some(&eligible))?;
    let cutoff = now - stale_after;

    let mut stale: Vec<StaleMember> = Vec::new();
    for record in &records {
        if record.updated_at() < cutoff {
            stale.push(StaleMember {
                member_id: record.member_id(),
                last_update: Some(record.updated_at()),
            });
        }
    }

    // Eligible members that never registered at all are due for a reminder too:
    let registered: std::collections::HashSet<UserId> =
        records.iter().map(|r| r.member_id()).collect();
    for member_id in &eligible {
        if !registered.contains(member_id) {
            stale.push(StaleMember {
                member_id: *member_id,
                last_update: None,
            });
        }
    }

    stale.sort_by_key(|member| member.member_id);
    Ok(stale)
}

/**
 * Spawns the background reminder loop.
 *
 * Wakes up hourly, and for every guild whose configured reminder interval has elapsed, rebuilds
 * the roster, scans for stale members and DMs each of them. One member's delivery failure is
 * logged and skipped; it never aborts the rest of the scan.
 */
pub fn spawn_reminder_loop(ctx: SerenityContext, store: Arc<dyn GearStore>) {
    tokio::spawn(async move {
        let mut last_run: HashMap<GuildId, DateTime<Utc>> = HashMap::new();
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(TICK_SECONDS));

        loop {
            ticker.tick().await;

            let guilds: Vec<GuildId> = ctx.cache.guilds();
            for gid in guilds {
                // Skip guilds whose filesystem was not bootstrapped yet:
                if fs::metadata(format!("guilds/{}/config.json", gid)).is_err() {
                    continue;
                }
                // A corrupt configuration file must not kill the loop for every guild:
                let config = match utils::try_load_config(&gid) {
                    Ok(config) => config,
                    Err(err) => {
                        warn!(guild = %gid, %err, "could not load the guild configuration; skipping scan");
                        continue;
                    }
                };

                let now = Utc::now();
                let due = last_run
                    .get(&gid)
                    .is_none_or(|last| now - *last >= Duration::hours(config.reminder_interval_hours as i64));
                if !due {
                    continue;
                }
                last_run.insert(gid, now);

                let roster = match roster::guild_roster(&ctx.http, gid, &config.qualifying_role).await
                {
                    Ok(roster) => roster,
                    Err(err) => {
                        warn!(guild = %gid, %err, "could not fetch the guild roster; skipping scan");
                        continue;
                    }
                };

                let stale = match stale_members(
                    store.as_ref(),
                    &roster,
                    now,
                    Duration::days(config.stale_after_days as i64),
                ) {
                    Ok(stale) => stale,
                    Err(err) => {
                        warn!(guild = %gid, %err, "stale-member scan failed; skipping guild");
                        continue;
                    }
                };

                info!(guild = %gid, count = stale.len(), "sending gearscore reminders");
                for member in stale {
                    if let Err(err) = send_reminder(&ctx, member, &config.stale_after_days).await {
                        // One member's failure must not block the remaining members:
                        warn!(guild = %gid, member = %member.member_id, %err,
                            "could not deliver reminder");
                    }
                }
            }
        }
    });
}

async fn send_reminder(
    ctx: &SerenityContext,
    member: StaleMember,
    stale_after_days: &u32,
) -> Result<(), serenity::Error> {
    let message = match member.last_update {
        Some(last) => format!(
            "Your guild gearscore entry was last updated on {}, more than {} day(s) ago. \
            Please refresh it with `/gearscore update`.",
            last.format("%Y-%m-%d"),
            stale_after_days
        ),
        None => "You hold the guild's gearscore role but never registered your gear. \
            Please submit it with `/gearscore register`."
            .to_string(),
    };

    let dm = member.member_id.create_dm_channel(&ctx.http).await?;
    dm.id.say(&ctx.http, message).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::testutil::record_at;

    fn entry(member_id: u64, qualifying: bool) -> RosterEntry {
        RosterEntry {
            member_id: UserId::new(member_id),
            qualifying,
        }
    }

    #[test]
    fn finds_stale_and_unregistered_members() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .upsert_record(&record_at(1, "witch", 100, 120, 200, now - Duration::days(30)))
            .unwrap();
        store
            .upsert_record(&record_at(2, "warrior", 100, 120, 200, now - Duration::days(2)))
            .unwrap();
        // Member 3 holds the role but never registered; member 4 is stale but lost the role:
        store
            .upsert_record(&record_at(4, "ranger", 100, 120, 200, now - Duration::days(60)))
            .unwrap();
        let roster = vec![entry(1, true), entry(2, true), entry(3, true), entry(4, false)];

        let stale = stale_members(&store, &roster, now, Duration::days(14)).unwrap();
        assert_eq!(stale.len(), 2);
        assert_eq!(stale[0].member_id, UserId::new(1));
        assert!(stale[0].last_update.is_some());
        assert_eq!(stale[1].member_id, UserId::new(3));
        assert!(stale[1].last_update.is_none());
    }

    #[test]
    fn fresh_records_are_not_reported() {
        let store = MemoryStore::new();
        let now = Utc::now();
        store
            .upsert_record(&record_at(1, "witch", 100, 120, 200, now - Duration::days(1)))
            .unwrap();
        let roster = vec![entry(1, true)];

        assert!(stale_members(&store, &roster, now, Duration::days(14))
            .unwrap()
            .is_empty());
    }
}
