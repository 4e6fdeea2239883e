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
use crate::gear::{ClassStatistic, GearRecord, HistoryEntry};
use crate::store::{aggregate_classes, GearStore};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension as _, Row};
use serenity::all::UserId;
use std::collections::HashSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS gear_records (
  member_id INTEGER PRIMARY KEY,
  family_name TEXT NOT NULL,
  character_name TEXT,
  class_tag TEXT NOT NULL,
  ap INTEGER NOT NULL CHECK (ap >= 0),
  aap INTEGER NOT NULL CHECK (aap >= 0),
  dp INTEGER NOT NULL CHECK (dp >= 0),
  gear_link TEXT NOT NULL,
  updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS gear_history (
  entry_seq INTEGER PRIMARY KEY AUTOINCREMENT,
  member_id INTEGER NOT NULL,
  class_tag TEXT NOT NULL,
  ap INTEGER NOT NULL CHECK (ap >= 0),
  aap INTEGER NOT NULL CHECK (aap >= 0),
  dp INTEGER NOT NULL CHECK (dp >= 0),
  total_score INTEGER NOT NULL,
  created_at TEXT NOT NULL
);

CREATE TRIGGER IF NOT EXISTS trg_gear_history_no_update
BEFORE UPDATE ON gear_history
BEGIN
  SELECT RAISE(FAIL, 'gear_history is append-only');
END;

CREATE INDEX IF NOT EXISTS idx_gear_history_member
  ON gear_history(member_id, class_tag, entry_seq);
";

/**
 * SQLite storage backend (rusqlite, bundled).
 *
 * `upsert_record` relies on `INSERT .. ON CONFLICT DO UPDATE` against the member-id primary
 * key, so a replace is a single atomic statement. The history table carries a trigger that
 * rejects in-place updates; only appends and the explicit wipe operations touch it.
 */
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (and migrates) the database file at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<SqliteStore, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Opens an in-memory database. Used by tests and throwaway deployments.
    pub fn open_in_memory() -> Result<SqliteStore, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<SqliteStore, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    // Row mapping can fail two ways: rusqlite's own column errors, and a row that no longer
    // satisfies the record invariants. The latter is reported as `Corrupt` in the inner Result.
    fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Result<GearRecord, StoreError>> {
        let member_id = UserId::new(row.get::<_, i64>(0)? as u64);
        let family_name: String = row.get(1)?;
        let character_name: Option<String> = row.get(2)?;
        let class_tag: String = row.get(3)?;
        let ap: i64 = row.get(4)?;
        let aap: i64 = row.get(5)?;
        let dp: i64 = row.get(6)?;
        let gear_link: String = row.get(7)?;
        let updated_at: String = row.get(8)?;

        let updated_at = match parse_timestamp(&updated_at) {
            Ok(ts) => ts,
            Err(err) => return Ok(Err(err)),
        };
        Ok(GearRecord::new(
            member_id,
            family_name,
            character_name,
            class_tag,
            ap,
            aap,
            dp,
            gear_link,
            updated_at,
        )
        .map_err(|err| StoreError::Corrupt(err.to_string())))
    }
}

/// Parses an RFC 3339 timestamp column back into UTC.
fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, StoreError> {
    Ok(DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc))
}

impl GearStore for SqliteStore {
    fn upsert_record(&self, record: &GearRecord) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO gear_records
               (member_id, family_name, character_name, class_tag, ap, aap, dp, gear_link, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
             ON CONFLICT(member_id) DO UPDATE SET
               family_name = excluded.family_name,
               character_name = excluded.character_name,
               class_tag = excluded.class_tag,
               ap = excluded.ap,
               aap = excluded.aap,
               dp = excluded.dp,
               gear_link = excluded.gear_link,
               updated_at = excluded.updated_at",
            params![
                record.member_id().get() as i64,
                record.family_name(),
                record.character_name(),
                record.class_tag(),
                record.ap(),
                record.aap(),
                record.dp(),
                record.gear_link(),
                record.updated_at().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn delete_record(&self, member_id: UserId, class_tag: &str) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "DELETE FROM gear_records WHERE member_id = ?1 AND class_tag = ?2",
            params![member_id.get() as i64, class_tag],
        )?;
        Ok(())
    }

    fn get_record(&self, member_id: UserId) -> Result<Option<GearRecord>, StoreError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT member_id, family_name, character_name, class_tag, ap, aap, dp,
                        gear_link, updated_at
                 FROM gear_records WHERE member_id = ?1",
                params![member_id.get() as i64],
                Self::row_to_record,
            )
            .optional()?;
        match row {
            None => Ok(None),
            Some(Err(err)) => Err(err),
            Some(Ok(record)) => Ok(Some(record)),
        }
    }

    fn list_records(
        &self,
        filter_ids: Option<&HashSet<UserId>>,
    ) -> Result<Vec<GearRecord>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT member_id, family_name, character_name, class_tag, ap, aap, dp,
                    gear_link, updated_at
             FROM gear_records ORDER BY member_id",
        )?;
        let rows = stmt.query_map([], Self::row_to_record)?;

        let mut records = Vec::new();
        for row in rows {
            let record = row??;
            if filter_ids.is_none_or(|ids| ids.contains(&record.member_id())) {
                records.push(record);
            }
        }
        Ok(records)
    }

    fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO gear_history
               (member_id, class_tag, ap, aap, dp, total_score, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.member_id().get() as i64,
                entry.class_tag(),
                entry.ap(),
                entry.aap(),
                entry.dp(),
                entry.total_score(),
                entry.created_at().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get_history(
        &self,
        member_id: UserId,
        class_tag: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT member_id, class_tag, ap, aap, dp, total_score, created_at
             FROM gear_history
             WHERE member_id = ?1 AND (?2 IS NULL OR class_tag = ?2)
             ORDER BY entry_seq DESC
             LIMIT ?3",
        )?;
        let rows = stmt.query_map(
            params![member_id.get() as i64, class_tag, limit as i64],
            |row| {
                Ok((
                    row.get::<_, i64>(0)? as u64,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, i64>(4)?,
                    row.get::<_, i64>(5)?,
                    row.get::<_, String>(6)?,
                ))
            },
        )?;

        let mut entries = Vec::new();
        for row in rows {
            let (member, class, ap, aap, dp, total, created_at) = row?;
            entries.push(HistoryEntry::from_parts(
                UserId::new(member),
                class,
                ap,
                aap,
                dp,
                total,
                parse_timestamp(&created_at)?,
            ));
        }
        Ok(entries)
    }

    fn class_aggregate(
        &self,
        filter_ids: Option<&HashSet<UserId>>,
    ) -> Result<Vec<ClassStatistic>, StoreError> {
        aggregate_classes(&self.list_records(filter_ids)?)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM gear_records", [])?;
        conn.execute("DELETE FROM gear_history", [])?;
        Ok(())
    }

    fn clear_history(&self) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM gear_history", [])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{check_store_contract, record};

    #[test]
    fn sqlite_store_fulfills_the_contract() {
        let store = SqliteStore::open_in_memory().unwrap();
        check_store_contract(&store);
    }

    #[test]
    fn sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kratos.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.upsert_record(&record(9, "witch", 100, 120, 200)).unwrap();
        }

        let reopened = SqliteStore::open(&path).unwrap();
        let rec = reopened.get_record(UserId::new(9)).unwrap().unwrap();
        assert_eq!(rec.total_score().unwrap(), 320);
    }

    #[test]
    fn history_rows_cannot_be_updated_in_place() {
        let store = SqliteStore::open_in_memory().unwrap();
        let entry =
            crate::gear::HistoryEntry::for_record(&record(2, "witch", 100, 120, 200)).unwrap();
        store.append_history(&entry).unwrap();

        let conn = store.conn.lock().unwrap();
        let res = conn.execute("UPDATE gear_history SET total_score = 0", []);
        assert!(res.is_err());
    }
}
