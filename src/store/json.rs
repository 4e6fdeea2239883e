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
use serenity::all::UserId;
use std::collections::HashSet;
use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/**
 * File-backed storage backend.
 *
 * Records are saved as `<root>/records/<member_id>.json`, one file per member, and history as
 * newline-delimited JSON appended to `<root>/history.jsonl`. All writers go through one mutex;
 * record files are written to a temporary path and renamed into place, so a half-written file
 * is never visible under the record's name.
 */
pub struct JsonStore {
    root: PathBuf,
    lock: Mutex<()>,
}

impl JsonStore {
    /// Opens a store rooted at the given directory, creating the layout if necessary.
    pub fn open(root: impl Into<PathBuf>) -> Result<JsonStore, StoreError> {
        let root = root.into();
        fs::create_dir_all(root.join("records"))?;
        if !root.join("history.jsonl").exists() {
            fs::write(root.join("history.jsonl"), "")?;
        }
        Ok(Self {
            root,
            lock: Mutex::new(()),
        })
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.lock.lock().map_err(|_| StoreError::Poisoned)
    }

    fn record_path(&self, member_id: UserId) -> PathBuf {
        self.root.join("records").join(format!("{}.json", member_id))
    }

    fn history_path(&self) -> PathBuf {
        self.root.join("history.jsonl")
    }

    fn read_record(path: &Path) -> Result<GearRecord, StoreError> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    fn read_record_if_exists(&self, member_id: UserId) -> Result<Option<GearRecord>, StoreError> {
        let path = self.record_path(member_id);
        if !path.exists() {
            return Ok(None);
        }
        Self::read_record(&path).map(Some)
    }
}

impl GearStore for JsonStore {
    fn upsert_record(&self, record: &GearRecord) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        let json = serde_json::to_string_pretty(record)?;
        let path = self.record_path(record.member_id());
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete_record(&self, member_id: UserId, class_tag: &str) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        if let Some(record) = self.read_record_if_exists(member_id)? {
            if record.class_tag() == class_tag {
                fs::remove_file(self.record_path(member_id))?;
            }
        }
        Ok(())
    }

    fn get_record(&self, member_id: UserId) -> Result<Option<GearRecord>, StoreError> {
        let _guard = self.guard()?;
        self.read_record_if_exists(member_id)
    }

    fn list_records(
        &self,
        filter_ids: Option<&HashSet<UserId>>,
    ) -> Result<Vec<GearRecord>, StoreError> {
        let _guard = self.guard()?;
        let mut records = Vec::new();
        for dir_entry in fs::read_dir(self.root.join("records"))? {
            let path = dir_entry?.path();
            if path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            let record = Self::read_record(&path)?;
            if filter_ids.is_none_or(|ids| ids.contains(&record.member_id())) {
                records.push(record);
            }
        }
        records.sort_by_key(|rec| rec.member_id());
        Ok(records)
    }

    fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.history_path())?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn get_history(
        &self,
        member_id: UserId,
        class_tag: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let _guard = self.guard()?;
        let log = fs::read_to_string(self.history_path())?;
        let mut entries = Vec::new();
        for line in log.lines().rev() {
            // Newest entries are at the end of the log.
            if line.trim().is_empty() {
                continue;
            }
            let entry: HistoryEntry = serde_json::from_str(line)?;
            if entry.member_id() != member_id {
                continue;
            }
            if class_tag.is_some_and(|tag| entry.class_tag() != tag) {
                continue;
            }
            entries.push(entry);
            if entries.len() == limit {
                break;
            }
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
        let _guard = self.guard()?;
        for dir_entry in fs::read_dir(self.root.join("records"))? {
            let path = dir_entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                fs::remove_file(path)?;
            }
        }
        fs::write(self.history_path(), "")?;
        Ok(())
    }

    fn clear_history(&self) -> Result<(), StoreError> {
        let _guard = self.guard()?;
        fs::write(self.history_path(), "")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{check_store_contract, record};

    #[test]
    fn json_store_fulfills_the_contract() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        check_store_contract(&store);
    }

    #[test]
    fn json_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = JsonStore::open(dir.path()).unwrap();
            store.upsert_record(&record(9, "witch", 100, 120, 200)).unwrap();
            store
                .append_history(&HistoryEntry::for_record(&record(9, "witch", 100, 120, 200)).unwrap())
                .unwrap();
        }

        let reopened = JsonStore::open(dir.path()).unwrap();
        let rec = reopened.get_record(UserId::new(9)).unwrap().unwrap();
        assert_eq!(rec.class_tag(), "witch");
        let hist = reopened.get_history(UserId::new(9), None, 10).unwrap();
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].total_score(), 320);
    }
}
