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
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/**
 * In-memory storage backend.
 *
 * Holds everything behind a single mutex, so a record replace is atomic by construction. Data
 * does not survive a restart; this backend exists for tests and throwaway deployments.
 */
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    records: HashMap<UserId, GearRecord>,
    history: Vec<HistoryEntry>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl GearStore for MemoryStore {
    fn upsert_record(&self, record: &GearRecord) -> Result<(), StoreError> {
        self.lock()?
            .records
            .insert(record.member_id(), record.clone());
        Ok(())
    }

    fn delete_record(&self, member_id: UserId, class_tag: &str) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner
            .records
            .get(&member_id)
            .is_some_and(|rec| rec.class_tag() == class_tag)
        {
            inner.records.remove(&member_id);
        }
        Ok(())
    }

    fn get_record(&self, member_id: UserId) -> Result<Option<GearRecord>, StoreError> {
        Ok(self.lock()?.records.get(&member_id).cloned())
    }

    fn list_records(
        &self,
        filter_ids: Option<&HashSet<UserId>>,
    ) -> Result<Vec<GearRecord>, StoreError> {
        let inner = self.lock()?;
        let mut records: Vec<GearRecord> = inner
            .records
            .values()
            .filter(|rec| filter_ids.is_none_or(|ids| ids.contains(&rec.member_id())))
            .cloned()
            .collect();
        records.sort_by_key(|rec| rec.member_id());
        Ok(records)
    }

    fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
        self.lock()?.history.push(entry.clone());
        Ok(())
    }

    fn get_history(
        &self,
        member_id: UserId,
        class_tag: Option<&str>,
        limit: usize,
    ) -> Result<Vec<HistoryEntry>, StoreError> {
        let inner = self.lock()?;
        Ok(inner
            .history
            .iter()
            .rev() // Newest first.
            .filter(|entry| entry.member_id() == member_id)
            .filter(|entry| class_tag.is_none_or(|tag| entry.class_tag() == tag))
            .take(limit)
            .cloned()
            .collect())
    }

    fn class_aggregate(
        &self,
        filter_ids: Option<&HashSet<UserId>>,
    ) -> Result<Vec<ClassStatistic>, StoreError> {
        aggregate_classes(&self.list_records(filter_ids)?)
    }

    fn clear_all(&self) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        inner.records.clear();
        inner.history.clear();
        Ok(())
    }

    fn clear_history(&self) -> Result<(), StoreError> {
        self.lock()?.history.clear();
        Ok(())
    }
}
