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
use crate::gear::{normalize_class_tag, GearRecord, HistoryEntry};
use crate::store::GearStore;
use chrono::Utc;
use serenity::all::UserId;
use tracing::warn;

/**
 * A first-time gear submission. Every field is caller-supplied.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
pub struct RegisterForm {
    pub member_id: UserId,
    pub family_name: String,
    pub character_name: Option<String>,
    pub class_tag: String,
    pub ap: i64,
    pub aap: i64,
    pub dp: i64,
    pub gear_link: String,
}

/**
 * A gear update. Stats and the gear link are always caller-supplied (they are the freshest
 * self-report and are never defaulted); the name and class fields fall back to the stored
 * record when omitted.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
pub struct UpdateForm {
    pub member_id: UserId,
    pub family_name: Option<String>,
    pub character_name: Option<String>,
    pub class_tag: Option<String>,
    pub ap: i64,
    pub aap: i64,
    pub dp: i64,
    pub gear_link: String,
}

/**
 * Registers a member's first gear record.
 *
 * Fails with `DuplicateRecord` if the member already has a record (for any class: a member
 * owns at most one record, and class changes go through `update`). On success a history entry
 * is appended; a failing history write is logged and swallowed, since record correctness takes
 * priority over history completeness.
 *
 * Granting the qualifying role and setting the nickname are the caller's side effects,
 * triggered by this operation's success but not part of its contract.
 */
pub fn register(store: &dyn GearStore, form: RegisterForm) -> Result<GearRecord, GearError> {
    let record = GearRecord::new(
        form.member_id,
        form.family_name,
        form.character_name,
        form.class_tag,
        form.ap,
        form.aap,
        form.dp,
        form.gear_link,
        Utc::now(),
    )?;

    if let Some(existing) = store.get_record(form.member_id)? {
        return Err(GearError::DuplicateRecord {
            class_tag: existing.class_tag().clone(),
        });
    }

    store.upsert_record(&record)?;
    append_history_best_effort(store, &record);

    Ok(record)
}

/**
 * Updates a member's existing gear record.
 *
 * Fails with `NoExistingRecord` if the member never registered. A changed class tag moves the
 * record: records are keyed by member, so the upsert replaces the old class row in one atomic
 * step, and the history entry is appended under the new class. When the class changes and no
 * character name is given, the stored name is cleared rather than carried over: a different
 * character plays the new class now.
 */
pub fn update(store: &dyn GearStore, form: UpdateForm) -> Result<GearRecord, GearError> {
    let Some(existing) = store.get_record(form.member_id)? else {
        return Err(GearError::NoExistingRecord);
    };

    let old_class = existing.class_tag().clone();
    let new_class = form
        .class_tag
        .map(|tag| normalize_class_tag(&tag))
        .unwrap_or_else(|| old_class.clone());
    let class_changed = new_class != old_class;

    let family_name = form
        .family_name
        .unwrap_or_else(|| existing.family_name().clone());
    let character_name = if class_changed {
        form.character_name
    } else {
        form.character_name
            .or_else(|| existing.character_name().clone())
    };

    let record = GearRecord::new(
        form.member_id,
        family_name,
        character_name,
        new_class,
        form.ap,
        form.aap,
        form.dp,
        form.gear_link,
        Utc::now(),
    )?;

    // Records are keyed by member, so this one upsert replaces the old class row too; the
    // member is never left without a record mid-move:
    store.upsert_record(&record)?;
    append_history_best_effort(store, &record);

    Ok(record)
}

/// Appends the history entry for a freshly written record. Failures are logged and swallowed.
fn append_history_best_effort(store: &dyn GearStore, record: &GearRecord) {
    let entry = match HistoryEntry::for_record(record) {
        Ok(entry) => entry,
        Err(err) => {
            warn!(member_id = %record.member_id(), %err, "could not build history entry");
            return;
        }
    };

    if let Err(err) = store.append_history(&entry) {
        warn!(member_id = %record.member_id(), %err, "history write failed; record kept");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::gear::ClassStatistic;
    use crate::store::memory::MemoryStore;
    use crate::store::DEFAULT_HISTORY_LIMIT;
    use std::collections::HashSet;

    fn register_form(member_id: u64) -> RegisterForm {
        RegisterForm {
            member_id: UserId::new(member_id),
            family_name: "Belmorn".to_string(),
            character_name: Some("Morrigan".to_string()),
            class_tag: "Witch".to_string(),
            ap: 260,
            aap: 280,
            dp: 330,
            gear_link: "https://garmoth.com/character/abc".to_string(),
        }
    }

    fn update_form(member_id: u64) -> UpdateForm {
        UpdateForm {
            member_id: UserId::new(member_id),
            family_name: None,
            character_name: None,
            class_tag: None,
            ap: 270,
            aap: 290,
            dp: 340,
            gear_link: "https://garmoth.com/character/abc2".to_string(),
        }
    }

    #[test]
    fn register_writes_record_and_history() {
        let store = MemoryStore::new();
        let record = register(&store, register_form(1)).unwrap();
        assert_eq!(record.class_tag(), "witch");
        assert_eq!(record.total_score().unwrap(), 280 + 330);

        let stored = store.get_record(UserId::new(1)).unwrap().unwrap();
        assert_eq!(stored.family_name(), "Belmorn");

        let hist = store
            .get_history(UserId::new(1), None, DEFAULT_HISTORY_LIMIT)
            .unwrap();
        assert_eq!(hist.len(), 1);
        assert_eq!(hist[0].total_score(), 610);
    }

    #[test]
    fn second_register_fails_and_leaves_record_unchanged() {
        let store = MemoryStore::new();
        register(&store, register_form(1)).unwrap();

        let mut second = register_form(1);
        second.ap = 999;
        let err = register(&store, second).unwrap_err();
        assert!(matches!(err, GearError::DuplicateRecord { .. }));

        // The stored record is untouched by the failed call:
        let stored = store.get_record(UserId::new(1)).unwrap().unwrap();
        assert_eq!(stored.ap(), 260);
        assert_eq!(
            store
                .get_history(UserId::new(1), None, DEFAULT_HISTORY_LIMIT)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn register_with_other_class_still_duplicates() {
        let store = MemoryStore::new();
        register(&store, register_form(1)).unwrap();

        let mut second = register_form(1);
        second.class_tag = "Warrior".to_string();
        assert!(matches!(
            register(&store, second),
            Err(GearError::DuplicateRecord { class_tag }) if class_tag == "witch"
        ));
    }

    #[test]
    fn update_without_register_fails() {
        let store = MemoryStore::new();
        assert!(matches!(
            update(&store, update_form(1)),
            Err(GearError::NoExistingRecord)
        ));
    }

    #[test]
    fn update_defaults_names_but_not_stats() {
        let store = MemoryStore::new();
        register(&store, register_form(1)).unwrap();

        let record = update(&store, update_form(1)).unwrap();
        // Omitted fields fall back to the stored values:
        assert_eq!(record.family_name(), "Belmorn");
        assert_eq!(record.character_name().as_deref(), Some("Morrigan"));
        assert_eq!(record.class_tag(), "witch");
        // Stats and link are the caller's values, never defaulted:
        assert_eq!(record.ap(), 270);
        assert_eq!(record.aap(), 290);
        assert_eq!(record.dp(), 340);
        assert_eq!(record.gear_link(), "https://garmoth.com/character/abc2");
    }

    #[test]
    fn class_change_moves_the_record() {
        let store = MemoryStore::new();
        register(&store, register_form(1)).unwrap();

        let mut form = update_form(1);
        form.class_tag = Some("Warrior".to_string());
        let record = update(&store, form).unwrap();
        assert_eq!(record.class_tag(), "warrior");

        // Exactly one row remains, under the new class:
        let all = store.list_records(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].class_tag(), "warrior");

        // History survives the move and the new entry carries the new class:
        let hist = store
            .get_history(UserId::new(1), None, DEFAULT_HISTORY_LIMIT)
            .unwrap();
        assert_eq!(hist.len(), 2);
        assert_eq!(hist[0].class_tag(), "warrior");
        assert_eq!(hist[1].class_tag(), "witch");
    }

    #[test]
    fn class_change_clears_omitted_character_name() {
        let store = MemoryStore::new();
        register(&store, register_form(1)).unwrap();

        let mut form = update_form(1);
        form.class_tag = Some("Warrior".to_string());
        let record = update(&store, form).unwrap();
        // A different character plays the new class; the old name does not carry over:
        assert!(record.character_name().is_none());

        // But an explicitly provided name is kept:
        let mut form = update_form(1);
        form.class_tag = Some("Berserker".to_string());
        form.character_name = Some("Grendel".to_string());
        let record = update(&store, form).unwrap();
        assert_eq!(record.character_name().as_deref(), Some("Grendel"));
    }

    #[test]
    fn invalid_update_leaves_store_unchanged() {
        let store = MemoryStore::new();
        register(&store, register_form(1)).unwrap();

        let mut form = update_form(1);
        form.ap = -5;
        assert!(matches!(
            update(&store, form),
            Err(GearError::InvalidInput(_))
        ));

        let stored = store.get_record(UserId::new(1)).unwrap().unwrap();
        assert_eq!(stored.ap(), 260);
    }

    /// Store wrapper whose history writes always fail, for the best-effort policy test.
    struct BrokenHistoryStore {
        inner: MemoryStore,
    }

    impl GearStore for BrokenHistoryStore {
        fn upsert_record(&self, record: &GearRecord) -> Result<(), StoreError> {
            self.inner.upsert_record(record)
        }
        fn delete_record(&self, member_id: UserId, class_tag: &str) -> Result<(), StoreError> {
            self.inner.delete_record(member_id, class_tag)
        }
        fn get_record(&self, member_id: UserId) -> Result<Option<GearRecord>, StoreError> {
            self.inner.get_record(member_id)
        }
        fn list_records(
            &self,
            filter_ids: Option<&HashSet<UserId>>,
        ) -> Result<Vec<GearRecord>, StoreError> {
            self.inner.list_records(filter_ids)
        }
        fn append_history(&self, _entry: &HistoryEntry) -> Result<(), StoreError> {
            Err(StoreError::Corrupt("history log unavailable".to_string()))
        }
        fn get_history(
            &self,
            member_id: UserId,
            class_tag: Option<&str>,
            limit: usize,
        ) -> Result<Vec<HistoryEntry>, StoreError> {
            self.inner.get_history(member_id, class_tag, limit)
        }
        fn class_aggregate(
            &self,
            filter_ids: Option<&HashSet<UserId>>,
        ) -> Result<Vec<ClassStatistic>, StoreError> {
            self.inner.class_aggregate(filter_ids)
        }
        fn clear_all(&self) -> Result<(), StoreError> {
            self.inner.clear_all()
        }
        fn clear_history(&self) -> Result<(), StoreError> {
            self.inner.clear_history()
        }
    }

    /// Store wrapper that rejects explicit deletes; a class change must not need any.
    struct NoDeleteStore {
        inner: MemoryStore,
    }

    impl GearStore for NoDeleteStore {
        fn upsert_record(&self, record: &GearRecord) -> Result<(), StoreError> {
            self.inner.upsert_record(record)
        }
        fn delete_record(&self, _member_id: UserId, _class_tag: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "deletes are disabled",
            )))
        }
        fn get_record(&self, member_id: UserId) -> Result<Option<GearRecord>, StoreError> {
            self.inner.get_record(member_id)
        }
        fn list_records(
            &self,
            filter_ids: Option<&HashSet<UserId>>,
        ) -> Result<Vec<GearRecord>, StoreError> {
            self.inner.list_records(filter_ids)
        }
        fn append_history(&self, entry: &HistoryEntry) -> Result<(), StoreError> {
            self.inner.append_history(entry)
        }
        fn get_history(
            &self,
            member_id: UserId,
            class_tag: Option<&str>,
            limit: usize,
        ) -> Result<Vec<HistoryEntry>, StoreError> {
            self.inner.get_history(member_id, class_tag, limit)
        }
        fn class_aggregate(
            &self,
            filter_ids: Option<&HashSet<UserId>>,
        ) -> Result<Vec<ClassStatistic>, StoreError> {
            self.inner.class_aggregate(filter_ids)
        }
        fn clear_all(&self) -> Result<(), StoreError> {
            self.inner.clear_all()
        }
        fn clear_history(&self) -> Result<(), StoreError> {
            self.inner.clear_history()
        }
    }

    #[test]
    fn class_change_replaces_through_the_keyed_upsert() {
        let store = NoDeleteStore {
            inner: MemoryStore::new(),
        };
        register(&store, register_form(1)).unwrap();

        let mut form = update_form(1);
        form.class_tag = Some("Warrior".to_string());
        // Succeeds even though the store refuses deletes; the replace is the upsert itself:
        let record = update(&store, form).unwrap();
        assert_eq!(record.class_tag(), "warrior");

        let all = store.list_records(None).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].class_tag(), "warrior");
    }

    #[test]
    fn history_failure_does_not_fail_the_write() {
        let store = BrokenHistoryStore {
            inner: MemoryStore::new(),
        };

        let record = register(&store, register_form(1)).unwrap();
        assert_eq!(record.class_tag(), "witch");
        // The record landed even though the history write failed:
        assert!(store.get_record(UserId::new(1)).unwrap().is_some());
    }
}
