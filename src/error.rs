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
use thiserror::Error;

/**
 * Failures of the gearscore core.
 *
 * The first three variants are user-recoverable: the command layer turns them into guidance for
 * the member that triggered the command. `Storage` wraps backend failures, which are rendered as
 * an internal error instead.
 */
#[derive(Debug, Error)]
pub enum GearError {
    /// A gear record already exists for the member; `update` must be used instead.
    #[error("a gear record for class `{class_tag}` already exists")]
    DuplicateRecord { class_tag: String },

    /// `update` was called for a member that never registered.
    #[error("no existing gear record to update")]
    NoExistingRecord,

    /// Rejected before any write: negative stat, empty required string, malformed gear link.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The storage backend failed; the operation was aborted with no partial state committed.
    #[error("storage backend failure: {0}")]
    Storage(#[from] StoreError),
}

/**
 * Failures of a storage backend, independent of which adapter produced them.
 */
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON (de)serialization failure: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite failure: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("timestamp parse failure: {0}")]
    Time(#[from] chrono::ParseError),

    /// A stored row no longer satisfies the record invariants (e.g. a negative stat).
    #[error("corrupt stored record: {0}")]
    Corrupt(String),

    /// A store lock was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    Poisoned,
}
