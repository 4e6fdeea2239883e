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
use serde::{Deserialize, Serialize};
use serenity::all::GuildId;
use std::fs;
use std::path::Path;

/* Data structures: */

// Bot configuration struct:
/**
 * Data structure encapsulating the per-guild configuration of the bot.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
#[derive(Deserialize, Serialize)]
pub struct BotConfig {
    /// The name of the Discord role marking members as eligible for ranking and statistics.
    pub qualifying_role: String,
    /// The name of the guild's (private) channel dedicated for special bot admin commands and
    /// activity monitoring.
    pub bot_channel: String,
    /// The name of the guild's public channel dedicated to leaderboard visualizations.
    pub lb_channel: String,
    /// Hours between two reminder scans of the guild.
    pub reminder_interval_hours: u32,
    /// Days after which a gear record counts as stale and its owner gets reminded.
    pub stale_after_days: u32,
    /// Whether to rewrite members' nicknames to `FamilyName (SCORE)` after a submission.
    pub sync_nicknames: bool,
    /// Amount of history entries shown by the history command.
    pub shown_history: u8,
}

impl Default for BotConfig {
    /// Last-resort configuration, used when no custom default `config.json` is shipped.
    fn default() -> BotConfig {
        Self {
            qualifying_role: String::from("Gearscore"),
            bot_channel: String::from("bot-commands"),
            lb_channel: String::from("leaderboards"),
            reminder_interval_hours: 24,
            stale_after_days: 14,
            sync_nicknames: true,
            shown_history: 10,
        }
    }
}

/**
 * Macro for logging the usage of a command.
 */
macro_rules! log_cmd {
    ($ctx:ident) => {
        tracing::info!(
            command = %$ctx.invocation_string(),
            user = %$ctx.author().tag(),
            user_id = %$ctx.author().id,
            guild = ?$ctx.guild_id(),
            "executing command"
        );
    };
}
pub(crate) use log_cmd;

/**
 * Macro for retrieving the guild ID from a Context object.
 */
macro_rules! get_guild_id {
    ($ctx:ident) => {
        $ctx.guild_id()
            .expect("The command was not executed in a guild.")
    };
}
pub(crate) use get_guild_id;

/**
 * Loads the bot configuration for a guild from its persistent configuration file.
 * The file must have been created beforehand (see `bootstrap_guild`).
 */
pub fn load_config(guild_id: &GuildId) -> BotConfig {
    try_load_config(guild_id)
        .expect(format!("Could not load guild {}'s configuration file.", guild_id).as_str())
}

/**
 * Fallible variant of `load_config`, for callers that must survive a missing or corrupt
 * configuration file (the reminder loop skips such guilds instead of dying).
 */
pub fn try_load_config(guild_id: &GuildId) -> Result<BotConfig, StoreError> {
    read_config(Path::new(&format!("guilds/{}/config.json", guild_id)))
}

fn read_config(path: &Path) -> Result<BotConfig, StoreError> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/**
 * Creates the directories expected for the bot to function properly.
 */
pub fn init_filesystem() {
    fs::create_dir_all("guilds").expect("Could not create guilds directory.");
}

/**
 * Creates the per-guild directory and configuration file, if they do not exist yet.
 *
 * A custom default configuration is read from a root `config.json`, if present; the built-in
 * defaults are used as last resort.
 */
pub fn bootstrap_guild(guild_id: &GuildId) {
    if fs::metadata(format!("guilds/{}", guild_id)).is_err() {
        fs::create_dir(format!("guilds/{}", guild_id))
            .expect(format!("Could not create guilds/{} directory.", guild_id).as_str());
    }

    if fs::metadata(format!("guilds/{}/config.json", guild_id)).is_err() {
        // Use custom default configuration, if found:
        let config: BotConfig = if fs::metadata("config.json").is_ok() {
            serde_json::from_str(
                fs::read_to_string("config.json")
                    .expect("Could not read the default configuration file.")
                    .as_str(),
            )
            .expect("Could not parse the default configuration file as a BotConfig object.")
        } else {
            BotConfig::default()
        };
        update_config_persistence(&config, guild_id);
    }
}

/**
 * Updates the persistent configuration file for a guild.
 */
pub fn update_config_persistence(config: &BotConfig, guild_id: &GuildId) {
    let json = serde_json::to_string_pretty(config).expect(
        format!(
            "Could not serialize guild {}'s configuration into JSON.",
            guild_id
        )
        .as_str(),
    );
    fs::write(format!("guilds/{}/config.json", guild_id), json)
        .expect(format!("Could not write guild {}'s configuration file.", guild_id).as_str());
}

/**
 * Formats the nickname the bot sets for a member after a successful submission.
 *
 * Discord caps nicknames at 32 characters; the family name is truncated to fit.
 */
pub fn format_nickname(family_name: &str, score: i64) -> String {
    let suffix = format!(" ({})", score);
    let keep = 32_usize.saturating_sub(suffix.chars().count());
    let family: String = family_name.chars().take(keep).collect();
    format!("{}{}", family, suffix)
}
