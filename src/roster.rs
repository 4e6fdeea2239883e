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
use serenity::all::{GuildId, Http, UserId};
use std::collections::HashSet;

/**
 * One entry of the live guild roster: a member and whether they currently hold the qualifying
 * role.
 *
 * Rosters are ephemeral: they are rebuilt from the live guild member list on every ranking or
 * statistics request and never persisted. A member losing the role between two queries is an
 * expected state change, not a bug.
 */
#[cfg_attr(debug_assertions, derive(Debug))]
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RosterEntry {
    pub member_id: UserId,
    pub qualifying: bool,
}

/**
 * Resolves the set of members currently eligible for ranking: those holding the qualifying
 * role in the given roster snapshot.
 */
pub fn eligible_members(roster: &[RosterEntry]) -> HashSet<UserId> {
    roster
        .iter()
        .filter(|entry| entry.qualifying)
        .map(|entry| entry.member_id)
        .collect()
}

/**
 * Builds a roster snapshot for a guild from the live member list, marking the members that hold
 * the role with the given name. Bot accounts are skipped.
 *
 * If no role with that name exists in the guild, every member is marked non-qualifying.
 */
pub async fn guild_roster(
    http: &Http,
    guild_id: GuildId,
    qualifying_role: &str,
) -> Result<Vec<RosterEntry>, serenity::Error> {
    let roles = guild_id.roles(http).await?;
    let role_id = roles
        .iter()
        .find(|(_, role)| role.name == qualifying_role)
        .map(|(id, _)| *id);

    let members = guild_id.members(http, None, None).await?;
    Ok(members
        .iter()
        .filter(|member| !member.user.bot)
        .map(|member| RosterEntry {
            member_id: member.user.id,
            qualifying: role_id.is_some_and(|rid| member.roles.contains(&rid)),
        })
        .collect())
}
