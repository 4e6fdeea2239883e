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
use crate::utils::{self, get_guild_id};
use crate::{ranking, roster};
use crate::{Context, Error};
use std::fmt::Write as _;

// Discord rejects messages longer than 2000 characters; leaderboards are sent in chunks.
const MESSAGE_LIMIT: usize = 1900;

#[poise::command(
    slash_command,
    guild_only,
    default_member_permissions = "MANAGE_GUILD",
    ephemeral,
    description_localized(
        "en-US",
        "Dump the guild's gearscore leaderboard, eligible members first."
    )
)]
#[kratos::log_cmd]
pub async fn roster(ctx: Context<'_>) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let config = utils::load_config(&gid);

    let guild_roster = match roster::guild_roster(ctx.http(), gid, &config.qualifying_role).await {
        Ok(guild_roster) => guild_roster,
        Err(err) => {
            tracing::error!(guild = %gid, %err, "could not fetch the guild roster");
            ctx.reply("Could not fetch the guild's member list; please try again later.")
                .await
                .expect("[roster] Failed to send roster failure reply.");
            return Ok(());
        }
    };

    // The ranked leaderboard over the eligible set:
    let board = match ranking::leaderboard(ctx.data().store.as_ref(), &guild_roster) {
        Ok(board) => board,
        Err(err) => {
            tracing::error!(guild = %gid, %err, "leaderboard query failed");
            ctx.reply("The storage backend is unavailable right now; please try again later.")
                .await
                .expect("[roster] Failed to send storage failure reply.");
            return Ok(());
        }
    };

    // Records of members that lost the role are kept but not ranked; list them separately:
    let eligible = roster::eligible_members(&guild_roster);
    let all_records = match ctx.data().store.list_records(None) {
        Ok(records) => records,
        Err(err) => {
            tracing::error!(guild = %gid, %err, "record listing failed");
            ctx.reply("The storage backend is unavailable right now; please try again later.")
                .await
                .expect("[roster] Failed to send storage failure reply.");
            return Ok(());
        }
    };

    let mut out = "## Gearscore leaderboard:\n".to_string();
    for (position, (record, score)) in board.iter().enumerate() {
        write!(
            &mut out,
            "{}. **{}** (<@{}>), `{}`: **{}**\n",
            position + 1,
            record.family_name(),
            record.member_id(),
            record.class_tag(),
            score
        )
        .unwrap();
    }
    if board.is_empty() {
        out.push_str("*No eligible member has registered their gear yet.*\n");
    }

    let unranked: Vec<_> = all_records
        .iter()
        .filter(|record| !eligible.contains(&record.member_id()))
        .collect();
    if !unranked.is_empty() {
        write!(
            &mut out,
            "\n**Stored but not eligible** (missing the `{}` role):\n",
            config.qualifying_role
        )
        .unwrap();
        for record in unranked {
            write!(
                &mut out,
                "- **{}** (<@{}>), `{}`\n",
                record.family_name(),
                record.member_id(),
                record.class_tag()
            )
            .unwrap();
        }
    }

    // Split into Discord-sized messages, on line boundaries:
    let mut chunk = String::new();
    for line in out.lines() {
        if chunk.len() + line.len() + 1 > MESSAGE_LIMIT {
            ctx.reply(chunk.clone())
                .await
                .expect("[roster] Failed to send a leaderboard chunk.");
            chunk.clear();
        }
        chunk.push_str(line);
        chunk.push('\n');
    }
    if !chunk.is_empty() {
        ctx.reply(chunk)
            .await
            .expect("[roster] Failed to send the leaderboard.");
    }

    Ok(())
}
