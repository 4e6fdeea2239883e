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

#[poise::command(
    slash_command,
    guild_only,
    ephemeral,
    description_localized(
        "en-US",
        "Show per-class member counts and average stats for the eligible members."
    )
)]
#[kratos::log_cmd]
pub async fn classstats(ctx: Context<'_>) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let config = utils::load_config(&gid);

    let guild_roster = match roster::guild_roster(ctx.http(), gid, &config.qualifying_role).await {
        Ok(guild_roster) => guild_roster,
        Err(err) => {
            tracing::error!(guild = %gid, %err, "could not fetch the guild roster");
            ctx.reply("Could not fetch the guild's member list; please try again later.")
                .await
                .expect("[classstats] Failed to send roster failure reply.");
            return Ok(());
        }
    };

    let stats = match ranking::class_statistics(ctx.data().store.as_ref(), &guild_roster) {
        Ok(stats) => stats,
        Err(err) => {
            tracing::error!(guild = %gid, %err, "class statistics query failed");
            ctx.reply("The storage backend is unavailable right now; please try again later.")
                .await
                .expect("[classstats] Failed to send storage failure reply.");
            return Ok(());
        }
    };

    if stats.is_empty() {
        ctx.reply("No eligible member has registered their gear yet.")
            .await
            .expect("[classstats] Failed to send empty-statistics reply.");
        return Ok(());
    }

    // Construct the statistics table, biggest classes first:
    let mut reply = "**Class statistics (eligible members):**\n```\n".to_string();
    write!(
        &mut reply,
        "{:<12} {:>5} {:>7} {:>7} {:>7} {:>7}\n",
        "class", "count", "score", "AP", "AAP", "DP"
    )
    .unwrap();
    for stat in &stats {
        write!(
            &mut reply,
            "{:<12} {:>5} {:>7.1} {:>7.1} {:>7.1} {:>7.1}\n",
            stat.class_tag, stat.count, stat.avg_score, stat.avg_ap, stat.avg_aap, stat.avg_dp
        )
        .unwrap();
    }
    reply.push_str("```");

    ctx.reply(reply)
        .await
        .expect(format!("[classstats] Failed to send the statistics for guild {}.", gid).as_str());

    Ok(())
}
