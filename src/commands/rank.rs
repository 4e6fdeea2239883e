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
use poise::serenity_prelude::User;

#[poise::command(
    slash_command,
    guild_only,
    ephemeral,
    description_localized(
        "en-US",
        "Get a member's position and percentile in the guild's gearscore leaderboard."
    )
)]
#[kratos::log_cmd]
pub async fn rank(
    ctx: Context<'_>,
    #[description = "The member to rank. Defaults to yourself."] member: Option<User>,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let config = utils::load_config(&gid);
    let target = member.map(|user| user.id).unwrap_or(ctx.author().id);

    // The roster is rebuilt from the live member list on every call; eligibility can change
    // between two invocations.
    let guild_roster = match roster::guild_roster(ctx.http(), gid, &config.qualifying_role).await {
        Ok(guild_roster) => guild_roster,
        Err(err) => {
            tracing::error!(guild = %gid, %err, "could not fetch the guild roster");
            ctx.reply("Could not fetch the guild's member list; please try again later.")
                .await
                .expect("[rank] Failed to send roster failure reply.");
            return Ok(());
        }
    };

    let result = match ranking::rank(ctx.data().store.as_ref(), &guild_roster, target) {
        Ok(result) => result,
        Err(err) => {
            tracing::error!(guild = %gid, %err, "ranking query failed");
            ctx.reply("The storage backend is unavailable right now; please try again later.")
                .await
                .expect("[rank] Failed to send storage failure reply.");
            return Ok(());
        }
    };

    // Not an error: the member is outside the eligible set, or eligible but unregistered.
    let Some(result) = result else {
        ctx.reply(format!(
            "<@{}> is not ranked: they either do not hold the `{}` role, or never registered \
            their gear with `/gearscore register`.",
            target, config.qualifying_role
        ))
        .await
        .expect("[rank] Failed to send not-eligible reply.");
        return Ok(());
    };

    ctx.reply(format!(
        "<@{}> is ranked **#{}** of **{}** eligible members (top **{}%**).\n\
        {} member(s) above, {} below.",
        target,
        result.position,
        result.total_eligible,
        result.percentile,
        result.count_above,
        result.count_below,
    ))
    .await
    .expect(format!("[rank] Failed to send the ranking for user {}.", target).as_str());

    Ok(())
}
