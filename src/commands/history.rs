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
use crate::{Context, Error};
use poise::serenity_prelude::User;
use std::fmt::Write as _;

#[poise::command(
    slash_command,
    guild_only,
    ephemeral,
    description_localized(
        "en-US",
        "Show a member's gearscore submission history, newest first."
    )
)]
#[kratos::log_cmd]
pub async fn history(
    ctx: Context<'_>,
    #[description = "The member whose history to show. Defaults to yourself."] member: Option<User>,
    #[description = "Only show entries for this class."] class: Option<String>,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let config = utils::load_config(&gid);
    let target = member.map(|user| user.id).unwrap_or(ctx.author().id);
    let class = class.map(|tag| crate::gear::normalize_class_tag(&tag));

    // The configured length is clamped to the storage contract's cap:
    let limit = crate::store::history_limit(config.shown_history as usize);
    let entries = match ctx.data().store.get_history(target, class.as_deref(), limit) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::error!(guild = %gid, user = %target, %err, "history query failed");
            ctx.reply("The storage backend is unavailable right now; please try again later.")
                .await
                .expect("[history] Failed to send storage failure reply.");
            return Ok(());
        }
    };

    if entries.is_empty() {
        ctx.reply(format!("<@{}> has no recorded submissions yet.", target))
            .await
            .expect("[history] Failed to send empty-history reply.");
        return Ok(());
    }

    let mut reply = format!("**Last submissions of <@{}>:**\n", target);
    for entry in &entries {
        write!(
            &mut reply,
            "- {} `{}`: AP {} / AAP {} / DP {} = **{}**\n",
            entry.created_at().format("%Y-%m-%d"),
            entry.class_tag(),
            entry.ap(),
            entry.aap(),
            entry.dp(),
            entry.total_score(),
        )
        .unwrap();
    }

    ctx.reply(reply)
        .await
        .expect(format!("[history] Failed to send the history for user {}.", target).as_str());

    Ok(())
}
