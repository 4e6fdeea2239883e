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
use crate::commands::botconfig::check_on_proper_channel;
use crate::utils;
use crate::utils::get_guild_id;
use crate::{Context, Error};

#[poise::command(
    slash_command,
    subcommands("all", "history"),
    subcommand_required,
    default_member_permissions = "MANAGE_GUILD",
    guild_only,
    ephemeral
)]
pub async fn reset(_: Context<'_>) -> Result<(), Error> {
    // This function will not be executed, as the command has subcommands.
    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized(
        "en-US",
        "Wipe every gear record and the whole submission history. Irreversible."
    )
)]
#[kratos::log_cmd]
pub async fn all(ctx: Context<'_>) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let config = utils::load_config(&gid);

    // Destructive operations are restricted to the bot admin channel:
    if !check_on_proper_channel(ctx, &config.bot_channel).await {
        return Ok(());
    }

    if let Err(err) = ctx.data().store.clear_all() {
        tracing::error!(guild = %gid, %err, "full wipe failed");
        ctx.reply("The storage backend is unavailable right now; nothing was wiped.")
            .await
            .expect("[reset] Failed to send storage failure reply.");
        return Ok(());
    }

    ctx.reply("All gear records and the submission history have been wiped.")
        .await
        .expect(format!("[reset] Failed to send wipe confirmation for guild {}.", gid).as_str());

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized(
        "en-US",
        "Wipe the submission history, keeping the current gear records. Irreversible."
    )
)]
#[kratos::log_cmd]
pub async fn history(ctx: Context<'_>) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let config = utils::load_config(&gid);

    if !check_on_proper_channel(ctx, &config.bot_channel).await {
        return Ok(());
    }

    if let Err(err) = ctx.data().store.clear_history() {
        tracing::error!(guild = %gid, %err, "history wipe failed");
        ctx.reply("The storage backend is unavailable right now; nothing was wiped.")
            .await
            .expect("[reset] Failed to send storage failure reply.");
        return Ok(());
    }

    ctx.reply("The submission history has been wiped. Current gear records were kept.")
        .await
        .expect(
            format!(
                "[reset] Failed to send history wipe confirmation for guild {}.",
                gid
            )
            .as_str(),
        );

    Ok(())
}
