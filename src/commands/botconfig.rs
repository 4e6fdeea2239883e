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
use crate::utils;
use crate::utils::get_guild_id;
use crate::{Context, Error};

/**
 * Checks that an admin command was invoked in the configured bot channel, replying with a
 * pointer to it otherwise.
 */
pub async fn check_on_proper_channel(ctx: Context<'_>, channel_name: &String) -> bool {
    let gid = get_guild_id!(ctx);
    let cmd_channel = ctx
        .guild_channel()
        .await
        .expect("[botconfig] The command was not invoked in a guild channel.");
    if cmd_channel.name != *channel_name {
        ctx.reply(
            format!(
                "This command should only be used in the configured bot channel: #{}.",
                channel_name
            )
            .as_str(),
        )
        .await
        .expect(
            format!(
            "[botconfig] Failed to send reply using the command in an invalid channel in guild {}.",
            gid
        )
            .as_str(),
        );

        return false;
    }

    return true;
}

#[poise::command(
    slash_command,
    subcommands(
        "show",
        "qualifying_role",
        "bot_channel",
        "lb_channel",
        "reminder_interval",
        "stale_after",
        "sync_nicknames",
        "shown_history",
    ),
    default_member_permissions = "MANAGE_GUILD",
    guild_only,
    ephemeral
)]
#[kratos::log_cmd]
pub async fn botconfig(ctx: Context<'_>) -> Result<(), Error> {
    // This function will not be executed, as the command has subcommands.
    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Show the current configuration for the bot.")
)]
#[kratos::log_cmd]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let config = utils::load_config(&gid);

    // Reply with the current configuration:
    ctx.reply(format!(
        "Current configuration:\n\
        ```json\n{}\n```",
        serde_json::to_string_pretty(&config).expect(
            format!(
                "[botconfig] Failed to serialize the config for guild {}.",
                gid
            )
            .as_str()
        )
    ))
    .await
    .expect(
        format!(
            "[botconfig] Failed to send the configuration for guild {}.",
            gid
        )
        .as_str(),
    );

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized(
        "en-US",
        "Change the role marking members as eligible for ranking."
    )
)]
#[kratos::log_cmd]
pub async fn qualifying_role(
    ctx: Context<'_>,
    #[description = "The name of the qualifying role."] role: String,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let mut config = utils::load_config(&gid);

    // Update the configuration:
    config.qualifying_role = role.clone();
    utils::update_config_persistence(&config, &gid);

    // Reply to the user, as confirmation:
    ctx.reply(
        format!(
            "The qualifying role has been changed to `{}`.",
            config.qualifying_role
        )
        .as_str(),
    )
    .await
    .expect(
        format!(
            "[botconfig] Failed to send confirmation of qualifying role change for guild {}.",
            gid
        )
        .as_str(),
    );

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Change the bot's admin channel.")
)]
#[kratos::log_cmd]
pub async fn bot_channel(
    ctx: Context<'_>,
    #[description = "The name of the bot admin channel."] channel: String,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let mut config = utils::load_config(&gid);

    // Update the configuration:
    config.bot_channel = channel.clone();
    utils::update_config_persistence(&config, &gid);

    // Reply to the user, as confirmation:
    ctx.reply(format!("The bot channel has been changed to #{}.", config.bot_channel).as_str())
        .await
        .expect(
            format!(
                "[botconfig] Failed to send confirmation of bot channel change for guild {}.",
                gid
            )
            .as_str(),
        );

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Change the leaderboard visualization channel.")
)]
#[kratos::log_cmd]
pub async fn lb_channel(
    ctx: Context<'_>,
    #[description = "The name of the leaderboard channel."] channel: String,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let mut config = utils::load_config(&gid);

    // Update the configuration:
    config.lb_channel = channel.clone();
    utils::update_config_persistence(&config, &gid);

    // Reply to the user, as confirmation:
    ctx.reply(
        format!(
            "The leaderboard channel has been changed to #{}.",
            config.lb_channel
        )
        .as_str(),
    )
    .await
    .expect(
        format!(
            "[botconfig] Failed to send confirmation of leaderboard channel change for guild {}.",
            gid
        )
        .as_str(),
    );

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Change the hours between two reminder scans.")
)]
#[kratos::log_cmd]
pub async fn reminder_interval(
    ctx: Context<'_>,
    #[description = "The new interval, in hours."] hours: u32,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let mut config = utils::load_config(&gid);

    // Update the configuration:
    config.reminder_interval_hours = hours;
    utils::update_config_persistence(&config, &gid);

    // Reply to the user, as confirmation:
    ctx.reply(
        format!(
            "The reminder interval has been changed to {} hour(s).",
            config.reminder_interval_hours
        )
        .as_str(),
    )
    .await
    .expect(
        format!(
            "[botconfig] Failed to send confirmation of reminder interval change for guild {}.",
            gid
        )
        .as_str(),
    );

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Change the days after which a gear record counts as stale.")
)]
#[kratos::log_cmd]
pub async fn stale_after(
    ctx: Context<'_>,
    #[description = "The new staleness cutoff, in days."] days: u32,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let mut config = utils::load_config(&gid);

    // Update the configuration:
    config.stale_after_days = days;
    utils::update_config_persistence(&config, &gid);

    // Reply to the user, as confirmation:
    ctx.reply(
        format!(
            "Gear records now count as stale after {} day(s).",
            config.stale_after_days
        )
        .as_str(),
    )
    .await
    .expect(
        format!(
            "[botconfig] Failed to send confirmation of staleness cutoff change for guild {}.",
            gid
        )
        .as_str(),
    );

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Toggle rewriting nicknames to `FamilyName (SCORE)`.")
)]
#[kratos::log_cmd]
pub async fn sync_nicknames(
    ctx: Context<'_>,
    #[description = "Whether to rewrite nicknames after submissions."] enabled: bool,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let mut config = utils::load_config(&gid);

    // Update the configuration:
    config.sync_nicknames = enabled;
    utils::update_config_persistence(&config, &gid);

    // Reply to the user, as confirmation:
    ctx.reply(
        format!(
            "Nickname synchronization has been {}.",
            if enabled { "enabled" } else { "disabled" }
        )
        .as_str(),
    )
    .await
    .expect(
        format!(
            "[botconfig] Failed to send confirmation of nickname sync change for guild {}.",
            gid
        )
        .as_str(),
    );

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Change the number of entries the history command shows.")
)]
#[kratos::log_cmd]
pub async fn shown_history(
    ctx: Context<'_>,
    #[description = "The new number of shown history entries."] count: u8,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let mut config = utils::load_config(&gid);

    // Update the configuration:
    config.shown_history = count;
    utils::update_config_persistence(&config, &gid);

    // Reply to the user, as confirmation:
    ctx.reply(
        format!(
            "The history command now shows up to {} entries.",
            config.shown_history
        )
        .as_str(),
    )
    .await
    .expect(
        format!(
            "[botconfig] Failed to send confirmation of history length change for guild {}.",
            gid
        )
        .as_str(),
    );

    Ok(())
}
