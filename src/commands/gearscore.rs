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
use crate::gear::GearRecord;
use crate::lifecycle::{self, RegisterForm, UpdateForm};
use crate::utils::{self, get_guild_id};
use crate::{Context, Error};
use poise::serenity_prelude::{EditMember, GuildId, UserId};

#[poise::command(
    slash_command,
    subcommands("register", "update", "show"),
    subcommand_required,
    guild_only
)]
pub async fn gearscore(_: Context<'_>) -> Result<(), Error> {
    // This function will not be executed, as the command has subcommands.
    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized(
        "en-US",
        "Register your gear stats for the guild's leaderboard."
    )
)]
#[kratos::log_cmd]
pub async fn register(
    ctx: Context<'_>,
    #[description = "Your in-game family name."] family_name: String,
    #[description = "The class you main."] class: String,
    #[description = "Your attack power (AP)."] ap: i64,
    #[description = "Your awakened attack power (AAP)."] aap: i64,
    #[description = "Your defense power (DP)."] dp: i64,
    #[description = "Link to your gear planner page."] gear_link: String,
    #[description = "Name of the character playing the class."] character_name: Option<String>,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let uid = ctx.author().id;

    let form = RegisterForm {
        member_id: uid,
        family_name,
        character_name,
        class_tag: class,
        ap,
        aap,
        dp,
        gear_link,
    };

    match lifecycle::register(ctx.data().store.as_ref(), form) {
        Ok(record) => {
            sync_member_presence(&ctx, gid, uid, &record).await;

            let score = record.total_score().expect(
                "[gearscore] A freshly registered record must have a valid score.",
            );
            ctx.reply(format!(
                "Your gear has been registered: class `{}`, gearscore **{}**.\n\
                Use `/gearscore update` whenever your stats change.",
                record.class_tag(),
                score
            ))
            .await
            .expect(
                format!(
                    "[gearscore] Failed to send reply after user {} registered.",
                    uid
                )
                .as_str(),
            );
        }
        Err(err) => reply_gear_error(&ctx, err, "register").await,
    }

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Update your gear stats (and optionally your class).")
)]
#[kratos::log_cmd]
pub async fn update(
    ctx: Context<'_>,
    #[description = "Your attack power (AP)."] ap: i64,
    #[description = "Your awakened attack power (AAP)."] aap: i64,
    #[description = "Your defense power (DP)."] dp: i64,
    #[description = "Link to your gear planner page."] gear_link: String,
    #[description = "Your new class, if you rerolled."] class: Option<String>,
    #[description = "Your in-game family name, if it changed."] family_name: Option<String>,
    #[description = "Name of the character playing the class."] character_name: Option<String>,
) -> Result<(), Error> {
    let gid = get_guild_id!(ctx);
    let uid = ctx.author().id;

    let form = UpdateForm {
        member_id: uid,
        family_name,
        character_name,
        class_tag: class,
        ap,
        aap,
        dp,
        gear_link,
    };

    match lifecycle::update(ctx.data().store.as_ref(), form) {
        Ok(record) => {
            sync_member_presence(&ctx, gid, uid, &record).await;

            let score = record.total_score().expect(
                "[gearscore] A freshly updated record must have a valid score.",
            );
            ctx.reply(format!(
                "Your gear has been updated: class `{}`, gearscore **{}**.",
                record.class_tag(),
                score
            ))
            .await
            .expect(
                format!("[gearscore] Failed to send reply after user {} updated.", uid).as_str(),
            );
        }
        Err(err) => reply_gear_error(&ctx, err, "update").await,
    }

    Ok(())
}

#[poise::command(
    slash_command,
    ephemeral,
    description_localized("en-US", "Show your stored gear record.")
)]
#[kratos::log_cmd]
pub async fn show(ctx: Context<'_>) -> Result<(), Error> {
    let uid = ctx.author().id;

    let record = match ctx.data().store.get_record(uid) {
        Ok(record) => record,
        Err(err) => {
            tracing::error!(user = %uid, %err, "could not fetch record");
            ctx.reply("The storage backend is unavailable right now; please try again later.")
                .await
                .expect("[gearscore] Failed to send storage failure reply.");
            return Ok(());
        }
    };

    let Some(record) = record else {
        ctx.reply("You have no gear record yet. Use `/gearscore register` to create one.")
            .await
            .expect("[gearscore] Failed to send missing-record reply.");
        return Ok(());
    };

    let score = record
        .total_score()
        .expect("[gearscore] A stored record must have a valid score.");
    ctx.reply(format!(
        "**{}**, class `{}`{}\n\
        AP {} / AAP {} / DP {}, gearscore **{}**\n\
        Gear link: <{}>\n\
        Last update: {}",
        record.family_name(),
        record.class_tag(),
        record
            .character_name()
            .as_ref()
            .map(|name| format!(" (character: {})", name))
            .unwrap_or_default(),
        record.ap(),
        record.aap(),
        record.dp(),
        score,
        record.gear_link(),
        record.updated_at().format("%Y-%m-%d %H:%M UTC"),
    ))
    .await
    .expect(format!("[gearscore] Failed to send record to user {}.", uid).as_str());

    Ok(())
}

/**
 * Renders a lifecycle failure as user guidance, distinguishing recoverable mistakes from
 * internal storage failures.
 */
pub async fn reply_gear_error(ctx: &Context<'_>, err: GearError, cmd: &str) {
    let message = match &err {
        GearError::DuplicateRecord { class_tag } => format!(
            "You already have a gear record (class `{}`). Use `/gearscore update` instead.",
            class_tag
        ),
        GearError::NoExistingRecord => {
            "You have no gear record yet. Use `/gearscore register` first.".to_string()
        }
        GearError::InvalidInput(reason) => format!("Your submission was rejected: {}.", reason),
        GearError::Storage(_) => {
            tracing::error!(%err, command = cmd, "storage failure during lifecycle operation");
            "The storage backend is unavailable right now; please try again later.".to_string()
        }
    };

    ctx.reply(message)
        .await
        .expect(format!("[{}] Failed to send error reply.", cmd).as_str());
}

/**
 * Best-effort side effects after a successful submission: grant the qualifying role and rewrite
 * the member's nickname. Failures (e.g. missing role or permissions) are logged, never
 * surfaced: they are outside the lifecycle contract.
 */
async fn sync_member_presence(ctx: &Context<'_>, gid: GuildId, uid: UserId, record: &GearRecord) {
    let config = utils::load_config(&gid);

    // Qualifying role:
    match gid.roles(ctx.http()).await {
        Ok(roles) => {
            if let Some((role_id, _)) = roles
                .iter()
                .find(|(_, role)| role.name == config.qualifying_role)
            {
                if let Err(err) = ctx
                    .http()
                    .add_member_role(gid, uid, *role_id, Some("Gearscore submission."))
                    .await
                {
                    tracing::warn!(guild = %gid, user = %uid, %err, "could not grant role");
                }
            } else {
                tracing::warn!(
                    guild = %gid,
                    role = config.qualifying_role,
                    "qualifying role does not exist in the guild"
                );
            }
        }
        Err(err) => tracing::warn!(guild = %gid, %err, "could not list guild roles"),
    }

    // Nickname:
    if config.sync_nicknames {
        if let Ok(score) = record.total_score() {
            let nick = utils::format_nickname(record.family_name(), score);
            if let Err(err) = gid
                .edit_member(ctx.http(), uid, EditMember::new().nickname(nick))
                .await
            {
                // Commonly fails for the guild owner; Discord forbids renaming them.
                tracing::warn!(guild = %gid, user = %uid, %err, "could not set nickname");
            }
        }
    }
}
