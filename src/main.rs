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
mod commands;
mod error;
mod gear;
mod lifecycle;
mod ranking;
mod reminder;
mod roster;
mod store;
mod utils;

use crate::store::json::JsonStore;
use crate::store::memory::MemoryStore;
use crate::store::sqlite::SqliteStore;
use crate::store::GearStore;
use poise::serenity_prelude as serenity;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/* Poise-required data types: */

type Error = Box<dyn std::error::Error + Send + Sync>;
type Context<'a> = poise::Context<'a, Data, Error>;
// User data:
pub struct Data {
    /// The storage backend. Constructed once at startup and injected everywhere, so tests and
    /// deployments can swap backends freely.
    pub store: Arc<dyn GearStore>,
}

async fn ready(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    _framework: poise::FrameworkContext<'_, Data, Error>,
    data: &Data,
) -> Result<(), Error> {
    match event {
        // Ready (bot is started):
        serenity::FullEvent::Ready { data_about_bot, .. } => {
            info!("{} is connected.", data_about_bot.user.name);

            // Create directories for the persistent data, if necessary:
            utils::init_filesystem();

            ctx.set_presence(None, serenity::OnlineStatus::Online);

            // Check guilds and create their configuration if missing:
            for g in &data_about_bot.guilds {
                let gid = g.id;
                info!("Kratos entered the guild {}.", gid);
                utils::bootstrap_guild(&gid);
            }

            // Start the periodic reminder scans, now that every guild is bootstrapped:
            reminder::spawn_reminder_loop(ctx.clone(), Arc::clone(&data.store));
        }
        // Guild create (the bot joins a new server):
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            // Only process new guilds:
            if *is_new != Some(true) {
                return Ok(());
            }
            info!("Kratos entered the guild {} ({}).", guild.name, guild.id);

            utils::bootstrap_guild(&guild.id);
        }

        _ => {}
    }

    Ok(())
}

/**
 * Builds the storage backend selected through the `KRATOS_BACKEND` environmental variable:
 * `sqlite` (default), `json`, or `memory`.
 */
fn build_store() -> Arc<dyn GearStore> {
    match env::var("KRATOS_BACKEND").as_deref() {
        Ok("json") => {
            info!("Using the JSON file storage backend (data/).");
            Arc::new(JsonStore::open("data").expect("Could not open the JSON store at data/."))
        }
        Ok("memory") => {
            info!("Using the in-memory storage backend; data will not survive a restart.");
            Arc::new(MemoryStore::new())
        }
        _ => {
            info!("Using the SQLite storage backend (kratos.db).");
            Arc::new(SqliteStore::open("kratos.db").expect("Could not open kratos.db."))
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let token = env::var("DISCORD_TOKEN")
        .expect("Discord token not provided (in DISCORD_TOKEN environmental variable).");
    let intents = serenity::GatewayIntents::default()
        | serenity::GatewayIntents::GUILD_MESSAGES
        | serenity::GatewayIntents::GUILD_MEMBERS;

    let store = build_store();

    let framework = poise::Framework::builder()
        .options(poise::FrameworkOptions {
            commands: vec![
                commands::botconfig::botconfig(),
                commands::classstats::classstats(),
                commands::gearscore::gearscore(),
                commands::history::history(),
                commands::license::license(),
                commands::rank::rank(),
                commands::reset::reset(),
                commands::roster::roster(),
            ],
            event_handler: |ctx, event, framework, data| {
                Box::pin(ready(ctx, event, framework, data))
            },
            ..Default::default()
        })
        .setup(|ctx, _ready, framework| {
            Box::pin(async move {
                poise::builtins::register_globally(ctx, &framework.options().commands)
                    .await
                    .expect("Could not register the commands.");
                Ok(Data { store })
            })
        })
        .build();

    let mut client = serenity::Client::builder(token, intents)
        .framework(framework) // For command handling, using poise.
        .await
        .expect("Could not create the Discord bot client object.");

    client.start().await.expect("The Discord bot crashed.");
}
